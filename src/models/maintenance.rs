//! Modelo de MaintenanceTicket
//!
//! Tickets de mantenimiento, borradores producidos por el parseo de tickets
//! escaneados y el registro final de cierre. Mapea a la tabla
//! `maintenance_tickets` del schema PostgreSQL.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::Type;
use std::fmt;
use uuid::Uuid;
use validator::ValidationError;

use crate::models::ticket_image::ImagePreview;
use crate::models::vehicle::Vehicle;
use crate::utils::validation::{validate_length, validate_not_empty};

/// Longitud máxima de una etiqueta de repuesto
pub const MAX_PART_LABEL_LEN: usize = 120;

/// Estado del ticket - mapea al ENUM maintenance_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "maintenance_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    InProgress,
    Completed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Etiqueta libre de un repuesto reemplazado ("Filtro de aceite", "Retrovisor")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartLabel(String);

impl PartLabel {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let trimmed = value.trim();
        validate_not_empty(trimmed)?;
        validate_length(trimmed, 1, MAX_PART_LABEL_LEN)?;
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PartLabel {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PartLabel::parse(&value)
    }
}

impl From<PartLabel> for String {
    fn from(label: PartLabel) -> Self {
        label.0
    }
}

impl fmt::Display for PartLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lista ordenada de repuestos
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartList(Vec<PartLabel>);

impl PartList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Construir desde etiquetas crudas; falla con la primera inválida
    pub fn from_labels<I, S>(labels: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        labels
            .into_iter()
            .map(|label| PartLabel::parse(label.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    pub fn push(&mut self, label: PartLabel) {
        self.0.push(label);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|label| label.0.clone()).collect()
    }
}

/// Ticket de mantenimiento de un vehículo
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaintenanceTicket {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub status: TicketStatus,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub workshop_name: String,
    pub workshop_contact: Option<String>,
    pub problem_description: String,
    pub works_performed: String,
    pub interior_parts_replaced: PartList,
    pub exterior_parts_replaced: PartList,
    pub total_cost: Option<Decimal>,
    pub currency: String,
    pub ticket_image_refs: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl MaintenanceTicket {
    /// Ticket recién abierto (`in_progress`) para un vehículo
    pub fn open(vehicle_id: Uuid, meta: MaintenanceMeta, currency: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            vehicle_id,
            status: TicketStatus::InProgress,
            start_date: meta.start_date,
            end_date: None,
            workshop_name: meta.workshop_name,
            workshop_contact: meta.workshop_contact,
            problem_description: meta.problem_description,
            works_performed: String::new(),
            interior_parts_replaced: PartList::new(),
            exterior_parts_replaced: PartList::new(),
            total_cost: None,
            currency,
            ticket_image_refs: Vec::new(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == TicketStatus::InProgress
    }

    /// Aplicar el registro de cierre; el ticket pasa a `completed`
    pub fn apply_completion(
        &mut self,
        record: CompletionRecord,
        end_date: NaiveDate,
        image_refs: Vec<String>,
    ) {
        self.status = TicketStatus::Completed;
        self.end_date = Some(end_date);
        self.works_performed = record.works_performed;
        self.interior_parts_replaced = record.interior_parts_replaced;
        self.exterior_parts_replaced = record.exterior_parts_replaced;
        self.total_cost = record.total_cost;
        if let Some(currency) = record.currency {
            self.currency = currency;
        }
        self.ticket_image_refs = image_refs;
        self.completed_at = Some(Utc::now());
    }
}

/// Datos de apertura de un mantenimiento, ya validados
#[derive(Debug, Clone, PartialEq)]
pub struct MaintenanceMeta {
    pub workshop_name: String,
    pub workshop_contact: Option<String>,
    pub problem_description: String,
    pub start_date: NaiveDate,
}

/// Borrador producido por el parseo del texto reconocido (no persistido)
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DraftCompletion {
    pub works_performed: String,
    pub interior_parts_replaced: PartList,
    pub exterior_parts_replaced: PartList,
    pub total_cost: Option<Decimal>,
    /// Moneda detectada junto al importe, si la había
    pub currency: Option<String>,
}

/// Ediciones manuales del operador; `None` deja pasar el valor del borrador.
///
/// En los campos anulables `Some(None)` (un `null` explícito en el JSON)
/// borra el valor detectado por el OCR.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionEdits {
    pub works_performed: Option<String>,
    pub interior_parts_replaced: Option<PartList>,
    pub exterior_parts_replaced: Option<PartList>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_cost: Option<Option<Decimal>>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub currency: Option<Option<String>>,
}

// Campo presente (aunque sea null) => Some(_); ausente => None vía `default`
fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Registro final de cierre: borrador + ediciones
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRecord {
    pub works_performed: String,
    pub interior_parts_replaced: PartList,
    pub exterior_parts_replaced: PartList,
    pub total_cost: Option<Decimal>,
    pub currency: Option<String>,
}

/// Entrada de `complete_maintenance`
#[derive(Debug, Clone)]
pub struct CompletionInput {
    pub end_date: Option<NaiveDate>,
    pub draft: DraftCompletion,
    pub edits: CompletionEdits,
    pub ocr_completed: bool,
    pub images: Vec<ImagePreview>,
}

/// Vehículo en taller con su ticket abierto
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActiveMaintenance {
    pub vehicle: Vehicle,
    pub ticket: MaintenanceTicket,
}
