use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::maintenance::{ActiveMaintenance, MaintenanceTicket, PartList, TicketStatus};
use crate::models::vehicle::{Vehicle, VehicleStatus};
use crate::repositories::vehicle_repository::VehicleRegistry;
use crate::repositories::{conflict_on_unique, PgRepository};
use crate::utils::errors::{not_found_error, AppError, AppResult};

/// Almacén de tickets de mantenimiento
#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn find_ticket(&self, id: Uuid) -> AppResult<Option<MaintenanceTicket>>;

    async fn find_in_progress_by_vehicle(
        &self,
        vehicle_id: Uuid,
    ) -> AppResult<Option<MaintenanceTicket>>;

    /// Historial, más reciente primero; `None` devuelve todos los vehículos
    async fn list_history(&self, vehicle_id: Option<Uuid>) -> AppResult<Vec<MaintenanceTicket>>;
}

/// Resultado del cierre: ticket completado y estado previo del vehículo
#[derive(Debug, Clone)]
pub struct ClosedTicket {
    pub ticket: MaintenanceTicket,
    pub previous_vehicle_status: VehicleStatus,
}

/// Escrituras pareadas ticket + vehículo, aplicadas como una sola unidad
#[async_trait]
pub trait MaintenanceStore: VehicleRegistry + TicketStore {
    /// Inserta el ticket `in_progress` y pasa el vehículo a `maintenance`.
    /// `NotFound` si el vehículo no existe, `Conflict` si ya tiene un ticket abierto.
    async fn open_ticket(&self, ticket: MaintenanceTicket) -> AppResult<MaintenanceTicket>;

    /// Guarda el ticket completado y devuelve el vehículo a `active`,
    /// sea cual sea su estado actual. `InvalidState` si el ticket ya no estaba abierto.
    async fn close_ticket(&self, ticket: MaintenanceTicket) -> AppResult<ClosedTicket>;

    async fn list_active(&self) -> AppResult<Vec<ActiveMaintenance>>;
}

// Struct de fila: los arrays TEXT[] se validan al convertir a PartList
#[derive(Debug, sqlx::FromRow)]
struct TicketRow {
    id: Uuid,
    vehicle_id: Uuid,
    status: TicketStatus,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    workshop_name: String,
    workshop_contact: Option<String>,
    problem_description: String,
    works_performed: String,
    interior_parts_replaced: Vec<String>,
    exterior_parts_replaced: Vec<String>,
    total_cost: Option<Decimal>,
    currency: String,
    ticket_image_refs: Vec<String>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<TicketRow> for MaintenanceTicket {
    type Error = AppError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        let interior = PartList::from_labels(&row.interior_parts_replaced).map_err(|e| {
            AppError::Internal(format!("Invalid interior part stored for ticket {}: {}", row.id, e))
        })?;
        let exterior = PartList::from_labels(&row.exterior_parts_replaced).map_err(|e| {
            AppError::Internal(format!("Invalid exterior part stored for ticket {}: {}", row.id, e))
        })?;

        Ok(Self {
            id: row.id,
            vehicle_id: row.vehicle_id,
            status: row.status,
            start_date: row.start_date,
            end_date: row.end_date,
            workshop_name: row.workshop_name,
            workshop_contact: row.workshop_contact,
            problem_description: row.problem_description,
            works_performed: row.works_performed,
            interior_parts_replaced: interior,
            exterior_parts_replaced: exterior,
            total_cost: row.total_cost,
            currency: row.currency,
            ticket_image_refs: row.ticket_image_refs,
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
    }
}

fn rows_to_tickets(rows: Vec<TicketRow>) -> AppResult<Vec<MaintenanceTicket>> {
    rows.into_iter().map(MaintenanceTicket::try_from).collect()
}

const TICKET_COLUMNS: &str = r#"
    id, vehicle_id, status, start_date, end_date, workshop_name, workshop_contact,
    problem_description, works_performed, interior_parts_replaced, exterior_parts_replaced,
    total_cost, currency, ticket_image_refs, created_at, completed_at
"#;

#[async_trait]
impl TicketStore for PgRepository {
    async fn find_ticket(&self, id: Uuid) -> AppResult<Option<MaintenanceTicket>> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {} FROM maintenance_tickets WHERE id = $1",
            TICKET_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.map(MaintenanceTicket::try_from).transpose()
    }

    async fn find_in_progress_by_vehicle(
        &self,
        vehicle_id: Uuid,
    ) -> AppResult<Option<MaintenanceTicket>> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {} FROM maintenance_tickets WHERE vehicle_id = $1 AND status = $2",
            TICKET_COLUMNS
        ))
        .bind(vehicle_id)
        .bind(TicketStatus::InProgress)
        .fetch_optional(self.pool())
        .await?;

        row.map(MaintenanceTicket::try_from).transpose()
    }

    async fn list_history(&self, vehicle_id: Option<Uuid>) -> AppResult<Vec<MaintenanceTicket>> {
        let rows = sqlx::query_as::<_, TicketRow>(&format!(
            r#"
            SELECT {} FROM maintenance_tickets
            WHERE ($1::uuid IS NULL OR vehicle_id = $1)
            ORDER BY start_date DESC, created_at DESC
            "#,
            TICKET_COLUMNS
        ))
        .bind(vehicle_id)
        .fetch_all(self.pool())
        .await?;

        rows_to_tickets(rows)
    }
}

#[async_trait]
impl MaintenanceStore for PgRepository {
    async fn open_ticket(&self, ticket: MaintenanceTicket) -> AppResult<MaintenanceTicket> {
        let mut tx = self.pool().begin().await?;

        // Bloquear la fila del vehículo serializa aperturas concurrentes
        let locked: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM vehicles WHERE id = $1 FOR UPDATE")
                .bind(ticket.vehicle_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(not_found_error("Vehicle", &ticket.vehicle_id.to_string()));
        }

        let vehicle_id = ticket.vehicle_id;
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            r#"
            INSERT INTO maintenance_tickets (
                id, vehicle_id, status, start_date, end_date, workshop_name, workshop_contact,
                problem_description, works_performed, interior_parts_replaced,
                exterior_parts_replaced, total_cost, currency, ticket_image_refs,
                created_at, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {}
            "#,
            TICKET_COLUMNS
        ))
        .bind(ticket.id)
        .bind(ticket.vehicle_id)
        .bind(ticket.status)
        .bind(ticket.start_date)
        .bind(ticket.end_date)
        .bind(&ticket.workshop_name)
        .bind(&ticket.workshop_contact)
        .bind(&ticket.problem_description)
        .bind(&ticket.works_performed)
        .bind(ticket.interior_parts_replaced.to_strings())
        .bind(ticket.exterior_parts_replaced.to_strings())
        .bind(ticket.total_cost)
        .bind(&ticket.currency)
        .bind(&ticket.ticket_image_refs)
        .bind(ticket.created_at)
        .bind(ticket.completed_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            conflict_on_unique(e, || {
                format!("Vehicle '{}' already has a maintenance ticket in progress", vehicle_id)
            })
        })?;

        sqlx::query("UPDATE vehicles SET vehicle_status = $2 WHERE id = $1")
            .bind(vehicle_id)
            .bind(VehicleStatus::Maintenance)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        MaintenanceTicket::try_from(row)
    }

    async fn close_ticket(&self, ticket: MaintenanceTicket) -> AppResult<ClosedTicket> {
        let mut tx = self.pool().begin().await?;

        // Mismo orden de bloqueo que open_ticket: primero el vehículo, luego el ticket
        let previous: Option<(VehicleStatus,)> =
            sqlx::query_as("SELECT vehicle_status FROM vehicles WHERE id = $1 FOR UPDATE")
                .bind(ticket.vehicle_id)
                .fetch_optional(&mut *tx)
                .await?;
        let (previous_vehicle_status,) = previous
            .ok_or_else(|| not_found_error("Vehicle", &ticket.vehicle_id.to_string()))?;

        let row = sqlx::query_as::<_, TicketRow>(&format!(
            r#"
            UPDATE maintenance_tickets
            SET status = $2, end_date = $3, works_performed = $4,
                interior_parts_replaced = $5, exterior_parts_replaced = $6,
                total_cost = $7, currency = $8, ticket_image_refs = $9, completed_at = $10
            WHERE id = $1 AND status = $11
            RETURNING {}
            "#,
            TICKET_COLUMNS
        ))
        .bind(ticket.id)
        .bind(ticket.status)
        .bind(ticket.end_date)
        .bind(&ticket.works_performed)
        .bind(ticket.interior_parts_replaced.to_strings())
        .bind(ticket.exterior_parts_replaced.to_strings())
        .bind(ticket.total_cost)
        .bind(&ticket.currency)
        .bind(&ticket.ticket_image_refs)
        .bind(ticket.completed_at)
        .bind(TicketStatus::InProgress)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::InvalidState(format!("Ticket '{}' is already completed", ticket.id))
        })?;

        sqlx::query("UPDATE vehicles SET vehicle_status = $2 WHERE id = $1")
            .bind(ticket.vehicle_id)
            .bind(VehicleStatus::Active)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(ClosedTicket {
            ticket: MaintenanceTicket::try_from(row)?,
            previous_vehicle_status,
        })
    }

    async fn list_active(&self) -> AppResult<Vec<ActiveMaintenance>> {
        let rows = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {} FROM maintenance_tickets WHERE status = $1 ORDER BY start_date ASC",
            TICKET_COLUMNS
        ))
        .bind(TicketStatus::InProgress)
        .fetch_all(self.pool())
        .await?;
        let tickets = rows_to_tickets(rows)?;

        let vehicle_ids: Vec<Uuid> = tickets.iter().map(|t| t.vehicle_id).collect();
        let vehicles = sqlx::query_as::<_, Vehicle>(
            "SELECT id, license_plate, brand, model, vehicle_status, created_at FROM vehicles WHERE id = ANY($1)",
        )
        .bind(&vehicle_ids)
        .fetch_all(self.pool())
        .await?;

        let active = tickets
            .into_iter()
            .filter_map(|ticket| {
                let vehicle = vehicles.iter().find(|v| v.id == ticket.vehicle_id)?.clone();
                Some(ActiveMaintenance { vehicle, ticket })
            })
            .collect();

        Ok(active)
    }
}
