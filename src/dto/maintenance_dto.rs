use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::maintenance::{CompletionEdits, MaintenanceTicket};
use crate::models::vehicle::VehicleStatus;

// Request para abrir un mantenimiento
#[derive(Debug, Deserialize, Validate)]
pub struct StartMaintenanceRequest {
    #[validate(length(min = 2, max = 120))]
    pub workshop_name: String,
    #[validate(length(max = 120))]
    pub workshop_contact: Option<String>,
    #[validate(length(min = 1, max = 2000))]
    pub problem_description: String,
    /// Hoy (UTC) si no se indica
    pub start_date: Option<NaiveDate>,
}

// Request para cerrar un mantenimiento; la compuerta y las imágenes
// se leen de la sesión de ingesta
#[derive(Debug, Deserialize)]
pub struct CompleteMaintenanceRequest {
    pub session_id: Uuid,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub edits: CompletionEdits,
}

// Response del cierre
#[derive(Debug, Serialize)]
pub struct CompletionResponse {
    pub ticket: MaintenanceTicket,
    pub vehicle_status: VehicleStatus,
    pub previous_vehicle_status: VehicleStatus,
}

// Filtro del historial
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub vehicle_id: Option<Uuid>,
}
