//! Controlador del ciclo de vida de mantenimiento
//!
//! Orquesta las transiciones start/complete. Las escrituras pareadas
//! ticket + vehículo las aplica el store como una sola unidad; aquí se
//! validan las entradas y se ensambla el cierre.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::dto::maintenance_dto::{CompleteMaintenanceRequest, StartMaintenanceRequest};
use crate::models::maintenance::{
    ActiveMaintenance, CompletionInput, MaintenanceMeta, MaintenanceTicket,
};
use crate::models::vehicle::VehicleStatus;
use crate::repositories::{ClosedTicket, MaintenanceStore};
use crate::services::completion_assembler::{
    merge_draft_with_manual_edits, validate_completion, CompletionAssembler,
};
use crate::services::object_storage::ObjectStorage;
use crate::services::ticket_ingestion::IngestionService;
use crate::state::AppState;
use crate::utils::errors::{not_found_error, validation_error, AppError, AppResult};

pub struct MaintenanceController {
    store: Arc<dyn MaintenanceStore>,
    assembler: CompletionAssembler,
    default_currency: String,
}

impl MaintenanceController {
    pub fn new(
        store: Arc<dyn MaintenanceStore>,
        storage: Arc<dyn ObjectStorage>,
        default_currency: String,
    ) -> Self {
        Self {
            assembler: CompletionAssembler::new(store.clone(), storage),
            store,
            default_currency,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.store.clone(),
            state.storage.clone(),
            state.config.default_currency.clone(),
        )
    }

    /// Abrir un ticket y pasar el vehículo a `maintenance`
    pub async fn start_maintenance(
        &self,
        vehicle_id: Uuid,
        request: StartMaintenanceRequest,
    ) -> AppResult<MaintenanceTicket> {
        request.validate()?;

        let workshop_name = request.workshop_name.trim().to_string();
        if workshop_name.chars().count() < 2 {
            return Err(validation_error("workshop_name", "workshop name is required"));
        }
        let problem_description = request.problem_description.trim().to_string();
        if problem_description.is_empty() {
            return Err(validation_error(
                "problem_description",
                "problem description is required",
            ));
        }

        let meta = MaintenanceMeta {
            workshop_name,
            workshop_contact: request
                .workshop_contact
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            problem_description,
            start_date: request
                .start_date
                .unwrap_or_else(|| Utc::now().date_naive()),
        };

        let vehicle = self
            .store
            .find_vehicle(vehicle_id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", &vehicle_id.to_string()))?;

        // El store vuelve a comprobarlo de forma atómica
        if let Some(open) = self.store.find_in_progress_by_vehicle(vehicle_id).await? {
            return Err(AppError::Conflict(format!(
                "Vehicle '{}' already has maintenance ticket '{}' in progress",
                vehicle.license_plate, open.id
            )));
        }

        let ticket = self
            .store
            .open_ticket(MaintenanceTicket::open(
                vehicle.id,
                meta,
                self.default_currency.clone(),
            ))
            .await?;

        log::info!(
            "🔧 Mantenimiento iniciado: vehículo {} en taller '{}' (ticket {})",
            vehicle.license_plate,
            ticket.workshop_name,
            ticket.id
        );
        Ok(ticket)
    }

    /// Cerrar el ticket y devolver el vehículo a `active`
    pub async fn complete_maintenance(
        &self,
        ticket_id: Uuid,
        input: CompletionInput,
    ) -> AppResult<ClosedTicket> {
        let ticket = self.get_ticket(ticket_id).await?;
        if !ticket.is_in_progress() {
            return Err(AppError::InvalidState(format!(
                "Ticket '{}' is already completed",
                ticket_id
            )));
        }

        let record = merge_draft_with_manual_edits(input.draft, input.edits);
        validate_completion(&record, &input.images, input.ocr_completed)?;

        let end_date = input.end_date.unwrap_or_else(|| Utc::now().date_naive());
        if end_date < ticket.start_date {
            return Err(validation_error(
                "end_date",
                "end date must not precede the start date",
            ));
        }

        let closed = self
            .assembler
            .persist(ticket, record, end_date, &input.images)
            .await?;

        if closed.previous_vehicle_status != VehicleStatus::Maintenance {
            log::warn!(
                "⚠️ Vehículo {} estaba en '{}' al cerrar el ticket {}; se fuerza a active",
                closed.ticket.vehicle_id,
                closed.previous_vehicle_status,
                closed.ticket.id
            );
        }
        log::info!(
            "✅ Mantenimiento completado: ticket {} ({} imágenes)",
            closed.ticket.id,
            closed.ticket.ticket_image_refs.len()
        );
        Ok(closed)
    }

    /// Cierre desde una sesión de ingesta: la compuerta y las imágenes salen de la sesión
    pub async fn complete_from_session(
        &self,
        ticket_id: Uuid,
        request: CompleteMaintenanceRequest,
        ingestion: &IngestionService,
    ) -> AppResult<ClosedTicket> {
        self.get_ticket(ticket_id).await?;
        let batch = ingestion
            .reviewed_batch(request.session_id, ticket_id)
            .await?;

        let closed = self
            .complete_maintenance(
                ticket_id,
                CompletionInput {
                    end_date: request.end_date,
                    draft: batch.draft,
                    edits: request.edits,
                    ocr_completed: batch.ocr_completed,
                    images: batch.images,
                },
            )
            .await?;

        ingestion.close_session(request.session_id).await;
        Ok(closed)
    }

    pub async fn get_ticket(&self, ticket_id: Uuid) -> AppResult<MaintenanceTicket> {
        self.store
            .find_ticket(ticket_id)
            .await?
            .ok_or_else(|| not_found_error("MaintenanceTicket", &ticket_id.to_string()))
    }

    pub async fn list_active_tickets(&self) -> AppResult<Vec<ActiveMaintenance>> {
        self.store.list_active().await
    }

    pub async fn list_history(&self, vehicle_id: Option<Uuid>) -> AppResult<Vec<MaintenanceTicket>> {
        if let Some(id) = vehicle_id {
            if self.store.find_vehicle(id).await?.is_none() {
                return Err(not_found_error("Vehicle", &id.to_string()));
            }
        }
        self.store.list_history(vehicle_id).await
    }
}
