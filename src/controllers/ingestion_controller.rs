use std::sync::Arc;
use uuid::Uuid;

use crate::dto::ingestion_dto::OpenSessionRequest;
use crate::repositories::MaintenanceStore;
use crate::services::ticket_ingestion::{IngestionService, IngestionSession};
use crate::state::AppState;
use crate::utils::errors::{not_found_error, AppError, AppResult};

pub struct IngestionController {
    store: Arc<dyn MaintenanceStore>,
    ingestion: Arc<IngestionService>,
}

impl IngestionController {
    pub fn new(store: Arc<dyn MaintenanceStore>, ingestion: Arc<IngestionService>) -> Self {
        Self { store, ingestion }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(state.store.clone(), state.ingestion.clone())
    }

    /// Sólo se aceptan imágenes para tickets abiertos
    pub async fn open_session(&self, request: OpenSessionRequest) -> AppResult<IngestionSession> {
        let ticket_id = request.ticket_id;
        let ticket = self
            .store
            .find_ticket(ticket_id)
            .await?
            .ok_or_else(|| not_found_error("MaintenanceTicket", &ticket_id.to_string()))?;
        if !ticket.is_in_progress() {
            return Err(AppError::InvalidState(format!(
                "Ticket '{}' is already completed",
                ticket_id
            )));
        }

        let images = request.into_images()?;
        self.ingestion.open_session(ticket_id, images).await
    }

    pub async fn get_session(&self, session_id: Uuid) -> AppResult<IngestionSession> {
        self.ingestion.get_session(session_id).await
    }

    pub async fn extract(&self, session_id: Uuid) -> AppResult<IngestionSession> {
        self.ingestion.extract_batch(session_id).await
    }

    pub async fn retry_failed(&self, session_id: Uuid) -> AppResult<IngestionSession> {
        self.ingestion.retry_failed(session_id).await
    }

    pub async fn acknowledge_failure(&self, session_id: Uuid) -> AppResult<IngestionSession> {
        self.ingestion.acknowledge_failure(session_id).await
    }

    pub async fn abandon(&self, session_id: Uuid) -> AppResult<()> {
        self.ingestion.abandon(session_id).await
    }
}
