//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::sync::Arc;

use crate::config::environment::EnvironmentConfig;
use crate::repositories::MaintenanceStore;
use crate::services::object_storage::ObjectStorage;
use crate::services::text_extractor::TextExtractor;
use crate::services::ticket_ingestion::{IngestionConfig, IngestionService};

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub store: Arc<dyn MaintenanceStore>,
    pub storage: Arc<dyn ObjectStorage>,
    pub ingestion: Arc<IngestionService>,
}

impl AppState {
    pub fn new(
        config: EnvironmentConfig,
        store: Arc<dyn MaintenanceStore>,
        storage: Arc<dyn ObjectStorage>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        let ingestion = IngestionService::new(
            extractor,
            IngestionConfig {
                extraction_timeout: config.ocr_timeout(),
                session_ttl: config.ingestion_session_ttl(),
            },
        );

        Self {
            config,
            store,
            storage,
            ingestion: Arc::new(ingestion),
        }
    }
}
