//! Mock de la capacidad de reconocimiento de texto

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::models::ticket_image::ImagePreview;
use crate::services::text_extractor::{ExtractionError, TextExtractor};

#[derive(Debug, Clone)]
enum MockResponse {
    Text(String),
    Failure(String),
}

/// Respuestas configurables por nombre de fichero. Sin configuración
/// devuelve texto vacío. Registra cada llamada para las aserciones.
#[derive(Debug, Clone, Default)]
pub struct MockTextExtractor {
    responses: Arc<RwLock<HashMap<String, MockResponse>>>,
    calls: Arc<RwLock<Vec<String>>>,
    delay: Arc<RwLock<Option<Duration>>>,
}

impl MockTextExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Texto reconocido para una imagen
    pub async fn set_text(&self, file_name: &str, text: &str) {
        self.responses
            .write()
            .await
            .insert(file_name.to_string(), MockResponse::Text(text.to_string()));
    }

    /// La imagen falla con `ExtractionError::Request`
    pub async fn set_failure(&self, file_name: &str, message: &str) {
        self.responses
            .write()
            .await
            .insert(file_name.to_string(), MockResponse::Failure(message.to_string()));
    }

    /// Retardo antes de responder (para timeouts y cancelación)
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    pub async fn call_count(&self, file_name: &str) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|name| name.as_str() == file_name)
            .count()
    }
}

#[async_trait]
impl TextExtractor for MockTextExtractor {
    async fn extract(&self, image: &ImagePreview) -> Result<String, ExtractionError> {
        self.calls.write().await.push(image.file_name.clone());

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let response = self.responses.read().await.get(&image.file_name).cloned();
        match response {
            Some(MockResponse::Text(text)) => Ok(text),
            Some(MockResponse::Failure(message)) => Err(ExtractionError::Request {
                index: image.index,
                message,
            }),
            None => Ok(String::new()),
        }
    }
}
