//! Reconocimiento de texto (OCR) sobre imágenes de tickets
//!
//! `TextExtractor` abstrae la capacidad externa; `HttpTextExtractor` la
//! implementa contra un servicio OCR que recibe la imagen en base64.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::models::ticket_image::ImagePreview;

/// Fallo al extraer texto de una imagen
#[derive(Debug, Clone, Error, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionError {
    #[error("text recognition failed for image {index}: {message}")]
    Request { index: usize, message: String },

    #[error("text recognition timed out for image {index} after {timeout_secs}s")]
    Timeout { index: usize, timeout_secs: u64 },

    #[error("invalid text recognition response for image {index}: {message}")]
    InvalidResponse { index: usize, message: String },

    #[error("text recognition cancelled for image {index}")]
    Cancelled { index: usize },
}

/// Capacidad externa de reconocimiento de texto
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, image: &ImagePreview) -> Result<String, ExtractionError>;
}

#[derive(Debug, Serialize)]
struct OcrRequest<'a> {
    file_name: &'a str,
    content_type: &'a str,
    data_base64: String,
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    text: String,
}

pub struct HttpTextExtractor {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpTextExtractor {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self { endpoint, client })
    }
}

#[async_trait]
impl TextExtractor for HttpTextExtractor {
    async fn extract(&self, image: &ImagePreview) -> Result<String, ExtractionError> {
        log::info!(
            "🔎 OCR de imagen {} ('{}', {} bytes)",
            image.index,
            image.file_name,
            image.size_bytes
        );

        let body = OcrRequest {
            file_name: &image.file_name,
            content_type: &image.content_type,
            data_base64: base64::engine::general_purpose::STANDARD.encode(&image.data),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("User-Agent", "FleetMaintenance/1.0")
            .json(&body)
            .send()
            .await
            .map_err(|e| ExtractionError::Request {
                index: image.index,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            log::error!("❌ OCR falló con status {}: {}", status, error_text);
            return Err(ExtractionError::Request {
                index: image.index,
                message: format!("status {}", status),
            });
        }

        let parsed: OcrResponse =
            response
                .json()
                .await
                .map_err(|e| ExtractionError::InvalidResponse {
                    index: image.index,
                    message: e.to_string(),
                })?;

        log::info!(
            "✅ OCR de imagen {} completado: {} caracteres",
            image.index,
            parsed.text.chars().count()
        );
        Ok(parsed.text)
    }
}
