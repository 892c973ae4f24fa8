//! Almacenamiento de objetos para las imágenes de tickets
//!
//! Sólo se usa al cerrar un ticket: hasta entonces las imágenes viven en la
//! sesión de ingesta. Sin reintentos: un fallo aborta el cierre.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::models::ticket_image::ImagePreview;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upload of '{key}' failed: {message}")]
    Upload { key: String, message: String },
}

/// Capacidad externa de almacenamiento; devuelve la referencia del objeto
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn store(&self, ticket_id: Uuid, image: &ImagePreview) -> Result<String, StorageError>;
}

/// Clave del objeto: `tickets/{ticket_id}/{index}-{file_name}`
pub fn object_key(ticket_id: Uuid, image: &ImagePreview) -> String {
    let safe_name: String = image
        .file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("tickets/{}/{}-{}", ticket_id, image.index, safe_name)
}

pub struct HttpObjectStorage {
    base_url: String,
    client: reqwest::Client,
}

impl HttpObjectStorage {
    pub fn new(base_url: String) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn store(&self, ticket_id: Uuid, image: &ImagePreview) -> Result<String, StorageError> {
        let key = object_key(ticket_id, image);
        let url = format!("{}/{}", self.base_url, key);
        log::info!("📤 Subiendo imagen de ticket a {}", url);

        let response = self
            .client
            .put(&url)
            .header("Content-Type", image.content_type.as_str())
            .body(image.data.to_vec())
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                key: key.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::Upload {
                key,
                message: format!("status {}", status),
            });
        }

        Ok(key)
    }
}
