use base64::Engine;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::ticket_image::UploadedImage;
use crate::utils::errors::{validation_error, AppResult};

// Imagen subida como base64
#[derive(Debug, Deserialize)]
pub struct ImagePayload {
    pub file_name: String,
    pub content_type: String,
    pub data_base64: String,
}

impl ImagePayload {
    pub fn decode(self) -> AppResult<UploadedImage> {
        let data = base64::engine::general_purpose::STANDARD
            .decode(self.data_base64.trim())
            .map_err(|_| validation_error("images", "image data must be valid base64"))?;

        Ok(UploadedImage {
            file_name: self.file_name,
            content_type: self.content_type,
            data,
        })
    }
}

// Request para abrir una sesión de ingesta
#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    pub ticket_id: Uuid,
    pub images: Vec<ImagePayload>,
}

impl OpenSessionRequest {
    pub fn into_images(self) -> AppResult<Vec<UploadedImage>> {
        self.images.into_iter().map(ImagePayload::decode).collect()
    }
}
