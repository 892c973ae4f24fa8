//! Imágenes de tickets escaneados
//!
//! Las imágenes viven sólo en memoria hasta que el ticket se cierra; en ese
//! momento se suben al almacenamiento de objetos.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Imagen recibida del operador, antes de validar el lote
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Representación en memoria de una imagen aceptada
#[derive(Clone, Serialize, PartialEq)]
pub struct ImagePreview {
    /// Posición en el orden de subida (desde 0)
    pub index: usize,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: usize,
    /// md5 hexadecimal del contenido
    pub checksum: String,
    #[serde(skip)]
    pub data: Arc<[u8]>,
}

impl ImagePreview {
    pub fn from_upload(index: usize, image: UploadedImage) -> Self {
        let checksum = format!("{:x}", md5::compute(&image.data));
        Self {
            index,
            file_name: image.file_name,
            content_type: image.content_type,
            size_bytes: image.data.len(),
            checksum,
            data: Arc::from(image.data),
        }
    }
}

impl fmt::Debug for ImagePreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePreview")
            .field("index", &self.index)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size_bytes", &self.size_bytes)
            .field("checksum", &self.checksum)
            .finish()
    }
}
