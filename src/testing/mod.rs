//! Utilidades de testing
//!
//! Implementaciones mock de las capacidades externas (OCR y almacenamiento
//! de objetos) para ejercitar el pipeline y el ciclo de mantenimiento sin
//! servicios reales.
//!
//! ```rust,ignore
//! let extractor = MockTextExtractor::new();
//! extractor.set_text("p1.jpg", "Trabajos: Cambio de aceite").await;
//! extractor.set_failure("p2.jpg", "ocr service unavailable").await;
//! ```

mod mock_object_storage;
mod mock_text_extractor;

pub use mock_object_storage::MockObjectStorage;
pub use mock_text_extractor::MockTextExtractor;

/// Fixtures compartidas por los tests
pub mod fixtures {
    use crate::models::ticket_image::UploadedImage;

    /// Imagen JPEG de prueba; los bytes son el propio nombre
    pub fn jpeg(file_name: &str) -> UploadedImage {
        UploadedImage {
            file_name: file_name.to_string(),
            content_type: "image/jpeg".to_string(),
            data: file_name.as_bytes().to_vec(),
        }
    }
}
