//! Services module
//!
//! Este módulo contiene la lógica de negocio y las capacidades externas:
//! pipeline de ingesta de tickets escaneados, parseo del texto reconocido,
//! ensamblado del cierre y los clientes de OCR y almacenamiento de objetos.

pub mod completion_assembler;
pub mod object_storage;
pub mod text_extractor;
pub mod ticket_ingestion;
pub mod ticket_parser;

pub use completion_assembler::CompletionAssembler;
pub use object_storage::{HttpObjectStorage, ObjectStorage, StorageError};
pub use text_extractor::{ExtractionError, HttpTextExtractor, TextExtractor};
pub use ticket_ingestion::{IngestionConfig, IngestionService, IngestionSession};
