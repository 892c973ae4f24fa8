//! Mock del almacenamiento de objetos

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::ticket_image::ImagePreview;
use crate::services::object_storage::{object_key, ObjectStorage, StorageError};

/// Guarda las claves subidas; puede forzarse a fallar
#[derive(Debug, Clone, Default)]
pub struct MockObjectStorage {
    stored: Arc<RwLock<Vec<String>>>,
    fail: Arc<AtomicBool>,
}

impl MockObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    pub async fn stored_keys(&self) -> Vec<String> {
        self.stored.read().await.clone()
    }
}

#[async_trait]
impl ObjectStorage for MockObjectStorage {
    async fn store(&self, ticket_id: Uuid, image: &ImagePreview) -> Result<String, StorageError> {
        let key = object_key(ticket_id, image);
        if self.fail.load(Ordering::SeqCst) {
            return Err(StorageError::Upload {
                key,
                message: "mock storage unavailable".to_string(),
            });
        }
        self.stored.write().await.push(key.clone());
        Ok(key)
    }
}
