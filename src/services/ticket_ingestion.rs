//! Pipeline de ingesta de tickets escaneados
//!
//! accept-images → extract-text → parse-fields. Cada subida vive en una
//! sesión en memoria ligada a un ticket. La extracción se lanza en paralelo
//! para todas las imágenes del lote y registra el resultado de cada una por
//! separado; mientras alguna imagen falle no hay borrador y la compuerta de
//! revisión (`ocr_completed`) sigue cerrada. El operador puede reintentar
//! sólo las fallidas, relanzar el lote completo o reconocer el error y
//! cargar todo a mano.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use uuid::Uuid;

use crate::models::maintenance::DraftCompletion;
use crate::models::ticket_image::{ImagePreview, UploadedImage};
use crate::services::text_extractor::{ExtractionError, TextExtractor};
use crate::services::ticket_parser::{concatenate_texts, parse_structured_fields};
use crate::utils::errors::{capacity_error, validation_error, AppError, AppResult};
use crate::utils::validation::validate_image_content_type;

pub const MIN_IMAGES: usize = 1;
pub const MAX_IMAGES: usize = 5;

#[derive(Debug, Clone)]
pub struct IngestionConfig {
    /// Límite por llamada de OCR
    pub extraction_timeout: Duration,
    /// Inactividad tras la cual una sesión se descarta
    pub session_ttl: Duration,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            extraction_timeout: Duration::from_secs(30),
            session_ttl: Duration::from_secs(3600),
        }
    }
}

/// Validar el lote (1..=5 imágenes) y construir las previsualizaciones
pub fn accept_images(images: Vec<UploadedImage>) -> AppResult<Vec<ImagePreview>> {
    if images.len() < MIN_IMAGES || images.len() > MAX_IMAGES {
        return Err(capacity_error(images.len(), MIN_IMAGES, MAX_IMAGES));
    }

    for image in &images {
        if validate_image_content_type(&image.content_type).is_err() {
            return Err(validation_error("images", "every image must have an image/* content type"));
        }
        if image.data.is_empty() {
            return Err(validation_error("images", "image data must not be empty"));
        }
    }

    Ok(images
        .into_iter()
        .enumerate()
        .map(|(index, image)| ImagePreview::from_upload(index, image))
        .collect())
}

/// Resultado del OCR de una imagen
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    Pending,
    Extracted { text: String },
    Failed { error: ExtractionError },
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageExtraction {
    pub image: ImagePreview,
    pub outcome: ExtractionOutcome,
    pub attempts: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestionSession {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub images: Vec<ImageExtraction>,
    pub has_error: bool,
    /// Compuerta de revisión requerida para cerrar el ticket
    pub ocr_completed: bool,
    /// El operador abandonó el OCR tras un error y carga los campos a mano
    pub manual_entry: bool,
    pub extracting: bool,
    pub draft: Option<DraftCompletion>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IngestionSession {
    pub fn image_previews(&self) -> Vec<ImagePreview> {
        self.images.iter().map(|e| e.image.clone()).collect()
    }

    pub fn first_error(&self) -> Option<&ExtractionError> {
        self.images.iter().find_map(|e| match &e.outcome {
            ExtractionOutcome::Failed { error } => Some(error),
            _ => None,
        })
    }
}

/// Lo que la sesión aporta al cierre del ticket
#[derive(Debug, Clone)]
pub struct ReviewedBatch {
    pub ocr_completed: bool,
    pub draft: DraftCompletion,
    pub images: Vec<ImagePreview>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExtractionScope {
    All,
    FailedOnly,
}

struct SessionEntry {
    session: IngestionSession,
    cancel: watch::Sender<bool>,
}

type SessionMap = Arc<RwLock<HashMap<Uuid, SessionEntry>>>;

// Libera la marca `extracting` si la extracción se descarta a medias
// (p. ej. el cliente HTTP corta la conexión y axum suelta el handler)
struct ExtractionGuard {
    sessions: SessionMap,
    session_id: Uuid,
    armed: bool,
}

impl ExtractionGuard {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ExtractionGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        log::warn!(
            "🛑 Extracción de la sesión {} interrumpida; se libera la sesión",
            self.session_id
        );

        if let Ok(mut sessions) = self.sessions.try_write() {
            release_extraction(&mut sessions, self.session_id);
            return;
        }
        let sessions = Arc::clone(&self.sessions);
        let session_id = self.session_id;
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                release_extraction(&mut *sessions.write().await, session_id);
            });
        }
    }
}

fn release_extraction(sessions: &mut HashMap<Uuid, SessionEntry>, session_id: Uuid) {
    if let Some(entry) = sessions.get_mut(&session_id) {
        entry.session.extracting = false;
        entry.session.updated_at = Utc::now();
    }
}

pub struct IngestionService {
    extractor: Arc<dyn TextExtractor>,
    config: IngestionConfig,
    sessions: SessionMap,
}

impl IngestionService {
    pub fn new(extractor: Arc<dyn TextExtractor>, config: IngestionConfig) -> Self {
        Self {
            extractor,
            config,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Abrir una sesión de subida para un ticket (acceptImages)
    pub async fn open_session(
        &self,
        ticket_id: Uuid,
        images: Vec<UploadedImage>,
    ) -> AppResult<IngestionSession> {
        self.cleanup_expired_sessions().await;

        let previews = accept_images(images)?;
        let now = Utc::now();
        let session = IngestionSession {
            id: Uuid::new_v4(),
            ticket_id,
            images: previews
                .into_iter()
                .map(|image| ImageExtraction {
                    image,
                    outcome: ExtractionOutcome::Pending,
                    attempts: 0,
                })
                .collect(),
            has_error: false,
            ocr_completed: false,
            manual_entry: false,
            extracting: false,
            draft: None,
            created_at: now,
            updated_at: now,
        };

        let (cancel, _) = watch::channel(false);
        self.sessions.write().await.insert(
            session.id,
            SessionEntry {
                session: session.clone(),
                cancel,
            },
        );

        log::info!(
            "📸 Sesión de ingesta {} abierta para ticket {} con {} imágenes",
            session.id,
            ticket_id,
            session.images.len()
        );
        Ok(session)
    }

    pub async fn get_session(&self, session_id: Uuid) -> AppResult<IngestionSession> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&session_id)
            .map(|entry| entry.session.clone())
            .ok_or_else(|| session_not_found(session_id))
    }

    /// OCR de una imagen con límite de tiempo (extractText)
    pub async fn extract_text(&self, image: &ImagePreview) -> Result<String, ExtractionError> {
        match tokio::time::timeout(self.config.extraction_timeout, self.extractor.extract(image))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(ExtractionError::Timeout {
                index: image.index,
                timeout_secs: self.config.extraction_timeout.as_secs(),
            }),
        }
    }

    /// Lanzar (o relanzar) el OCR de todo el lote y parsear si no hubo fallos
    pub async fn extract_batch(&self, session_id: Uuid) -> AppResult<IngestionSession> {
        self.run_extraction(session_id, ExtractionScope::All).await
    }

    /// Reintentar sólo las imágenes fallidas
    pub async fn retry_failed(&self, session_id: Uuid) -> AppResult<IngestionSession> {
        self.run_extraction(session_id, ExtractionScope::FailedOnly).await
    }

    async fn run_extraction(
        &self,
        session_id: Uuid,
        scope: ExtractionScope,
    ) -> AppResult<IngestionSession> {
        let (targets, cancel_rx) = {
            let mut sessions = self.sessions.write().await;
            let entry = sessions
                .get_mut(&session_id)
                .ok_or_else(|| session_not_found(session_id))?;
            let session = &mut entry.session;

            if session.extracting {
                return Err(AppError::Conflict(format!(
                    "Extraction already running for session '{}'",
                    session_id
                )));
            }
            if session.ocr_completed {
                return Err(AppError::InvalidState(format!(
                    "Session '{}' has already passed review",
                    session_id
                )));
            }

            let targets: Vec<ImagePreview> = session
                .images
                .iter()
                .filter(|e| match scope {
                    ExtractionScope::All => true,
                    ExtractionScope::FailedOnly => {
                        matches!(e.outcome, ExtractionOutcome::Failed { .. })
                    }
                })
                .map(|e| e.image.clone())
                .collect();
            if targets.is_empty() {
                return Err(AppError::InvalidState(format!(
                    "Session '{}' has no failed images to retry",
                    session_id
                )));
            }

            session.extracting = true;
            session.updated_at = Utc::now();
            (targets, entry.cancel.subscribe())
        };
        let mut guard = ExtractionGuard {
            sessions: Arc::clone(&self.sessions),
            session_id,
            armed: true,
        };

        log::info!(
            "🔎 Extrayendo texto de {} imágenes (sesión {})",
            targets.len(),
            session_id
        );

        let requests = targets.iter().map(|image| {
            let cancel_rx = cancel_rx.clone();
            async move {
                let result = tokio::select! {
                    result = self.extract_text(image) => result,
                    _ = cancelled(cancel_rx) => Err(ExtractionError::Cancelled { index: image.index }),
                };
                (image.index, result)
            }
        });
        let results = join_all(requests).await;

        let mut sessions = self.sessions.write().await;
        guard.disarm();
        let entry = match sessions.get_mut(&session_id) {
            Some(entry) => entry,
            None => {
                log::warn!("🛑 Sesión {} abandonada durante la extracción", session_id);
                return Err(session_not_found(session_id));
            }
        };
        let session = &mut entry.session;
        session.extracting = false;

        for (index, result) in results {
            if let Some(slot) = session.images.iter_mut().find(|e| e.image.index == index) {
                slot.attempts += 1;
                slot.outcome = match result {
                    Ok(text) => ExtractionOutcome::Extracted { text },
                    Err(error) => {
                        log::warn!("⚠️ OCR falló para imagen {}: {}", index, error);
                        ExtractionOutcome::Failed { error }
                    }
                };
            }
        }

        session.updated_at = Utc::now();
        session.has_error = session
            .images
            .iter()
            .any(|e| !matches!(e.outcome, ExtractionOutcome::Extracted { .. }));

        if session.has_error {
            session.draft = None;
            session.ocr_completed = false;
            log::warn!(
                "❌ Lote con errores en sesión {}: sin borrador hasta reintentar o cargar a mano",
                session_id
            );
        } else {
            let text = {
                let texts: Vec<&str> = session
                    .images
                    .iter()
                    .filter_map(|e| match &e.outcome {
                        ExtractionOutcome::Extracted { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect();
                concatenate_texts(&texts)
            };
            session.draft = Some(parse_structured_fields(&text));
            session.ocr_completed = true;
            log::info!("✅ Borrador generado para sesión {}", session_id);
        }

        Ok(session.clone())
    }

    /// El operador reconoce el error de OCR y pasa a carga manual
    pub async fn acknowledge_failure(&self, session_id: Uuid) -> AppResult<IngestionSession> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(&session_id)
            .ok_or_else(|| session_not_found(session_id))?;
        let session = &mut entry.session;

        if session.extracting {
            return Err(AppError::Conflict(format!(
                "Extraction still running for session '{}'",
                session_id
            )));
        }
        if session.ocr_completed {
            return Err(AppError::InvalidState(format!(
                "Session '{}' has already passed review",
                session_id
            )));
        }
        if !session.has_error {
            return Err(AppError::InvalidState(format!(
                "Session '{}' has no extraction error to acknowledge",
                session_id
            )));
        }

        session.manual_entry = true;
        session.ocr_completed = true;
        session.draft = Some(DraftCompletion::default());
        session.updated_at = Utc::now();

        log::info!("✍️ Sesión {} pasa a carga manual", session_id);
        Ok(session.clone())
    }

    /// Borrador de la sesión; si el lote falló devuelve el error de extracción
    pub async fn draft(&self, session_id: Uuid) -> AppResult<DraftCompletion> {
        let session = self.get_session(session_id).await?;
        if let Some(draft) = session.draft {
            return Ok(draft);
        }
        if let Some(error) = session.first_error() {
            return Err(AppError::Extraction(error.clone()));
        }
        Err(AppError::InvalidState(format!(
            "Text extraction has not run for session '{}'",
            session_id
        )))
    }

    /// Datos revisados que la sesión entrega al cierre del ticket
    pub async fn reviewed_batch(&self, session_id: Uuid, ticket_id: Uuid) -> AppResult<ReviewedBatch> {
        let session = self.get_session(session_id).await?;
        if session.ticket_id != ticket_id {
            return Err(AppError::BadRequest(format!(
                "Session '{}' does not belong to ticket '{}'",
                session_id, ticket_id
            )));
        }

        Ok(ReviewedBatch {
            ocr_completed: session.ocr_completed,
            images: session.image_previews(),
            draft: session.draft.unwrap_or_default(),
        })
    }

    /// Abandonar la sesión: cancela el OCR en curso y libera las imágenes
    pub async fn abandon(&self, session_id: Uuid) -> AppResult<()> {
        let entry = self
            .sessions
            .write()
            .await
            .remove(&session_id)
            .ok_or_else(|| session_not_found(session_id))?;
        let _ = entry.cancel.send(true);

        log::info!("🗑️ Sesión de ingesta {} abandonada", session_id);
        Ok(())
    }

    /// Cerrar la sesión tras completar el ticket
    pub async fn close_session(&self, session_id: Uuid) {
        if self.sessions.write().await.remove(&session_id).is_some() {
            log::debug!("Sesión de ingesta {} cerrada", session_id);
        }
    }

    /// Descartar sesiones inactivas; devuelve cuántas se eliminaron
    pub async fn cleanup_expired_sessions(&self) -> usize {
        let ttl = chrono::Duration::from_std(self.config.session_ttl)
            .unwrap_or_else(|_| chrono::Duration::hours(1));
        let now = Utc::now();

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let alive = entry.session.extracting || entry.session.updated_at + ttl > now;
            if !alive {
                let _ = entry.cancel.send(true);
                log::info!("⌛ Sesión de ingesta {} expirada", id);
            }
            alive
        });
        before - sessions.len()
    }
}

fn session_not_found(session_id: Uuid) -> AppError {
    AppError::NotFound(format!("Ingestion session '{}' not found", session_id))
}

// Resuelve cuando la sesión se abandona (o su emisor desaparece)
async fn cancelled(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTextExtractor;

    fn image(name: &str) -> UploadedImage {
        UploadedImage {
            file_name: name.to_string(),
            content_type: "image/jpeg".to_string(),
            data: name.as_bytes().to_vec(),
        }
    }

    fn images(count: usize) -> Vec<UploadedImage> {
        (0..count).map(|i| image(&format!("ticket-{}.jpg", i))).collect()
    }

    fn service(extractor: &MockTextExtractor, config: IngestionConfig) -> IngestionService {
        IngestionService::new(Arc::new(extractor.clone()), config)
    }

    #[test]
    fn test_accept_images_capacity() {
        assert!(matches!(accept_images(images(0)), Err(AppError::Capacity(_))));
        assert!(matches!(accept_images(images(6)), Err(AppError::Capacity(_))));
        assert_eq!(accept_images(images(1)).unwrap().len(), 1);
        assert_eq!(accept_images(images(5)).unwrap().len(), 5);
    }

    #[test]
    fn test_accept_images_keeps_upload_order() {
        let previews = accept_images(vec![image("b.jpg"), image("a.jpg")]).unwrap();
        assert_eq!(previews[0].file_name, "b.jpg");
        assert_eq!(previews[0].index, 0);
        assert_eq!(previews[1].file_name, "a.jpg");
        assert_eq!(previews[1].index, 1);
    }

    #[test]
    fn test_accept_images_rejects_non_images() {
        let mut pdf = image("ticket.pdf");
        pdf.content_type = "application/pdf".to_string();
        assert!(matches!(accept_images(vec![pdf]), Err(AppError::Validation(_))));

        let mut empty = image("vacia.jpg");
        empty.data.clear();
        assert!(matches!(accept_images(vec![empty]), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_successful_batch_opens_review_gate() {
        let extractor = MockTextExtractor::new();
        extractor.set_text("p1.jpg", "Trabajos: Cambio de aceite").await;
        extractor.set_text("p2.jpg", "Total: 45,00 €").await;
        let service = service(&extractor, IngestionConfig::default());

        let session = service
            .open_session(Uuid::new_v4(), vec![image("p1.jpg"), image("p2.jpg")])
            .await
            .unwrap();
        assert!(!session.ocr_completed);

        let session = service.extract_batch(session.id).await.unwrap();
        assert!(!session.has_error);
        assert!(session.ocr_completed);
        let draft = session.draft.unwrap();
        assert_eq!(draft.works_performed, "Cambio de aceite");
        assert_eq!(draft.total_cost, Some("45.00".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_empty_draft_still_opens_gate() {
        let extractor = MockTextExtractor::new();
        let service = service(&extractor, IngestionConfig::default());
        let session = service.open_session(Uuid::new_v4(), images(1)).await.unwrap();

        let session = service.extract_batch(session.id).await.unwrap();
        assert!(session.ocr_completed);
        assert_eq!(session.draft, Some(DraftCompletion::default()));
    }

    #[tokio::test]
    async fn test_single_failure_blocks_draft() {
        let extractor = MockTextExtractor::new();
        extractor.set_text("p1.jpg", "Trabajos: Cambio de aceite").await;
        extractor.set_failure("p2.jpg", "ocr service unavailable").await;
        let service = service(&extractor, IngestionConfig::default());

        let session = service
            .open_session(Uuid::new_v4(), vec![image("p1.jpg"), image("p2.jpg")])
            .await
            .unwrap();
        let session = service.extract_batch(session.id).await.unwrap();

        assert!(session.has_error);
        assert!(!session.ocr_completed);
        assert!(session.draft.is_none());
        assert!(matches!(
            session.images[0].outcome,
            ExtractionOutcome::Extracted { .. }
        ));
        assert!(matches!(
            service.draft(session.id).await,
            Err(AppError::Extraction(_))
        ));
    }

    #[tokio::test]
    async fn test_retry_failed_only_reissues_failed_images() {
        let extractor = MockTextExtractor::new();
        extractor.set_text("p1.jpg", "Trabajos: Cambio de aceite").await;
        extractor.set_failure("p2.jpg", "timeout upstream").await;
        let service = service(&extractor, IngestionConfig::default());

        let session = service
            .open_session(Uuid::new_v4(), vec![image("p1.jpg"), image("p2.jpg")])
            .await
            .unwrap();
        service.extract_batch(session.id).await.unwrap();

        extractor.set_text("p2.jpg", "Total 60 EUR").await;
        let session = service.retry_failed(session.id).await.unwrap();

        assert!(session.ocr_completed);
        assert_eq!(extractor.call_count("p1.jpg").await, 1);
        assert_eq!(extractor.call_count("p2.jpg").await, 2);
        assert_eq!(session.images[1].attempts, 2);
        let draft = session.draft.unwrap();
        assert_eq!(draft.works_performed, "Cambio de aceite");
        assert_eq!(draft.currency.as_deref(), Some("EUR"));
    }

    #[tokio::test]
    async fn test_retry_without_failures_is_invalid() {
        let extractor = MockTextExtractor::new();
        let service = service(&extractor, IngestionConfig::default());
        let session = service.open_session(Uuid::new_v4(), images(2)).await.unwrap();

        assert!(matches!(
            service.retry_failed(session.id).await,
            Err(AppError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_acknowledge_failure_switches_to_manual_entry() {
        let extractor = MockTextExtractor::new();
        extractor.set_failure("ticket-0.jpg", "unreadable").await;
        let service = service(&extractor, IngestionConfig::default());
        let session = service.open_session(Uuid::new_v4(), images(1)).await.unwrap();

        assert!(matches!(
            service.acknowledge_failure(session.id).await,
            Err(AppError::InvalidState(_))
        ));

        service.extract_batch(session.id).await.unwrap();
        let session = service.acknowledge_failure(session.id).await.unwrap();
        assert!(session.ocr_completed);
        assert!(session.manual_entry);
        assert_eq!(service.draft(session.id).await.unwrap(), DraftCompletion::default());
    }

    #[tokio::test]
    async fn test_extraction_timeout_is_a_failure() {
        let extractor = MockTextExtractor::new();
        extractor.set_delay(Duration::from_millis(500)).await;
        let config = IngestionConfig {
            extraction_timeout: Duration::from_millis(20),
            ..IngestionConfig::default()
        };
        let service = service(&extractor, config);
        let session = service.open_session(Uuid::new_v4(), images(1)).await.unwrap();

        let session = service.extract_batch(session.id).await.unwrap();
        assert!(session.has_error);
        assert!(matches!(
            session.first_error(),
            Some(ExtractionError::Timeout { index: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_abandon_cancels_running_extraction() {
        let extractor = MockTextExtractor::new();
        extractor.set_delay(Duration::from_secs(10)).await;
        let service = Arc::new(service(&extractor, IngestionConfig::default()));
        let session = service.open_session(Uuid::new_v4(), images(2)).await.unwrap();

        let running = {
            let service = service.clone();
            let id = session.id;
            tokio::spawn(async move { service.extract_batch(id).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        service.abandon(session.id).await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(2), running)
            .await
            .expect("extraction should stop after abandon")
            .unwrap();
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(matches!(
            service.get_session(session.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_interrupted_extraction_releases_session() {
        let extractor = MockTextExtractor::new();
        extractor.set_delay(Duration::from_secs(5)).await;
        let service = Arc::new(service(&extractor, IngestionConfig::default()));
        let session = service.open_session(Uuid::new_v4(), images(2)).await.unwrap();

        let running = {
            let service = service.clone();
            let id = session.id;
            tokio::spawn(async move { service.extract_batch(id).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(service.get_session(session.id).await.unwrap().extracting);

        running.abort();
        assert!(running.await.unwrap_err().is_cancelled());

        let released = service.get_session(session.id).await.unwrap();
        assert!(!released.extracting);
        assert!(!released.ocr_completed);

        extractor.set_delay(Duration::ZERO).await;
        let session = service.extract_batch(session.id).await.unwrap();
        assert!(session.ocr_completed);
        assert!(!session.has_error);
    }

    #[tokio::test]
    async fn test_running_extraction_survives_expiry_sweep() {
        let extractor = MockTextExtractor::new();
        extractor.set_delay(Duration::from_millis(300)).await;
        let config = IngestionConfig {
            session_ttl: Duration::from_secs(0),
            ..IngestionConfig::default()
        };
        let service = Arc::new(service(&extractor, config));
        let opened = service.open_session(Uuid::new_v4(), images(1)).await.unwrap();

        let running = {
            let service = service.clone();
            let id = opened.id;
            tokio::spawn(async move { service.extract_batch(id).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let during = service.get_session(opened.id).await.unwrap();
        assert!(during.extracting);
        assert!(during.updated_at > opened.updated_at);

        // Abrir otra sesión dispara el barrido de expiradas
        service.open_session(Uuid::new_v4(), images(1)).await.unwrap();
        assert!(service.get_session(opened.id).await.is_ok());

        let finished = running.await.unwrap().unwrap();
        assert!(finished.ocr_completed);
    }

    #[tokio::test]
    async fn test_reviewed_batch_checks_ticket() {
        let extractor = MockTextExtractor::new();
        let service = service(&extractor, IngestionConfig::default());
        let ticket_id = Uuid::new_v4();
        let session = service.open_session(ticket_id, images(3)).await.unwrap();

        let batch = service.reviewed_batch(session.id, ticket_id).await.unwrap();
        assert!(!batch.ocr_completed);
        assert_eq!(batch.images.len(), 3);

        assert!(matches!(
            service.reviewed_batch(session.id, Uuid::new_v4()).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_sessions_are_swept() {
        let extractor = MockTextExtractor::new();
        let config = IngestionConfig {
            session_ttl: Duration::from_secs(0),
            ..IngestionConfig::default()
        };
        let service = service(&extractor, config);

        let first = service.open_session(Uuid::new_v4(), images(1)).await.unwrap();
        let _second = service.open_session(Uuid::new_v4(), images(1)).await.unwrap();

        assert!(matches!(
            service.get_session(first.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
