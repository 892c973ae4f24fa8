//! Ensamblado del cierre de un ticket
//!
//! Combina el borrador del OCR con las ediciones del operador, valida el
//! resultado y lo persiste: primero sube las imágenes al almacenamiento de
//! objetos y después escribe el ticket y revierte el vehículo en una sola
//! operación del store.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::models::maintenance::{CompletionEdits, CompletionRecord, DraftCompletion, MaintenanceTicket};
use crate::models::ticket_image::ImagePreview;
use crate::repositories::{ClosedTicket, MaintenanceStore};
use crate::services::object_storage::ObjectStorage;
use crate::services::ticket_ingestion::{MAX_IMAGES, MIN_IMAGES};
use crate::utils::errors::{validation_error, AppError, AppResult};
use crate::utils::validation::validate_currency;

/// Cotas de la columna `total_cost NUMERIC(12, 2)`
const MAX_COST_SCALE: u32 = 2;
const COST_UPPER_BOUND: i64 = 10_000_000_000;

/// Las ediciones reemplazan campo a campo; lo no editado pasa tal cual
pub fn merge_draft_with_manual_edits(
    draft: DraftCompletion,
    edits: CompletionEdits,
) -> CompletionRecord {
    let works_performed = edits
        .works_performed
        .unwrap_or(draft.works_performed)
        .trim()
        .to_string();

    CompletionRecord {
        works_performed,
        interior_parts_replaced: edits
            .interior_parts_replaced
            .unwrap_or(draft.interior_parts_replaced),
        exterior_parts_replaced: edits
            .exterior_parts_replaced
            .unwrap_or(draft.exterior_parts_replaced),
        total_cost: edits.total_cost.unwrap_or(draft.total_cost),
        currency: edits
            .currency
            .map(|c| c.map(|c| c.trim().to_uppercase()))
            .unwrap_or(draft.currency),
    }
}

/// Reglas de cierre: compuerta de revisión, trabajos realizados y 1..=5 imágenes
pub fn validate_completion(
    record: &CompletionRecord,
    images: &[ImagePreview],
    ocr_completed: bool,
) -> AppResult<()> {
    if !ocr_completed {
        return Err(validation_error(
            "ocr_completed",
            "the scanned ticket must be reviewed before completing the maintenance",
        ));
    }

    if record.works_performed.trim().is_empty() {
        return Err(validation_error("works_performed", "works performed is required"));
    }

    if images.len() < MIN_IMAGES || images.len() > MAX_IMAGES {
        return Err(validation_error(
            "ticket_image_refs",
            "a completed ticket must reference between 1 and 5 images",
        ));
    }

    if let Some(currency) = &record.currency {
        if validate_currency(currency).is_err() {
            return Err(validation_error("currency", "currency must be a 3-letter ISO code"));
        }
    }

    if let Some(cost) = record.total_cost {
        if cost.is_sign_negative() {
            return Err(validation_error("total_cost", "total cost must not be negative"));
        }
        if cost >= Decimal::from(COST_UPPER_BOUND) {
            return Err(validation_error("total_cost", "total cost exceeds 9999999999.99"));
        }
        if cost.normalize().scale() > MAX_COST_SCALE {
            return Err(validation_error(
                "total_cost",
                "total cost must have at most 2 decimal places",
            ));
        }
    }

    Ok(())
}

pub struct CompletionAssembler {
    store: Arc<dyn MaintenanceStore>,
    storage: Arc<dyn ObjectStorage>,
}

impl CompletionAssembler {
    pub fn new(store: Arc<dyn MaintenanceStore>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { store, storage }
    }

    /// Subir imágenes y cerrar el ticket. Un fallo de subida aborta antes de escribir.
    pub async fn persist(
        &self,
        mut ticket: MaintenanceTicket,
        record: CompletionRecord,
        end_date: NaiveDate,
        images: &[ImagePreview],
    ) -> AppResult<ClosedTicket> {
        let mut image_refs = Vec::with_capacity(images.len());
        for image in images {
            let reference = self.storage.store(ticket.id, image).await.map_err(|e| {
                log::error!("❌ Error subiendo imagen {} del ticket {}: {}", image.index, ticket.id, e);
                AppError::from(e)
            })?;
            image_refs.push(reference);
        }
        log::info!("📦 {} imágenes almacenadas para ticket {}", image_refs.len(), ticket.id);

        ticket.apply_completion(record, end_date, image_refs);
        let ticket_id = ticket.id;

        self.store.close_ticket(ticket).await.map_err(|e| {
            log::error!("❌ Error cerrando ticket {}: {}", ticket_id, e);
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::maintenance::PartList;
    use crate::models::ticket_image::UploadedImage;
    use crate::services::ticket_parser::parse_structured_fields;

    fn previews(count: usize) -> Vec<ImagePreview> {
        (0..count)
            .map(|i| {
                ImagePreview::from_upload(
                    i,
                    UploadedImage {
                        file_name: format!("ticket-{}.jpg", i),
                        content_type: "image/jpeg".to_string(),
                        data: vec![i as u8 + 1],
                    },
                )
            })
            .collect()
    }

    fn draft() -> DraftCompletion {
        DraftCompletion {
            works_performed: "Cambio de aceite".to_string(),
            interior_parts_replaced: PartList::from_labels(["Filtro de habitáculo"]).unwrap(),
            exterior_parts_replaced: PartList::new(),
            total_cost: Some(Decimal::new(4500, 2)),
            currency: Some("EUR".to_string()),
        }
    }

    #[test]
    fn test_merge_passes_draft_through() {
        let record = merge_draft_with_manual_edits(draft(), CompletionEdits::default());
        assert_eq!(record.works_performed, "Cambio de aceite");
        assert_eq!(record.interior_parts_replaced.len(), 1);
        assert_eq!(record.total_cost, Some(Decimal::new(4500, 2)));
        assert_eq!(record.currency.as_deref(), Some("EUR"));
    }

    #[test]
    fn test_merge_edits_override_fields() {
        let edits = CompletionEdits {
            works_performed: Some("  Cambio de aceite y filtros ".to_string()),
            exterior_parts_replaced: Some(PartList::from_labels(["Retrovisor"]).unwrap()),
            total_cost: Some(Some(Decimal::new(6000, 2))),
            currency: Some(Some("usd".to_string())),
            ..CompletionEdits::default()
        };
        let record = merge_draft_with_manual_edits(draft(), edits);

        assert_eq!(record.works_performed, "Cambio de aceite y filtros");
        assert_eq!(record.interior_parts_replaced.len(), 1);
        assert_eq!(record.exterior_parts_replaced.to_strings(), vec!["Retrovisor"]);
        assert_eq!(record.total_cost, Some(Decimal::new(6000, 2)));
        assert_eq!(record.currency.as_deref(), Some("USD"));
    }

    #[test]
    fn test_merge_null_edit_clears_parsed_cost() {
        let parsed = parse_structured_fields("Mano de obra $ 40\nTrabajos: Alineación");
        assert_eq!(parsed.total_cost, Some(Decimal::new(40, 0)));

        let edits: CompletionEdits = serde_json::from_str(r#"{"total_cost": null}"#).unwrap();
        let record = merge_draft_with_manual_edits(parsed, edits);
        assert_eq!(record.total_cost, None);
        assert_eq!(record.works_performed, "Alineación");
    }

    #[test]
    fn test_merge_null_edit_clears_parsed_currency() {
        let edits: CompletionEdits = serde_json::from_str(r#"{"currency": null}"#).unwrap();
        let record = merge_draft_with_manual_edits(draft(), edits);
        assert_eq!(record.currency, None);
        assert_eq!(record.total_cost, Some(Decimal::new(4500, 2)));
    }

    #[test]
    fn test_merge_without_draft() {
        let edits = CompletionEdits {
            works_performed: Some("Revisión general".to_string()),
            ..CompletionEdits::default()
        };
        let record = merge_draft_with_manual_edits(DraftCompletion::default(), edits);
        assert_eq!(record.works_performed, "Revisión general");
        assert!(record.total_cost.is_none());
        assert!(record.currency.is_none());
    }

    #[test]
    fn test_validate_requires_review_gate() {
        let record = merge_draft_with_manual_edits(draft(), CompletionEdits::default());
        assert!(matches!(
            validate_completion(&record, &previews(2), false),
            Err(AppError::Validation(_))
        ));
        assert!(validate_completion(&record, &previews(2), true).is_ok());
    }

    #[test]
    fn test_validate_requires_works_performed() {
        let edits = CompletionEdits {
            works_performed: Some("   ".to_string()),
            ..CompletionEdits::default()
        };
        let record = merge_draft_with_manual_edits(draft(), edits);
        assert!(matches!(
            validate_completion(&record, &previews(1), true),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_image_count() {
        let record = merge_draft_with_manual_edits(draft(), CompletionEdits::default());
        assert!(validate_completion(&record, &previews(0), true).is_err());
        assert!(validate_completion(&record, &previews(6), true).is_err());
        assert!(validate_completion(&record, &previews(5), true).is_ok());
    }

    #[test]
    fn test_validate_currency_and_cost() {
        let mut record = merge_draft_with_manual_edits(draft(), CompletionEdits::default());
        record.currency = Some("EURO".to_string());
        assert!(validate_completion(&record, &previews(1), true).is_err());

        record.currency = None;
        record.total_cost = Some(Decimal::new(-100, 2));
        assert!(validate_completion(&record, &previews(1), true).is_err());
    }

    #[test]
    fn test_validate_cost_fits_the_stored_precision() {
        let mut record = merge_draft_with_manual_edits(draft(), CompletionEdits::default());

        record.total_cost = parse_structured_fields("Total: 12345678901 €").total_cost;
        assert_eq!(record.total_cost, Some(Decimal::new(12_345_678_901, 0)));
        assert!(matches!(
            validate_completion(&record, &previews(1), true),
            Err(AppError::Validation(_))
        ));

        record.total_cost = parse_structured_fields("Total: 1,2345 €").total_cost;
        assert_eq!(record.total_cost, Some(Decimal::new(12345, 4)));
        assert!(matches!(
            validate_completion(&record, &previews(1), true),
            Err(AppError::Validation(_))
        ));

        record.total_cost = Some(Decimal::new(999_999_999_999, 2));
        assert!(validate_completion(&record, &previews(1), true).is_ok());

        record.total_cost = Some(Decimal::new(45000, 3));
        assert!(validate_completion(&record, &previews(1), true).is_ok());
    }
}
