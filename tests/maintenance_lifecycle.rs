use chrono::NaiveDate;
use std::sync::Arc;
use uuid::Uuid;

use fleet_maintenance::controllers::{IngestionController, MaintenanceController, VehicleController};
use fleet_maintenance::dto::ingestion_dto::{ImagePayload, OpenSessionRequest};
use fleet_maintenance::dto::maintenance_dto::{CompleteMaintenanceRequest, StartMaintenanceRequest};
use fleet_maintenance::dto::vehicle_dto::{CreateVehicleRequest, UpdateVehicleStatusRequest};
use fleet_maintenance::models::maintenance::{
    CompletionEdits, CompletionInput, DraftCompletion, TicketStatus,
};
use fleet_maintenance::models::ticket_image::ImagePreview;
use fleet_maintenance::models::vehicle::{Vehicle, VehicleStatus};
use fleet_maintenance::repositories::{InMemoryRepository, TicketStore, VehicleRegistry};
use fleet_maintenance::services::ticket_ingestion::{IngestionConfig, IngestionService};
use fleet_maintenance::testing::{fixtures, MockObjectStorage, MockTextExtractor};
use fleet_maintenance::utils::errors::AppError;

struct Fleet {
    store: Arc<InMemoryRepository>,
    storage: MockObjectStorage,
    extractor: MockTextExtractor,
    ingestion: Arc<IngestionService>,
}

impl Fleet {
    fn new() -> Self {
        let extractor = MockTextExtractor::new();
        Self {
            store: Arc::new(InMemoryRepository::new()),
            storage: MockObjectStorage::new(),
            ingestion: Arc::new(IngestionService::new(
                Arc::new(extractor.clone()),
                IngestionConfig::default(),
            )),
            extractor,
        }
    }

    fn maintenance(&self) -> MaintenanceController {
        MaintenanceController::new(
            self.store.clone(),
            Arc::new(self.storage.clone()),
            "EUR".to_string(),
        )
    }

    fn vehicles(&self) -> VehicleController {
        VehicleController::new(self.store.clone())
    }

    fn ingestion(&self) -> IngestionController {
        IngestionController::new(self.store.clone(), self.ingestion.clone())
    }

    async fn register(&self, plate: &str) -> Vehicle {
        self.vehicles()
            .create(CreateVehicleRequest {
                license_plate: plate.to_string(),
                brand: Some("Renault".to_string()),
                model: Some("Master".to_string()),
            })
            .await
            .unwrap()
            .data
            .unwrap()
    }

    async fn vehicle_status(&self, id: Uuid) -> VehicleStatus {
        self.vehicles().get_by_id(id).await.unwrap().vehicle_status
    }

    // I2: maintenance ⇔ existe un ticket in_progress
    async fn assert_status_invariant(&self) {
        let vehicles = self.store.list_vehicles().await.unwrap();
        for vehicle in vehicles {
            let open = self
                .store
                .find_in_progress_by_vehicle(vehicle.id)
                .await
                .unwrap();
            assert_eq!(
                vehicle.vehicle_status == VehicleStatus::Maintenance,
                open.is_some(),
                "vehicle {} breaks the status invariant",
                vehicle.license_plate
            );
        }
    }
}

fn start_request(workshop: &str) -> StartMaintenanceRequest {
    StartMaintenanceRequest {
        workshop_name: workshop.to_string(),
        workshop_contact: Some("+34 600 000 000".to_string()),
        problem_description: "Ruido al frenar".to_string(),
        start_date: Some(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
    }
}

fn payload(file_name: &str) -> ImagePayload {
    use base64::Engine;
    let image = fixtures::jpeg(file_name);
    ImagePayload {
        file_name: image.file_name,
        content_type: image.content_type,
        data_base64: base64::engine::general_purpose::STANDARD.encode(&image.data),
    }
}

fn previews(count: usize) -> Vec<ImagePreview> {
    (0..count)
        .map(|i| ImagePreview::from_upload(i, fixtures::jpeg(&format!("scan-{}.jpg", i))))
        .collect()
}

#[tokio::test]
async fn scenario_a_successful_ocr_completes_ticket() {
    let fleet = Fleet::new();
    let vehicle = fleet.register("ABC123").await;
    assert_eq!(vehicle.vehicle_status, VehicleStatus::Active);

    let ticket = fleet
        .maintenance()
        .start_maintenance(vehicle.id, start_request("Taller X"))
        .await
        .unwrap();
    assert_eq!(ticket.status, TicketStatus::InProgress);
    assert_eq!(fleet.vehicle_status(vehicle.id).await, VehicleStatus::Maintenance);
    fleet.assert_status_invariant().await;

    fleet.extractor.set_text("p1.jpg", "Trabajos: Cambio de aceite").await;
    fleet.extractor.set_text("p2.jpg", "Total: 45,00 EUR").await;

    let session = fleet
        .ingestion()
        .open_session(OpenSessionRequest {
            ticket_id: ticket.id,
            images: vec![payload("p1.jpg"), payload("p2.jpg")],
        })
        .await
        .unwrap();
    let session = fleet.ingestion().extract(session.id).await.unwrap();
    assert!(session.ocr_completed);
    assert_eq!(
        session.draft.as_ref().unwrap().works_performed,
        "Cambio de aceite"
    );

    let closed = fleet
        .maintenance()
        .complete_from_session(
            ticket.id,
            CompleteMaintenanceRequest {
                session_id: session.id,
                end_date: Some(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()),
                edits: CompletionEdits::default(),
            },
            &fleet.ingestion,
        )
        .await
        .unwrap();

    assert_eq!(closed.ticket.status, TicketStatus::Completed);
    assert_eq!(closed.ticket.works_performed, "Cambio de aceite");
    assert_eq!(closed.ticket.total_cost, Some("45.00".parse().unwrap()));
    assert_eq!(closed.ticket.ticket_image_refs.len(), 2);
    assert_eq!(closed.previous_vehicle_status, VehicleStatus::Maintenance);
    assert_eq!(fleet.vehicle_status(vehicle.id).await, VehicleStatus::Active);
    assert_eq!(fleet.storage.stored_keys().await.len(), 2);
    fleet.assert_status_invariant().await;

    assert!(matches!(
        fleet.ingestion().get_session(session.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn scenario_b_failed_image_blocks_completion_until_retry() {
    let fleet = Fleet::new();
    let vehicle = fleet.register("ABC123").await;
    let ticket = fleet
        .maintenance()
        .start_maintenance(vehicle.id, start_request("Taller X"))
        .await
        .unwrap();

    fleet.extractor.set_text("p1.jpg", "Trabajos: Cambio de aceite").await;
    fleet.extractor.set_failure("p2.jpg", "ocr service unavailable").await;

    let session = fleet
        .ingestion()
        .open_session(OpenSessionRequest {
            ticket_id: ticket.id,
            images: vec![payload("p1.jpg"), payload("p2.jpg")],
        })
        .await
        .unwrap();
    let session = fleet.ingestion().extract(session.id).await.unwrap();
    assert!(session.has_error);
    assert!(!session.ocr_completed);

    let request = || CompleteMaintenanceRequest {
        session_id: session.id,
        end_date: None,
        edits: CompletionEdits {
            works_performed: Some("Cambio de aceite".to_string()),
            ..CompletionEdits::default()
        },
    };

    let rejected = fleet
        .maintenance()
        .complete_from_session(ticket.id, request(), &fleet.ingestion)
        .await;
    assert!(matches!(rejected, Err(AppError::Validation(_))));
    assert_eq!(fleet.vehicle_status(vehicle.id).await, VehicleStatus::Maintenance);
    assert!(fleet.storage.stored_keys().await.is_empty());

    fleet.extractor.set_text("p2.jpg", "Total 60 EUR").await;
    let session = fleet.ingestion().retry_failed(session.id).await.unwrap();
    assert!(session.ocr_completed);

    let closed = fleet
        .maintenance()
        .complete_from_session(ticket.id, request(), &fleet.ingestion)
        .await
        .unwrap();
    assert_eq!(closed.ticket.status, TicketStatus::Completed);
    assert_eq!(fleet.vehicle_status(vehicle.id).await, VehicleStatus::Active);
    fleet.assert_status_invariant().await;
}

#[tokio::test]
async fn scenario_b_acknowledged_failure_allows_manual_completion() {
    let fleet = Fleet::new();
    let vehicle = fleet.register("ABC123").await;
    let ticket = fleet
        .maintenance()
        .start_maintenance(vehicle.id, start_request("Taller X"))
        .await
        .unwrap();

    fleet.extractor.set_failure("p1.jpg", "unreadable").await;
    let session = fleet
        .ingestion()
        .open_session(OpenSessionRequest {
            ticket_id: ticket.id,
            images: vec![payload("p1.jpg")],
        })
        .await
        .unwrap();
    fleet.ingestion().extract(session.id).await.unwrap();
    fleet.ingestion().acknowledge_failure(session.id).await.unwrap();

    let closed = fleet
        .maintenance()
        .complete_from_session(
            ticket.id,
            CompleteMaintenanceRequest {
                session_id: session.id,
                end_date: None,
                edits: CompletionEdits {
                    works_performed: Some("Sustitución de pastillas".to_string()),
                    ..CompletionEdits::default()
                },
            },
            &fleet.ingestion,
        )
        .await
        .unwrap();
    assert_eq!(closed.ticket.works_performed, "Sustitución de pastillas");
    assert_eq!(closed.ticket.ticket_image_refs.len(), 1);
}

#[tokio::test]
async fn scenario_c_empty_works_performed_is_rejected() {
    let fleet = Fleet::new();
    let vehicle = fleet.register("ABC123").await;
    let ticket = fleet
        .maintenance()
        .start_maintenance(vehicle.id, start_request("Taller X"))
        .await
        .unwrap();

    let result = fleet
        .maintenance()
        .complete_maintenance(
            ticket.id,
            CompletionInput {
                end_date: None,
                draft: DraftCompletion::default(),
                edits: CompletionEdits {
                    works_performed: Some(String::new()),
                    ..CompletionEdits::default()
                },
                ocr_completed: true,
                images: previews(1),
            },
        )
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(fleet.vehicle_status(vehicle.id).await, VehicleStatus::Maintenance);
    fleet.assert_status_invariant().await;
}

#[tokio::test]
async fn starting_twice_conflicts() {
    let fleet = Fleet::new();
    let vehicle = fleet.register("ABC123").await;

    fleet
        .maintenance()
        .start_maintenance(vehicle.id, start_request("Taller X"))
        .await
        .unwrap();
    let second = fleet
        .maintenance()
        .start_maintenance(vehicle.id, start_request("Taller Y"))
        .await;

    assert!(matches!(second, Err(AppError::Conflict(_))));
    assert_eq!(fleet.maintenance().list_active_tickets().await.unwrap().len(), 1);
    fleet.assert_status_invariant().await;
}

#[tokio::test]
async fn concurrent_starts_open_a_single_ticket() {
    let fleet = Fleet::new();
    let vehicle = fleet.register("ABC123").await;

    let attempts = (0..8).map(|i| {
        let controller = fleet.maintenance();
        let id = vehicle.id;
        async move {
            controller
                .start_maintenance(id, start_request(&format!("Taller {}", i)))
                .await
        }
    });
    let results = futures::future::join_all(attempts).await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, AppError::Conflict(_))));
    fleet.assert_status_invariant().await;
}

#[tokio::test]
async fn completing_twice_is_invalid_state() {
    let fleet = Fleet::new();
    let vehicle = fleet.register("ABC123").await;
    let ticket = fleet
        .maintenance()
        .start_maintenance(vehicle.id, start_request("Taller X"))
        .await
        .unwrap();

    let input = || CompletionInput {
        end_date: None,
        draft: DraftCompletion::default(),
        edits: CompletionEdits {
            works_performed: Some("Cambio de aceite".to_string()),
            ..CompletionEdits::default()
        },
        ocr_completed: true,
        images: previews(2),
    };

    fleet
        .maintenance()
        .complete_maintenance(ticket.id, input())
        .await
        .unwrap();
    let again = fleet.maintenance().complete_maintenance(ticket.id, input()).await;

    assert!(matches!(again, Err(AppError::InvalidState(_))));
    assert_eq!(fleet.storage.stored_keys().await.len(), 2);
}

#[tokio::test]
async fn missing_entities_are_not_found() {
    let fleet = Fleet::new();

    let start = fleet
        .maintenance()
        .start_maintenance(Uuid::new_v4(), start_request("Taller X"))
        .await;
    assert!(matches!(start, Err(AppError::NotFound(_))));

    let complete = fleet
        .maintenance()
        .complete_maintenance(
            Uuid::new_v4(),
            CompletionInput {
                end_date: None,
                draft: DraftCompletion::default(),
                edits: CompletionEdits::default(),
                ocr_completed: true,
                images: previews(1),
            },
        )
        .await;
    assert!(matches!(complete, Err(AppError::NotFound(_))));

    let history = fleet.maintenance().list_history(Some(Uuid::new_v4())).await;
    assert!(matches!(history, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn storage_failure_leaves_ticket_open() {
    let fleet = Fleet::new();
    let vehicle = fleet.register("ABC123").await;
    let ticket = fleet
        .maintenance()
        .start_maintenance(vehicle.id, start_request("Taller X"))
        .await
        .unwrap();

    fleet.storage.set_failing(true);
    let result = fleet
        .maintenance()
        .complete_maintenance(
            ticket.id,
            CompletionInput {
                end_date: None,
                draft: DraftCompletion::default(),
                edits: CompletionEdits {
                    works_performed: Some("Cambio de aceite".to_string()),
                    ..CompletionEdits::default()
                },
                ocr_completed: true,
                images: previews(1),
            },
        )
        .await;

    assert!(matches!(result, Err(AppError::Storage(_))));
    let stored = fleet.maintenance().get_ticket(ticket.id).await.unwrap();
    assert_eq!(stored.status, TicketStatus::InProgress);
    assert_eq!(fleet.vehicle_status(vehicle.id).await, VehicleStatus::Maintenance);
    fleet.assert_status_invariant().await;
}

#[tokio::test]
async fn end_date_before_start_is_rejected() {
    let fleet = Fleet::new();
    let vehicle = fleet.register("ABC123").await;
    let ticket = fleet
        .maintenance()
        .start_maintenance(vehicle.id, start_request("Taller X"))
        .await
        .unwrap();

    let result = fleet
        .maintenance()
        .complete_maintenance(
            ticket.id,
            CompletionInput {
                end_date: Some(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()),
                draft: DraftCompletion::default(),
                edits: CompletionEdits {
                    works_performed: Some("Cambio de aceite".to_string()),
                    ..CompletionEdits::default()
                },
                ocr_completed: true,
                images: previews(1),
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn history_lists_newest_first() {
    let fleet = Fleet::new();
    let vehicle = fleet.register("ABC123").await;
    let other = fleet.register("XYZ789").await;

    for (day, works) in [(1, "Cambio de aceite"), (10, "Neumáticos")] {
        let mut request = start_request("Taller X");
        request.start_date = NaiveDate::from_ymd_opt(2024, 3, day);
        let ticket = fleet
            .maintenance()
            .start_maintenance(vehicle.id, request)
            .await
            .unwrap();
        fleet
            .maintenance()
            .complete_maintenance(
                ticket.id,
                CompletionInput {
                    end_date: NaiveDate::from_ymd_opt(2024, 3, day + 1),
                    draft: DraftCompletion::default(),
                    edits: CompletionEdits {
                        works_performed: Some(works.to_string()),
                        ..CompletionEdits::default()
                    },
                    ocr_completed: true,
                    images: previews(1),
                },
            )
            .await
            .unwrap();
    }
    fleet
        .maintenance()
        .start_maintenance(other.id, start_request("Taller Y"))
        .await
        .unwrap();

    let history = fleet.maintenance().list_history(Some(vehicle.id)).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].works_performed, "Neumáticos");
    assert_eq!(history[1].works_performed, "Cambio de aceite");

    assert_eq!(fleet.maintenance().list_history(None).await.unwrap().len(), 3);

    let active = fleet.maintenance().list_active_tickets().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].vehicle.id, other.id);
}

#[tokio::test]
async fn vehicle_status_updates_respect_maintenance() {
    let fleet = Fleet::new();
    let vehicle = fleet.register("ABC123").await;

    let direct = fleet
        .vehicles()
        .update_status(
            vehicle.id,
            UpdateVehicleStatusRequest {
                vehicle_status: VehicleStatus::Maintenance,
            },
        )
        .await;
    assert!(matches!(direct, Err(AppError::Validation(_))));

    fleet
        .maintenance()
        .start_maintenance(vehicle.id, start_request("Taller X"))
        .await
        .unwrap();
    let blocked = fleet
        .vehicles()
        .update_status(
            vehicle.id,
            UpdateVehicleStatusRequest {
                vehicle_status: VehicleStatus::Inactive,
            },
        )
        .await;
    assert!(matches!(blocked, Err(AppError::Conflict(_))));
    fleet.assert_status_invariant().await;
}

#[tokio::test]
async fn ingestion_requires_an_open_ticket() {
    let fleet = Fleet::new();

    let unknown = fleet
        .ingestion()
        .open_session(OpenSessionRequest {
            ticket_id: Uuid::new_v4(),
            images: vec![payload("p1.jpg")],
        })
        .await;
    assert!(matches!(unknown, Err(AppError::NotFound(_))));

    let vehicle = fleet.register("ABC123").await;
    let ticket = fleet
        .maintenance()
        .start_maintenance(vehicle.id, start_request("Taller X"))
        .await
        .unwrap();

    let too_many = fleet
        .ingestion()
        .open_session(OpenSessionRequest {
            ticket_id: ticket.id,
            images: (0..6).map(|i| payload(&format!("p{}.jpg", i))).collect(),
        })
        .await;
    assert!(matches!(too_many, Err(AppError::Capacity(_))));
}
