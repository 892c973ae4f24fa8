use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::maintenance_controller::MaintenanceController;
use crate::dto::maintenance_dto::{
    CompleteMaintenanceRequest, CompletionResponse, HistoryQuery, StartMaintenanceRequest,
};
use crate::dto::ApiResponse;
use crate::models::maintenance::{ActiveMaintenance, MaintenanceTicket};
use crate::models::vehicle::VehicleStatus;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_maintenance_router() -> Router<AppState> {
    Router::new()
        .route("/vehicle/:vehicle_id/start", post(start_maintenance))
        .route("/ticket/:ticket_id/complete", post(complete_maintenance))
        .route("/ticket/:ticket_id", get(get_ticket))
        .route("/active", get(list_active))
        .route("/history", get(list_history))
}

async fn start_maintenance(
    State(state): State<AppState>,
    Path(vehicle_id): Path<Uuid>,
    Json(request): Json<StartMaintenanceRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MaintenanceTicket>>), AppError> {
    let controller = MaintenanceController::from_state(&state);
    let ticket = controller.start_maintenance(vehicle_id, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(
            ticket,
            "Mantenimiento iniciado".to_string(),
        )),
    ))
}

async fn complete_maintenance(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    Json(request): Json<CompleteMaintenanceRequest>,
) -> Result<Json<ApiResponse<CompletionResponse>>, AppError> {
    let controller = MaintenanceController::from_state(&state);
    let closed = controller
        .complete_from_session(ticket_id, request, &state.ingestion)
        .await?;

    Ok(Json(ApiResponse::success_with_message(
        CompletionResponse {
            ticket: closed.ticket,
            vehicle_status: VehicleStatus::Active,
            previous_vehicle_status: closed.previous_vehicle_status,
        },
        "Mantenimiento completado".to_string(),
    )))
}

async fn get_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
) -> Result<Json<MaintenanceTicket>, AppError> {
    let controller = MaintenanceController::from_state(&state);
    Ok(Json(controller.get_ticket(ticket_id).await?))
}

async fn list_active(
    State(state): State<AppState>,
) -> Result<Json<Vec<ActiveMaintenance>>, AppError> {
    let controller = MaintenanceController::from_state(&state);
    Ok(Json(controller.list_active_tickets().await?))
}

async fn list_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<MaintenanceTicket>>, AppError> {
    let controller = MaintenanceController::from_state(&state);
    Ok(Json(controller.list_history(query.vehicle_id).await?))
}
