use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::ingestion_controller::IngestionController;
use crate::dto::ingestion_dto::OpenSessionRequest;
use crate::dto::ApiResponse;
use crate::services::ticket_ingestion::{ExtractionOutcome, IngestionSession};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_ingestion_router() -> Router<AppState> {
    Router::new()
        .route("/session", post(open_session))
        .route("/session/:id", get(get_session).delete(abandon_session))
        .route("/session/:id/extract", post(extract))
        .route("/session/:id/retry", post(retry_failed))
        .route("/session/:id/acknowledge", post(acknowledge_failure))
}

async fn open_session(
    State(state): State<AppState>,
    Json(request): Json<OpenSessionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<IngestionSession>>), AppError> {
    let controller = IngestionController::from_state(&state);
    let session = controller.open_session(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(session))))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<IngestionSession>, AppError> {
    let controller = IngestionController::from_state(&state);
    Ok(Json(controller.get_session(id).await?))
}

async fn extract(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<IngestionSession>>, AppError> {
    let controller = IngestionController::from_state(&state);
    let session = controller.extract(id).await?;
    Ok(Json(extraction_response(session)))
}

async fn retry_failed(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<IngestionSession>>, AppError> {
    let controller = IngestionController::from_state(&state);
    let session = controller.retry_failed(id).await?;
    Ok(Json(extraction_response(session)))
}

async fn acknowledge_failure(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<IngestionSession>>, AppError> {
    let controller = IngestionController::from_state(&state);
    let session = controller.acknowledge_failure(id).await?;
    Ok(Json(ApiResponse::success_with_message(
        session,
        "OCR abandonado: completar los campos manualmente".to_string(),
    )))
}

async fn abandon_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = IngestionController::from_state(&state);
    controller.abandon(id).await?;
    Ok(Json(ApiResponse::message("Sesión de ingesta abandonada".to_string())))
}

// Un lote con errores no es un fallo de la request: se devuelve el estado
// por imagen para reintentar o pasar a carga manual
fn extraction_response(session: IngestionSession) -> ApiResponse<IngestionSession> {
    if session.has_error {
        let failed = session
            .images
            .iter()
            .filter(|e| matches!(e.outcome, ExtractionOutcome::Failed { .. }))
            .count();
        ApiResponse {
            success: false,
            message: Some(format!(
                "Falló el OCR de {} imágenes: reintentar o completar manualmente",
                failed
            )),
            data: Some(session),
        }
    } else {
        ApiResponse::success_with_message(session, "Borrador generado".to_string())
    }
}
