//! Rutas HTTP
//!
//! `create_router` monta los routers por dominio; `create_app` añade las
//! capas compartidas y el estado.

pub mod ingestion_routes;
pub mod maintenance_routes;
pub mod vehicle_routes;

use axum::{extract::DefaultBodyLimit, response::Json, routing::get, Router};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::middleware::cors::cors_for;
use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/api/vehicle", vehicle_routes::create_vehicle_router())
        .nest("/api/maintenance", maintenance_routes::create_maintenance_router())
        .nest("/api/ingestion", ingestion_routes::create_ingestion_router())
}

pub fn create_app(state: AppState) -> Router {
    let cors = cors_for(&state.config.cors_origins, state.config.is_development());

    create_router()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(state.config.max_request_bytes)),
        )
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "fleet_maintenance",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
