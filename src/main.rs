use anyhow::Result;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use fleet_maintenance::config::{EnvironmentConfig, StoreBackend};
use fleet_maintenance::database::DatabaseConnection;
use fleet_maintenance::repositories::{InMemoryRepository, MaintenanceStore, PgRepository};
use fleet_maintenance::routes::create_app;
use fleet_maintenance::services::{HttpObjectStorage, HttpTextExtractor};
use fleet_maintenance::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();
    let config = EnvironmentConfig::from_env();

    // Configurar logging
    let level = config
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::DEBUG);
    tracing_subscriber::fmt().with_max_level(level).init();

    info!("🔧 Fleet Maintenance - Mantenimiento de flota e ingesta de tickets");
    info!("=================================================================");

    // Inicializar almacenamiento
    let store: Arc<dyn MaintenanceStore> = match config.store_backend {
        StoreBackend::Postgres => {
            let db_connection = match DatabaseConnection::new_default().await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("❌ Error conectando a la base de datos: {}", e);
                    return Err(anyhow::anyhow!("Error de base de datos: {}", e));
                }
            };
            db_connection.run_migrations().await?;
            Arc::new(PgRepository::new(db_connection.pool().clone()))
        }
        StoreBackend::Memory => {
            warn!("⚠️ STORE_BACKEND=memory: los datos no sobreviven a un reinicio");
            Arc::new(InMemoryRepository::new())
        }
    };

    // Capacidades externas
    let extractor = Arc::new(HttpTextExtractor::new(
        config.ocr_service_url.clone(),
        config.ocr_timeout(),
    )?);
    let storage = Arc::new(HttpObjectStorage::new(config.object_storage_url.clone())?);
    info!("🔎 OCR: {} (timeout {}s)", config.ocr_service_url, config.ocr_timeout_secs);
    info!("📦 Almacenamiento de objetos: {}", config.object_storage_url);

    let addr: SocketAddr = config.server_url().parse()?;
    let app = create_app(AppState::new(config, store, storage, extractor));

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("🚗 Endpoints - Vehicle:");
    info!("   POST /api/vehicle - Registrar vehículo");
    info!("   GET  /api/vehicle - Listar vehículos");
    info!("   GET  /api/vehicle/:id - Obtener vehículo");
    info!("   PUT  /api/vehicle/:id/status - Cambiar disponibilidad");
    info!("🔧 Endpoints - Maintenance:");
    info!("   POST /api/maintenance/vehicle/:vehicle_id/start - Iniciar mantenimiento");
    info!("   POST /api/maintenance/ticket/:ticket_id/complete - Completar mantenimiento");
    info!("   GET  /api/maintenance/ticket/:ticket_id - Obtener ticket");
    info!("   GET  /api/maintenance/active - Vehículos en taller");
    info!("   GET  /api/maintenance/history - Historial (?vehicle_id=)");
    info!("📸 Endpoints - Ingestion:");
    info!("   POST /api/ingestion/session - Subir imágenes del ticket");
    info!("   GET  /api/ingestion/session/:id - Estado de la sesión y borrador");
    info!("   POST /api/ingestion/session/:id/extract - OCR + parseo");
    info!("   POST /api/ingestion/session/:id/retry - Reintentar imágenes fallidas");
    info!("   POST /api/ingestion/session/:id/acknowledge - Pasar a carga manual");
    info!("   DELETE /api/ingestion/session/:id - Abandonar sesión");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Error del servidor: {}", e);
        return Err(e.into());
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo instalar el handler de Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo instalar el handler de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
