//! Repositorios
//!
//! Acceso a datos de vehículos y tickets de mantenimiento. Los traits
//! `VehicleRegistry` y `TicketStore` exponen las colecciones; `MaintenanceStore`
//! agrega las escrituras pareadas (ticket + vehículo) que deben aplicarse
//! como una sola unidad.

pub mod vehicle_repository;
pub mod maintenance_repository;
pub mod memory_repository;

pub use maintenance_repository::{ClosedTicket, MaintenanceStore, TicketStore};
pub use memory_repository::InMemoryRepository;
pub use vehicle_repository::VehicleRegistry;

use sqlx::PgPool;

use crate::utils::errors::AppError;

/// Repositorio PostgreSQL; implementa los tres traits sobre el mismo pool
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Traducir violaciones de unicidad a `Conflict`; el resto queda como error de BD
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: impl FnOnce() -> String) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(message()),
        _ => AppError::Database(err),
    }
}
