use async_trait::async_trait;
use uuid::Uuid;

use crate::models::vehicle::{Vehicle, VehicleStatus};
use crate::repositories::{conflict_on_unique, PgRepository};
use crate::utils::errors::{not_found_error, AppError, AppResult};

/// Registro de vehículos: identidad y estado de disponibilidad
#[async_trait]
pub trait VehicleRegistry: Send + Sync {
    async fn create_vehicle(&self, vehicle: Vehicle) -> AppResult<Vehicle>;

    async fn find_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>>;

    async fn list_vehicles(&self) -> AppResult<Vec<Vehicle>>;

    /// Cambio directo de estado. `Conflict` si el vehículo está en taller:
    /// ese estado sólo lo gestionan la apertura y el cierre de tickets.
    async fn update_vehicle_status(&self, id: Uuid, status: VehicleStatus) -> AppResult<Vehicle>;
}

pub(crate) fn in_maintenance_conflict(id: Uuid) -> AppError {
    AppError::Conflict(format!(
        "Vehicle '{}' is in maintenance; complete its ticket first",
        id
    ))
}

const VEHICLE_COLUMNS: &str = "id, license_plate, brand, model, vehicle_status, created_at";

#[async_trait]
impl VehicleRegistry for PgRepository {
    async fn create_vehicle(&self, vehicle: Vehicle) -> AppResult<Vehicle> {
        let plate = vehicle.license_plate.clone();

        let created = sqlx::query_as::<_, Vehicle>(&format!(
            r#"
            INSERT INTO vehicles (id, license_plate, brand, model, vehicle_status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            VEHICLE_COLUMNS
        ))
        .bind(vehicle.id)
        .bind(vehicle.license_plate)
        .bind(vehicle.brand)
        .bind(vehicle.model)
        .bind(vehicle.vehicle_status)
        .bind(vehicle.created_at)
        .fetch_one(self.pool())
        .await
        .map_err(|e| {
            conflict_on_unique(e, || {
                format!("Vehicle with license_plate '{}' already exists", plate)
            })
        })?;

        Ok(created)
    }

    async fn find_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        let vehicle = sqlx::query_as::<_, Vehicle>(&format!(
            "SELECT {} FROM vehicles WHERE id = $1",
            VEHICLE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(vehicle)
    }

    async fn list_vehicles(&self) -> AppResult<Vec<Vehicle>> {
        let vehicles = sqlx::query_as::<_, Vehicle>(&format!(
            "SELECT {} FROM vehicles ORDER BY created_at DESC",
            VEHICLE_COLUMNS
        ))
        .fetch_all(self.pool())
        .await?;

        Ok(vehicles)
    }

    async fn update_vehicle_status(&self, id: Uuid, status: VehicleStatus) -> AppResult<Vehicle> {
        // Condicional: no compite con la apertura, que bloquea la fila
        let updated = sqlx::query_as::<_, Vehicle>(&format!(
            "UPDATE vehicles SET vehicle_status = $2 WHERE id = $1 AND vehicle_status <> $3 RETURNING {}",
            VEHICLE_COLUMNS
        ))
        .bind(id)
        .bind(status)
        .bind(VehicleStatus::Maintenance)
        .fetch_optional(self.pool())
        .await?;

        match updated {
            Some(vehicle) => Ok(vehicle),
            None => match self.find_vehicle(id).await? {
                Some(_) => Err(in_maintenance_conflict(id)),
                None => Err(not_found_error("Vehicle", &id.to_string())),
            },
        }
    }
}
