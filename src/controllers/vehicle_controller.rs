use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::dto::vehicle_dto::{CreateVehicleRequest, UpdateVehicleStatusRequest};
use crate::dto::ApiResponse;
use crate::models::vehicle::{Vehicle, VehicleStatus};
use crate::repositories::MaintenanceStore;
use crate::state::AppState;
use crate::utils::errors::{not_found_error, validation_error, AppResult};

pub struct VehicleController {
    store: Arc<dyn MaintenanceStore>,
}

impl VehicleController {
    pub fn new(store: Arc<dyn MaintenanceStore>) -> Self {
        Self { store }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(state.store.clone())
    }

    pub async fn create(&self, request: CreateVehicleRequest) -> AppResult<ApiResponse<Vehicle>> {
        request.validate()?;

        let plate = request.license_plate.trim().to_uppercase();
        if plate.is_empty() {
            return Err(validation_error("license_plate", "license plate is required"));
        }

        let vehicle = self
            .store
            .create_vehicle(Vehicle::new(
                plate,
                non_blank(request.brand),
                non_blank(request.model),
            ))
            .await?;

        log::info!("🚐 Vehículo {} registrado ({})", vehicle.license_plate, vehicle.id);
        Ok(ApiResponse::success_with_message(
            vehicle,
            "Vehículo creado exitosamente".to_string(),
        ))
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Vehicle> {
        self.store
            .find_vehicle(id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", &id.to_string()))
    }

    pub async fn list(&self) -> AppResult<Vec<Vehicle>> {
        self.store.list_vehicles().await
    }

    /// `maintenance` sólo se alcanza abriendo un ticket
    pub async fn update_status(
        &self,
        id: Uuid,
        request: UpdateVehicleStatusRequest,
    ) -> AppResult<ApiResponse<Vehicle>> {
        if request.vehicle_status == VehicleStatus::Maintenance {
            return Err(validation_error(
                "vehicle_status",
                "maintenance status is set by starting a maintenance ticket",
            ));
        }

        let vehicle = self
            .store
            .update_vehicle_status(id, request.vehicle_status)
            .await?;

        log::info!("🔄 Vehículo {} pasa a {}", vehicle.license_plate, vehicle.vehicle_status);
        Ok(ApiResponse::success_with_message(
            vehicle,
            "Estado del vehículo actualizado".to_string(),
        ))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
