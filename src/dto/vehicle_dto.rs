use serde::Deserialize;
use validator::Validate;

use crate::models::vehicle::VehicleStatus;

// Request para registrar un vehículo
#[derive(Debug, Deserialize, Validate)]
pub struct CreateVehicleRequest {
    #[validate(length(min = 2, max = 20))]
    pub license_plate: String,
    #[validate(length(max = 60))]
    pub brand: Option<String>,
    #[validate(length(max = 60))]
    pub model: Option<String>,
}

// Request para cambiar el estado de disponibilidad
#[derive(Debug, Deserialize)]
pub struct UpdateVehicleStatusRequest {
    pub vehicle_status: VehicleStatus,
}
