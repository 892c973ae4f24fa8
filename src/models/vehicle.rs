//! Modelo de Vehicle
//!
//! Este módulo contiene el struct Vehicle y su estado de disponibilidad.
//! Mapea exactamente a la tabla `vehicles` del schema PostgreSQL.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// Estado del vehículo - mapea al ENUM vehicle_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "vehicle_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    Active,
    Maintenance,
    Inactive,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Active => "active",
            VehicleStatus::Maintenance => "maintenance",
            VehicleStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vehicle principal - mapea exactamente a la tabla vehicles
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Vehicle {
    pub id: Uuid,
    pub license_plate: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub vehicle_status: VehicleStatus,
    pub created_at: DateTime<Utc>,
}

impl Vehicle {
    /// Nuevo vehículo disponible (estado `active`)
    pub fn new(license_plate: String, brand: Option<String>, model: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            license_plate,
            brand,
            model,
            vehicle_status: VehicleStatus::Active,
            created_at: Utc::now(),
        }
    }

    pub fn is_in_maintenance(&self) -> bool {
        self.vehicle_status == VehicleStatus::Maintenance
    }
}
