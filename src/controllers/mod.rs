//! Controladores
//!
//! Se construyen por request a partir del `AppState` y delegan en
//! repositorios y servicios.

pub mod ingestion_controller;
pub mod maintenance_controller;
pub mod vehicle_controller;

pub use ingestion_controller::IngestionController;
pub use maintenance_controller::MaintenanceController;
pub use vehicle_controller::VehicleController;
