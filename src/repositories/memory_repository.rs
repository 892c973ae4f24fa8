//! Repositorio en memoria
//!
//! Misma semántica que el repositorio PostgreSQL: las escrituras pareadas se
//! aplican bajo un único write lock, de modo que la comprobación de ticket
//! abierto y la inserción no pueden intercalarse. Se usa en desarrollo
//! (`STORE_BACKEND=memory`) y en los tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::maintenance::{ActiveMaintenance, MaintenanceTicket};
use crate::models::vehicle::{Vehicle, VehicleStatus};
use crate::repositories::vehicle_repository::in_maintenance_conflict;
use crate::repositories::{ClosedTicket, MaintenanceStore, TicketStore, VehicleRegistry};
use crate::utils::errors::{conflict_error, not_found_error, AppError, AppResult};

#[derive(Default)]
struct MemoryState {
    vehicles: HashMap<Uuid, Vehicle>,
    // Orden de inserción
    tickets: Vec<MaintenanceTicket>,
}

#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VehicleRegistry for InMemoryRepository {
    async fn create_vehicle(&self, vehicle: Vehicle) -> AppResult<Vehicle> {
        let mut state = self.state.write().await;
        if state
            .vehicles
            .values()
            .any(|v| v.license_plate == vehicle.license_plate)
        {
            return Err(conflict_error("Vehicle", "license_plate", &vehicle.license_plate));
        }
        state.vehicles.insert(vehicle.id, vehicle.clone());
        Ok(vehicle)
    }

    async fn find_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        Ok(self.state.read().await.vehicles.get(&id).cloned())
    }

    async fn list_vehicles(&self) -> AppResult<Vec<Vehicle>> {
        let state = self.state.read().await;
        let mut vehicles: Vec<Vehicle> = state.vehicles.values().cloned().collect();
        vehicles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(vehicles)
    }

    async fn update_vehicle_status(&self, id: Uuid, status: VehicleStatus) -> AppResult<Vehicle> {
        let mut state = self.state.write().await;
        let vehicle = state
            .vehicles
            .get_mut(&id)
            .ok_or_else(|| not_found_error("Vehicle", &id.to_string()))?;
        if vehicle.is_in_maintenance() {
            return Err(in_maintenance_conflict(id));
        }
        vehicle.vehicle_status = status;
        Ok(vehicle.clone())
    }
}

#[async_trait]
impl TicketStore for InMemoryRepository {
    async fn find_ticket(&self, id: Uuid) -> AppResult<Option<MaintenanceTicket>> {
        let state = self.state.read().await;
        Ok(state.tickets.iter().find(|t| t.id == id).cloned())
    }

    async fn find_in_progress_by_vehicle(
        &self,
        vehicle_id: Uuid,
    ) -> AppResult<Option<MaintenanceTicket>> {
        let state = self.state.read().await;
        Ok(state
            .tickets
            .iter()
            .find(|t| t.vehicle_id == vehicle_id && t.is_in_progress())
            .cloned())
    }

    async fn list_history(&self, vehicle_id: Option<Uuid>) -> AppResult<Vec<MaintenanceTicket>> {
        let state = self.state.read().await;
        let mut history: Vec<MaintenanceTicket> = state
            .tickets
            .iter()
            .rev()
            .filter(|t| vehicle_id.map_or(true, |id| t.vehicle_id == id))
            .cloned()
            .collect();
        // sort estable: a igual fecha se conserva "más reciente primero"
        history.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(history)
    }
}

#[async_trait]
impl MaintenanceStore for InMemoryRepository {
    async fn open_ticket(&self, ticket: MaintenanceTicket) -> AppResult<MaintenanceTicket> {
        let mut state = self.state.write().await;

        if !state.vehicles.contains_key(&ticket.vehicle_id) {
            return Err(not_found_error("Vehicle", &ticket.vehicle_id.to_string()));
        }
        if state
            .tickets
            .iter()
            .any(|t| t.vehicle_id == ticket.vehicle_id && t.is_in_progress())
        {
            return Err(AppError::Conflict(format!(
                "Vehicle '{}' already has a maintenance ticket in progress",
                ticket.vehicle_id
            )));
        }

        if let Some(vehicle) = state.vehicles.get_mut(&ticket.vehicle_id) {
            vehicle.vehicle_status = VehicleStatus::Maintenance;
        }
        state.tickets.push(ticket.clone());
        Ok(ticket)
    }

    async fn close_ticket(&self, ticket: MaintenanceTicket) -> AppResult<ClosedTicket> {
        let mut state = self.state.write().await;

        let previous_vehicle_status = state
            .vehicles
            .get(&ticket.vehicle_id)
            .map(|v| v.vehicle_status)
            .ok_or_else(|| not_found_error("Vehicle", &ticket.vehicle_id.to_string()))?;

        let stored = state
            .tickets
            .iter_mut()
            .find(|t| t.id == ticket.id)
            .ok_or_else(|| not_found_error("MaintenanceTicket", &ticket.id.to_string()))?;
        if !stored.is_in_progress() {
            return Err(AppError::InvalidState(format!(
                "Ticket '{}' is already completed",
                ticket.id
            )));
        }
        *stored = ticket.clone();

        if let Some(vehicle) = state.vehicles.get_mut(&ticket.vehicle_id) {
            vehicle.vehicle_status = VehicleStatus::Active;
        }

        Ok(ClosedTicket {
            ticket,
            previous_vehicle_status,
        })
    }

    async fn list_active(&self) -> AppResult<Vec<ActiveMaintenance>> {
        let state = self.state.read().await;
        let mut active: Vec<ActiveMaintenance> = state
            .tickets
            .iter()
            .filter(|t| t.is_in_progress())
            .filter_map(|ticket| {
                let vehicle = state.vehicles.get(&ticket.vehicle_id)?.clone();
                Some(ActiveMaintenance {
                    vehicle,
                    ticket: ticket.clone(),
                })
            })
            .collect();
        active.sort_by(|a, b| a.ticket.start_date.cmp(&b.ticket.start_date));
        Ok(active)
    }
}
