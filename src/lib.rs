//! Fleet maintenance
//!
//! Ciclo de vida de mantenimiento de vehículos de flota e ingesta de tickets
//! de taller escaneados (OCR → borrador → revisión → cierre).

pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod testing;
pub mod utils;
