//! Modelos del sistema
//!
//! Este módulo contiene los modelos de datos que mapean al schema
//! PostgreSQL y los tipos transitorios del flujo de mantenimiento.

pub mod vehicle;
pub mod maintenance;
pub mod ticket_image;
