//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y variables de configuración.
//! Los valores numéricos inválidos vuelven al default con un aviso.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Backend de persistencia del registro de vehículos y tickets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub log_level: String,
    pub cors_origins: Vec<String>,
    pub store_backend: StoreBackend,
    pub ocr_service_url: String,
    pub ocr_timeout_secs: u64,
    pub object_storage_url: String,
    pub ingestion_session_ttl_secs: u64,
    pub default_currency: String,
    pub max_request_bytes: usize,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            port: 3000,
            host: "0.0.0.0".to_string(),
            log_level: "debug".to_string(),
            cors_origins: Vec::new(),
            store_backend: StoreBackend::Postgres,
            ocr_service_url: "http://localhost:8081/ocr".to_string(),
            ocr_timeout_secs: 30,
            object_storage_url: "http://localhost:9000/fleet-maintenance".to_string(),
            ingestion_session_ttl_secs: 3600,
            default_currency: "EUR".to_string(),
            // 5 imágenes en base64 más margen
            max_request_bytes: 40 * 1024 * 1024,
        }
    }
}

impl EnvironmentConfig {
    /// Leer la configuración desde variables de entorno
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let environment = env::var("ENVIRONMENT").unwrap_or(defaults.environment);
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| {
            if environment == "production" {
                "info".to_string()
            } else {
                defaults.log_level.clone()
            }
        });

        Self {
            environment,
            port: parse_var("PORT", defaults.port),
            host: env::var("HOST").unwrap_or(defaults.host),
            log_level,
            cors_origins: env::var("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            store_backend: parse_var("STORE_BACKEND", defaults.store_backend),
            ocr_service_url: env::var("OCR_SERVICE_URL").unwrap_or(defaults.ocr_service_url),
            ocr_timeout_secs: parse_var("OCR_TIMEOUT_SECS", defaults.ocr_timeout_secs),
            object_storage_url: env::var("OBJECT_STORAGE_URL")
                .unwrap_or(defaults.object_storage_url),
            ingestion_session_ttl_secs: parse_var(
                "INGESTION_SESSION_TTL_SECS",
                defaults.ingestion_session_ttl_secs,
            ),
            default_currency: env::var("DEFAULT_CURRENCY")
                .map(|c| c.trim().to_uppercase())
                .unwrap_or(defaults.default_currency),
            max_request_bytes: parse_var("MAX_REQUEST_BYTES", defaults.max_request_bytes),
        }
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Obtener la URL del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_secs(self.ocr_timeout_secs)
    }

    pub fn ingestion_session_ttl(&self) -> Duration {
        Duration::from_secs(self.ingestion_session_ttl_secs)
    }
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("⚠️ Valor inválido para {}: '{}', usando {:?}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}
