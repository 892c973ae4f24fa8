//! Conexión a PostgreSQL
//!
//! Crea el pool a partir de `DatabaseConfig` y aplica las migraciones
//! embebidas de `migrations/`.

use anyhow::Result;
use sqlx::PgPool;

use crate::config::database::DatabaseConfig;

/// Pool de conexiones ya verificado
#[derive(Clone)]
pub struct DatabaseConnection {
    pool: PgPool,
}

impl DatabaseConnection {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        log::info!("🗄️ Conectando a PostgreSQL en {}", mask_database_url(&config.url));
        let pool = config.create_pool().await?;

        sqlx::query("SELECT 1").execute(&pool).await?;
        log::info!("✅ Conexión a PostgreSQL establecida");

        Ok(Self { pool })
    }

    /// Conectar usando `DATABASE_URL`
    pub async fn new_default() -> Result<Self> {
        let config = DatabaseConfig::from_env()?;
        Self::new(&config).await
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Ejecutar migraciones de la base de datos
    pub async fn run_migrations(&self) -> Result<()> {
        log::info!("🔄 Aplicando migraciones");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        log::info!("✅ Migraciones aplicadas");
        Ok(())
    }
}

/// Función helper para enmascarar la URL de la base de datos en logs
fn mask_database_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at_pos)) if at_pos > scheme_end => {
            format!("{}***:***@{}", &url[..scheme_end + 3], &url[at_pos + 1..])
        }
        _ => url.to_string(),
    }
}
