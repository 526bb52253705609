// MySQL pool backing the pricing lookups and the voucher store.

use std::env;
use std::time::Duration;

use serde::Deserialize;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};

use super::env_or;
use crate::core::{AppError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    /// Connections kept open while idle
    pub pool_size: u32,
    pub max_connections: u32,
    /// How long a request waits for a free connection
    pub acquire_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self> {
        Ok(DatabaseConfig {
            url: env::var("DATABASE_URL")
                .map_err(|_| AppError::Configuration("DATABASE_URL not set".to_string()))?,
            pool_size: env_or("DATABASE_POOL_SIZE", 10)?,
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", 20)?,
            acquire_timeout_secs: env_or("DATABASE_ACQUIRE_TIMEOUT_SECS", 30)?,
        })
    }

    pub async fn create_pool(&self) -> Result<MySqlPool> {
        let pool = MySqlPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.pool_size)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .test_before_acquire(true)
            .connect(&self.url)
            .await
            .map_err(AppError::Database)?;

        tracing::info!(
            min = self.pool_size,
            max = self.max_connections,
            "Database pool ready"
        );
        Ok(pool)
    }
}

/// Applies the pricing and voucher schema in `migrations/`
pub async fn run_migrations(pool: &MySqlPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| AppError::Configuration(format!("Migration failed: {}", e)))?;
    tracing::info!("Database schema up to date");
    Ok(())
}
