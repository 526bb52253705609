use crate::core::{AppError, Result};
use crate::modules::pricing::models::CustomerType;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use std::str::FromStr;

pub mod database;
pub mod server;

pub use database::{run_migrations, DatabaseConfig};
pub use server::ServerConfig;

/// Reads `name`, falling back to `default` when unset
pub(crate) fn env_or<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Configuration(format!("Invalid {}: {}", name, raw))),
        Err(_) => Ok(default),
    }
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub pricing: PricingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub log_level: String,
    /// `json` for structured output, anything else for human-readable lines
    pub log_format: String,
}

impl AppConfig {
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    /// Largest debit/credit difference still reported as balanced
    pub ledger_tolerance: Decimal,
    /// Customer type assumed when no profile is found
    pub default_customer_type: CustomerType,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            ledger_tolerance: Decimal::new(1, 2),
            default_customer_type: CustomerType::UnRegistered,
        }
    }
}

impl PricingConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = PricingConfig::default();
        Ok(PricingConfig {
            ledger_tolerance: env_or("PRICING_LEDGER_TOLERANCE", defaults.ledger_tolerance)?,
            default_customer_type: env_or(
                "PRICING_DEFAULT_CUSTOMER_TYPE",
                defaults.default_customer_type,
            )?,
        })
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = Config {
            app: AppConfig {
                env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
                log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
            },
            database: DatabaseConfig::from_env()?,
            server: ServerConfig::from_env()?,
            pricing: PricingConfig::from_env()?,
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.database.pool_size == 0 || self.database.max_connections == 0 {
            return Err(AppError::Configuration(
                "Database pool sizes must be greater than 0".to_string(),
            ));
        }

        if self.database.pool_size > self.database.max_connections {
            return Err(AppError::Configuration(
                "DATABASE_POOL_SIZE cannot exceed DATABASE_MAX_CONNECTIONS".to_string(),
            ));
        }

        if self.database.acquire_timeout_secs == 0 {
            return Err(AppError::Configuration(
                "DATABASE_ACQUIRE_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        if self.server.workers == 0 {
            return Err(AppError::Configuration(
                "Server workers must be greater than 0".to_string(),
            ));
        }

        if self.pricing.ledger_tolerance < Decimal::ZERO {
            return Err(AppError::Configuration(
                "Ledger tolerance cannot be negative".to_string(),
            ));
        }

        Ok(())
    }
}
