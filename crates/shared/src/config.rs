//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::types::Currency;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Settlement engine configuration.
    #[serde(default)]
    pub settlement: SettlementConfig,
    /// Session token configuration.
    pub session: SessionConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settlement engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SettlementConfig {
    /// Currency used when a group does not specify one.
    #[serde(default)]
    pub default_currency: Currency,
    /// Leftover balance tolerated per account before a report carries an
    /// imbalance warning.
    #[serde(default = "default_residual_tolerance")]
    pub residual_tolerance_per_account: Decimal,
    /// Whether expenses already marked paid still count towards balances.
    #[serde(default)]
    pub include_paid_expenses: bool,
}

fn default_residual_tolerance() -> Decimal {
    Decimal::new(2, 2)
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            default_currency: Currency::default(),
            residual_tolerance_per_account: default_residual_tolerance(),
            include_paid_expenses: false,
        }
    }
}

/// Session token configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Secret key for signing tokens.
    pub secret: String,
    /// Token lifetime in seconds.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
}

fn default_token_ttl() -> u64 {
    86400 // 1 day
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_filter() -> String {
    "acerto=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, later ones winning: `config/default`, `config/{RUN_MODE}`,
    /// then `ACERTO__*` environment variables (a `.env` file is honored).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("ACERTO").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
