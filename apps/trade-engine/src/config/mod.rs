//! Configuration loading, validation, and environment variable
//! interpolation for the trade engine.
//!
//! # Usage
//!
//! ```rust,ignore
//! use trade_engine::config::Config;
//!
//! // Load entirely from process environment variables (production path).
//! let config = Config::from_env();
//!
//! // Load from an optional YAML overlay, still interpolating `${VAR}`.
//! let config = load_config(Some("config.yaml"))?;
//! ```

mod coinbase;
mod observability;
mod persistence;
mod server;
pub mod trading;
mod validation;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use coinbase::{CoinbaseConfig, CoinbaseConfigError};
pub use observability::{LoggingConfig, ObservabilityConfig};
pub use persistence::{PersistenceConfig, PersistenceConfigError};
pub use server::ServerConfig;
pub use trading::TradingConfig;
pub use validation::{StartupValidation, StartupValidationError, validate_startup_environment};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),

    /// Startup validation failed.
    #[error(transparent)]
    StartupValidation(#[from] StartupValidationError),
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Trading mode, safety gates, and limits.
    #[serde(default)]
    pub trading: TradingConfig,
    /// Coinbase broker credentials.
    #[serde(default)]
    pub coinbase: CoinbaseConfig,
    /// Persistence configuration.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Observability (logging) configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            trading: TradingConfig::default(),
            coinbase: CoinbaseConfig::default(),
            persistence: PersistenceConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    /// Build configuration directly from process environment variables,
    /// bypassing any YAML file. This is the path `main.rs` uses in
    /// production; `load_config` exists for local overrides and tests.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("HTTP_PORT")
            && let Ok(port) = v.parse()
        {
            config.server.http_port = port;
        }
        if let Ok(v) = std::env::var("BIND_ADDRESS") {
            config.server.bind_address = v;
        }

        if let Ok(v) = std::env::var("EXECUTION_MODE_DEFAULT") {
            config.trading.execution_mode_default = v;
        }
        config.trading.enable_live_trading = env_bool("ENABLE_LIVE_TRADING", false);
        config.trading.trading_disable_live = env_bool("TRADING_DISABLE_LIVE", true);
        config.trading.demo_safe_mode = env_bool("DEMO_SAFE_MODE", true);
        config.trading.force_paper_mode = env_bool("FORCE_PAPER_MODE", false);
        config.trading.debug_min_rules = env_bool("DEBUG_MIN_RULES", false);
        if let Ok(v) = std::env::var("LIVE_MAX_NOTIONAL_USD")
            && let Ok(n) = v.parse()
        {
            config.trading.live_max_notional_usd = n;
        }
        if let Ok(v) = std::env::var("EXECUTION_TIMEOUT_SECONDS")
            && let Ok(n) = v.parse()
        {
            config.trading.execution_timeout_seconds = n;
        }
        if let Ok(v) = std::env::var("MARKET_DATA_MODE") {
            config.trading.market_data_mode = v;
        }

        if let Ok(v) = std::env::var("COINBASE_API_KEY_NAME") {
            config.coinbase.api_key_name = v;
        }
        config.coinbase.api_private_key = std::env::var("COINBASE_API_PRIVATE_KEY").ok();
        config.coinbase.api_private_key_path = std::env::var("COINBASE_API_PRIVATE_KEY_PATH").ok();

        config.persistence.database_url = std::env::var("DATABASE_URL").ok();

        if let Ok(v) = std::env::var("RUST_LOG") {
            config.observability.logging.level = v;
        }

        config
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

// ============================================
// YAML overlay loading (local dev / tests)
// ============================================

/// Load configuration from a YAML file with environment variable
/// interpolation, falling back to `Config::from_env()` defaults for any
/// field the file doesn't set.
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or
/// validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let mut result = input.to_string();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    for cap in re.captures_iter(input) {
        let Some(full_match) = cap.get(0) else {
            continue;
        };
        let Some(var_match) = cap.get(1) else {
            continue;
        };
        let full_match = full_match.as_str();
        let var_name = var_match.as_str();
        let default_value = cap.get(2).map(|m| m.as_str());

        let value = match std::env::var(var_name) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.map_or_else(String::new, str::to_string),
        };

        result = result.replace(full_match, &value);
    }

    result
}

/// Validate configuration values that are independent of the running
/// environment (startup validation in [`validation`] handles the rest).
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.trading.live_max_notional_usd <= 0.0 {
        return Err(ConfigError::ValidationError(
            "trading.live_max_notional_usd must be positive".to_string(),
        ));
    }

    if config.trading.execution_timeout_seconds == 0 {
        return Err(ConfigError::ValidationError(
            "trading.execution_timeout_seconds must be positive".to_string(),
        ));
    }

    let valid_modes = ["PAPER", "LIVE"];
    if !valid_modes.contains(&config.trading.execution_mode_default.as_str()) {
        return Err(ConfigError::ValidationError(format!(
            "trading.execution_mode_default must be one of: {valid_modes:?}"
        )));
    }

    validate_startup_environment(config)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_defaults() {
        let config = Config::default();
        assert_eq!(config.server.http_port, 8080);
        assert_eq!(config.trading.execution_mode_default, "PAPER");
        assert!(config.trading.trading_disable_live);
        assert!(!config.trading.enable_live_trading);
        assert_eq!(config.trading.execution_timeout_seconds, 60);
        assert!((config.trading.live_max_notional_usd - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn load_minimal_yaml_overlay() {
        let yaml = r"
server:
  http_port: 9090
";
        let config = load_config_from_string(yaml).unwrap();
        assert_eq!(config.server.http_port, 9090);
        assert_eq!(config.trading.execution_mode_default, "PAPER");
    }

    #[test]
    fn env_var_with_default_when_missing() {
        let input = "mode: ${TRADE_ENGINE_TEST_NONEXISTENT_VAR:-PAPER}";
        assert_eq!(interpolate_env_vars(input), "mode: PAPER");
    }

    #[test]
    fn env_var_without_default_becomes_empty() {
        let input = "api_key: ${TRADE_ENGINE_TEST_UNLIKELY_TO_EXIST}";
        assert_eq!(interpolate_env_vars(input), "api_key: ");
    }

    #[test]
    fn rejects_unsupported_execution_mode() {
        let yaml = r"
trading:
  execution_mode_default: BACKTEST
";
        let err = load_config_from_string(yaml).unwrap_err();
        assert!(err.to_string().contains("execution_mode_default"));
    }

    #[test]
    fn rejects_nonpositive_live_max_notional() {
        let yaml = r"
trading:
  live_max_notional_usd: 0
";
        let err = load_config_from_string(yaml).unwrap_err();
        assert!(err.to_string().contains("live_max_notional_usd"));
    }
}
