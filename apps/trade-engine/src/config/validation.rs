//! Startup validation: fatal misconfiguration is caught before the HTTP
//! server binds, per §7's "fatal at startup" propagation policy.

use super::Config;

/// Errors from startup validation.
#[derive(Debug, thiserror::Error)]
pub enum StartupValidationError {
    /// `MARKET_DATA_MODE` was not `coinbase`.
    #[error("unsupported MARKET_DATA_MODE '{0}': only 'coinbase' is supported")]
    UnsupportedMarketDataMode(String),
    /// LIVE trading is enabled but Coinbase credentials are missing.
    #[error(
        "ENABLE_LIVE_TRADING is set but Coinbase credentials are missing: set \
         COINBASE_API_KEY_NAME and (COINBASE_API_PRIVATE_KEY or COINBASE_API_PRIVATE_KEY_PATH)"
    )]
    MissingLiveCredentials,
}

/// Result of startup validation.
#[derive(Debug)]
pub struct StartupValidation {
    /// Non-fatal warnings surfaced in the startup log.
    pub warnings: Vec<String>,
}

/// Validate configuration that would otherwise fail lazily and confusingly
/// once a request arrives.
///
/// # Errors
///
/// Returns `StartupValidationError` for conditions the spec designates
/// fatal at startup.
pub fn validate_startup_environment(
    config: &Config,
) -> Result<StartupValidation, StartupValidationError> {
    if config.trading.market_data_mode != "coinbase" {
        return Err(StartupValidationError::UnsupportedMarketDataMode(
            config.trading.market_data_mode.clone(),
        ));
    }

    let mut warnings = Vec::new();

    if config.trading.enable_live_trading && !config.coinbase.has_credentials() {
        return Err(StartupValidationError::MissingLiveCredentials);
    }

    if config.trading.enable_live_trading && config.trading.trading_disable_live {
        warnings.push(
            "ENABLE_LIVE_TRADING is true but TRADING_DISABLE_LIVE kill switch is also on; \
             LIVE confirmations will be rejected until the kill switch is cleared"
                .to_string(),
        );
    }

    Ok(StartupValidation { warnings })
}
