//! Trading mode, safety gates, and execution-timeout configuration.

use serde::{Deserialize, Serialize};

/// Trading configuration: execution mode, safety gates, and limits.
///
/// Every field maps to an environment variable named in the module's
/// `from_env` constructor; the YAML keys below exist purely so tests and
/// local overrides can exercise the same struct without touching the
/// process environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// `EXECUTION_MODE_DEFAULT` - PAPER or LIVE.
    #[serde(default = "default_execution_mode")]
    pub execution_mode_default: String,
    /// `ENABLE_LIVE_TRADING` - must be true AND the kill switch off to place
    /// LIVE orders.
    #[serde(default)]
    pub enable_live_trading: bool,
    /// `TRADING_DISABLE_LIVE` - master kill switch. ON blocks every LIVE
    /// confirmation regardless of other flags.
    #[serde(default = "default_true")]
    pub trading_disable_live: bool,
    /// `DEMO_SAFE_MODE` - LIVE CRYPTO execution is blocked at the execution
    /// node with `DEMO_MODE_LIVE_BLOCKED`.
    #[serde(default = "default_true")]
    pub demo_safe_mode: bool,
    /// `FORCE_PAPER_MODE` - every intent is downgraded to PAPER
    /// pre-confirmation.
    #[serde(default)]
    pub force_paper_mode: bool,
    /// `LIVE_MAX_NOTIONAL_USD` - hard per-order cap for LIVE.
    #[serde(default = "default_live_max_notional")]
    pub live_max_notional_usd: f64,
    /// `EXECUTION_TIMEOUT_SECONDS` - wall clock budget for a run.
    #[serde(default = "default_execution_timeout_seconds")]
    pub execution_timeout_seconds: u64,
    /// `MARKET_DATA_MODE` - must be `coinbase`; anything else is a fatal
    /// startup error.
    #[serde(default = "default_market_data_mode")]
    pub market_data_mode: String,
    /// `DEBUG_MIN_RULES` - emit `min_rules_trace` artifacts for SELL sizing
    /// debugging.
    #[serde(default)]
    pub debug_min_rules: bool,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            execution_mode_default: default_execution_mode(),
            enable_live_trading: false,
            trading_disable_live: true,
            demo_safe_mode: true,
            force_paper_mode: false,
            live_max_notional_usd: default_live_max_notional(),
            execution_timeout_seconds: default_execution_timeout_seconds(),
            market_data_mode: default_market_data_mode(),
            debug_min_rules: false,
        }
    }
}

impl TradingConfig {
    /// Whether LIVE orders may be placed at all, ignoring per-request mode
    /// selection. Both the kill switch must be off and the enable flag set.
    #[must_use]
    pub const fn live_trading_allowed(&self) -> bool {
        self.enable_live_trading && !self.trading_disable_live
    }

    /// `EXECUTION_TIMEOUT_SECONDS` as a `Duration`.
    #[must_use]
    pub const fn execution_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.execution_timeout_seconds)
    }
}

const fn default_true() -> bool {
    true
}

fn default_execution_mode() -> String {
    "PAPER".to_string()
}

const fn default_live_max_notional() -> f64 {
    20.0
}

const fn default_execution_timeout_seconds() -> u64 {
    60
}

fn default_market_data_mode() -> String {
    "coinbase".to_string()
}
