//! Coinbase-specific error types.

use thiserror::Error;

use crate::application::ports::BrokerError;

/// Errors from the Coinbase adapter.
#[derive(Debug, Error, Clone)]
pub enum CoinbaseError {
    /// The EC private key could not be parsed.
    #[error("invalid Coinbase credentials: {0}")]
    InvalidCredentials(String),

    /// JWT signing itself failed.
    #[error("JWT signing failed: {0}")]
    JwtSigningFailed(String),

    /// The transport-level request failed (connection refused, DNS, TLS).
    #[error("network error: {0}")]
    Network(String),

    /// The response body could not be parsed as the expected shape.
    #[error("response parsing failed: {0}")]
    JsonParse(String),

    /// The exchange rejected the order (`success: false`).
    #[error("order rejected: {0}")]
    OrderRejected(String),

    /// 401/403 from the exchange.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// 429, retries exhausted.
    #[error("rate limited")]
    RateLimited,

    /// A 4xx/5xx the retry policy doesn't special-case.
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code.
        code: u16,
        /// Error body or reason.
        message: String,
    },

    /// The retry budget (3 attempts) was exhausted.
    #[error("max retries exceeded after {attempts} attempts")]
    MaxRetriesExceeded {
        /// Number of attempts made before giving up.
        attempts: u32,
    },
}

impl From<CoinbaseError> for BrokerError {
    fn from(err: CoinbaseError) -> Self {
        match err {
            CoinbaseError::InvalidCredentials(_) => Self::CredentialsMissing,
            CoinbaseError::JwtSigningFailed(_) => Self::CredentialsMissing,
            CoinbaseError::Network(message) | CoinbaseError::JsonParse(message) => {
                Self::ApiError { message }
            }
            CoinbaseError::OrderRejected(reason) => Self::OrderRejected { reason },
            CoinbaseError::AuthenticationFailed => Self::CredentialsMissing,
            CoinbaseError::RateLimited => Self::RateLimited,
            CoinbaseError::Api { code, message } => Self::ApiError {
                message: format!("{code}: {message}"),
            },
            CoinbaseError::MaxRetriesExceeded { attempts } => Self::ApiError {
                message: format!("max retries exceeded after {attempts} attempts"),
            },
        }
    }
}
