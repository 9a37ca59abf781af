//! Stable error codes and the HTTP error envelope.
//!
//! Every user-visible failure carries one of the stable codes from this
//! module so clients can branch on `error_code` rather than parsing
//! messages. `to_response` renders the exact envelope shape the HTTP layer
//! promises: `{status:"ERROR", error:{code, error_code, message,
//! request_id, remediation?}, content, request_id}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Stable error codes surfaced in API responses and audit artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The metadata provider returned nothing usable for the product.
    ProductDetailsUnavailable,
    /// The metadata provider timed out.
    ProductApiTimeout,
    /// The metadata provider rate-limited the request.
    ProductApiRateLimited,
    /// The product does not exist on the exchange.
    ProductNotFound,
    /// No run exists for this id under the caller's tenant.
    RunNotFound,
    /// No order exists for this id.
    OrderNotFound,
    /// No confirmation exists for this id under the caller's tenant, or its
    /// `conf_` id was malformed.
    ConfirmationNotFound,
    /// The confirmation has already moved past the state the request
    /// requires (e.g. cancelling one that's already confirmed).
    ConfirmationTerminalState,
    /// The account lacks sufficient balance of the asset being sold.
    InsufficientBalance,
    /// The account lacks sufficient cash to fund a buy.
    InsufficientCash,
    /// The requested size is below the product's minimum.
    BelowMinimumSize,
    /// The requested size does not align to the product's increment.
    InvalidPrecision,
    /// The sell size exceeds available holdings.
    ExceedsHoldings,
    /// Funds are on hold and unavailable for trading.
    FundsOnHold,
    /// Computed trade quantity resolved to zero.
    QtyZero,
    /// The account holds none of the asset being sold.
    NotHeld,
    /// No product matches the resolved symbol.
    NoProduct,
    /// The product is not currently tradeable.
    NotTradable,
    /// The product only accepts limit orders.
    LimitOnly,
    /// The broker rejected the order outright.
    OrderRejected,
    /// The broker never reached a terminal status within the polling window.
    OrderTimeout,
    /// A non-business-logic failure from the broker API.
    BrokerApiError,
    /// The execution node exceeded its wall-clock budget.
    ExecutionTimeout,
    /// The execution node failed for a reason other than a timeout.
    ExecutionFailed,
    /// LIVE crypto execution blocked by the demo-safe-mode gate.
    DemoModeLiveBlocked,
    /// Broker credentials are missing or malformed.
    CredentialsMissing,
    /// LIVE trading is disabled by configuration.
    LiveTradingDisabled,
    /// The LIVE kill switch is engaged.
    LiveDisabled,
    /// The database schema is behind the migrations the binary expects.
    DbSchemaOutdated,
    /// A rate limit (internal or broker) was exceeded.
    RateLimited,
    /// The request body exceeded the configured size limit.
    RequestTooLarge,
    /// Generic request validation failure.
    ValidationError,
    /// Unexpected internal failure.
    InternalError,
}

impl ErrorCode {
    /// The HTTP status this code is rendered with.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::ProductNotFound | Self::NoProduct | Self::RunNotFound | Self::OrderNotFound | Self::ConfirmationNotFound => {
                StatusCode::NOT_FOUND
            }
            Self::ConfirmationTerminalState => StatusCode::CONFLICT,
            Self::InsufficientBalance
            | Self::InsufficientCash
            | Self::BelowMinimumSize
            | Self::InvalidPrecision
            | Self::ExceedsHoldings
            | Self::FundsOnHold
            | Self::QtyZero
            | Self::NotHeld
            | Self::NotTradable
            | Self::LimitOnly
            | Self::ValidationError => StatusCode::BAD_REQUEST,
            Self::LiveDisabled | Self::LiveTradingDisabled | Self::DemoModeLiveBlocked => {
                StatusCode::FORBIDDEN
            }
            Self::RateLimited | Self::ProductApiRateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::ProductApiTimeout | Self::OrderTimeout | Self::ExecutionTimeout => {
                StatusCode::GATEWAY_TIMEOUT
            }
            Self::RequestTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::DbSchemaOutdated => StatusCode::SERVICE_UNAVAILABLE,
            Self::ProductDetailsUnavailable
            | Self::OrderRejected
            | Self::BrokerApiError
            | Self::ExecutionFailed
            | Self::CredentialsMissing
            | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The canonical `SCREAMING_SNAKE_CASE` wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProductDetailsUnavailable => "PRODUCT_DETAILS_UNAVAILABLE",
            Self::ProductApiTimeout => "PRODUCT_API_TIMEOUT",
            Self::ProductApiRateLimited => "PRODUCT_API_RATE_LIMITED",
            Self::ProductNotFound => "PRODUCT_NOT_FOUND",
            Self::RunNotFound => "RUN_NOT_FOUND",
            Self::OrderNotFound => "ORDER_NOT_FOUND",
            Self::ConfirmationNotFound => "CONFIRMATION_NOT_FOUND",
            Self::ConfirmationTerminalState => "CONFIRMATION_TERMINAL_STATE",
            Self::InsufficientBalance => "INSUFFICIENT_BALANCE",
            Self::InsufficientCash => "INSUFFICIENT_CASH",
            Self::BelowMinimumSize => "BELOW_MINIMUM_SIZE",
            Self::InvalidPrecision => "INVALID_PRECISION",
            Self::ExceedsHoldings => "EXCEEDS_HOLDINGS",
            Self::FundsOnHold => "FUNDS_ON_HOLD",
            Self::QtyZero => "QTY_ZERO",
            Self::NotHeld => "NOT_HELD",
            Self::NoProduct => "NO_PRODUCT",
            Self::NotTradable => "NOT_TRADABLE",
            Self::LimitOnly => "LIMIT_ONLY",
            Self::OrderRejected => "ORDER_REJECTED",
            Self::OrderTimeout => "ORDER_TIMEOUT",
            Self::BrokerApiError => "BROKER_API_ERROR",
            Self::ExecutionTimeout => "EXECUTION_TIMEOUT",
            Self::ExecutionFailed => "EXECUTION_FAILED",
            Self::DemoModeLiveBlocked => "DEMO_MODE_LIVE_BLOCKED",
            Self::CredentialsMissing => "CREDENTIALS_MISSING",
            Self::LiveTradingDisabled => "LIVE_TRADING_DISABLED",
            Self::LiveDisabled => "LIVE_DISABLED",
            Self::DbSchemaOutdated => "DB_SCHEMA_OUTDATED",
            Self::RateLimited => "RATE_LIMITED",
            Self::RequestTooLarge => "REQUEST_TOO_LARGE",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// A default remediation string shown to the user, if the call site
    /// doesn't supply a more specific one.
    #[must_use]
    pub const fn default_remediation(self) -> Option<&'static str> {
        match self {
            Self::LiveDisabled => {
                Some("Set TRADING_DISABLE_LIVE=false and restart to enable live trading.")
            }
            Self::DbSchemaOutdated => Some("Restart the backend after applying pending migrations."),
            Self::RateLimited | Self::ProductApiRateLimited => {
                Some("Wait a moment and retry the request.")
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user-visible, request-correlated error.
#[derive(Debug, Clone, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct TradeEngineError {
    code: ErrorCode,
    message: String,
    remediation: Option<String>,
    request_id: Option<String>,
}

impl TradeEngineError {
    /// Construct an error with the code's canonical message.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            remediation: code.default_remediation().map(ToString::to_string),
            request_id: None,
        }
    }

    /// Attach an explicit remediation string, overriding the code's default.
    #[must_use]
    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }

    /// Stamp the request ID this error is being returned for.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// The stable error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// Render the exact `{status, error, content, request_id}` envelope.
    #[must_use]
    pub fn to_envelope(&self) -> ErrorEnvelope {
        let request_id = self.request_id.clone().unwrap_or_default();
        ErrorEnvelope {
            status: "ERROR",
            error: ErrorBody {
                code: self.code.as_str(),
                error_code: self.code.as_str(),
                message: self.message.clone(),
                request_id: request_id.clone(),
                remediation: self.remediation.clone(),
            },
            content: self.message.clone(),
            request_id,
        }
    }
}

impl IntoResponse for TradeEngineError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self.to_envelope())).into_response()
    }
}

/// The error envelope every failed API response body carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Always `"ERROR"`.
    pub status: &'static str,
    /// Structured error detail.
    pub error: ErrorBody,
    /// Human-readable message, duplicated from `error.message` for clients
    /// that only read `content`.
    pub content: String,
    /// Request correlation ID, duplicated from `error.request_id`.
    pub request_id: String,
}

/// The `error` object within [`ErrorEnvelope`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Legacy alias for `error_code`, kept for clients reading either field.
    pub code: &'static str,
    /// Stable error code.
    pub error_code: &'static str,
    /// Human-readable message. Internal token names are never interpolated
    /// here; callers must pass user-safe text.
    pub message: String,
    /// Request correlation ID.
    pub request_id: String,
    /// Remediation hint, when one applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}
