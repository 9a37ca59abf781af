// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Trade Truth Engine - Rust Core Library
//!
//! Deterministic trade planning and execution engine for the Trade Truth
//! platform.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Core business logic (aggregates, value objects, domain events)
//!   - `order_execution`: Order aggregate, status lifecycle, fills
//!   - `product_catalog`: Background-refreshed listing of tradable products
//!   - `asset_resolution`: Deterministic classification of a holding's tradability
//!   - `market_metadata`: Four-tier precedence resolver for per-product trading rules
//!   - `trade_context`: The immutable snapshot the preflight engine evaluates
//!   - `preflight`: Pure pre-trade validation and the funds recycler
//!   - `confirmation`: Staged trade proposals awaiting user approval
//!   - `run`: Durable DAG execution records, events, and artifacts
//!
//! - **Application**: Use cases and orchestration
//!   - `ports`: Interfaces for external systems (`BrokerPort`, `EventPublisherPort`)
//!   - `use_cases`: `SubmitOrder`, `PollOrderStatus`, `ConfirmTrade`,
//!     `CancelConfirmation`, `GetRun`, `GetOrderFillStatus`
//!   - `dto`: Data transfer objects for API boundaries
//!
//! - **Infrastructure**: Adapters (implementations)
//!   - `broker`: Coinbase Advanced Trade adapter
//!   - `persistence`: In-memory repository adapters
//!   - `http`: Axum REST API
//!
//! - **Config**: Environment-driven configuration and startup validation
//! - **Observability**: Prometheus metrics and structured logging

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Broker integration and resilience patterns (retry/backoff policy),
/// consumed by the market metadata resolver's live tier.
mod broker;

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

/// Environment-driven configuration, YAML overlay loading, and startup
/// validation.
pub mod config;

/// Prometheus metrics and structured logging setup.
pub mod observability;

/// Stable error codes and the HTTP error envelope.
pub mod error;

// =============================================================================
// Re-exports from Clean Architecture
// =============================================================================

// Domain re-exports
pub use domain::order_execution::{
    Order,
    value_objects::{OrderSide, OrderStatus},
};
pub use domain::shared::{BrokerId, Money, OrderId, ProductId, Quantity, RunId, Symbol, Timestamp};

// Application re-exports
pub use application::dto::{FillDto, FillStatusResponseDto, OrderDto, OrderSizeDto};
pub use application::ports::{
    BrokerError, BrokerPort, EventPublisherPort, NoOpEventPublisher, PlaceOrderRequest,
    PlaceOrderResponse, PlaceOrderSize,
};
pub use application::use_cases::{
    CancelConfirmationUseCase, ConfirmTradeUseCase, GetOrderFillStatusUseCase, GetRunUseCase,
    PollOrderStatusUseCase, SubmitOrderUseCase,
};

// Infrastructure re-exports
pub use infrastructure::broker::coinbase::{CoinbaseBrokerAdapter, CoinbaseError};
pub use infrastructure::http::{AppState, create_router};
pub use infrastructure::persistence::{
    InMemoryConfirmationRepository, InMemoryOrderRepository, InMemoryProductCatalogRepository,
    InMemoryRunRepository,
};

// Config and error re-exports
pub use config::Config;
pub use error::{ErrorBody, ErrorCode, ErrorEnvelope, TradeEngineError};
