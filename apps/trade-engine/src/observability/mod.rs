//! Observability module for metrics, tracing, and logging.
//!
//! This module provides instrumentation for the execution engine,
//! including Prometheus metrics export and distributed tracing.

mod metrics;
mod tracing_init;

pub use metrics::{
    init_metrics, record_broker_request, record_broker_retry, record_catalog_refresh,
    record_confirmation_transition, record_order_fill, record_order_rejection,
    record_order_submission, record_run_terminal, update_active_orders, MetricsConfig,
    MetricsError,
};
pub use tracing_init::init_tracing;
