//! Prometheus metrics for the trade execution engine.
//!
//! Covers order execution, the broker adapter, confirmation lifecycle, and
//! the product catalog refresh cadence.
//!
//! # Example
//!
//! ```ignore
//! use trade_engine::observability::{init_metrics, MetricsConfig};
//!
//! let config = MetricsConfig::default();
//! init_metrics(&config).expect("Failed to initialize metrics");
//!
//! record_order_submission("coinbase", "submitted", 0.015);
//! ```

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Configuration for the metrics exporter.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener.
    pub listen_addr: SocketAddr,
    /// Histogram buckets for latency measurements (in seconds).
    pub latency_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9090".parse().expect("valid default address"),
            // Latency buckets from 100us to 30s, wide enough to cover both
            // broker round-trips and the full fill-polling ceiling.
            latency_buckets: vec![
                0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0,
                10.0, 30.0,
            ],
        }
    }
}

impl MetricsConfig {
    /// Create a new metrics configuration with custom address.
    #[must_use]
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            listen_addr: addr,
            ..Default::default()
        }
    }
}

/// Initialize the Prometheus metrics exporter.
///
/// This starts an HTTP server that exposes metrics at `/metrics`.
///
/// # Errors
///
/// Returns an error if the metrics exporter fails to start (e.g., port already in use).
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .set_buckets(&config.latency_buckets)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(
        addr = %config.listen_addr,
        "Prometheus metrics exporter started"
    );

    Ok(())
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

// ============================================================================
// Order Execution Metrics
// ============================================================================

/// Record an order submission.
///
/// * `provider` - Broker provider (e.g., "coinbase")
/// * `status` - Submission status (e.g., "submitted", "rejected", "error")
/// * `latency_seconds` - Time from submit to broker acknowledgment
pub fn record_order_submission(provider: &str, status: &str, latency_seconds: f64) {
    counter!(
        "order_submissions_total",
        "provider" => provider.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        "order_submit_latency_seconds",
        "provider" => provider.to_string()
    )
    .record(latency_seconds);
}

/// Record an order reaching a terminal fill.
///
/// * `provider` - Broker provider
/// * `latency_seconds` - Time from submit to fill confirmation
pub fn record_order_fill(provider: &str, latency_seconds: f64) {
    histogram!(
        "order_fill_latency_seconds",
        "provider" => provider.to_string()
    )
    .record(latency_seconds);
}

/// Record an order rejection.
///
/// * `provider` - Broker provider
/// * `reason` - Rejection reason (e.g., `"INSUFFICIENT_CASH"`, `"BELOW_MINIMUM_SIZE"`)
pub fn record_order_rejection(provider: &str, reason: &str) {
    counter!(
        "order_rejections_total",
        "provider" => provider.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Update the active (non-terminal) orders gauge.
pub fn update_active_orders(count: i64) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("active_orders").set(count as f64);
}

// ============================================================================
// Broker Adapter Metrics
// ============================================================================

/// Record a broker API request.
///
/// * `endpoint` - Logical endpoint name (e.g., `"place_order"`, `"get_fills"`)
/// * `status` - Outcome (e.g., `"ok"`, `"rate_limited"`, `"error"`)
/// * `duration_seconds` - Request duration, including retries
pub fn record_broker_request(endpoint: &str, status: &str, duration_seconds: f64) {
    counter!(
        "broker_requests_total",
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        "broker_request_duration_seconds",
        "endpoint" => endpoint.to_string()
    )
    .record(duration_seconds);
}

/// Record a broker retry attempt (429/502/503/504 backoff).
pub fn record_broker_retry(endpoint: &str) {
    counter!(
        "broker_retries_total",
        "endpoint" => endpoint.to_string()
    )
    .increment(1);
}

// ============================================================================
// Confirmation and Run Metrics
// ============================================================================

/// Record a confirmation lifecycle transition.
///
/// * `transition` - e.g., `"staged"`, `"confirmed"`, `"cancelled"`, `"expired"`
pub fn record_confirmation_transition(transition: &str) {
    counter!(
        "confirmation_transitions_total",
        "transition" => transition.to_string()
    )
    .increment(1);
}

/// Record a run reaching a terminal status.
///
/// * `status` - e.g., `"completed"`, `"failed"`, `"rejected"`
pub fn record_run_terminal(status: &str) {
    counter!(
        "run_terminal_total",
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// Product Catalog Metrics
// ============================================================================

/// Record a product catalog refresh cycle.
///
/// * `status` - e.g., `"ok"`, `"error"`
/// * `product_count` - Rows stored after the refresh
pub fn record_catalog_refresh(status: &str, product_count: usize) {
    counter!(
        "catalog_refresh_total",
        "status" => status.to_string()
    )
    .increment(1);

    #[allow(clippy::cast_precision_loss)]
    gauge!("catalog_product_count").set(product_count as f64);
}

// ============================================================================
// Tests
// ============================================================================
