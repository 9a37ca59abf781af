//! Trade Engine Binary
//!
//! Starts the trade planning and execution engine behind a single REST +
//! SSE surface.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin trade-engine
//! ```
//!
//! # Environment Variables
//!
//! - `EXECUTION_MODE_DEFAULT`: `PAPER` | `LIVE` (default: `PAPER`)
//! - `ENABLE_LIVE_TRADING`, `TRADING_DISABLE_LIVE`, `FORCE_PAPER_MODE`: safety gates
//! - `COINBASE_API_KEY_NAME`, `COINBASE_API_PRIVATE_KEY` / `COINBASE_API_PRIVATE_KEY_PATH`
//! - `HTTP_PORT`: HTTP server port (default: 8080)
//! - `RUST_LOG`: log level (default: info)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;

use trade_engine::config::Config;
use trade_engine::domain::product_catalog::ProductCatalogRepository;
use trade_engine::domain::shared::ProductId;
use trade_engine::infrastructure::broker::coinbase::{CoinbaseBrokerAdapter, CoinbaseConfig};
use trade_engine::infrastructure::http::{create_router, AppState};
use trade_engine::infrastructure::persistence::{
    InMemoryConfirmationRepository, InMemoryOrderRepository, InMemoryPortfolioSnapshotRepository,
    InMemoryProductCatalogRepository, InMemoryRunRepository,
};
use trade_engine::observability::{init_metrics, init_tracing, MetricsConfig};

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// How often the product catalog is refreshed from Coinbase in the background.
const CATALOG_REFRESH_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
#[allow(clippy::too_many_lines)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if dotenvy::dotenv().is_err() {
        load_dotenv_from_ancestors();
    }

    let config = Arc::new(Config::from_env());

    init_tracing(&config.observability.logging.level, &config.observability.logging.format);

    tracing::info!("Starting trade engine");

    if let Ok(v) = std::env::var("METRICS_PORT")
        && let Ok(port) = v.parse::<u16>()
    {
        let metrics_config = MetricsConfig::with_addr(([0, 0, 0, 0], port).into());
        if let Err(e) = init_metrics(&metrics_config) {
            tracing::warn!("Failed to start metrics exporter: {e}");
        }
    }

    let validation = trade_engine::config::validate_startup_environment(&config)
        .map_err(|e| -> Box<dyn std::error::Error> {
            tracing::error!("Startup validation failed: {e}");
            Box::new(e)
        })?;
    for warning in &validation.warnings {
        tracing::warn!("{warning}");
    }

    tracing::info!(
        execution_mode_default = %config.trading.execution_mode_default,
        live_trading_allowed = config.trading.live_trading_allowed(),
        market_data_mode = %config.trading.market_data_mode,
        "Configuration loaded"
    );

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    if !config.coinbase.has_credentials() {
        tracing::error!(
            "COINBASE_API_KEY_NAME and a private key (COINBASE_API_PRIVATE_KEY or \
             COINBASE_API_PRIVATE_KEY_PATH) are required even in PAPER mode: product rules and \
             market prices are still read from the live broker, even though PAPER balances come \
             from the last portfolio snapshot"
        );
        std::process::exit(1);
    }

    let private_key_pem = config.coinbase.load_private_key_pem().map_err(|e| -> Box<dyn std::error::Error> {
        tracing::error!("Failed to load Coinbase private key: {e}");
        Box::new(e)
    })?;
    let coinbase_config = CoinbaseConfig::new(config.coinbase.api_key_name.clone(), private_key_pem);
    let broker = CoinbaseBrokerAdapter::new(coinbase_config).map_err(|e| -> Box<dyn std::error::Error> {
        tracing::error!("Failed to create Coinbase adapter: {e}");
        Box::new(e)
    })?;

    let orders = Arc::new(InMemoryOrderRepository::new());
    let confirmations = Arc::new(InMemoryConfirmationRepository::new());
    let runs = Arc::new(InMemoryRunRepository::new());
    let catalog = Arc::new(InMemoryProductCatalogRepository::new());
    let snapshots: Arc<dyn trade_engine::domain::portfolio_snapshot::PortfolioSnapshotRepository> =
        Arc::new(InMemoryPortfolioSnapshotRepository::new());

    let state = AppState::new(
        broker.clone(),
        Arc::clone(&orders),
        Arc::clone(&confirmations),
        Arc::clone(&runs),
        Arc::clone(&catalog),
        snapshots,
        Arc::clone(&config),
        env!("CARGO_PKG_VERSION"),
    );
    let app = create_router(state);

    let catalog_refresh_handle = tokio::spawn(refresh_catalog_loop(broker, Arc::clone(&catalog)));

    let http_port = config.server.http_port;
    let bind_address = config.server.bind_address.clone();
    let http_addr: SocketAddr = format!("{bind_address}:{http_port}").parse()?;

    tracing::info!(%http_addr, "HTTP server starting");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health");
    tracing::info!("  GET  /api/v1/ops/capabilities");
    tracing::info!("  POST /api/v1/chat/command");
    tracing::info!("  POST /api/v1/confirmations/{{conf_id}}/confirm");
    tracing::info!("  POST /api/v1/confirmations/{{conf_id}}/cancel");
    tracing::info!("  GET  /api/v1/runs/{{run_id}}");
    tracing::info!("  GET  /api/v1/runs/{{run_id}}/events");
    tracing::info!("  GET  /api/v1/runs/{{run_id}}/trace");
    tracing::info!("  GET  /api/v1/orders/{{order_id}}/fill-status");

    let listener = TcpListener::bind(http_addr).await?;
    let http_server =
        axum::serve(listener, app).with_graceful_shutdown(shutdown_signal(shutdown_tx.clone()));

    tracing::info!("Trade engine ready");

    if let Err(e) = http_server.await {
        tracing::error!("HTTP server error: {e}");
    }

    catalog_refresh_handle.abort();

    tracing::info!("Trade engine stopped");
    Ok(())
}

/// Periodically fetch metadata for every tracked product and upsert it into
/// the catalog. The Advanced Trade API has no bulk product-listing endpoint
/// usable here, so the tracked set comes from `TRACKED_PRODUCTS` (default
/// `BTC-USD,ETH-USD`) rather than a full exchange sync.
async fn refresh_catalog_loop(
    broker: CoinbaseBrokerAdapter,
    catalog: Arc<InMemoryProductCatalogRepository>,
) {
    let tracked: Vec<String> = std::env::var("TRACKED_PRODUCTS")
        .unwrap_or_else(|_| "BTC-USD,ETH-USD".to_string())
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let mut interval = tokio::time::interval(CATALOG_REFRESH_INTERVAL);
    loop {
        interval.tick().await;
        let mut products = Vec::with_capacity(tracked.len());
        for product_id in &tracked {
            match broker.get_product_metadata(&ProductId::new(product_id.clone())).await {
                Ok(product) => products.push(product),
                Err(e) => {
                    tracing::warn!(product_id = %product_id, error = %e, "Failed to refresh product metadata");
                }
            }
        }
        if !products.is_empty() {
            let count = products.len();
            catalog.upsert_all(products).await;
            tracing::info!(count, "Product catalog refreshed");
        }
    }
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv_from_ancestors() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    let _ = shutdown_tx.send(());

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
