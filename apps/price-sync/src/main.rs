//! Price Sync Binary
//!
//! Starts the live price synchronization service.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin price-sync
//! ```
//!
//! # Environment Variables
//!
//! - `PRICE_API_URL`: Pricing backend base URL (default: <http://127.0.0.1:8000>)
//! - `PRICE_MARGIN_PERCENT`: Recompute margin (default: 3.0)
//! - `PRICE_HTTP_TIMEOUT_SECS`: Backend request timeout (default: 10)
//! - `PRICE_UPDATES_CAPACITY`: Update broadcast capacity (default: 1024)
//! - `PRICE_SYNC_PRODUCTS`: Comma-separated product ids to track at startup
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4318>)
//! - `OTEL_SERVICE_NAME`: Service name (default: valora-price-sync)
//! - `RUST_LOG`: Log level (default: info)

use std::collections::HashSet;
use std::sync::Arc;

use price_sync::infrastructure::telemetry;
use price_sync::{
    BackendClient, LivePriceService, PriceStore, ProductId, SyncConfig, WsStreamConnector,
    init_metrics,
};
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    load_dotenv();

    // Initialize telemetry (OpenTelemetry + tracing)
    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting Price Sync");

    // Initialize Prometheus metrics
    let _metrics_handle = init_metrics();

    let config = SyncConfig::from_env()?;
    log_config(&config);

    let store = Arc::new(PriceStore::new(config.updates_capacity));
    let api = Arc::new(BackendClient::new(
        config.api_url.clone(),
        config.http_timeout,
        config.margin_percent,
    )?);
    let connector = Arc::new(WsStreamConnector::new(config.ws_base_url()));

    let service = Arc::new(LivePriceService::new(
        api,
        connector,
        Arc::clone(&store),
        config.margin_percent,
    ));

    let products: HashSet<ProductId> = config.products.iter().cloned().collect();
    if products.is_empty() {
        tracing::warn!("no startup products configured, waiting for interest changes");
    }
    let changes = service.set_interest(&products);
    tracing::info!(opened = changes.open.len(), "initial interest declared");

    // Log every applied update from the store's broadcast channel
    let mut updates = store.subscribe_updates();
    tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(update) => {
                    tracing::info!(
                        product_id = %update.product_id,
                        display_paise = update.display_paise,
                        "price updated"
                    );
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "price update logger lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
            }
        }
    });

    tracing::info!("Price sync ready");

    await_shutdown().await;

    service.shutdown();
    tracing::info!("Price sync stopped");
    Ok(())
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
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

/// Log the parsed configuration.
fn log_config(config: &SyncConfig) {
    tracing::info!(
        api_url = %config.api_url,
        margin_percent = config.margin_percent,
        http_timeout_secs = config.http_timeout.as_secs(),
        updates_capacity = config.updates_capacity,
        products = config.products.len(),
        "Configuration loaded"
    );
    tracing::debug!(ws_base_url = %config.ws_base_url(), "WebSocket endpoint");
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
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
}
