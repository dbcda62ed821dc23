//! Prometheus Metrics Module
//!
//! Exposes synchronization metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Frames**: Stream frames received and discarded
//! - **Fetches**: Snapshot fetch and recompute outcomes
//! - **Subscriptions**: Active subscription count

use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if the recorder cannot be installed.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let builder = PrometheusBuilder::new();
            let handle = builder
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "price_sync_frames_received_total",
        "Total price update frames received from product streams"
    );
    describe_counter!(
        "price_sync_frames_discarded_total",
        "Total stream frames discarded as malformed or mismatched"
    );

    describe_counter!(
        "price_sync_snapshot_fetches_total",
        "Total priming snapshot fetches by result"
    );
    describe_counter!(
        "price_sync_recomputes_total",
        "Total manual recompute requests by result"
    );

    describe_gauge!(
        "price_sync_open_subscriptions",
        "Number of products with an open streaming subscription"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Metric label for backend call outcomes.
#[derive(Debug, Clone, Copy)]
pub enum ApiResult {
    /// Call succeeded.
    Ok,
    /// Call failed at transport or status level.
    Error,
}

impl ApiResult {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// Record a frame received from a product stream.
pub fn record_frame_received() {
    counter!("price_sync_frames_received_total").increment(1);
}

/// Record a frame discarded before reaching the store.
pub fn record_frame_discarded(reason: &'static str) {
    counter!(
        "price_sync_frames_discarded_total",
        "reason" => reason
    )
    .increment(1);
}

/// Record the outcome of a priming snapshot fetch.
pub fn record_fetch_result(result: ApiResult) {
    counter!(
        "price_sync_snapshot_fetches_total",
        "result" => result.as_str()
    )
    .increment(1);
}

/// Record the outcome of a manual recompute.
pub fn record_recompute_result(result: ApiResult) {
    counter!(
        "price_sync_recomputes_total",
        "result" => result.as_str()
    )
    .increment(1);
}

/// Update the open subscription count.
pub fn set_open_subscriptions(count: f64) {
    gauge!("price_sync_open_subscriptions").set(count);
}

// =============================================================================
// Tests
// =============================================================================
