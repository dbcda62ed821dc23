//! Port Interfaces
//!
//! Contracts between the live price service and the transports behind it,
//! following the hexagonal pattern: the service drives these ports, the
//! infrastructure adapters implement them.
//!
//! ## Driven Ports (Outbound)
//!
//! - [`PriceApi`]: point-in-time snapshot fetch and on-demand recompute
//! - [`StreamConnector`]: opens one streaming subscription per product

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::application::services::FrameSink;
use crate::domain::price::{PriceSnapshot, ProductId};

// =============================================================================
// Errors
// =============================================================================

/// Failure talking to the remote price service.
///
/// Recovered locally wherever it occurs; a transport failure never
/// propagates to consumers as anything other than an absent price.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Network-level failure (connect, timeout, body read).
    #[error("network error: {0}")]
    Network(String),

    /// The service answered with a non-success status.
    #[error("unexpected status {status}: {body}")]
    Status {
        /// HTTP status code returned.
        status: u16,
        /// Response body, for the log line.
        body: String,
    },

    /// The response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

// =============================================================================
// Price API Port
// =============================================================================

/// Request/response operations against the remote price service.
///
/// Pure transport: no retry, no state. Callers decide what a failure
/// means; this port only reports it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceApi: Send + Sync {
    /// Fetch the latest known price for a product.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on network failure or non-success status.
    async fn fetch_snapshot(&self, product_id: &ProductId)
    -> Result<PriceSnapshot, TransportError>;

    /// Ask the backend to recompute the price with the given margin.
    ///
    /// The backend may additionally push a matching stream frame to all
    /// subscribers; the returned snapshot is trusted as authoritative
    /// immediately either way.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on network failure or non-success status.
    async fn recompute(
        &self,
        product_id: &ProductId,
        margin_percent: f64,
    ) -> Result<PriceSnapshot, TransportError>;
}

// =============================================================================
// Stream Connector Port
// =============================================================================

/// Opens streaming subscriptions, one per product.
///
/// The connector owns the connection task; the returned handle is the only
/// way to tear it down. Dropped connections stop delivering frames and are
/// never reopened by the connector itself.
pub trait StreamConnector: Send + Sync {
    /// Open a subscription delivering frames for `product_id` into `sink`.
    fn open(&self, product_id: &ProductId, sink: FrameSink) -> SubscriptionHandle;
}

/// Owns one open streaming connection bound to exactly one product.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    product_id: ProductId,
    cancel: CancellationToken,
}

impl SubscriptionHandle {
    /// Create a handle wrapping the connection task's cancellation token.
    #[must_use]
    pub fn new(product_id: ProductId, cancel: CancellationToken) -> Self {
        Self { product_id, cancel }
    }

    /// The product this subscription is bound to.
    #[must_use]
    pub fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    /// Close the subscription, releasing the connection immediately.
    ///
    /// Idempotent: safe to call repeatedly or on an already-failed handle.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_close_is_idempotent() {
        let handle = SubscriptionHandle::new(ProductId::from("sku-1"), CancellationToken::new());
        assert!(!handle.is_closed());

        handle.close();
        handle.close();

        assert!(handle.is_closed());
        assert_eq!(handle.product_id().as_str(), "sku-1");
    }

    #[test]
    fn transport_error_messages() {
        let err = TransportError::Status {
            status: 503,
            body: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "unexpected status 503: unavailable");

        let err = TransportError::Network("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
    }
}
