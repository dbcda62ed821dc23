//! WebSocket Stream Connector
//!
//! Opens one WebSocket connection per product against the backend's
//! `/ws/prices/{product_id}` endpoint and pumps decoded frames into the
//! service's [`FrameSink`].
//!
//! A subscription lives until its handle is closed or the server drops
//! the connection. There is no reconnection: interest changes drive the
//! lifecycle, and a dropped stream simply stops producing updates while
//! the entry keeps its last known value.

pub mod codec;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{StreamConnector, SubscriptionHandle};
use crate::application::services::FrameSink;
use crate::domain::price::ProductId;
use crate::infrastructure::metrics::record_frame_received;

/// Connector opening one WebSocket per product.
#[derive(Debug, Clone)]
pub struct WsStreamConnector {
    ws_base: String,
}

impl WsStreamConnector {
    /// Create a connector against a `ws://` or `wss://` base URL
    /// (no trailing slash).
    #[must_use]
    pub fn new(ws_base: impl Into<String>) -> Self {
        Self {
            ws_base: ws_base.into(),
        }
    }

    fn product_url(&self, product_id: &ProductId) -> String {
        format!("{}/ws/prices/{}", self.ws_base, product_id.as_str())
    }
}

impl StreamConnector for WsStreamConnector {
    fn open(&self, product_id: &ProductId, sink: FrameSink) -> SubscriptionHandle {
        let cancel = CancellationToken::new();
        let handle = SubscriptionHandle::new(product_id.clone(), cancel.clone());

        let url = self.product_url(product_id);
        let product_id = product_id.clone();
        tokio::spawn(async move {
            run_subscription(url, product_id, sink, cancel).await;
        });

        handle
    }
}

/// Connect and pump frames until cancelled or the connection ends.
async fn run_subscription(
    url: String,
    product_id: ProductId,
    sink: FrameSink,
    cancel: CancellationToken,
) {
    tracing::info!(product_id = %product_id, url = %url, "opening price stream");

    let ws_stream = tokio::select! {
        () = cancel.cancelled() => {
            tracing::debug!(product_id = %product_id, "subscription cancelled before connect");
            return;
        }
        connected = tokio_tungstenite::connect_async(&url) => {
            match connected {
                Ok((stream, _response)) => stream,
                Err(e) => {
                    tracing::warn!(product_id = %product_id, error = %e, "price stream connect failed");
                    return;
                }
            }
        }
    };

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!(product_id = %product_id, "price stream closed by interest withdrawal");
                let _ = write.send(Message::Close(None)).await;
                return;
            }
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        record_frame_received();
                        if let Some(frame) = codec::decode_frame(&text, &product_id) {
                            sink.deliver(frame.into_snapshot());
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if write.send(Message::Pong(data)).await.is_err() {
                            tracing::warn!(product_id = %product_id, "price stream pong failed");
                            return;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!(product_id = %product_id, "server closed price stream");
                        return;
                    }
                    Some(Ok(_)) => {
                        // Ignore other message types
                    }
                    Some(Err(e)) => {
                        tracing::warn!(product_id = %product_id, error = %e, "price stream error");
                        return;
                    }
                    None => {
                        tracing::info!(product_id = %product_id, "price stream ended");
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_url_formatting() {
        let connector = WsStreamConnector::new("ws://127.0.0.1:8000");
        assert_eq!(
            connector.product_url(&ProductId::from("sku-9")),
            "ws://127.0.0.1:8000/ws/prices/sku-9"
        );
    }
}
