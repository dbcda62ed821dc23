//! Price Frame Codec
//!
//! Decodes JSON price update frames from per-product WebSocket streams.
//!
//! A frame that cannot be used is discarded silently: the stream carries
//! best-effort updates and a bad frame never tears down the subscription.

use serde::Deserialize;

use crate::domain::price::{PriceSnapshot, ProductId};
use crate::infrastructure::metrics::record_frame_discarded;

/// One price update frame as sent by the backend stream.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceUpdateFrame {
    /// Frame discriminator; only `price_update` frames are consumed.
    #[serde(rename = "type")]
    pub kind: String,
    /// Product the update applies to.
    pub product_id: ProductId,
    /// Display price in paise.
    pub display_paise: i64,
    /// Human-readable price string, informational only.
    #[serde(default)]
    pub display_price_readable: Option<String>,
    /// Lowest source price in paise.
    #[serde(default)]
    pub lowest_paise: Option<i64>,
    /// Margin applied by the backend.
    #[serde(default)]
    pub margin_percent: Option<f64>,
    /// Opaque provenance payload forwarded by the backend.
    #[serde(default)]
    pub blockchain: Option<serde_json::Value>,
}

impl PriceUpdateFrame {
    /// Convert into a store snapshot, stamping the observation time.
    #[must_use]
    pub fn into_snapshot(self) -> PriceSnapshot {
        PriceSnapshot::new(self.product_id, self.display_paise)
    }
}

/// Decode one text frame bound to a specific product's subscription.
///
/// Returns `None` for anything that is not a well-formed `price_update`
/// frame for `bound`: non-JSON text, another frame kind, a mismatched
/// product id, or a negative price.
#[must_use]
pub fn decode_frame(text: &str, bound: &ProductId) -> Option<PriceUpdateFrame> {
    let frame: PriceUpdateFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            record_frame_discarded("malformed");
            tracing::debug!(error = %e, "discarding undecodable frame");
            return None;
        }
    };

    if frame.kind != "price_update" {
        record_frame_discarded("wrong_kind");
        return None;
    }

    if frame.product_id != *bound {
        record_frame_discarded("product_mismatch");
        tracing::debug!(
            bound = %bound,
            received = %frame.product_id,
            "discarding frame for another product"
        );
        return None;
    }

    if frame.display_paise < 0 {
        record_frame_discarded("negative_price");
        return None;
    }

    Some(frame)
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn bound() -> ProductId {
        ProductId::from("sku-1")
    }

    #[test]
    fn decodes_full_frame() {
        let text = r#"{
            "type": "price_update",
            "product_id": "sku-1",
            "display_paise": 49900,
            "display_price_readable": "₹499.00",
            "lowest_paise": 48500,
            "margin_percent": 3.0,
            "blockchain": {"chain": [{"idx": 0}]}
        }"#;

        let frame = decode_frame(text, &bound()).unwrap();
        assert_eq!(frame.display_paise, 49900);
        assert_eq!(frame.lowest_paise, Some(48500));
        assert_eq!(frame.display_price_readable.as_deref(), Some("₹499.00"));
        assert!(frame.blockchain.is_some());

        let snapshot = frame.into_snapshot();
        assert_eq!(snapshot.product_id, bound());
        assert_eq!(snapshot.display_paise, 49900);
    }

    #[test]
    fn decodes_minimal_frame() {
        let text = r#"{"type": "price_update", "product_id": "sku-1", "display_paise": 100}"#;
        let frame = decode_frame(text, &bound()).unwrap();
        assert_eq!(frame.display_paise, 100);
        assert!(frame.lowest_paise.is_none());
        assert!(frame.margin_percent.is_none());
    }

    #[test_case("not json at all" ; "plain text")]
    #[test_case("{\"type\": \"price_update\"}" ; "missing fields")]
    #[test_case("{\"type\": \"heartbeat\", \"product_id\": \"sku-1\", \"display_paise\": 1}" ; "wrong kind")]
    #[test_case("{\"type\": \"price_update\", \"product_id\": \"sku-2\", \"display_paise\": 1}" ; "other product")]
    #[test_case("{\"type\": \"price_update\", \"product_id\": \"sku-1\", \"display_paise\": -5}" ; "negative price")]
    fn discards_unusable_frames(text: &str) {
        assert!(decode_frame(text, &bound()).is_none());
    }
}
