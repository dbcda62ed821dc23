//! Pricing Backend REST Client
//!
//! HTTP adapter for the pricing backend: seeds the store on interest
//! (`GET /api/price/{product_id}`) and drives manual recomputes
//! (`POST /api/price`). Requests carry a timeout and are never retried;
//! a failed priming fetch leaves the entry to be seeded by the stream.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::application::ports::{PriceApi, TransportError};
use crate::domain::price::{PriceSnapshot, ProductId};

// =============================================================================
// Wire Types
// =============================================================================

/// Price response envelope from the backend.
///
/// Field casing follows the backend contract verbatim.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceOutput {
    /// Resolved display price in rupees.
    #[serde(rename = "DISPLAY_PRICE")]
    pub display_price: f64,
    /// Per-source prices the backend aggregated.
    #[serde(rename = "FETCHED_PRICE", default)]
    pub fetched_price: Vec<FetchedItem>,
    /// Catalog of active products with their latest display prices.
    #[serde(rename = "PRODUCTS_LIST", default)]
    pub products_list: Vec<ProductInfo>,
}

/// One source price inside [`PriceOutput::fetched_price`].
#[derive(Debug, Clone, Deserialize)]
pub struct FetchedItem {
    /// Source adapter name.
    #[serde(default)]
    pub adapter: Option<String>,
    /// Price in paise.
    #[serde(default)]
    pub paise: Option<i64>,
    /// Price in rupees.
    #[serde(default)]
    pub rupees: Option<f64>,
    /// Source confidence score.
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Catalog entry inside [`PriceOutput::products_list`].
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInfo {
    /// Product identifier.
    pub product_id: ProductId,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Brand name.
    #[serde(default)]
    pub brand: Option<String>,
    /// Product category.
    #[serde(default)]
    pub category: Option<String>,
    /// Latest display price in paise.
    #[serde(default)]
    pub display_paise: Option<i64>,
    /// Whether the product is active in the catalog.
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Body for `POST /api/price`.
#[derive(Debug, Clone, Serialize)]
struct ComputeRequest<'a> {
    product_id: &'a str,
    margin_percent: f64,
}

/// Convert a rupee amount to paise, rounding to the nearest paisa.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn rupees_to_paise(rupees: f64) -> i64 {
    (rupees * 100.0).round() as i64
}

// =============================================================================
// Backend Client
// =============================================================================

/// REST client for the pricing backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    margin_percent: f64,
}

impl BackendClient {
    /// Create a client against `base_url` (no trailing slash) with the
    /// given request timeout and default fetch margin.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        margin_percent: f64,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            margin_percent,
        })
    }

    async fn decode_snapshot(
        product_id: &ProductId,
        response: reqwest::Response,
    ) -> Result<PriceSnapshot, TransportError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let output: PriceOutput = response
            .json()
            .await
            .map_err(|e| TransportError::Malformed(e.to_string()))?;

        Ok(PriceSnapshot::new(
            product_id.clone(),
            rupees_to_paise(output.display_price),
        ))
    }
}

#[async_trait::async_trait]
impl PriceApi for BackendClient {
    async fn fetch_snapshot(
        &self,
        product_id: &ProductId,
    ) -> Result<PriceSnapshot, TransportError> {
        let url = format!(
            "{}/api/price/{}?margin_percent={}",
            self.base_url,
            product_id.as_str(),
            self.margin_percent
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Self::decode_snapshot(product_id, response).await
    }

    async fn recompute(
        &self,
        product_id: &ProductId,
        margin_percent: f64,
    ) -> Result<PriceSnapshot, TransportError> {
        let url = format!("{}/api/price", self.base_url);
        let body = ComputeRequest {
            product_id: product_id.as_str(),
            margin_percent,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Self::decode_snapshot(product_id, response).await
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(499.0, 49900 ; "whole rupees")]
    #[test_case(499.005, 49901 ; "rounds up at half")]
    #[test_case(499.004, 49900 ; "rounds down below half")]
    #[test_case(0.0, 0 ; "zero")]
    fn rupee_conversion(rupees: f64, paise: i64) {
        assert_eq!(rupees_to_paise(rupees), paise);
    }

    #[test]
    fn price_output_deserializes_full_envelope() {
        let json = r#"{
            "DISPLAY_PRICE": 499.0,
            "FETCHED_PRICE": [
                {"adapter": "flipkart", "paise": 48500, "rupees": 485.0, "confidence": 0.9},
                {"adapter": null, "paise": null, "rupees": null, "confidence": null}
            ],
            "PRODUCTS_LIST": [
                {"product_id": "sku-1", "name": "Widget", "display_paise": 49900, "is_active": true}
            ]
        }"#;

        let output: PriceOutput = serde_json::from_str(json).unwrap();
        assert!((output.display_price - 499.0).abs() < f64::EPSILON);
        assert_eq!(output.fetched_price.len(), 2);
        assert_eq!(output.fetched_price[0].adapter.as_deref(), Some("flipkart"));
        assert_eq!(output.fetched_price[0].paise, Some(48500));
        assert!(output.fetched_price[1].paise.is_none());
        assert_eq!(output.products_list[0].product_id, ProductId::from("sku-1"));
        assert_eq!(output.products_list[0].display_paise, Some(49900));
    }

    #[test]
    fn price_output_tolerates_missing_lists() {
        let output: PriceOutput = serde_json::from_str(r#"{"DISPLAY_PRICE": 12.5}"#).unwrap();
        assert!(output.fetched_price.is_empty());
        assert!(output.products_list.is_empty());
        assert_eq!(rupees_to_paise(output.display_price), 1250);
    }

    #[test]
    fn compute_request_serializes_contract_fields() {
        let body = ComputeRequest {
            product_id: "sku-7",
            margin_percent: 3.0,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["product_id"], "sku-7");
        assert!((json["margin_percent"].as_f64().unwrap() - 3.0).abs() < f64::EPSILON);
    }
}
