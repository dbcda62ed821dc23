//! Synchronization Settings
//!
//! Configuration types for the price synchronization service, loaded from
//! environment variables.

use std::time::Duration;

use crate::domain::price::ProductId;

/// Default pricing backend base URL.
const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// Default margin percentage for manual recomputes.
const DEFAULT_MARGIN_PERCENT: f64 = 3.0;

/// Default HTTP request timeout.
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default price update broadcast capacity.
const DEFAULT_UPDATES_CAPACITY: usize = 1024;

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Pricing backend base URL (http or https).
    pub api_url: String,
    /// Margin percentage sent with recompute requests.
    pub margin_percent: f64,
    /// Timeout applied to every backend HTTP request.
    pub http_timeout: Duration,
    /// Capacity of the price update broadcast channel.
    pub updates_capacity: usize,
    /// Products to synchronize at startup.
    pub products: Vec<ProductId>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            margin_percent: DEFAULT_MARGIN_PERCENT,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            updates_capacity: DEFAULT_UPDATES_CAPACITY,
            products: Vec::new(),
        }
    }
}

impl SyncConfig {
    /// Create configuration from environment variables.
    ///
    /// - `PRICE_API_URL`: backend base URL (default: `http://127.0.0.1:8000`)
    /// - `PRICE_MARGIN_PERCENT`: recompute margin (default: 3.0)
    /// - `PRICE_HTTP_TIMEOUT_SECS`: request timeout (default: 10)
    /// - `PRICE_UPDATES_CAPACITY`: broadcast capacity (default: 1024)
    /// - `PRICE_SYNC_PRODUCTS`: comma-separated startup product ids
    ///
    /// # Errors
    ///
    /// Returns an error if `PRICE_API_URL` does not carry an http or https
    /// scheme.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = std::env::var("PRICE_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        validate_api_url(&api_url)?;

        let margin_percent = parse_env_f64("PRICE_MARGIN_PERCENT", DEFAULT_MARGIN_PERCENT);
        let http_timeout = parse_env_duration_secs("PRICE_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT);
        let updates_capacity = parse_env_usize("PRICE_UPDATES_CAPACITY", DEFAULT_UPDATES_CAPACITY);

        let products = std::env::var("PRICE_SYNC_PRODUCTS")
            .map(|v| parse_product_list(&v))
            .unwrap_or_default();

        Ok(Self {
            api_url,
            margin_percent,
            http_timeout,
            updates_capacity,
            products,
        })
    }

    /// Get the WebSocket base URL derived from the API URL.
    ///
    /// `http` maps to `ws`, `https` to `wss`.
    #[must_use]
    pub fn ws_base_url(&self) -> String {
        if let Some(rest) = self.api_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.api_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.api_url.clone()
        }
    }
}

fn validate_api_url(url: &str) -> Result<(), ConfigError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            key: "PRICE_API_URL".to_string(),
            value: url.to_string(),
        })
    }
}

fn parse_product_list(raw: &str) -> Vec<ProductId> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ProductId::from)
        .collect()
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable carries an unusable value.
    #[error("environment variable {key} has invalid value: {value}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Offending value.
        value: String,
    },
}

fn parse_env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert!((config.margin_percent - 3.0).abs() < f64::EPSILON);
        assert_eq!(config.http_timeout, Duration::from_secs(10));
        assert_eq!(config.updates_capacity, 1024);
        assert!(config.products.is_empty());
    }

    #[test]
    fn ws_base_url_http() {
        let config = SyncConfig {
            api_url: "http://127.0.0.1:8000".to_string(),
            ..SyncConfig::default()
        };
        assert_eq!(config.ws_base_url(), "ws://127.0.0.1:8000");
    }

    #[test]
    fn ws_base_url_https() {
        let config = SyncConfig {
            api_url: "https://pricing.example.com".to_string(),
            ..SyncConfig::default()
        };
        assert_eq!(config.ws_base_url(), "wss://pricing.example.com");
    }

    #[test]
    fn api_url_scheme_validation() {
        assert!(validate_api_url("http://localhost:8000").is_ok());
        assert!(validate_api_url("https://pricing.example.com").is_ok());
        assert!(validate_api_url("ftp://nope").is_err());
        assert!(validate_api_url("localhost:8000").is_err());
    }

    #[test]
    fn product_list_parsing() {
        let products = parse_product_list("sku-1, sku-2,,sku-3 ");
        assert_eq!(
            products,
            vec![
                ProductId::from("sku-1"),
                ProductId::from("sku-2"),
                ProductId::from("sku-3"),
            ]
        );
        assert!(parse_product_list("").is_empty());
    }
}
