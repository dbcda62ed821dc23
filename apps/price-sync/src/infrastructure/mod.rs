//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Pricing backend REST client.
pub mod backend;

/// Configuration loading.
pub mod config;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Per-product WebSocket stream connector.
pub mod stream;

/// OpenTelemetry tracing integration.
pub mod telemetry;
