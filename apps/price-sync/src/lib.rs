#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Price Sync - Live Price Synchronization Service
//!
//! Keeps an in-memory mirror of backend product prices current by seeding
//! each product from a REST snapshot and then streaming per-product updates
//! over WebSocket, multiplexing a changing interest set across both.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Core pricing state with no external integrations
//!   - `price`: Product ids, snapshots, the concurrent price store
//!   - `interest`: Set-diffing of requested vs active products
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Interfaces for the pricing backend and stream transport
//!   - `services`: Subscription multiplexing and manual recompute
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `backend`: REST client for snapshots and recomputes
//!   - `stream`: Per-product WebSocket connector and frame codec
//!   - `config`: Environment-driven configuration
//!   - `metrics`: Prometheus instrumentation
//!   - `telemetry`: OpenTelemetry tracing integration
//!
//! # Data Flow
//!
//! ```text
//! REST snapshot ──┐
//!                 │     ┌─────────────┐     ┌─────────────┐
//!                 ├────►│ Price Store │────►│  Broadcast  │──► Consumer 1
//! Product WS ─────┤     │ (last write │     │   Updates   │──► Consumer N
//!  (per product)  │     │    wins)    │     └─────────────┘
//! Recompute ──────┘     └─────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core pricing types with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::interest::InterestChanges;
pub use domain::price::{
    PriceSnapshot, PriceStore, PriceStoreEntry, PriceUpdate, ProductId, RecomputeGuard,
};

// Application ports and services
pub use application::ports::{PriceApi, StreamConnector, SubscriptionHandle, TransportError};
pub use application::services::{FrameSink, LivePriceService, PhaseCell, SyncPhase};

// Infrastructure adapters
pub use infrastructure::backend::BackendClient;
pub use infrastructure::config::{ConfigError, SyncConfig};
pub use infrastructure::stream::WsStreamConnector;

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
