//! Domain layer.
//!
//! Core price synchronization types with no dependencies on transports.

/// Product identifiers, price snapshots, and the per-product price store.
pub mod price;

/// Declared-interest diffing for the subscription multiplexer.
pub mod interest;
