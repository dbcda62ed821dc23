//! Application layer.
//!
//! Port definitions for the remote price service and the live price
//! service that multiplexes subscriptions across declared interest.

/// Port interfaces for the REST client and stream connector.
pub mod ports;

/// The live price service (subscription multiplexer + recompute trigger).
pub mod services;
