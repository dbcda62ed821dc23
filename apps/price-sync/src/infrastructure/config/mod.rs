//! Configuration Module
//!
//! Configuration loading for the price synchronization service.

mod settings;

pub use settings::{ConfigError, SyncConfig};
