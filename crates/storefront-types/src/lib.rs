//! Common types module for the storefront order system.
//!
//! This module defines the order status workflow and the data types shared
//! by the storage, core and service crates.

/// API types for HTTP endpoints and request/response structures.
pub mod api;
/// Order record types.
pub mod order;
/// Registry trait for pluggable backend implementations.
pub mod registry;
/// Order status workflow: states, transition table, display metadata.
pub mod status;
/// Storage types for managing persistent data.
pub mod storage;
/// Configuration validation types for backend settings.
pub mod validation;

// Re-export all types for convenient access
pub use api::*;
pub use order::*;
pub use registry::*;
pub use status::*;
pub use storage::*;
pub use validation::*;
