//! Core order engine for the storefront.
//!
//! Wires the configured storage backend to the order state machine, which
//! is the only component allowed to change an order's status.

pub mod builder;
pub mod engine;
pub mod state;

pub use builder::{BuilderError, ShopBuilder, ShopFactories};
pub use engine::ShopEngine;
pub use state::{OrderStateError, OrderStateMachine};
