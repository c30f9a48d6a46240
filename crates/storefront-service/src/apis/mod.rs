//! Admin API implementations. Handlers here take the engine directly and
//! return typed results; `server` adapts them to axum.

pub mod order;
pub mod status;
