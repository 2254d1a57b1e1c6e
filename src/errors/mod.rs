//! Centralized error handling module
//!
//! Typed errors for everything outside the dispatcher's own state machine:
//! configuration, event files, the bus connection and the service loop.

pub mod context;
pub mod types;

pub use context::ErrorContextExt;
pub use types::{AppError, AppResult};
