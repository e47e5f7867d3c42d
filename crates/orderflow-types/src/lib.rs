//! Common types module for the orderflow system.
//!
//! This module defines the core data types and structures used throughout
//! the ordering backend. It provides a centralized location for shared types
//! to ensure consistency across all components.

/// API types for HTTP endpoints and request/response structures.
pub mod api;
/// Inbound bot events and callback actions.
pub mod events;
/// Coin ledger types for the loyalty program.
pub mod ledger;
/// Order, line item and status types.
pub mod order;
/// One-time password challenge types.
pub mod otp;
/// Secret value wrapper for credentials.
pub mod secret_string;
/// Storage collection keys for persistent data.
pub mod storage;
/// User identity types (messenger links and registered profiles).
pub mod user;
/// Small shared helpers.
pub mod util;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

// Re-export all types for convenient access
pub use api::*;
pub use events::*;
pub use ledger::*;
pub use order::*;
pub use otp::*;
pub use secret_string::SecretString;
pub use storage::*;
pub use user::*;
pub use util::*;
pub use validation::*;
