//! Core engine for the ordering backend.
//!
//! This module provides the main orchestration logic, coordinating between
//! the services (storage, loyalty ledger, notifications, inbound updates)
//! to drive the complete order lifecycle. It includes the typed-event
//! dispatch loop and the builder with pluggable implementations.

pub mod builder;
pub mod engine;
pub mod handlers;
pub mod state;

pub use builder::EngineBuilder;
pub use engine::{Engine, EngineError};
pub use handlers::order::{CancelError, CreateError, NewOrder, OrderHandler, TransitionError};
pub use handlers::review::ReviewCollector;
pub use handlers::update::UpdateHandler;
pub use state::OrderStateMachine;
