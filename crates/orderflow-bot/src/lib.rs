//! Inbound update stream for the ordering backend.
//!
//! This module handles the arrival of messenger updates (button presses,
//! text messages, shared contacts, commands). It provides an abstraction
//! over the transport so the engine consumes typed [`BotEvent`]s from a
//! channel instead of dealing with the messenger wire format.

use async_trait::async_trait;
use orderflow_types::{BotEvent, ConfigSchema, SecretString};
use thiserror::Error;
use tokio::sync::mpsc;

/// Re-export implementations
pub mod implementations {
	pub mod telegram;
}

/// Errors that can occur during update monitoring.
#[derive(Debug, Error)]
pub enum BotError {
	/// Connecting to the update transport failed.
	#[error("Connection error: {0}")]
	Connection(String),
	/// Monitoring was started twice on the same source.
	#[error("Already monitoring")]
	AlreadyMonitoring,
	/// An update could not be decoded.
	#[error("Parse error: {0}")]
	ParseError(String),
}

/// Trait defining the interface for update source implementations.
///
/// This trait must be implemented by any update transport that wants to
/// integrate with the ordering backend. It provides methods for starting
/// and stopping update monitoring.
#[async_trait]
pub trait UpdateSource: Send + Sync {
	/// Returns the configuration schema for this update source.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Starts monitoring for new updates from this source.
	///
	/// Decoded events are sent through the provided channel. The
	/// implementation should continue monitoring until stop_monitoring is
	/// called or an error occurs.
	async fn start_monitoring(
		&self,
		sender: mpsc::UnboundedSender<BotEvent>,
	) -> Result<(), BotError>;

	/// Stops monitoring for new updates from this source.
	async fn stop_monitoring(&self) -> Result<(), BotError>;
}

/// Type alias for update source factory functions.
///
/// Factories receive their own TOML section plus the bot token, which is
/// configured once at the top level rather than per implementation.
pub type UpdateFactory =
	fn(&toml::Value, &SecretString) -> Result<Box<dyn UpdateSource>, BotError>;

/// Service that manages the configured update sources.
pub struct UpdateService {
	/// Collection of update sources to monitor.
	sources: Vec<Box<dyn UpdateSource>>,
}

impl UpdateService {
	/// Creates a new UpdateService with the specified sources.
	pub fn new(sources: Vec<Box<dyn UpdateSource>>) -> Self {
		Self { sources }
	}

	/// Starts monitoring on all configured update sources.
	///
	/// All events from any source are sent through the provided channel.
	/// If any source fails to start the entire operation fails.
	pub async fn start_all(
		&self,
		sender: mpsc::UnboundedSender<BotEvent>,
	) -> Result<(), BotError> {
		for source in &self.sources {
			source.start_monitoring(sender.clone()).await?;
		}
		Ok(())
	}

	/// Stops monitoring on all active update sources.
	pub async fn stop_all(&self) -> Result<(), BotError> {
		for source in &self.sources {
			source.stop_monitoring().await?;
		}
		Ok(())
	}
}
