//! Notification dispatch for the ordering backend.
//!
//! This module translates lifecycle events into outbound messages on an
//! abstract messenger channel. Delivery is strictly best-effort: every
//! failure is caught at this boundary and logged, never propagated into
//! the state transition that triggered it. Customers are addressed by
//! phone and resolved through the messenger link table; customers without
//! a link are skipped silently.

use async_trait::async_trait;
use orderflow_storage::{StorageError, StorageService};
use orderflow_types::{Collection, ConfigSchema, LinkedUser, SecretString};
use std::sync::Arc;
use thiserror::Error;

pub mod keyboard;
pub mod render;

/// Re-export implementations
pub mod implementations {
	pub mod memory;
	pub mod telegram;
}

pub use keyboard::{InlineButton, InlineKeyboard};

/// Errors that can occur during channel operations.
#[derive(Debug, Error)]
pub enum NotifyError {
	/// The messenger API rejected or failed the call.
	#[error("Channel error: {0}")]
	Channel(String),
	/// Configuration validation failed.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the low-level interface for messenger channels.
///
/// This trait must be implemented by any outbound channel that wants to
/// integrate with the ordering backend. Message ids returned by
/// [`ChannelInterface::send_message`] are opaque handles usable for later
/// edits of the same message.
#[async_trait]
pub trait ChannelInterface: Send + Sync {
	/// Returns the configuration schema for this channel implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Sends a message to a chat and returns the message id.
	async fn send_message(
		&self,
		chat_id: i64,
		text: &str,
		keyboard: Option<&InlineKeyboard>,
	) -> Result<i64, NotifyError>;

	/// Replaces text and keyboard of an already sent message.
	async fn edit_message_text(
		&self,
		chat_id: i64,
		message_id: i64,
		text: &str,
		keyboard: Option<&InlineKeyboard>,
	) -> Result<(), NotifyError>;

	/// Replaces only the keyboard of an already sent message.
	async fn edit_message_keyboard(
		&self,
		chat_id: i64,
		message_id: i64,
		keyboard: Option<&InlineKeyboard>,
	) -> Result<(), NotifyError>;

	/// Acknowledges an inline button press, optionally with an alert popup.
	async fn answer_callback(
		&self,
		callback_id: &str,
		text: &str,
		alert: bool,
	) -> Result<(), NotifyError>;

	/// Sends a message with a one-time contact-request button.
	///
	/// Used by the registration flow; the messenger replies with a contact
	/// card once the user presses the button.
	async fn request_contact(
		&self,
		chat_id: i64,
		text: &str,
		button_text: &str,
	) -> Result<i64, NotifyError>;
}

/// Type alias for channel factory functions.
///
/// Factories receive their own TOML section plus the bot token, which is
/// configured once at the top level rather than per implementation.
pub type ChannelFactory =
	fn(&toml::Value, &SecretString) -> Result<Box<dyn ChannelInterface>, NotifyError>;

/// Service that dispatches notifications to the configured recipients.
///
/// Wraps the low-level channel with role addressing (admin, courier,
/// customer-by-phone) and the fire-and-forget error policy. All `send_*`
/// and `edit_*` helpers swallow channel failures after logging them; the
/// caller learns about a failed send only through the absent message id.
pub struct NotificationService {
	/// The underlying channel implementation.
	channel: Box<dyn ChannelInterface>,
	/// Storage used to resolve customer phones to chat ids.
	storage: Arc<StorageService>,
	/// Chat receiving admin-facing messages.
	admin_chat_id: i64,
	/// Chat receiving courier-facing messages, if configured.
	courier_chat_id: Option<i64>,
}

impl NotificationService {
	/// Creates a new NotificationService.
	pub fn new(
		channel: Box<dyn ChannelInterface>,
		storage: Arc<StorageService>,
		admin_chat_id: i64,
		courier_chat_id: Option<i64>,
	) -> Self {
		Self {
			channel,
			storage,
			admin_chat_id,
			courier_chat_id,
		}
	}

	/// Returns the admin chat id.
	pub fn admin_chat_id(&self) -> i64 {
		self.admin_chat_id
	}

	/// Returns the courier chat id, if configured.
	pub fn courier_chat_id(&self) -> Option<i64> {
		self.courier_chat_id
	}

	/// Resolves a customer phone to a chat id via the messenger link table.
	pub async fn resolve_chat(&self, phone: &str) -> Option<i64> {
		match self
			.storage
			.retrieve::<LinkedUser>(Collection::Users, phone)
			.await
		{
			Ok(link) => Some(link.chat_id),
			Err(StorageError::NotFound) => None,
			Err(e) => {
				tracing::warn!(phone, error = %e, "Failed to resolve customer chat");
				None
			}
		}
	}

	/// Sends to an explicit chat, returning the message id when delivered.
	pub async fn send_to_chat(
		&self,
		chat_id: i64,
		text: &str,
		keyboard: Option<&InlineKeyboard>,
	) -> Option<i64> {
		match self.channel.send_message(chat_id, text, keyboard).await {
			Ok(message_id) => Some(message_id),
			Err(e) => {
				tracing::warn!(chat_id, error = %e, "Failed to send message");
				None
			}
		}
	}

	/// Sends an admin-facing message.
	pub async fn send_to_admin(&self, text: &str, keyboard: Option<&InlineKeyboard>) -> Option<i64> {
		self.send_to_chat(self.admin_chat_id, text, keyboard).await
	}

	/// Sends a courier-facing message; a no-op without a configured courier.
	pub async fn send_to_courier(
		&self,
		text: &str,
		keyboard: Option<&InlineKeyboard>,
	) -> Option<i64> {
		match self.courier_chat_id {
			Some(chat_id) => self.send_to_chat(chat_id, text, keyboard).await,
			None => {
				tracing::warn!("No courier chat configured, dropping courier message");
				None
			}
		}
	}

	/// Sends a customer-facing message, resolved by phone.
	///
	/// Customers without a messenger link are skipped silently; they may
	/// have ordered through channels outside the bot.
	pub async fn send_to_customer(
		&self,
		phone: &str,
		text: &str,
		keyboard: Option<&InlineKeyboard>,
	) -> Option<i64> {
		let Some(chat_id) = self.resolve_chat(phone).await else {
			tracing::debug!(phone, "Customer has no messenger link, skipping notification");
			return None;
		};
		self.send_to_chat(chat_id, text, keyboard).await
	}

	/// Re-renders a previously sent message.
	pub async fn edit_message(
		&self,
		chat_id: i64,
		message_id: i64,
		text: &str,
		keyboard: Option<&InlineKeyboard>,
	) {
		if let Err(e) = self
			.channel
			.edit_message_text(chat_id, message_id, text, keyboard)
			.await
		{
			tracing::warn!(chat_id, message_id, error = %e, "Failed to edit message");
		}
	}

	/// Replaces the keyboard of a previously sent message.
	pub async fn edit_keyboard(
		&self,
		chat_id: i64,
		message_id: i64,
		keyboard: Option<&InlineKeyboard>,
	) {
		if let Err(e) = self
			.channel
			.edit_message_keyboard(chat_id, message_id, keyboard)
			.await
		{
			tracing::warn!(chat_id, message_id, error = %e, "Failed to edit keyboard");
		}
	}

	/// Acknowledges an inline button press.
	pub async fn answer_callback(&self, callback_id: &str, text: &str, alert: bool) {
		if let Err(e) = self.channel.answer_callback(callback_id, text, alert).await {
			tracing::warn!(error = %e, "Failed to answer callback");
		}
	}

	/// Asks a chat to share its contact card.
	pub async fn send_contact_request(&self, chat_id: i64, text: &str, button_text: &str) {
		if let Err(e) = self.channel.request_contact(chat_id, text, button_text).await {
			tracing::warn!(chat_id, error = %e, "Failed to send contact request");
		}
	}
}
