//! In-memory channel implementation.
//!
//! Records every outbound call instead of delivering it, so tests can
//! assert on message content, recipients and attached keyboards. Handles
//! are shared: clones observe the same recorded traffic.

use crate::{ChannelInterface, InlineKeyboard, NotifyError};
use async_trait::async_trait;
use orderflow_types::{ConfigSchema, Schema, SecretString, ValidationError};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

/// A message recorded by the memory channel.
#[derive(Debug, Clone)]
pub struct RecordedMessage {
	pub chat_id: i64,
	pub message_id: i64,
	pub text: String,
	pub keyboard: Option<InlineKeyboard>,
}

/// In-memory channel implementation.
#[derive(Clone, Default)]
pub struct MemoryChannel {
	sent: Arc<Mutex<Vec<RecordedMessage>>>,
	edits: Arc<Mutex<Vec<RecordedMessage>>>,
	answers: Arc<Mutex<Vec<(String, String)>>>,
	next_id: Arc<AtomicI64>,
}

impl MemoryChannel {
	/// Creates a new MemoryChannel.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns all sent messages so far.
	pub fn sent(&self) -> Vec<RecordedMessage> {
		self.sent.lock().unwrap().clone()
	}

	/// Returns all sent messages addressed to the given chat.
	pub fn sent_to(&self, chat_id: i64) -> Vec<RecordedMessage> {
		self.sent()
			.into_iter()
			.filter(|m| m.chat_id == chat_id)
			.collect()
	}

	/// Returns all message edits so far.
	pub fn edits(&self) -> Vec<RecordedMessage> {
		self.edits.lock().unwrap().clone()
	}

	/// Returns all callback acknowledgements so far.
	pub fn answers(&self) -> Vec<(String, String)> {
		self.answers.lock().unwrap().clone()
	}
}

#[async_trait]
impl ChannelInterface for MemoryChannel {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryChannelSchema)
	}

	async fn send_message(
		&self,
		chat_id: i64,
		text: &str,
		keyboard: Option<&InlineKeyboard>,
	) -> Result<i64, NotifyError> {
		let message_id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
		self.sent.lock().unwrap().push(RecordedMessage {
			chat_id,
			message_id,
			text: text.to_string(),
			keyboard: keyboard.cloned(),
		});
		Ok(message_id)
	}

	async fn edit_message_text(
		&self,
		chat_id: i64,
		message_id: i64,
		text: &str,
		keyboard: Option<&InlineKeyboard>,
	) -> Result<(), NotifyError> {
		self.edits.lock().unwrap().push(RecordedMessage {
			chat_id,
			message_id,
			text: text.to_string(),
			keyboard: keyboard.cloned(),
		});
		Ok(())
	}

	async fn edit_message_keyboard(
		&self,
		chat_id: i64,
		message_id: i64,
		keyboard: Option<&InlineKeyboard>,
	) -> Result<(), NotifyError> {
		self.edits.lock().unwrap().push(RecordedMessage {
			chat_id,
			message_id,
			text: String::new(),
			keyboard: keyboard.cloned(),
		});
		Ok(())
	}

	async fn answer_callback(
		&self,
		callback_id: &str,
		text: &str,
		_alert: bool,
	) -> Result<(), NotifyError> {
		self.answers
			.lock()
			.unwrap()
			.push((callback_id.to_string(), text.to_string()));
		Ok(())
	}

	async fn request_contact(
		&self,
		chat_id: i64,
		text: &str,
		_button_text: &str,
	) -> Result<i64, NotifyError> {
		// Recorded as a plain send; tests only care about the prompt text.
		self.send_message(chat_id, text, None).await
	}
}

/// Configuration schema for MemoryChannel.
pub struct MemoryChannelSchema;

impl ConfigSchema for MemoryChannelSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		// Memory channel has no required configuration
		let schema = Schema::new(vec![], vec![]);
		schema.validate(config)
	}
}

/// Factory function to create a memory channel from configuration.
///
/// Configuration parameters:
/// - None required for the memory channel
pub fn create_channel(
	_config: &toml::Value,
	_token: &SecretString,
) -> Result<Box<dyn ChannelInterface>, NotifyError> {
	Ok(Box::new(MemoryChannel::new()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn records_sends_with_increasing_ids() {
		let channel = MemoryChannel::new();
		let first = channel.send_message(10, "hello", None).await.unwrap();
		let second = channel.send_message(11, "world", None).await.unwrap();
		assert!(second > first);

		let sent = channel.sent();
		assert_eq!(sent.len(), 2);
		assert_eq!(sent[0].chat_id, 10);
		assert_eq!(sent[1].text, "world");
	}

	#[tokio::test]
	async fn clones_share_recorded_traffic() {
		let channel = MemoryChannel::new();
		let observer = channel.clone();
		channel.send_message(10, "hello", None).await.unwrap();
		assert_eq!(observer.sent_to(10).len(), 1);
	}
}
