//! Telegram long-poll update source.
//!
//! Runs `getUpdates` in a detached task, decodes the wire format into
//! typed [`BotEvent`]s and feeds them into the engine channel. Transport
//! errors are logged and retried after a short pause; decoding never
//! panics on unexpected payloads, unknown update shapes are skipped.

use crate::{BotError, UpdateSource};
use async_trait::async_trait;
use orderflow_types::{
	BotCommand, BotEvent, ConfigSchema, Field, FieldType, Schema, SecretString, ValidationError,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Default Bot API host.
const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Seconds the server holds an empty long poll open.
const DEFAULT_POLL_TIMEOUT: u64 = 25;

/// Pause before retrying after a transport error.
const RETRY_PAUSE: std::time::Duration = std::time::Duration::from_secs(3);

/// Telegram long-poll update source.
pub struct TelegramUpdates {
	http: reqwest::Client,
	base_url: String,
	poll_timeout: u64,
	running: Arc<AtomicBool>,
}

impl TelegramUpdates {
	/// Creates a new TelegramUpdates source for the given bot token.
	pub fn new(token: &SecretString, api_url: &str, poll_timeout: u64) -> Result<Self, BotError> {
		let http = reqwest::Client::builder()
			.timeout(std::time::Duration::from_secs(poll_timeout + 15))
			.build()
			.map_err(|e| BotError::Connection(e.to_string()))?;

		Ok(Self {
			http,
			base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token.expose()),
			poll_timeout,
			running: Arc::new(AtomicBool::new(false)),
		})
	}
}

#[async_trait]
impl UpdateSource for TelegramUpdates {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(TelegramUpdatesSchema)
	}

	async fn start_monitoring(
		&self,
		sender: mpsc::UnboundedSender<BotEvent>,
	) -> Result<(), BotError> {
		if self.running.swap(true, Ordering::SeqCst) {
			return Err(BotError::AlreadyMonitoring);
		}

		let http = self.http.clone();
		let url = format!("{}/getUpdates", self.base_url);
		let poll_timeout = self.poll_timeout;
		let running = self.running.clone();

		tokio::spawn(async move {
			let mut offset: i64 = 0;
			while running.load(Ordering::SeqCst) {
				let params = json!({
					"offset": offset,
					"timeout": poll_timeout,
					"allowed_updates": ["message", "callback_query"],
				});

				let updates = match poll_once(&http, &url, &params).await {
					Ok(updates) => updates,
					Err(e) => {
						tracing::warn!(error = %e, "Update poll failed, retrying");
						tokio::time::sleep(RETRY_PAUSE).await;
						continue;
					}
				};

				for update in updates {
					offset = offset.max(update.update_id + 1);
					let Some(event) = decode_update(update) else {
						continue;
					};
					if sender.send(event).is_err() {
						// Engine is gone, stop polling.
						running.store(false, Ordering::SeqCst);
						return;
					}
				}
			}
		});

		Ok(())
	}

	async fn stop_monitoring(&self) -> Result<(), BotError> {
		self.running.store(false, Ordering::SeqCst);
		Ok(())
	}
}

/// One `getUpdates` round trip.
async fn poll_once(
	http: &reqwest::Client,
	url: &str,
	params: &serde_json::Value,
) -> Result<Vec<Update>, BotError> {
	let response = http
		.post(url)
		.json(params)
		.send()
		.await
		.map_err(|e| BotError::Connection(e.to_string()))?;

	let body: GetUpdatesResponse = response
		.json()
		.await
		.map_err(|e| BotError::ParseError(e.to_string()))?;

	if !body.ok {
		return Err(BotError::Connection(
			body.description.unwrap_or_else(|| "Bot API error".into()),
		));
	}
	Ok(body.result)
}

#[derive(Debug, Deserialize)]
struct GetUpdatesResponse {
	ok: bool,
	#[serde(default)]
	result: Vec<Update>,
	description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
	update_id: i64,
	message: Option<Message>,
	callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct Message {
	message_id: i64,
	chat: Chat,
	from: Option<User>,
	text: Option<String>,
	contact: Option<Contact>,
}

#[derive(Debug, Deserialize)]
struct Chat {
	id: i64,
}

#[derive(Debug, Deserialize)]
struct User {
	id: i64,
	first_name: String,
	last_name: Option<String>,
	username: Option<String>,
}

impl User {
	fn full_name(&self) -> String {
		match &self.last_name {
			Some(last) => format!("{} {}", self.first_name, last),
			None => self.first_name.clone(),
		}
	}
}

#[derive(Debug, Deserialize)]
struct Contact {
	phone_number: String,
	first_name: String,
	last_name: Option<String>,
	user_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
	id: String,
	from: User,
	message: Option<Message>,
	data: Option<String>,
}

/// Converts one wire update into a typed event, if it is one we handle.
fn decode_update(update: Update) -> Option<BotEvent> {
	if let Some(callback) = update.callback_query {
		let message = callback.message?;
		return Some(BotEvent::CallbackPressed {
			chat_id: message.chat.id,
			callback_id: callback.id,
			message_id: message.message_id,
			data: callback.data?,
			from_name: callback.from.full_name(),
		});
	}

	let message = update.message?;
	let chat_id = message.chat.id;

	if let Some(contact) = message.contact {
		let own_contact = match (contact.user_id, &message.from) {
			(Some(contact_user), Some(from)) => contact_user == from.id,
			// Without both ids we cannot prove otherwise.
			_ => true,
		};
		let full_name = match &contact.last_name {
			Some(last) => format!("{} {}", contact.first_name, last),
			None => contact.first_name.clone(),
		};
		return Some(BotEvent::ContactShared {
			chat_id,
			phone: contact.phone_number,
			full_name,
			own_contact,
		});
	}

	let text = message.text?;
	if text.starts_with('/') {
		let command: BotCommand = text.trim().parse().ok()?;
		return Some(BotEvent::CommandReceived { chat_id, command });
	}

	let from = message.from;
	Some(BotEvent::TextReceived {
		chat_id,
		from_name: from
			.as_ref()
			.map(User::full_name)
			.unwrap_or_else(|| "—".to_string()),
		username: from.and_then(|u| u.username),
		text,
	})
}

/// Configuration schema for TelegramUpdates.
pub struct TelegramUpdatesSchema;

impl ConfigSchema for TelegramUpdatesSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![], // No required fields
			vec![
				Field::new("api_url", FieldType::String),
				Field::new(
					"poll_timeout",
					FieldType::Integer {
						min: Some(1),
						max: Some(50),
					},
				),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create a Telegram update source from configuration.
///
/// Configuration parameters:
/// - `api_url`: Bot API host override (default: "https://api.telegram.org")
/// - `poll_timeout`: long-poll hold time in seconds (default: 25)
pub fn create_updates(
	config: &toml::Value,
	token: &SecretString,
) -> Result<Box<dyn UpdateSource>, BotError> {
	let api_url = config
		.get("api_url")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_API_URL);
	let poll_timeout = config
		.get("poll_timeout")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_POLL_TIMEOUT);

	Ok(Box::new(TelegramUpdates::new(token, api_url, poll_timeout)?))
}
