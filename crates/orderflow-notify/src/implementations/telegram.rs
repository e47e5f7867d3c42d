//! Telegram Bot API channel implementation.
//!
//! Talks to the Bot API over HTTPS with a pooled reqwest client. Every
//! method call is a single JSON POST; non-`ok` responses surface as
//! [`NotifyError::Channel`] with the API description.

use crate::{ChannelInterface, InlineKeyboard, NotifyError};
use async_trait::async_trait;
use orderflow_types::{ConfigSchema, Field, FieldType, Schema, SecretString, ValidationError};
use serde_json::{json, Value};

/// Default Bot API host.
const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Telegram channel implementation.
pub struct TelegramChannel {
	/// Pooled HTTP client.
	http: reqwest::Client,
	/// Method endpoint prefix, `{api_url}/bot{token}`.
	base_url: String,
}

impl TelegramChannel {
	/// Creates a new TelegramChannel for the given bot token.
	pub fn new(token: &SecretString, api_url: &str) -> Result<Self, NotifyError> {
		let http = reqwest::Client::builder()
			.timeout(std::time::Duration::from_secs(30))
			.build()
			.map_err(|e| NotifyError::Channel(e.to_string()))?;

		Ok(Self {
			http,
			base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token.expose()),
		})
	}

	/// Calls a Bot API method and returns its `result` payload.
	async fn call(&self, method: &str, params: Value) -> Result<Value, NotifyError> {
		let url = format!("{}/{}", self.base_url, method);
		let response = self
			.http
			.post(&url)
			.json(&params)
			.send()
			.await
			.map_err(|e| NotifyError::Channel(e.to_string()))?;

		let body: Value = response
			.json()
			.await
			.map_err(|e| NotifyError::Channel(e.to_string()))?;

		if body.get("ok").and_then(Value::as_bool) != Some(true) {
			let description = body
				.get("description")
				.and_then(Value::as_str)
				.unwrap_or("unknown Bot API error");
			return Err(NotifyError::Channel(format!("{}: {}", method, description)));
		}

		Ok(body.get("result").cloned().unwrap_or(Value::Null))
	}
}

#[async_trait]
impl ChannelInterface for TelegramChannel {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(TelegramChannelSchema)
	}

	async fn send_message(
		&self,
		chat_id: i64,
		text: &str,
		keyboard: Option<&InlineKeyboard>,
	) -> Result<i64, NotifyError> {
		let mut params = json!({
			"chat_id": chat_id,
			"text": text,
			"parse_mode": "HTML",
		});
		if let Some(keyboard) = keyboard {
			params["reply_markup"] = keyboard.to_reply_markup();
		}

		let result = self.call("sendMessage", params).await?;
		result
			.get("message_id")
			.and_then(Value::as_i64)
			.ok_or_else(|| NotifyError::Channel("sendMessage returned no message_id".into()))
	}

	async fn edit_message_text(
		&self,
		chat_id: i64,
		message_id: i64,
		text: &str,
		keyboard: Option<&InlineKeyboard>,
	) -> Result<(), NotifyError> {
		let mut params = json!({
			"chat_id": chat_id,
			"message_id": message_id,
			"text": text,
			"parse_mode": "HTML",
		});
		if let Some(keyboard) = keyboard {
			params["reply_markup"] = keyboard.to_reply_markup();
		}
		self.call("editMessageText", params).await.map(|_| ())
	}

	async fn edit_message_keyboard(
		&self,
		chat_id: i64,
		message_id: i64,
		keyboard: Option<&InlineKeyboard>,
	) -> Result<(), NotifyError> {
		let mut params = json!({
			"chat_id": chat_id,
			"message_id": message_id,
		});
		if let Some(keyboard) = keyboard {
			params["reply_markup"] = keyboard.to_reply_markup();
		}
		self.call("editMessageReplyMarkup", params).await.map(|_| ())
	}

	async fn answer_callback(
		&self,
		callback_id: &str,
		text: &str,
		alert: bool,
	) -> Result<(), NotifyError> {
		let params = json!({
			"callback_query_id": callback_id,
			"text": text,
			"show_alert": alert,
		});
		self.call("answerCallbackQuery", params).await.map(|_| ())
	}

	async fn request_contact(
		&self,
		chat_id: i64,
		text: &str,
		button_text: &str,
	) -> Result<i64, NotifyError> {
		let params = json!({
			"chat_id": chat_id,
			"text": text,
			"parse_mode": "HTML",
			"reply_markup": {
				"keyboard": [[{ "text": button_text, "request_contact": true }]],
				"resize_keyboard": true,
				"one_time_keyboard": true,
			},
		});
		let result = self.call("sendMessage", params).await?;
		result
			.get("message_id")
			.and_then(Value::as_i64)
			.ok_or_else(|| NotifyError::Channel("sendMessage returned no message_id".into()))
	}
}

/// Configuration schema for TelegramChannel.
pub struct TelegramChannelSchema;

impl ConfigSchema for TelegramChannelSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![], // No required fields
			vec![Field::new("api_url", FieldType::String)],
		);
		schema.validate(config)
	}
}

/// Factory function to create a Telegram channel from configuration.
///
/// Configuration parameters:
/// - `api_url`: Bot API host override, mainly for tests
///   (default: "https://api.telegram.org")
pub fn create_channel(
	config: &toml::Value,
	token: &SecretString,
) -> Result<Box<dyn ChannelInterface>, NotifyError> {
	let api_url = config
		.get("api_url")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_API_URL);

	Ok(Box::new(TelegramChannel::new(token, api_url)?))
}
