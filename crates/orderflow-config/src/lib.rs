//! Configuration module for the ordering backend.
//!
//! This module provides structures and utilities for managing the backend
//! configuration. It supports loading configuration from TOML files and
//! provides validation to ensure all required values are properly set.
//! Pluggable implementations (storage backends, messenger channels, update
//! sources) keep their settings as raw TOML tables validated by their own
//! config schemas at build time.

use orderflow_types::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the ordering backend.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	/// Settings of the ordering service itself.
	pub service: ServiceConfig,
	/// Messenger identities (bot token, admin and courier chats).
	pub telegram: TelegramConfig,
	/// Configuration for the storage backend.
	pub storage: StorageConfig,
	/// Configuration for the outbound notification channel.
	pub channel: ChannelConfig,
	/// Configuration for the inbound update source.
	pub updates: UpdatesConfig,
	/// OTP issuance and verification limits.
	#[serde(default)]
	pub otp: OtpConfig,
	/// Configuration for the HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Settings of the ordering service itself.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
	/// Unique identifier for this instance, used in logs.
	pub id: String,
	/// Smallest accepted order total.
	#[serde(default = "default_min_order_total")]
	pub min_order_total: i64,
	/// Seconds after creation during which a customer may cancel.
	#[serde(default = "default_cancel_window_seconds")]
	pub cancel_window_seconds: u64,
	/// Delay before a new order is announced to the admin, slightly longer
	/// than the cancel window so self-cancelled orders never surface.
	#[serde(default = "default_announce_delay_seconds")]
	pub announce_delay_seconds: u64,
}

fn default_min_order_total() -> i64 {
	50_000
}

fn default_cancel_window_seconds() -> u64 {
	55
}

fn default_announce_delay_seconds() -> u64 {
	65
}

/// Messenger identities the workflows are bound to.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
	/// Bot API token.
	pub bot_token: SecretString,
	/// Chat receiving order announcements and admin controls.
	pub admin_chat_id: i64,
	/// Chat receiving courier assignments; courier flows are disabled
	/// when absent.
	pub courier_chat_id: Option<i64>,
	/// Storefront link offered to registered users.
	pub website_url: Option<String>,
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the outbound notification channel.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of channel implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the inbound update source.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdatesConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of update source implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// OTP issuance and verification limits.
#[derive(Debug, Clone, Deserialize)]
pub struct OtpConfig {
	/// Challenge lifetime in seconds.
	#[serde(default = "default_otp_ttl_seconds")]
	pub ttl_seconds: u64,
	/// Rolling per-phone issuance cooldown in seconds.
	#[serde(default = "default_otp_cooldown_seconds")]
	pub resend_cooldown_seconds: u64,
	/// Wrong attempts after which a challenge is discarded.
	#[serde(default = "default_otp_max_attempts")]
	pub max_attempts: u32,
}

impl Default for OtpConfig {
	fn default() -> Self {
		Self {
			ttl_seconds: default_otp_ttl_seconds(),
			resend_cooldown_seconds: default_otp_cooldown_seconds(),
			max_attempts: default_otp_max_attempts(),
		}
	}
}

fn default_otp_ttl_seconds() -> u64 {
	300
}

fn default_otp_cooldown_seconds() -> u64 {
	60
}

fn default_otp_max_attempts() -> u32 {
	5
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	#[serde(default)]
	pub enabled: bool,
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	8000
}

impl Config {
	/// Parses a configuration from a TOML string and validates it.
	pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
		let config: Config = toml::from_str(raw)?;
		config.validate()?;
		Ok(config)
	}

	/// Loads configuration from a file.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let raw = std::fs::read_to_string(path)?;
		Self::from_toml_str(&raw)
	}

	/// Loads configuration from a file without blocking the runtime.
	pub async fn from_file_async(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let raw = tokio::fs::read_to_string(path).await?;
		Self::from_toml_str(&raw)
	}

	/// Validates cross-field consistency.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.trim().is_empty() {
			return Err(ConfigError::Validation("service.id must not be empty".into()));
		}
		if self.service.min_order_total < 0 {
			return Err(ConfigError::Validation(
				"service.min_order_total must not be negative".into(),
			));
		}
		for (section, primary, implementations) in [
			("storage", &self.storage.primary, &self.storage.implementations),
			("channel", &self.channel.primary, &self.channel.implementations),
			("updates", &self.updates.primary, &self.updates.implementations),
		] {
			if !implementations.contains_key(primary) {
				return Err(ConfigError::Validation(format!(
					"{section}.primary '{primary}' has no matching implementation section"
				)));
			}
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const MINIMAL: &str = r#"
		[service]
		id = "orderflow-test"

		[telegram]
		bot_token = "123:abc"
		admin_chat_id = 10

		[storage]
		primary = "memory"
		[storage.implementations.memory]

		[channel]
		primary = "memory"
		[channel.implementations.memory]

		[updates]
		primary = "telegram"
		[updates.implementations.telegram]
	"#;

	#[test]
	fn minimal_config_parses_with_defaults() {
		let config = Config::from_toml_str(MINIMAL).unwrap();
		assert_eq!(config.service.min_order_total, 50_000);
		assert_eq!(config.service.cancel_window_seconds, 55);
		assert_eq!(config.service.announce_delay_seconds, 65);
		assert_eq!(config.otp.ttl_seconds, 300);
		assert_eq!(config.otp.resend_cooldown_seconds, 60);
		assert_eq!(config.otp.max_attempts, 5);
		assert!(config.api.is_none());
		assert!(config.telegram.courier_chat_id.is_none());
	}

	#[test]
	fn primary_must_reference_an_implementation() {
		let raw = MINIMAL.replace("primary = \"memory\"", "primary = \"missing\"");
		assert!(matches!(
			Config::from_toml_str(&raw),
			Err(ConfigError::Validation(_))
		));
	}

	#[test]
	fn empty_service_id_is_rejected() {
		let raw = MINIMAL.replace("id = \"orderflow-test\"", "id = \"  \"");
		assert!(matches!(
			Config::from_toml_str(&raw),
			Err(ConfigError::Validation(_))
		));
	}
}
