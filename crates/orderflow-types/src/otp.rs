//! One-time password challenge types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A live OTP challenge bound to a phone number.
///
/// At most one challenge exists per phone; issuing a new one replaces the
/// old. Challenges are destroyed on successful verification, on expiry
/// detected at verification time, and after the attempt cap is exceeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpChallenge {
	/// Six ASCII digits.
	pub code: String,
	/// Flow the code was issued for; verification must match it.
	pub mode: OtpMode,
	/// Instant after which the code is no longer accepted.
	pub expires_at: DateTime<Utc>,
	/// Failed verification attempts so far.
	#[serde(default)]
	pub attempts: u32,
	/// Issuance instant, used for the resend cooldown.
	pub created_at: DateTime<Utc>,
}

/// Account flow an OTP challenge belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpMode {
	/// Sign in with an existing profile.
	#[default]
	Login,
	/// Create a new profile.
	Signup,
}

impl fmt::Display for OtpMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OtpMode::Login => f.write_str("login"),
			OtpMode::Signup => f.write_str("signup"),
		}
	}
}
