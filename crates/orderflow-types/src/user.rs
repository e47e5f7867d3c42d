//! User identity types.
//!
//! Two separate records exist per person: the messenger link created by the
//! bot (phone to chat id) and the registered web profile created through the
//! OTP signup flow. Either can exist without the other.

use serde::{Deserialize, Serialize};

/// Association of a phone number with a messenger recipient identity.
///
/// One phone maps to one chat; re-registration overwrites the link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedUser {
	/// Phone number in `+`-prefixed form.
	pub phone: String,
	/// Messenger chat identifier used to address the person.
	pub chat_id: i64,
	/// Display name as reported by the messenger.
	pub full_name: String,
}

/// Registered customer profile from the web signup flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
	/// Phone number in `+`-prefixed form.
	pub phone: String,
	#[serde(rename = "firstName")]
	pub first_name: String,
	#[serde(rename = "lastName")]
	pub last_name: String,
}
