//! Secret value wrapper for credentials.

use serde::Deserialize;
use std::fmt;
use zeroize::Zeroize;

/// A string that must not leak into logs or debug output.
///
/// Used for the messenger bot token. The inner value is zeroized on drop
/// and both `Debug` and `Display` render a redaction marker; access goes
/// through [`SecretString::expose`] so call sites stay auditable.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
	/// Wraps a secret value.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the secret value.
	pub fn expose(&self) -> &str {
		&self.0
	}
}

impl From<String> for SecretString {
	fn from(value: String) -> Self {
		Self(value)
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("SecretString(***)")
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("***")
	}
}

impl Drop for SecretString {
	fn drop(&mut self) {
		self.0.zeroize();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn debug_output_is_redacted() {
		let secret = SecretString::new("123456:token");
		assert_eq!(format!("{:?}", secret), "SecretString(***)");
		assert_eq!(format!("{}", secret), "***");
		assert_eq!(secret.expose(), "123456:token");
	}
}
