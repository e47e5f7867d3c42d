//! Storage-related types for the ordering backend.

use std::str::FromStr;

/// Storage collections for the different data families.
///
/// This enum provides type safety for storage operations by replacing
/// string literals with strongly typed variants. Each collection is also
/// the unit of mutual exclusion in the storage service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
	/// Order records.
	Orders,
	/// Messenger links (phone to chat id).
	Users,
	/// Registered web profiles.
	Profiles,
	/// Coin ledgers of the loyalty program.
	Ledgers,
	/// Live OTP challenges.
	Otp,
	/// Monotonic sequence counters.
	Counters,
}

impl Collection {
	/// Returns the string representation of the collection.
	pub fn as_str(&self) -> &'static str {
		match self {
			Collection::Orders => "orders",
			Collection::Users => "users",
			Collection::Profiles => "profiles",
			Collection::Ledgers => "ledgers",
			Collection::Otp => "otp",
			Collection::Counters => "counters",
		}
	}

	/// Returns an iterator over all collection variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Orders,
			Self::Users,
			Self::Profiles,
			Self::Ledgers,
			Self::Otp,
			Self::Counters,
		]
		.into_iter()
	}
}

impl FromStr for Collection {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"orders" => Ok(Self::Orders),
			"users" => Ok(Self::Users),
			"profiles" => Ok(Self::Profiles),
			"ledgers" => Ok(Self::Ledgers),
			"otp" => Ok(Self::Otp),
			"counters" => Ok(Self::Counters),
			_ => Err(()),
		}
	}
}

impl From<Collection> for &'static str {
	fn from(collection: Collection) -> Self {
		collection.as_str()
	}
}
