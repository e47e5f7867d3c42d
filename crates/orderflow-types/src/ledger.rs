//! Coin ledger types for the loyalty program.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Purchasing power of a single loyalty coin, in currency units.
pub const COIN_VALUE: i64 = 1000;

/// Per-phone coin account with its full movement history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoinLedger {
	/// Current balance in coins, never negative.
	pub balance: i64,
	/// Ordered movement history, oldest first.
	#[serde(default)]
	pub history: Vec<CoinEntry>,
}

impl CoinLedger {
	/// Returns true if an earn entry for the given order already exists.
	///
	/// Used to keep delivery cash-back idempotent per order.
	pub fn has_earned_for(&self, order_id: &str) -> bool {
		self.history
			.iter()
			.any(|e| e.kind == CoinEntryKind::Earn && e.order_id == order_id)
	}
}

/// One movement on a coin ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinEntry {
	/// Direction of the movement.
	#[serde(rename = "type")]
	pub kind: CoinEntryKind,
	/// Moved amount in coins.
	pub amount: i64,
	/// Order that caused the movement.
	pub order_id: String,
	/// Timestamp of the movement.
	pub at: DateTime<Utc>,
}

/// Direction of a coin movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoinEntryKind {
	/// Cash-back credited on delivery completion.
	Earn,
	/// Coins spent as a discount at order creation.
	Spend,
}
