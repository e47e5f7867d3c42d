//! Loyalty ledger for the ordering backend.
//!
//! This module computes and credits the coins earned when an order is
//! delivered, debits coins spent as a discount at order creation, and
//! enforces per-order idempotency of the delivery cash-back. All ledger
//! mutations run as read-modify-write sequences under the ledgers
//! collection lock of the storage service, so the idempotency check and
//! the append are atomic.

use chrono::Utc;
use orderflow_storage::{StorageError, StorageService};
use orderflow_types::{CoinEntry, CoinEntryKind, CoinLedger, Collection, Order, COIN_VALUE};
use std::sync::Arc;
use thiserror::Error;

/// Cash-back granularity: one coin is earned per this many currency units
/// of the pre-discount total (5% cash-back at 1000 units per coin).
const EARN_DIVISOR: i64 = COIN_VALUE * 20;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
	/// A spend exceeds the current balance; the balance is left unchanged.
	#[error("Insufficient balance: requested {requested}, available {available}")]
	InsufficientBalance { requested: i64, available: i64 },
	/// The storage backend failed.
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
}

/// Outcome of a delivery credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditOutcome {
	/// Coins credited by this call; zero when the order was already credited.
	pub earned: i64,
	/// Balance after the call.
	pub balance: i64,
}

/// Service managing coin balances of the loyalty program.
pub struct LedgerService {
	storage: Arc<StorageService>,
}

impl LedgerService {
	/// Creates a new LedgerService on top of the given storage.
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// Computes the coins earned for a pre-discount order total.
	///
	/// 5% cash-back expressed in coins, rounded half-up, with a floor of
	/// one coin so every completed order yields a visible reward.
	pub fn earned_for(pre_discount_total: i64) -> i64 {
		let rounded = (pre_discount_total + EARN_DIVISOR / 2) / EARN_DIVISOR;
		rounded.max(1)
	}

	/// Credits the delivery cash-back for an order.
	///
	/// Idempotent per order id: a replayed or retried call finds the
	/// existing earn entry and returns the unchanged balance with
	/// `earned = 0`. A phone without a ledger gets one created with a zero
	/// starting balance before crediting.
	pub async fn credit_for_delivery(
		&self,
		phone: &str,
		order: &Order,
	) -> Result<CreditOutcome, LedgerError> {
		let order_id = order.id.clone();
		let earned = Self::earned_for(order.pre_discount_total());

		let outcome = self
			.storage
			.mutate_or_default::<CoinLedger, _, _>(Collection::Ledgers, phone, |ledger| {
				if ledger.has_earned_for(&order_id) {
					return CreditOutcome {
						earned: 0,
						balance: ledger.balance,
					};
				}
				ledger.balance += earned;
				ledger.history.push(CoinEntry {
					kind: CoinEntryKind::Earn,
					amount: earned,
					order_id: order_id.clone(),
					at: Utc::now(),
				});
				CreditOutcome {
					earned,
					balance: ledger.balance,
				}
			})
			.await?;

		if outcome.earned == 0 {
			tracing::debug!(order_id = %order.id, phone, "Cash-back already credited");
		}
		Ok(outcome)
	}

	/// Debits coins spent as a discount at order creation.
	///
	/// Fails with [`LedgerError::InsufficientBalance`] without mutating the
	/// ledger when the balance does not cover the amount. Returns the new
	/// balance on success.
	pub async fn debit_for_order(
		&self,
		phone: &str,
		amount: i64,
		order_id: &str,
	) -> Result<i64, LedgerError> {
		let order_id = order_id.to_string();
		self.storage
			.mutate_or_default::<CoinLedger, _, _>(Collection::Ledgers, phone, |ledger| {
				if amount > ledger.balance {
					return Err(LedgerError::InsufficientBalance {
						requested: amount,
						available: ledger.balance,
					});
				}
				ledger.balance -= amount;
				ledger.history.push(CoinEntry {
					kind: CoinEntryKind::Spend,
					amount,
					order_id,
					at: Utc::now(),
				});
				Ok(ledger.balance)
			})
			.await?
	}

	/// Returns the current balance for a phone, zero for unknown phones.
	pub async fn balance(&self, phone: &str) -> Result<i64, LedgerError> {
		match self
			.storage
			.retrieve::<CoinLedger>(Collection::Ledgers, phone)
			.await
		{
			Ok(ledger) => Ok(ledger.balance),
			Err(StorageError::NotFound) => Ok(0),
			Err(e) => Err(e.into()),
		}
	}
}
