//! Inbound bot events and callback actions.
//!
//! Incoming messenger updates are converted into these typed events at the
//! transport boundary, so the engine consumes plain values through a
//! synchronous call interface instead of transport callbacks.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::order::OrderStatus;

/// A single inbound event from the messenger channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BotEvent {
	/// An inline button was pressed.
	CallbackPressed {
		chat_id: i64,
		/// Identifier to acknowledge the press with.
		callback_id: String,
		/// Message the button belongs to, for interface re-renders.
		message_id: i64,
		/// Raw callback payload, parsed with [`CallbackAction`].
		data: String,
		/// Display name of the pressing user.
		from_name: String,
	},
	/// A plain text message arrived.
	TextReceived {
		chat_id: i64,
		from_name: String,
		username: Option<String>,
		text: String,
	},
	/// The user shared a contact card.
	ContactShared {
		chat_id: i64,
		phone: String,
		full_name: String,
		/// Whether the contact belongs to the sender themselves.
		own_contact: bool,
	},
	/// A slash command arrived.
	CommandReceived { chat_id: i64, command: BotCommand },
}

/// Recognized slash commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotCommand {
	/// Greeting / registration entry point.
	Start,
	/// Admin digest of recent orders.
	Orders,
	/// Admin statistics for the current day.
	Stats,
}

impl FromStr for BotCommand {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"/start" => Ok(Self::Start),
			"/orders" => Ok(Self::Orders),
			"/stats" => Ok(Self::Stats),
			_ => Err(()),
		}
	}
}

/// Parsed payload of an inline button press.
///
/// Wire format is `<verb>:<order_id>[:<argument>]`, kept compatible with
/// what the keyboards attach to outbound messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
	/// Admin moving an order along the flow (`status:{id}:{status}`).
	SetStatus { order_id: String, status: OrderStatus },
	/// Courier advancing a delivery (`courier:{id}:{status}`).
	Advance { order_id: String, status: OrderStatus },
	/// Customer opening the review prompt (`review:{id}`).
	LeaveReview { order_id: String },
}

impl CallbackAction {
	/// Renders the action back into its wire payload.
	pub fn to_data(&self) -> String {
		match self {
			CallbackAction::SetStatus { order_id, status } => {
				format!("status:{}:{}", order_id, status)
			}
			CallbackAction::Advance { order_id, status } => {
				format!("courier:{}:{}", order_id, status)
			}
			CallbackAction::LeaveReview { order_id } => format!("review:{}", order_id),
		}
	}
}

impl FromStr for CallbackAction {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let mut parts = s.splitn(3, ':');
		let verb = parts.next().ok_or(())?;
		let order_id = parts.next().ok_or(())?.to_string();
		match verb {
			"status" => {
				let status = parts.next().ok_or(())?.parse().map_err(|_| ())?;
				Ok(Self::SetStatus { order_id, status })
			}
			"courier" => {
				let status = parts.next().ok_or(())?.parse().map_err(|_| ())?;
				Ok(Self::Advance { order_id, status })
			}
			"review" => Ok(Self::LeaveReview { order_id }),
			_ => Err(()),
		}
	}
}

/// Actor roles driving status transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRole {
	/// Restaurant administrator.
	Admin,
	/// Delivery courier.
	Courier,
	/// The ordering customer.
	Customer,
	/// Internal processes (creation, trusted maintenance paths).
	System,
}

impl ActorRole {
	/// Authorization gate: which target statuses a role may request.
	///
	/// Checked once at the interaction boundary; the state machine itself
	/// assumes the caller already passed this gate.
	pub fn may_set(self, target: OrderStatus) -> bool {
		match self {
			ActorRole::Admin => matches!(
				target,
				OrderStatus::Confirmed
					| OrderStatus::Cooking
					| OrderStatus::Ready
					| OrderStatus::Cancelled
			),
			ActorRole::Courier => {
				matches!(target, OrderStatus::Delivering | OrderStatus::Done)
			}
			ActorRole::Customer => target == OrderStatus::Cancelled,
			ActorRole::System => true,
		}
	}
}
