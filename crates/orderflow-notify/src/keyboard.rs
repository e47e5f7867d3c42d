//! Inline keyboards attached to outbound messages.
//!
//! Keyboards expose exactly the legal next actions for the current order
//! status, so a well-behaved client can only request valid transitions;
//! the engine still re-validates every request.

use orderflow_types::{CallbackAction, Order, OrderStatus};
use serde_json::json;

/// An inline keyboard as a grid of buttons.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InlineKeyboard {
	pub rows: Vec<Vec<InlineButton>>,
}

/// A single inline button.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineButton {
	pub text: String,
	pub action: ButtonAction,
}

/// What pressing a button does.
#[derive(Debug, Clone, PartialEq)]
pub enum ButtonAction {
	/// Opens an external link.
	Url(String),
	/// Sends a callback payload back to the bot.
	Callback(String),
}

impl InlineButton {
	/// Creates a link button.
	pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
		Self {
			text: text.into(),
			action: ButtonAction::Url(url.into()),
		}
	}

	/// Creates a callback button from a typed action.
	pub fn callback(text: impl Into<String>, action: &CallbackAction) -> Self {
		Self {
			text: text.into(),
			action: ButtonAction::Callback(action.to_data()),
		}
	}
}

impl InlineKeyboard {
	/// Creates a keyboard from rows of buttons.
	pub fn new(rows: Vec<Vec<InlineButton>>) -> Self {
		Self { rows }
	}

	/// Renders the keyboard as a Bot API `reply_markup` object.
	pub fn to_reply_markup(&self) -> serde_json::Value {
		let rows: Vec<Vec<serde_json::Value>> = self
			.rows
			.iter()
			.map(|row| {
				row.iter()
					.map(|button| match &button.action {
						ButtonAction::Url(url) => {
							json!({ "text": button.text, "url": url })
						}
						ButtonAction::Callback(data) => {
							json!({ "text": button.text, "callback_data": data })
						}
					})
					.collect()
			})
			.collect();
		json!({ "inline_keyboard": rows })
	}

	/// Returns every callback payload reachable from this keyboard.
	pub fn callback_payloads(&self) -> Vec<&str> {
		self.rows
			.iter()
			.flatten()
			.filter_map(|button| match &button.action {
				ButtonAction::Callback(data) => Some(data.as_str()),
				ButtonAction::Url(_) => None,
			})
			.collect()
	}
}

/// Link opening the address in a maps search.
fn maps_url(address: &str) -> String {
	let mut encoded = String::with_capacity(address.len());
	for c in address.trim().chars() {
		match c {
			' ' => encoded.push('+'),
			c if c.is_ascii_alphanumeric() => encoded.push(c),
			c => {
				let mut buf = [0u8; 4];
				for byte in c.encode_utf8(&mut buf).as_bytes() {
					encoded.push_str(&format!("%{:02X}", byte));
				}
			}
		}
	}
	format!("https://www.google.com/maps/search/?api=1&query={}", encoded)
}

/// `tel:` link for one-tap calls.
fn tel_url(phone: &str) -> String {
	format!("tel:{}", phone.trim())
}

/// Call and maps shortcuts shared by the admin and courier keyboards.
fn contact_row(order: &Order) -> Vec<InlineButton> {
	vec![
		InlineButton::url("📞 Call", tel_url(order.phone.as_deref().unwrap_or(""))),
		InlineButton::url("📍 Maps", maps_url(&order.address)),
	]
}

/// Admin controls for the current order status.
///
/// Statuses past `cooking` are courier territory, the admin keyboard keeps
/// only the contact shortcuts there.
pub fn admin_keyboard(order: &Order) -> InlineKeyboard {
	let mut rows = vec![contact_row(order)];

	let set = |status: OrderStatus| CallbackAction::SetStatus {
		order_id: order.id.clone(),
		status,
	};

	match order.status {
		OrderStatus::Pending => rows.push(vec![
			InlineButton::callback("✅ Confirm", &set(OrderStatus::Confirmed)),
			InlineButton::callback("❌ Cancel", &set(OrderStatus::Cancelled)),
		]),
		OrderStatus::Confirmed => rows.push(vec![
			InlineButton::callback("🍳 Cooking", &set(OrderStatus::Cooking)),
			InlineButton::callback("❌ Cancel", &set(OrderStatus::Cancelled)),
		]),
		OrderStatus::Cooking => rows.push(vec![InlineButton::callback(
			"📦 Ready",
			&set(OrderStatus::Ready),
		)]),
		_ => {}
	}

	InlineKeyboard::new(rows)
}

/// Courier controls: one advance action per status.
pub fn courier_keyboard(order: &Order) -> InlineKeyboard {
	let mut rows = vec![contact_row(order)];

	let advance = |status: OrderStatus| CallbackAction::Advance {
		order_id: order.id.clone(),
		status,
	};

	match order.status {
		OrderStatus::Ready => rows.push(vec![InlineButton::callback(
			"🚗 On my way",
			&advance(OrderStatus::Delivering),
		)]),
		OrderStatus::Delivering => rows.push(vec![InlineButton::callback(
			"✅ Delivered",
			&advance(OrderStatus::Done),
		)]),
		_ => {}
	}

	InlineKeyboard::new(rows)
}

/// Single review-prompt control attached to the delivery confirmation.
pub fn review_keyboard(order_id: &str) -> InlineKeyboard {
	InlineKeyboard::new(vec![vec![InlineButton::callback(
		"⭐ Leave a review",
		&CallbackAction::LeaveReview {
			order_id: order_id.to_string(),
		},
	)]])
}

/// Storefront link button.
pub fn website_keyboard(url: &str) -> InlineKeyboard {
	InlineKeyboard::new(vec![vec![InlineButton::url("🍽 Open the menu", url)]])
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;
	use orderflow_types::PaymentMethod;

	fn order(status: OrderStatus) -> Order {
		Order {
			id: "0007".into(),
			created_at: Utc::now(),
			address: "Main street 1".into(),
			items: vec![],
			total: 55_000,
			status,
			payment: PaymentMethod::Cash,
			phone: Some("+998901234567".into()),
			customer_name: None,
			extra_phone: None,
			comment: None,
			coins_used: 0,
			channel_message_id: None,
		}
	}

	#[test]
	fn admin_keyboard_offers_only_legal_actions() {
		let pending = admin_keyboard(&order(OrderStatus::Pending));
		assert_eq!(
			pending.callback_payloads(),
			vec!["status:0007:confirmed", "status:0007:cancelled"]
		);

		let cooking = admin_keyboard(&order(OrderStatus::Cooking));
		assert_eq!(cooking.callback_payloads(), vec!["status:0007:ready"]);

		// Past cooking the admin has no transition buttons.
		for status in [
			OrderStatus::Ready,
			OrderStatus::Delivering,
			OrderStatus::Done,
			OrderStatus::Cancelled,
		] {
			assert!(admin_keyboard(&order(status)).callback_payloads().is_empty());
		}
	}

	#[test]
	fn courier_keyboard_advances_one_step_at_a_time() {
		let ready = courier_keyboard(&order(OrderStatus::Ready));
		assert_eq!(ready.callback_payloads(), vec!["courier:0007:delivering"]);

		let delivering = courier_keyboard(&order(OrderStatus::Delivering));
		assert_eq!(delivering.callback_payloads(), vec!["courier:0007:done"]);

		assert!(courier_keyboard(&order(OrderStatus::Done))
			.callback_payloads()
			.is_empty());
	}

	#[test]
	fn reply_markup_shape_matches_bot_api() {
		let markup = review_keyboard("0007").to_reply_markup();
		assert_eq!(
			markup["inline_keyboard"][0][0]["callback_data"],
			"review:0007"
		);
	}

	#[test]
	fn maps_url_escapes_the_address() {
		let url = maps_url("Main street 1, block #3");
		assert!(url.starts_with("https://www.google.com/maps/search/?api=1&query="));
		assert!(url.contains("Main+street+1%2C+block+%233"));
	}
}
