//! Message templates for the ordering backend.
//!
//! Pure text rendering, HTML-formatted for the messenger channel. The
//! content contracts live here: what each recipient role sees for each
//! lifecycle event.

use orderflow_types::{Order, OrderStatus, PaymentMethod, COIN_VALUE};

/// Emoji and human label for a status.
pub fn status_line(status: OrderStatus) -> (&'static str, &'static str) {
	match status {
		OrderStatus::Pending => ("🕐", "Waiting"),
		OrderStatus::Confirmed => ("✅", "Confirmed"),
		OrderStatus::Cooking => ("🍳", "Cooking"),
		OrderStatus::Ready => ("📦", "Awaiting courier"),
		OrderStatus::Delivering => ("🚗", "Delivering"),
		OrderStatus::Done => ("🎉", "Delivered"),
		OrderStatus::Cancelled => ("❌", "Cancelled"),
	}
}

/// Groups digits by thousands: `55000` becomes `55,000`.
pub fn format_thousands(value: i64) -> String {
	let digits = value.abs().to_string();
	let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
	for (i, c) in digits.chars().enumerate() {
		if i > 0 && (digits.len() - i) % 3 == 0 {
			grouped.push(',');
		}
		grouped.push(c);
	}
	if value < 0 {
		format!("-{}", grouped)
	} else {
		grouped
	}
}

fn payment_label(payment: PaymentMethod) -> &'static str {
	match payment {
		PaymentMethod::Cash => "💵 Cash",
		PaymentMethod::Card => "💳 Card",
	}
}

/// Full order summary for the admin and courier views.
///
/// Address, line items, total, payment method, customer identity,
/// timestamp and current status, in that order.
pub fn order_summary(order: &Order, title: &str) -> String {
	let mut items_text = String::new();
	for item in &order.items {
		items_text.push_str(&format!(
			"  • {} x {} — {} UZS\n",
			item.name,
			item.quantity,
			format_thousands(item.line_total())
		));
	}
	if items_text.is_empty() {
		items_text.push_str("  • —\n");
	}

	let (emoji, label) = status_line(order.status);
	let mut text = format!(
		"🛒 <b>{title} #{id}</b>\n\
		 ━━━━━━━━━━━━━━━\n\
		 📍 <b>Address:</b> {address}\n\n\
		 🍽 <b>Items:</b>\n{items}\n\
		 💰 <b><u>{total} UZS</u></b>\n\
		 💳 <b>Payment:</b> {payment}\n\
		 👤 <b>Customer:</b> {customer}\n\
		 📞 <b>Phone:</b> {phone}\n",
		title = title,
		id = order.id,
		address = order.address,
		items = items_text,
		total = format_thousands(order.total),
		payment = payment_label(order.payment),
		customer = order.customer_name.as_deref().unwrap_or("—"),
		phone = order.phone.as_deref().unwrap_or("—"),
	);

	if let Some(extra) = &order.extra_phone {
		text.push_str(&format!("📱 <b>Extra phone:</b> {}\n", extra));
	}
	if let Some(comment) = &order.comment {
		text.push_str(&format!("💬 <b>Comment:</b> {}\n", comment));
	}

	text.push_str(&format!(
		"⏰ <b>Placed:</b> {}\n\n{} <b>Status:</b> {}",
		order.created_at.format("%Y-%m-%d %H:%M"),
		emoji,
		label
	));
	text
}

/// Customer notification for the `confirmed` transition.
pub fn customer_confirmed(order: &Order) -> String {
	format!(
		"✅ <b>Your order is confirmed!</b>\n\n\
		 📦 Order: <b>#{}</b>\n\
		 💰 Total: <b>{} UZS</b>\n\n\
		 🍳 The kitchen is on it, delivery is coming soon!",
		order.id,
		format_thousands(order.total)
	)
}

/// Customer notification for the `ready` transition.
pub fn customer_ready(order: &Order) -> String {
	format!(
		"📦 <b>Your order is ready!</b>\n\n\
		 📦 Order: <b>#{}</b>\n\
		 🚗 A courier will be assigned shortly.",
		order.id
	)
}

/// Customer notification for the `delivering` transition.
pub fn customer_delivering(order: &Order) -> String {
	format!(
		"🚗 <b>The courier is on the way!</b>\n\n\
		 📦 Order: <b>#{}</b>\n\
		 Please be ready to receive it!",
		order.id
	)
}

/// Customer notification for the `done` transition, with the cash-back.
pub fn customer_delivered(order: &Order, earned: i64, balance: i64) -> String {
	format!(
		"🎉 <b>Your order has been delivered!</b>\n\n\
		 🪙 You earned <b>+{earned} coins</b>\n\
		 💰 That is worth <b>{value} UZS</b> off\n\
		 📊 Current balance: <b>{balance} coins</b>\n\n\
		 Spend them on your next order! 🛍",
		earned = earned,
		value = format_thousands(earned * COIN_VALUE),
		balance = balance
	)
}

/// Admin note about a customer-cancelled order.
pub fn admin_cancelled(order: &Order) -> String {
	format!(
		"❌ <b>Order cancelled #{}</b>\n\
		 💳 {} UZS\n\
		 👤 {} {}",
		order.id,
		format_thousands(order.total),
		order.customer_name.as_deref().unwrap_or(""),
		order.phone.as_deref().unwrap_or("")
	)
}

/// Informational admin mirror for the courier-driven `delivering` step.
pub fn admin_delivering(order_id: &str) -> String {
	format!("🚗 <b>Courier on the way!</b>\n📦 Order #{}", order_id)
}

/// Informational admin mirror for the courier-driven `done` step.
pub fn admin_delivered(order_id: &str) -> String {
	format!("✅ <b>Order #{} delivered!</b>", order_id)
}

/// Replacement text for the courier message once the delivery is done.
pub fn courier_done(order_id: &str) -> String {
	format!("✅ <b>Order #{} delivered!</b>\n\nThank you! 🎉", order_id)
}

/// Prompt asking the customer to type their review.
pub fn review_prompt(order_id: &str) -> String {
	format!(
		"✍️ <b>Write your review</b>\n\n\
		 Tell us what you think about order #{}.\n\
		 (Food, delivery speed, anything else.)",
		order_id
	)
}

/// Review forwarded to the admin chat.
pub fn review_forward(order_id: &str, reviewer: &str, username: Option<&str>, text: &str) -> String {
	format!(
		"💬 <b>New review!</b>\n\n\
		 📦 Order: #{order_id}\n\
		 👤 {reviewer} (@{username})\n\n\
		 \"{text}\"",
		order_id = order_id,
		reviewer = reviewer,
		username = username.unwrap_or("—"),
		text = text
	)
}

/// Acknowledgement sent to the reviewer.
pub fn review_thanks() -> String {
	"🙏 Thank you for your review!".to_string()
}

/// OTP code delivery message.
pub fn otp_message(code: &str) -> String {
	format!(
		"🔐 <b>Verification code</b>\n\n\
		 Your code: <code>{}</code>\n\n\
		 ⏱ The code is valid for 5 minutes.\n\
		 Never share it with anyone!",
		code
	)
}

/// Admin greeting for `/start`.
pub fn welcome_admin(chat_id: i64) -> String {
	format!(
		"👋 <b>Orderflow admin</b>\n\nChat ID: <code>{}</code>",
		chat_id
	)
}

/// Courier greeting for `/start`.
pub fn welcome_courier() -> String {
	"🚗 <b>Courier panel</b>\n\nReady orders will arrive here.".to_string()
}

/// Greeting for an already registered customer.
pub fn welcome_known_user(full_name: &str, phone: &str) -> String {
	let first = full_name.split_whitespace().next().unwrap_or("friend");
	format!(
		"👋 <b>Hello, {}!</b>\n\n\
		 📱 Your number is saved: <code>{}</code>\n\n\
		 Open the menu to place an order:",
		first, phone
	)
}

/// Registration prompt for an unknown customer.
pub fn welcome_new_user() -> String {
	"👋 Welcome! 🍽\n\n\
	 Share your phone number to register.\n\n\
	 ⬇️ Use the button below:"
		.to_string()
}

/// Confirmation after a contact card was saved.
pub fn contact_saved() -> String {
	"✅ <b>Number saved!</b>\n\nTap the button below to order ⬇️".to_string()
}

/// Rejection when a foreign contact card was shared.
pub fn contact_not_own() -> String {
	"❌ Please share <b>your own</b> number.".to_string()
}

/// Admin digest of the most recent orders.
pub fn orders_digest(orders: &[Order]) -> String {
	if orders.is_empty() {
		return "📭 No orders yet.".to_string();
	}
	let mut lines = vec!["📋 <b>Recent orders:</b>".to_string(), String::new()];
	for order in orders {
		let (emoji, label) = status_line(order.status);
		lines.push(format!(
			"{} #{} — {} UZS — {}",
			emoji,
			order.id,
			format_thousands(order.total),
			label
		));
	}
	lines.join("\n")
}

/// Admin statistics for the current day.
pub fn stats_today(total: usize, done: usize, pending: usize, cancelled: usize, revenue: i64) -> String {
	format!(
		"📊 <b>Today</b>\n\n\
		 📦 Orders    : {total}\n\
		 🎉 Delivered : {done}\n\
		 🕐 Waiting   : {pending}\n\
		 ❌ Cancelled : {cancelled}\n\
		 💰 Revenue   : {revenue} UZS",
		total = total,
		done = done,
		pending = pending,
		cancelled = cancelled,
		revenue = format_thousands(revenue)
	)
}
