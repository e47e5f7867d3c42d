//! Inbound update handling.
//!
//! Routes typed bot events to the lifecycle engine and the review
//! collector: inline button presses become transition requests or review
//! prompts, contact cards become messenger links, commands drive the
//! admin/courier panels. Nothing here returns errors to the transport;
//! rejections are answered in-band and faults are logged.

use crate::handlers::order::{OrderHandler, TransitionError};
use crate::handlers::review::ReviewCollector;
use crate::state::OrderStateMachine;
use chrono::Utc;
use orderflow_notify::{keyboard, render, NotificationService};
use orderflow_storage::StorageService;
use orderflow_types::{
	normalize_phone, ActorRole, BotCommand, BotEvent, CallbackAction, Collection, LinkedUser,
	OrderStatus,
};
use std::sync::Arc;

/// Number of orders in the admin digest.
const DIGEST_LIMIT: usize = 10;

/// Handler dispatching inbound bot events.
pub struct UpdateHandler {
	orders: Arc<OrderHandler>,
	state: Arc<OrderStateMachine>,
	review: Arc<ReviewCollector>,
	notifier: Arc<NotificationService>,
	storage: Arc<StorageService>,
	website_url: Option<String>,
}

impl UpdateHandler {
	/// Creates a new UpdateHandler.
	pub fn new(
		orders: Arc<OrderHandler>,
		state: Arc<OrderStateMachine>,
		review: Arc<ReviewCollector>,
		notifier: Arc<NotificationService>,
		storage: Arc<StorageService>,
		website_url: Option<String>,
	) -> Arc<Self> {
		Arc::new(Self {
			orders,
			state,
			review,
			notifier,
			storage,
			website_url,
		})
	}

	fn is_admin(&self, chat_id: i64) -> bool {
		chat_id == self.notifier.admin_chat_id()
	}

	fn is_courier(&self, chat_id: i64) -> bool {
		self.notifier.courier_chat_id() == Some(chat_id)
	}

	/// Dispatches one inbound event.
	pub async fn handle(&self, event: BotEvent) {
		match event {
			BotEvent::CallbackPressed {
				chat_id,
				callback_id,
				message_id,
				data,
				..
			} => {
				self.handle_callback(chat_id, &callback_id, message_id, &data)
					.await;
			}
			BotEvent::TextReceived {
				chat_id,
				from_name,
				username,
				text,
			} => {
				// The review collector has first claim on free text; with
				// no slot pending the message is ignored entirely.
				self.review
					.submit_review(chat_id, &from_name, username.as_deref(), &text)
					.await;
			}
			BotEvent::ContactShared {
				chat_id,
				phone,
				full_name,
				own_contact,
			} => {
				self.handle_contact(chat_id, &phone, &full_name, own_contact)
					.await;
			}
			BotEvent::CommandReceived { chat_id, command } => {
				self.handle_command(chat_id, command).await;
			}
		}
	}

	async fn handle_callback(
		&self,
		chat_id: i64,
		callback_id: &str,
		message_id: i64,
		data: &str,
	) {
		let Ok(action) = data.parse::<CallbackAction>() else {
			tracing::debug!(chat_id, data, "Unparseable callback payload, ignoring");
			return;
		};

		match action {
			CallbackAction::LeaveReview { order_id } => {
				self.notifier.answer_callback(callback_id, "", false).await;
				self.review.request_review(chat_id, &order_id).await;
			}
			CallbackAction::SetStatus { order_id, status } => {
				if !self.is_admin(chat_id) {
					self.notifier
						.answer_callback(callback_id, "❌ Not allowed", true)
						.await;
					return;
				}
				self.run_transition(callback_id, &order_id, status, ActorRole::Admin)
					.await;
			}
			CallbackAction::Advance { order_id, status } => {
				if !self.is_courier(chat_id) {
					self.notifier
						.answer_callback(callback_id, "❌ Not allowed", true)
						.await;
					return;
				}
				let Some(updated) = self
					.run_transition(callback_id, &order_id, status, ActorRole::Courier)
					.await
				else {
					return;
				};

				// Re-render the courier's own message to match the new step.
				match status {
					OrderStatus::Delivering => {
						self.notifier
							.edit_keyboard(
								chat_id,
								message_id,
								Some(&keyboard::courier_keyboard(&updated)),
							)
							.await;
					}
					OrderStatus::Done => {
						self.notifier
							.edit_message(
								chat_id,
								message_id,
								&render::courier_done(&order_id),
								None,
							)
							.await;
					}
					_ => {}
				}
			}
		}
	}

	/// Applies a transition and answers the pressed button either way.
	async fn run_transition(
		&self,
		callback_id: &str,
		order_id: &str,
		status: OrderStatus,
		actor: ActorRole,
	) -> Option<orderflow_types::Order> {
		match self.orders.apply_transition(order_id, status, actor).await {
			Ok(updated) => {
				let (emoji, label) = render::status_line(updated.status);
				self.notifier
					.answer_callback(callback_id, &format!("{} {}", emoji, label), false)
					.await;
				Some(updated)
			}
			Err(e) => {
				let reply = match &e {
					TransitionError::NotFound(_) => "❌ Order not found",
					TransitionError::Invalid { .. } => "⚠️ Wrong status order",
					TransitionError::Unauthorized(_) => "❌ Not allowed",
					TransitionError::Storage(_) => "❌ Update failed",
				};
				tracing::warn!(order_id, status = %status, error = %e, "Transition rejected");
				self.notifier.answer_callback(callback_id, reply, true).await;
				None
			}
		}
	}

	async fn handle_contact(&self, chat_id: i64, phone: &str, full_name: &str, own_contact: bool) {
		if !own_contact {
			self.notifier
				.send_to_chat(chat_id, &render::contact_not_own(), None)
				.await;
			return;
		}
		let Some(phone) = normalize_phone(phone) else {
			tracing::warn!(chat_id, "Contact card without a phone number");
			return;
		};

		let website = self.website_url.as_deref().map(keyboard::website_keyboard);

		if let Some(existing) = self.find_link_by_chat(chat_id).await {
			self.notifier
				.send_to_chat(
					chat_id,
					&render::welcome_known_user(&existing.full_name, &existing.phone),
					website.as_ref(),
				)
				.await;
			return;
		}

		// One phone, one chat: a re-registration overwrites the link.
		let link = LinkedUser {
			phone: phone.clone(),
			chat_id,
			full_name: full_name.to_string(),
		};
		if let Err(e) = self.storage.store(Collection::Users, &phone, &link).await {
			tracing::error!(chat_id, error = %e, "Failed to save messenger link");
			return;
		}
		tracing::info!(chat_id, phone = %phone, "Messenger link registered");

		self.notifier
			.send_to_chat(chat_id, &render::contact_saved(), website.as_ref())
			.await;
	}

	async fn handle_command(&self, chat_id: i64, command: BotCommand) {
		match command {
			BotCommand::Start => self.handle_start(chat_id).await,
			BotCommand::Orders => {
				if self.is_admin(chat_id) {
					self.send_orders_digest(chat_id).await;
				}
			}
			BotCommand::Stats => {
				if self.is_admin(chat_id) {
					self.send_stats(chat_id).await;
				}
			}
		}
	}

	async fn handle_start(&self, chat_id: i64) {
		if self.is_admin(chat_id) {
			self.notifier
				.send_to_chat(chat_id, &render::welcome_admin(chat_id), None)
				.await;
			return;
		}
		if self.is_courier(chat_id) {
			self.notifier
				.send_to_chat(chat_id, &render::welcome_courier(), None)
				.await;
			return;
		}

		if let Some(existing) = self.find_link_by_chat(chat_id).await {
			let website = self.website_url.as_deref().map(keyboard::website_keyboard);
			self.notifier
				.send_to_chat(
					chat_id,
					&render::welcome_known_user(&existing.full_name, &existing.phone),
					website.as_ref(),
				)
				.await;
			return;
		}

		self.notifier
			.send_contact_request(chat_id, &render::welcome_new_user(), "📱 Share my number")
			.await;
	}

	async fn send_orders_digest(&self, chat_id: i64) {
		let mut orders = match self.state.list_orders().await {
			Ok(orders) => orders,
			Err(e) => {
				tracing::error!(error = %e, "Failed to list orders for digest");
				return;
			}
		};
		orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
		orders.truncate(DIGEST_LIMIT);
		self.notifier
			.send_to_chat(chat_id, &render::orders_digest(&orders), None)
			.await;
	}

	async fn send_stats(&self, chat_id: i64) {
		let orders = match self.state.list_orders().await {
			Ok(orders) => orders,
			Err(e) => {
				tracing::error!(error = %e, "Failed to list orders for stats");
				return;
			}
		};

		let today = Utc::now().date_naive();
		let todays: Vec<_> = orders
			.iter()
			.filter(|o| o.created_at.date_naive() == today)
			.collect();

		let done = todays
			.iter()
			.filter(|o| o.status == OrderStatus::Done)
			.count();
		let pending = todays
			.iter()
			.filter(|o| o.status == OrderStatus::Pending)
			.count();
		let cancelled = todays
			.iter()
			.filter(|o| o.status == OrderStatus::Cancelled)
			.count();
		let revenue = todays
			.iter()
			.filter(|o| o.status != OrderStatus::Cancelled)
			.map(|o| o.total)
			.sum();

		self.notifier
			.send_to_chat(
				chat_id,
				&render::stats_today(todays.len(), done, pending, cancelled, revenue),
				None,
			)
			.await;
	}

	/// Reverse lookup of a messenger link by chat id.
	async fn find_link_by_chat(&self, chat_id: i64) -> Option<LinkedUser> {
		match self.storage.list::<LinkedUser>(Collection::Users).await {
			Ok(links) => links.into_iter().find(|l| l.chat_id == chat_id),
			Err(e) => {
				tracing::warn!(chat_id, error = %e, "Failed to scan messenger links");
				None
			}
		}
	}
}
