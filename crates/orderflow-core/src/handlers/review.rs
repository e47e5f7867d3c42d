//! Review collection.
//!
//! A short-lived per-conversation state: after a delivery the customer may
//! open a review prompt, and the next text message from that chat is
//! captured as the review. One slot per chat; a second request replaces
//! the first, and the slot is consumed by exactly one message regardless
//! of its content.

use dashmap::DashMap;
use orderflow_notify::{render, NotificationService};
use std::sync::Arc;

/// Collects free-text reviews tied to delivered orders.
pub struct ReviewCollector {
	/// Pending review slot per chat: the order awaiting feedback.
	pending: DashMap<i64, String>,
	notifier: Arc<NotificationService>,
}

impl ReviewCollector {
	/// Creates a new ReviewCollector.
	pub fn new(notifier: Arc<NotificationService>) -> Arc<Self> {
		Arc::new(Self {
			pending: DashMap::new(),
			notifier,
		})
	}

	/// Opens the review slot for a chat and prompts for text.
	///
	/// A prior unconsumed slot is silently replaced; reviews do not stack.
	pub async fn request_review(&self, chat_id: i64, order_id: &str) {
		self.pending.insert(chat_id, order_id.to_string());
		self.notifier
			.send_to_chat(chat_id, &render::review_prompt(order_id), None)
			.await;
	}

	/// Feeds an incoming text message to the collector.
	///
	/// Returns `true` when the message was consumed as a review. With no
	/// slot pending the message is left alone entirely, neither consumed
	/// nor acknowledged. An empty review still consumes the slot and is
	/// acknowledged, but nothing is forwarded.
	pub async fn submit_review(
		&self,
		chat_id: i64,
		reviewer: &str,
		username: Option<&str>,
		text: &str,
	) -> bool {
		let Some((_, order_id)) = self.pending.remove(&chat_id) else {
			return false;
		};

		let trimmed = text.trim();
		if !trimmed.is_empty() {
			self.notifier
				.send_to_admin(
					&render::review_forward(&order_id, reviewer, username, trimmed),
					None,
				)
				.await;
		} else {
			tracing::debug!(order_id = %order_id, "Empty review, nothing forwarded");
		}

		self.notifier
			.send_to_chat(chat_id, &render::review_thanks(), None)
			.await;
		true
	}

	/// Whether a chat currently has an open review slot.
	pub fn has_pending(&self, chat_id: i64) -> bool {
		self.pending.contains_key(&chat_id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use orderflow_notify::implementations::memory::MemoryChannel;
	use orderflow_storage::implementations::memory::MemoryStorage;
	use orderflow_storage::StorageService;

	const ADMIN: i64 = 1;
	const CUSTOMER: i64 = 100;

	fn collector() -> (Arc<ReviewCollector>, MemoryChannel) {
		let channel = MemoryChannel::new();
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let notifier = Arc::new(NotificationService::new(
			Box::new(channel.clone()),
			storage,
			ADMIN,
			None,
		));
		(ReviewCollector::new(notifier), channel)
	}

	#[tokio::test]
	async fn second_request_replaces_the_first() {
		let (collector, channel) = collector();
		collector.request_review(CUSTOMER, "0001").await;
		collector.request_review(CUSTOMER, "0002").await;

		assert!(collector.submit_review(CUSTOMER, "Alex", None, "tasty").await);
		assert!(!collector.has_pending(CUSTOMER));

		// Only the review for the replacing order was forwarded.
		let forwarded: Vec<_> = channel
			.sent_to(ADMIN)
			.into_iter()
			.filter(|m| m.text.contains("New review"))
			.collect();
		assert_eq!(forwarded.len(), 1);
		assert!(forwarded[0].text.contains("#0002"));
		assert!(forwarded[0].text.contains("tasty"));
	}

	#[tokio::test]
	async fn text_without_pending_slot_is_ignored() {
		let (collector, channel) = collector();
		assert!(!collector.submit_review(CUSTOMER, "Alex", None, "hello").await);
		assert!(channel.sent().is_empty());
	}

	#[tokio::test]
	async fn slot_is_consumed_exactly_once() {
		let (collector, channel) = collector();
		collector.request_review(CUSTOMER, "0001").await;
		assert!(collector.submit_review(CUSTOMER, "Alex", None, "good").await);
		assert!(!collector.submit_review(CUSTOMER, "Alex", None, "more").await);

		let forwarded: Vec<_> = channel
			.sent_to(ADMIN)
			.into_iter()
			.filter(|m| m.text.contains("New review"))
			.collect();
		assert_eq!(forwarded.len(), 1);
	}

	#[tokio::test]
	async fn empty_review_is_acknowledged_but_not_forwarded() {
		let (collector, channel) = collector();
		collector.request_review(CUSTOMER, "0001").await;
		assert!(collector.submit_review(CUSTOMER, "Alex", None, "   ").await);

		assert!(channel
			.sent_to(ADMIN)
			.iter()
			.all(|m| !m.text.contains("New review")));
		// The reviewer still gets thanked.
		let acks = channel.sent_to(CUSTOMER);
		assert!(acks.iter().any(|m| m.text.contains("Thank you")));
	}
}
