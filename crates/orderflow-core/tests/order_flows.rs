//! End-to-end order lifecycle flows against in-memory backends.

use chrono::{Duration, Utc};
use orderflow_core::{CancelError, CreateError, NewOrder, OrderHandler, TransitionError};
use orderflow_core::OrderStateMachine;
use orderflow_ledger::LedgerService;
use orderflow_notify::implementations::memory::MemoryChannel;
use orderflow_notify::NotificationService;
use orderflow_storage::implementations::memory::MemoryStorage;
use orderflow_storage::StorageService;
use orderflow_types::{
	ActorRole, Collection, LineItem, LinkedUser, OrderStatus, PaymentMethod,
};
use std::sync::Arc;

const ADMIN_CHAT: i64 = 1;
const COURIER_CHAT: i64 = 2;
const CUSTOMER_CHAT: i64 = 100;
const PHONE: &str = "+998901234567";

struct TestBackend {
	storage: Arc<StorageService>,
	channel: MemoryChannel,
	state: Arc<OrderStateMachine>,
	ledger: Arc<LedgerService>,
	orders: Arc<OrderHandler>,
}

fn backend() -> TestBackend {
	let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
	let channel = MemoryChannel::new();
	let notifier = Arc::new(NotificationService::new(
		Box::new(channel.clone()),
		storage.clone(),
		ADMIN_CHAT,
		Some(COURIER_CHAT),
	));
	let state = Arc::new(OrderStateMachine::new(storage.clone()));
	let ledger = Arc::new(LedgerService::new(storage.clone()));
	// Announce delay far in the future so scheduled announcements never
	// race the assertions; tests call announce_order directly.
	let orders = OrderHandler::new(
		state.clone(),
		ledger.clone(),
		notifier,
		50_000,
		55,
		3_600,
	);
	TestBackend {
		storage,
		channel,
		state,
		ledger,
		orders,
	}
}

async fn link_customer(backend: &TestBackend) {
	backend
		.storage
		.store(
			Collection::Users,
			PHONE,
			&LinkedUser {
				phone: PHONE.into(),
				chat_id: CUSTOMER_CHAT,
				full_name: "Alex K".into(),
			},
		)
		.await
		.unwrap();
}

fn new_order(total: i64, coins_used: i64) -> NewOrder {
	NewOrder {
		address: "Main street 1".into(),
		items: vec![
			LineItem {
				name: "Burger".into(),
				quantity: 2,
				price: 25_000,
			},
			LineItem {
				name: "Fries".into(),
				quantity: 1,
				price: 5_000,
			},
		],
		total,
		payment: PaymentMethod::Cash,
		phone: Some(PHONE.into()),
		customer_name: Some("Alex".into()),
		extra_phone: None,
		comment: None,
		coins_used,
		created_at: None,
	}
}

#[tokio::test]
async fn full_lifecycle_with_notifications_and_cash_back() {
	let backend = backend();
	link_customer(&backend).await;

	// Creation: pending, sequential id, no messages yet.
	let order = backend.orders.create_order(new_order(55_000, 0)).await.unwrap();
	assert_eq!(order.id, "0001");
	assert_eq!(order.status, OrderStatus::Pending);
	assert!(backend.channel.sent().is_empty());

	// Announcement carries the summary and the pending controls.
	backend.orders.announce_order(&order.id).await;
	let announced = backend.channel.sent_to(ADMIN_CHAT);
	assert_eq!(announced.len(), 1);
	assert!(announced[0].text.contains("#0001"));
	assert!(announced[0].text.contains("Burger x 2"));
	let keyboard = announced[0].keyboard.as_ref().unwrap();
	assert!(keyboard
		.callback_payloads()
		.contains(&"status:0001:confirmed"));
	assert!(backend
		.state
		.get_order("0001")
		.await
		.unwrap()
		.channel_message_id
		.is_some());

	// confirmed: customer is told, with the total.
	backend
		.orders
		.apply_transition("0001", OrderStatus::Confirmed, ActorRole::Admin)
		.await
		.unwrap();
	let customer = backend.channel.sent_to(CUSTOMER_CHAT);
	assert_eq!(customer.len(), 1);
	assert!(customer[0].text.contains("confirmed"));
	assert!(customer[0].text.contains("55,000"));

	// cooking: no customer-facing message.
	backend
		.orders
		.apply_transition("0001", OrderStatus::Cooking, ActorRole::Admin)
		.await
		.unwrap();
	assert_eq!(backend.channel.sent_to(CUSTOMER_CHAT).len(), 1);

	// ready: courier assignment plus a customer note.
	backend
		.orders
		.apply_transition("0001", OrderStatus::Ready, ActorRole::Admin)
		.await
		.unwrap();
	let courier = backend.channel.sent_to(COURIER_CHAT);
	assert_eq!(courier.len(), 1);
	assert!(courier[0].text.contains("Burger x 2"));
	assert!(courier[0].text.contains("+998901234567"));
	assert!(courier[0]
		.keyboard
		.as_ref()
		.unwrap()
		.callback_payloads()
		.contains(&"courier:0001:delivering"));
	let customer = backend.channel.sent_to(CUSTOMER_CHAT);
	assert_eq!(customer.len(), 2);
	assert!(customer[1].text.contains("courier will be assigned"));

	// delivering: customer heads-up and an admin mirror.
	backend
		.orders
		.apply_transition("0001", OrderStatus::Delivering, ActorRole::Courier)
		.await
		.unwrap();
	let customer = backend.channel.sent_to(CUSTOMER_CHAT);
	assert_eq!(customer.len(), 3);
	assert!(customer[2].text.contains("on the way"));
	assert!(backend
		.channel
		.sent_to(ADMIN_CHAT)
		.iter()
		.any(|m| m.text.contains("Courier on the way")));

	// done: cash-back credited once, review prompt attached.
	backend
		.orders
		.apply_transition("0001", OrderStatus::Done, ActorRole::Courier)
		.await
		.unwrap();
	assert_eq!(backend.ledger.balance(PHONE).await.unwrap(), 3);
	let customer = backend.channel.sent_to(CUSTOMER_CHAT);
	assert_eq!(customer.len(), 4);
	assert!(customer[3].text.contains("+3 coins"));
	assert!(customer[3].text.contains("3 coins"));
	assert!(customer[3]
		.keyboard
		.as_ref()
		.unwrap()
		.callback_payloads()
		.contains(&"review:0001"));

	// The admin summary was re-rendered on every transition.
	assert!(!backend.channel.edits().is_empty());

	// Terminal lock-in.
	let result = backend
		.orders
		.apply_transition("0001", OrderStatus::Confirmed, ActorRole::Admin)
		.await;
	assert!(matches!(result, Err(TransitionError::Invalid { .. })));
}

#[tokio::test]
async fn cash_back_is_computed_on_the_pre_discount_total() {
	let backend = backend();
	link_customer(&backend).await;

	// Earn 10 coins up front so the discount can be honored.
	let seed = backend
		.orders
		.create_order(new_order(200_000, 0))
		.await
		.unwrap();
	backend
		.orders
		.apply_transition(&seed.id, OrderStatus::Done, ActorRole::Courier)
		.await
		.unwrap();
	assert_eq!(backend.ledger.balance(PHONE).await.unwrap(), 10);

	// 90 000 after a 10-coin discount.
	let order = backend
		.orders
		.create_order(new_order(90_000, 10))
		.await
		.unwrap();
	assert_eq!(backend.ledger.balance(PHONE).await.unwrap(), 0);

	backend
		.orders
		.apply_transition(&order.id, OrderStatus::Done, ActorRole::Courier)
		.await
		.unwrap();
	// round(100 000 * 0.05 / 1000) = 5
	assert_eq!(backend.ledger.balance(PHONE).await.unwrap(), 5);
}

#[tokio::test]
async fn insufficient_balance_voids_the_discount_but_not_the_order() {
	let backend = backend();
	link_customer(&backend).await;

	let order = backend
		.orders
		.create_order(new_order(90_000, 10))
		.await
		.unwrap();
	assert_eq!(order.status, OrderStatus::Pending);
	assert_eq!(order.coins_used, 10);
	// Nothing was debited.
	assert_eq!(backend.ledger.balance(PHONE).await.unwrap(), 0);
}

#[tokio::test]
async fn cancellation_window_is_enforced() {
	let backend = backend();
	let order = backend.orders.create_order(new_order(55_000, 0)).await.unwrap();

	// Age the order past the window.
	backend
		.state
		.update_order_with(&order.id, |o| {
			o.created_at = Utc::now() - Duration::seconds(120);
		})
		.await
		.unwrap();

	let result = backend.orders.cancel_order(&order.id).await;
	assert!(matches!(result, Err(CancelError::WindowElapsed { .. })));
	assert_eq!(
		backend.state.get_order(&order.id).await.unwrap().status,
		OrderStatus::Pending
	);
}

#[tokio::test]
async fn cancelled_orders_are_never_announced() {
	let backend = backend();
	let order = backend.orders.create_order(new_order(55_000, 0)).await.unwrap();

	let cancelled = backend.orders.cancel_order(&order.id).await.unwrap();
	assert_eq!(cancelled.status, OrderStatus::Cancelled);
	assert!(backend
		.channel
		.sent_to(ADMIN_CHAT)
		.iter()
		.any(|m| m.text.contains("Order cancelled")));

	let admin_before = backend.channel.sent_to(ADMIN_CHAT).len();
	backend.orders.announce_order(&order.id).await;
	assert_eq!(backend.channel.sent_to(ADMIN_CHAT).len(), admin_before);
}

#[tokio::test]
async fn cancellation_requires_pending_status() {
	let backend = backend();
	let order = backend.orders.create_order(new_order(55_000, 0)).await.unwrap();
	backend
		.orders
		.apply_transition(&order.id, OrderStatus::Confirmed, ActorRole::Admin)
		.await
		.unwrap();

	assert!(matches!(
		backend.orders.cancel_order(&order.id).await,
		Err(CancelError::WrongStatus)
	));
}

#[tokio::test]
async fn backwards_transitions_are_rejected() {
	let backend = backend();
	let order = backend.orders.create_order(new_order(55_000, 0)).await.unwrap();
	backend
		.orders
		.apply_transition(&order.id, OrderStatus::Confirmed, ActorRole::Admin)
		.await
		.unwrap();

	// confirmed -> pending decreases the rank.
	let result = backend
		.orders
		.apply_transition(&order.id, OrderStatus::Pending, ActorRole::System)
		.await;
	assert!(matches!(
		result,
		Err(TransitionError::Invalid {
			from: OrderStatus::Confirmed,
			to: OrderStatus::Pending
		})
	));
}

#[tokio::test]
async fn role_gate_runs_before_validation() {
	let backend = backend();
	let order = backend.orders.create_order(new_order(55_000, 0)).await.unwrap();

	let result = backend
		.orders
		.apply_transition(&order.id, OrderStatus::Confirmed, ActorRole::Courier)
		.await;
	assert!(matches!(
		result,
		Err(TransitionError::Unauthorized(OrderStatus::Confirmed))
	));
	assert_eq!(
		backend.state.get_order(&order.id).await.unwrap().status,
		OrderStatus::Pending
	);
}

#[tokio::test]
async fn self_transition_is_a_silent_noop() {
	let backend = backend();
	link_customer(&backend).await;
	let order = backend.orders.create_order(new_order(55_000, 0)).await.unwrap();
	backend
		.orders
		.apply_transition(&order.id, OrderStatus::Confirmed, ActorRole::Admin)
		.await
		.unwrap();
	let sent_before = backend.channel.sent().len();

	let unchanged = backend
		.orders
		.apply_transition(&order.id, OrderStatus::Confirmed, ActorRole::Admin)
		.await
		.unwrap();
	assert_eq!(unchanged.status, OrderStatus::Confirmed);
	// No side effects fire on a no-op.
	assert_eq!(backend.channel.sent().len(), sent_before);
}

#[tokio::test]
async fn creation_invariants_are_validated() {
	let backend = backend();

	let mut below_minimum = new_order(49_999, 0);
	below_minimum.total = 49_999;
	assert!(matches!(
		backend.orders.create_order(below_minimum).await,
		Err(CreateError::BelowMinimum { minimum: 50_000 })
	));

	let mut empty = new_order(55_000, 0);
	empty.items.clear();
	assert!(matches!(
		backend.orders.create_order(empty).await,
		Err(CreateError::EmptyItems)
	));

	let mut bad_quantity = new_order(55_000, 0);
	bad_quantity.items[0].quantity = 0;
	assert!(matches!(
		backend.orders.create_order(bad_quantity).await,
		Err(CreateError::BadQuantity)
	));

	let mut unnamed = new_order(55_000, 0);
	unnamed.items[0].name = "  ".into();
	assert!(matches!(
		backend.orders.create_order(unnamed).await,
		Err(CreateError::UnnamedItem)
	));
}

#[tokio::test]
async fn missing_order_is_reported_as_not_found() {
	let backend = backend();
	assert!(matches!(
		backend
			.orders
			.apply_transition("0404", OrderStatus::Confirmed, ActorRole::Admin)
			.await,
		Err(TransitionError::NotFound(id)) if id == "0404"
	));
	assert!(matches!(
		backend.orders.cancel_order("0404").await,
		Err(CancelError::NotFound(id)) if id == "0404"
	));
}

#[tokio::test]
async fn unlinked_customers_are_skipped_silently() {
	let backend = backend();
	// No messenger link for the phone.
	let order = backend.orders.create_order(new_order(55_000, 0)).await.unwrap();
	backend
		.orders
		.apply_transition(&order.id, OrderStatus::Confirmed, ActorRole::Admin)
		.await
		.unwrap();

	// Transition went through, nothing was sent to the customer chat.
	assert_eq!(
		backend.state.get_order(&order.id).await.unwrap().status,
		OrderStatus::Confirmed
	);
	assert!(backend.channel.sent_to(CUSTOMER_CHAT).is_empty());
}
