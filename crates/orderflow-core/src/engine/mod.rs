//! Engine orchestrating the order lifecycle.
//!
//! The engine wires the services together and runs the main event loop:
//! inbound bot events arrive on an mpsc channel from the update sources
//! and are dispatched to the handlers one at a time. Suspension happens
//! only at the I/O edges (storage, outbound sends); business logic itself
//! is synchronous.

use crate::handlers::order::OrderHandler;
use crate::handlers::review::ReviewCollector;
use crate::handlers::update::UpdateHandler;
use crate::state::OrderStateMachine;
use orderflow_bot::UpdateService;
use orderflow_config::Config;
use orderflow_ledger::LedgerService;
use orderflow_notify::NotificationService;
use orderflow_otp::OtpService;
use orderflow_storage::StorageService;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
	/// Error related to configuration issues.
	#[error("Configuration error: {0}")]
	Config(String),
	/// Error from one of the engine services.
	#[error("Service error: {0}")]
	Service(String),
}

/// Main engine driving the ordering backend.
pub struct Engine {
	/// Backend configuration.
	config: Config,
	/// Storage service for persisting state.
	storage: Arc<StorageService>,
	/// Loyalty ledger service.
	ledger: Arc<LedgerService>,
	/// OTP challenge service.
	otp: Arc<OtpService>,
	/// Notification dispatch service.
	notifier: Arc<NotificationService>,
	/// Inbound update sources.
	updates: UpdateService,
	/// Order state machine.
	state: Arc<OrderStateMachine>,
	/// Order lifecycle handler.
	orders: Arc<OrderHandler>,
	/// Review collector.
	review: Arc<ReviewCollector>,
	/// Inbound event dispatcher.
	update_handler: Arc<UpdateHandler>,
}

impl Engine {
	/// Creates a new engine with the given services.
	pub fn new(
		config: Config,
		storage: Arc<StorageService>,
		notifier: Arc<NotificationService>,
		updates: UpdateService,
	) -> Self {
		let state = Arc::new(OrderStateMachine::new(storage.clone()));
		let ledger = Arc::new(LedgerService::new(storage.clone()));
		let otp = Arc::new(OtpService::new(
			storage.clone(),
			config.otp.ttl_seconds,
			config.otp.resend_cooldown_seconds,
			config.otp.max_attempts,
		));

		let orders = OrderHandler::new(
			state.clone(),
			ledger.clone(),
			notifier.clone(),
			config.service.min_order_total,
			config.service.cancel_window_seconds,
			config.service.announce_delay_seconds,
		);
		let review = ReviewCollector::new(notifier.clone());
		let update_handler = UpdateHandler::new(
			orders.clone(),
			state.clone(),
			review.clone(),
			notifier.clone(),
			storage.clone(),
			config.telegram.website_url.clone(),
		);

		Self {
			config,
			storage,
			ledger,
			otp,
			notifier,
			updates,
			state,
			orders,
			review,
			update_handler,
		}
	}

	/// Main event loop.
	///
	/// Starts the update sources, then dispatches inbound events until a
	/// shutdown signal arrives. Handler faults are logged, never fatal.
	pub async fn run(&self) -> Result<(), EngineError> {
		let (event_tx, mut event_rx) = mpsc::unbounded_channel();
		self.updates
			.start_all(event_tx)
			.await
			.map_err(|e| EngineError::Service(e.to_string()))?;

		tracing::info!(service_id = %self.config.service.id, "Engine started");

		loop {
			tokio::select! {
				Some(event) = event_rx.recv() => {
					self.update_handler.handle(event).await;
				}

				// Shutdown signal
				_ = tokio::signal::ctrl_c() => {
					break;
				}
			}
		}

		self.updates
			.stop_all()
			.await
			.map_err(|e| EngineError::Service(e.to_string()))?;

		tracing::info!("Engine stopped");
		Ok(())
	}

	/// Returns a reference to the configuration.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Returns a reference to the storage service.
	pub fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}

	/// Returns a reference to the order lifecycle handler.
	pub fn orders(&self) -> &Arc<OrderHandler> {
		&self.orders
	}

	/// Returns a reference to the order state machine.
	pub fn state(&self) -> &Arc<OrderStateMachine> {
		&self.state
	}

	/// Returns a reference to the loyalty ledger service.
	pub fn ledger(&self) -> &Arc<LedgerService> {
		&self.ledger
	}

	/// Returns a reference to the OTP service.
	pub fn otp(&self) -> &Arc<OtpService> {
		&self.otp
	}

	/// Returns a reference to the notification service.
	pub fn notifier(&self) -> &Arc<NotificationService> {
		&self.notifier
	}

	/// Returns a reference to the review collector.
	pub fn review(&self) -> &Arc<ReviewCollector> {
		&self.review
	}

	/// Returns a reference to the inbound event dispatcher.
	pub fn update_handler(&self) -> &Arc<UpdateHandler> {
		&self.update_handler
	}
}
