//! Storefront engine wiring and main loop.
//!
//! The engine owns every service, routes inbound chat events to the chat
//! handler, feeds bus events to the notification handler and keeps the
//! reconciler ticking. Inbound events are handled one at a time, in arrival
//! order; per-user ordering is expected to be provided by the chat platform
//! delivering one event per user at a time.

use crate::event_bus::EventBus;
use crate::handlers::{AdminHandler, ChatHandler, NotificationHandler};
use crate::ledger::BalanceLedger;
use crate::placement::OrderPlacementEngine;
use crate::reconciler::StatusReconciler;
use crate::settings::SettingsStore;
use boost_chat::{ChatInterface, ChatService};
use boost_config::Config;
use boost_provider::{ProviderInterface, ProviderService};
use boost_session::SessionStore;
use boost_storage::{StorageInterface, StorageService};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
	/// Error related to configuration issues.
	#[error("Configuration error: {0}")]
	Config(String),
	/// Error from one of the storefront services.
	#[error("Service error: {0}")]
	Service(String),
}

/// Main engine that orchestrates the storefront.
pub struct StorefrontEngine {
	/// Storefront configuration.
	config: Config,
	/// Storage service for persisting state.
	storage: Arc<StorageService>,
	/// Chat service for outbound messages and the inbound stream.
	chat: Arc<ChatService>,
	/// Reconciliation loop over non-terminal orders.
	reconciler: Arc<StatusReconciler>,
	/// Handler for inbound chat events.
	chat_handler: Arc<ChatHandler>,
	/// Handler for bus events that become notifications.
	notify_handler: Arc<NotificationHandler>,
	/// Event bus for inter-service communication.
	event_bus: EventBus,
}

impl StorefrontEngine {
	/// Wires a complete engine from the configured implementations.
	pub fn new(
		config: Config,
		storage_backend: Box<dyn StorageInterface>,
		provider_impl: Box<dyn ProviderInterface>,
		chat_impl: Box<dyn ChatInterface>,
	) -> Self {
		let storage = Arc::new(StorageService::new(storage_backend));
		let provider = Arc::new(ProviderService::new(provider_impl));
		let chat = Arc::new(ChatService::new(chat_impl));
		let event_bus = EventBus::new(1000);

		let ledger = Arc::new(BalanceLedger::new(storage.clone()));
		let settings = Arc::new(SettingsStore::new(storage.clone()));
		let sessions = Arc::new(SessionStore::new());

		let placement = Arc::new(OrderPlacementEngine::new(
			storage.clone(),
			ledger.clone(),
			settings.clone(),
			provider.clone(),
			event_bus.clone(),
		));
		let reconciler = Arc::new(StatusReconciler::new(
			storage.clone(),
			ledger.clone(),
			provider,
			event_bus.clone(),
			config.reconciler.batch_limit,
		));
		let admin = Arc::new(AdminHandler::new(
			settings.clone(),
			ledger.clone(),
			storage.clone(),
			sessions.clone(),
			chat.clone(),
			config.store.admin_ids.clone(),
			config.store.currency_symbol.clone(),
		));
		let chat_handler = Arc::new(ChatHandler::new(
			sessions,
			ledger,
			settings.clone(),
			storage.clone(),
			placement,
			chat.clone(),
			event_bus.clone(),
			admin,
			config.store.min_deposit,
			config.store.currency_symbol.clone(),
		));
		let notify_handler = Arc::new(NotificationHandler::new(
			chat.clone(),
			settings,
			config.store.currency_symbol.clone(),
		));

		Self {
			config,
			storage,
			chat,
			reconciler,
			chat_handler,
			notify_handler,
			event_bus,
		}
	}

	/// Main execution loop for the storefront engine.
	///
	/// This method:
	/// 1. Starts the inbound chat update stream
	/// 2. Spawns the reconciliation loop on its interval
	/// 3. Routes inbound events and bus events to their handlers
	/// 4. Handles graceful shutdown on Ctrl+C
	pub async fn run(&self) -> Result<(), EngineError> {
		// Start the inbound update stream
		let (event_tx, mut event_rx) = mpsc::unbounded_channel();
		self.chat
			.start_updates(event_tx)
			.await
			.map_err(|e| EngineError::Service(e.to_string()))?;

		// Subscribe to bus events
		let mut bus_receiver = self.event_bus.subscribe();

		// Keep the reconciler ticking independently of event handling
		let reconciler_task = tokio::spawn(
			self.reconciler
				.clone()
				.run(Duration::from_secs(self.config.reconciler.interval_seconds)),
		);

		loop {
			tokio::select! {
				// Handle inbound chat events
				Some(event) = event_rx.recv() => {
					self.chat_handler.handle(event).await;
				}

				// Handle bus events
				Ok(event) = bus_receiver.recv() => {
					self.notify_handler.handle(event).await;
				}

				// Shutdown signal
				_ = tokio::signal::ctrl_c() => {
					break;
				}
			}
		}

		// Cleanup
		reconciler_task.abort();
		self.chat
			.stop_updates()
			.await
			.map_err(|e| EngineError::Service(e.to_string()))?;

		Ok(())
	}

	/// Returns a reference to the event bus.
	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	/// Returns a reference to the configuration.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Returns a reference to the storage service.
	pub fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}
}
