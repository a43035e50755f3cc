//! Shared fixtures for engine tests.
//!
//! Wires the full engine stack against the in-memory storage backend and
//! the scriptable provider/chat mocks, keeping handles on the mocks so
//! tests can script responses and assert on outbound traffic.

use crate::event_bus::EventBus;
use crate::handlers::{AdminHandler, ChatHandler, NotificationHandler};
use crate::ledger::BalanceLedger;
use crate::placement::OrderPlacementEngine;
use crate::reconciler::StatusReconciler;
use crate::settings::SettingsStore;
use boost_chat::implementations::mock::MockChat;
use boost_chat::ChatService;
use boost_provider::implementations::mock::MockProvider;
use boost_provider::ProviderService;
use boost_session::SessionStore;
use boost_storage::implementations::memory::MemoryStorage;
use boost_storage::StorageService;
use boost_types::{InboundEvent, InboundKind, Order, OrderStatus, StorageNamespace, UserId};
use rust_decimal_macros::dec;
use std::sync::Arc;

/// The admin id every harness allow-lists.
pub(crate) const ADMIN_ID: i64 = 1000;

pub(crate) struct TestHarness {
	pub storage: Arc<StorageService>,
	pub ledger: Arc<BalanceLedger>,
	pub settings: Arc<SettingsStore>,
	pub sessions: Arc<SessionStore>,
	pub provider: Arc<MockProvider>,
	pub chat_mock: Arc<MockChat>,
	pub chat: Arc<ChatService>,
	pub placement: Arc<OrderPlacementEngine>,
	pub reconciler: Arc<StatusReconciler>,
	pub event_bus: EventBus,
	pub handler: Arc<ChatHandler>,
	pub notifier: Arc<NotificationHandler>,
}

impl TestHarness {
	pub async fn new() -> Self {
		Self::with_batch_limit(50).await
	}

	pub async fn with_batch_limit(batch_limit: usize) -> Self {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let event_bus = EventBus::new(64);

		let provider = Arc::new(MockProvider::new());
		let provider_service = Arc::new(ProviderService::new(Box::new(provider.clone())));
		let chat_mock = Arc::new(MockChat::new());
		let chat = Arc::new(ChatService::new(Box::new(chat_mock.clone())));

		let ledger = Arc::new(BalanceLedger::new(storage.clone()));
		let settings = Arc::new(SettingsStore::new(storage.clone()));
		let sessions = Arc::new(SessionStore::new());

		let placement = Arc::new(OrderPlacementEngine::new(
			storage.clone(),
			ledger.clone(),
			settings.clone(),
			provider_service.clone(),
			event_bus.clone(),
		));
		let reconciler = Arc::new(StatusReconciler::new(
			storage.clone(),
			ledger.clone(),
			provider_service,
			event_bus.clone(),
			batch_limit,
		));
		let admin = Arc::new(AdminHandler::new(
			settings.clone(),
			ledger.clone(),
			storage.clone(),
			sessions.clone(),
			chat.clone(),
			vec![ADMIN_ID],
			"$".to_string(),
		));
		let handler = Arc::new(ChatHandler::new(
			sessions.clone(),
			ledger.clone(),
			settings.clone(),
			storage.clone(),
			placement.clone(),
			chat.clone(),
			event_bus.clone(),
			admin,
			dec!(5.00),
			"$".to_string(),
		));
		let notifier = Arc::new(NotificationHandler::new(
			chat.clone(),
			settings.clone(),
			"$".to_string(),
		));

		Self {
			storage,
			ledger,
			settings,
			sessions,
			provider,
			chat_mock,
			chat,
			placement,
			reconciler,
			event_bus,
			handler,
			notifier,
		}
	}

	/// All persisted orders.
	pub async fn orders(&self) -> Vec<Order> {
		self.storage
			.list(StorageNamespace::Orders.as_str())
			.await
			.unwrap()
	}

	/// One persisted order by id.
	pub async fn order(&self, id: &str) -> Order {
		self.storage
			.retrieve(StorageNamespace::Orders.as_str(), id)
			.await
			.unwrap()
	}

	/// Forces an order terminal, as if reconciled long ago.
	pub async fn complete_order(&self, id: &str) {
		self.storage
			.modify(StorageNamespace::Orders.as_str(), id, |order: &mut Order| {
				order.status = OrderStatus::Completed;
			})
			.await
			.unwrap();
	}
}

/// Builds an inbound event from a user already known by their id.
pub(crate) fn inbound(user: i64, kind: InboundKind) -> InboundEvent {
	InboundEvent {
		user_id: UserId(user),
		handle: format!("user{}", user),
		kind,
	}
}
