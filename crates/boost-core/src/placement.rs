//! Order placement engine.
//!
//! Turns a confirmed dialog into a provider order and a ledger debit. The
//! preconditions run in a fixed sequence — duplicate guard, balance check,
//! provider acceptance — and nothing is mutated until all three pass, so a
//! failed placement never leaves partial state behind.

use crate::event_bus::EventBus;
use crate::ledger::{BalanceLedger, LedgerError};
use crate::settings::SettingsStore;
use boost_provider::ProviderService;
use boost_storage::{StorageError, StorageService};
use boost_types::{
	current_timestamp, Order, OrderEvent, OrderStatus, ServiceKind, StoreEvent, StorageNamespace,
	UserId,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during order placement.
///
/// These are internal failures; the business outcomes a user can cause are
/// expressed through [`PlacementOutcome`] instead.
#[derive(Debug, Error)]
pub enum PlacementError {
	#[error("Storage error: {0}")]
	Storage(String),
	#[error("Ledger error: {0}")]
	Ledger(String),
}

impl From<StorageError> for PlacementError {
	fn from(err: StorageError) -> Self {
		PlacementError::Storage(err.to_string())
	}
}

impl From<LedgerError> for PlacementError {
	fn from(err: LedgerError) -> Self {
		PlacementError::Ledger(err.to_string())
	}
}

/// Outcome of a placement attempt.
#[derive(Debug)]
pub enum PlacementOutcome {
	/// Order accepted by the provider, persisted and paid for.
	Placed { order: Order },
	/// An order for the same (user, link, service) is still active.
	DuplicateActive,
	/// The user's balance does not cover the cost.
	InsufficientBalance { balance: Decimal, cost: Decimal },
	/// The provider rejected the order or could not be reached; nothing
	/// was charged and no order record exists.
	ProviderUnavailable,
}

/// Validates, prices and places orders against the provider.
pub struct OrderPlacementEngine {
	storage: Arc<StorageService>,
	ledger: Arc<BalanceLedger>,
	settings: Arc<SettingsStore>,
	provider: Arc<ProviderService>,
	event_bus: EventBus,
}

impl OrderPlacementEngine {
	pub fn new(
		storage: Arc<StorageService>,
		ledger: Arc<BalanceLedger>,
		settings: Arc<SettingsStore>,
		provider: Arc<ProviderService>,
		event_bus: EventBus,
	) -> Self {
		Self {
			storage,
			ledger,
			settings,
			provider,
			event_bus,
		}
	}

	/// Places an order with the cost recorded when the quantity was
	/// accepted. The cost is never recomputed here: a price change between
	/// the summary and the confirmation charges the summarized amount.
	pub async fn place(
		&self,
		user_id: UserId,
		service: ServiceKind,
		link: &str,
		quantity: u64,
		cost: Decimal,
	) -> Result<PlacementOutcome, PlacementError> {
		// Duplicate guard: one active order per (user, link, service).
		if self.has_active_order(user_id, service, link).await? {
			tracing::info!(user = %user_id, service = %service, "Duplicate active order refused");
			return Ok(PlacementOutcome::DuplicateActive);
		}

		// Sufficiency check happens-before the debit.
		let user = self
			.ledger
			.get(user_id)
			.await?
			.ok_or_else(|| PlacementError::Ledger(format!("user {} missing", user_id)))?;
		if user.balance < cost {
			return Ok(PlacementOutcome::InsufficientBalance {
				balance: user.balance,
				cost,
			});
		}

		// Provider acceptance. A missing service id is indistinguishable
		// from an unreachable provider as far as the user is concerned.
		let Some(service_id) = self.settings.provider_service(service).await? else {
			tracing::error!(service = %service, "No provider service id configured");
			return Ok(PlacementOutcome::ProviderUnavailable);
		};
		let accepted = match self
			.provider
			.create_order(&service_id, link, quantity)
			.await
		{
			Ok(accepted) => accepted,
			Err(_) => return Ok(PlacementOutcome::ProviderUnavailable),
		};

		// Point of no return: debit, then persist the order record.
		let now = current_timestamp();
		self.ledger.debit(user_id, cost).await?;
		let order = Order {
			id: accepted.order_id,
			user_id,
			service,
			link: link.to_string(),
			quantity,
			cost,
			status: OrderStatus::Pending,
			provider_status: accepted.status.unwrap_or_default(),
			created_at: now,
			updated_at: now,
		};
		self.storage
			.insert(StorageNamespace::Orders.as_str(), &order.id, &order)
			.await?;

		tracing::info!(
			order_id = %order.id,
			user = %user_id,
			service = %service,
			cost = %cost,
			"Order placed"
		);
		self.event_bus
			.publish(StoreEvent::Order(OrderEvent::Placed {
				order: order.clone(),
			}))
			.ok();

		Ok(PlacementOutcome::Placed { order })
	}

	/// Whether a non-terminal order already exists for the triple.
	async fn has_active_order(
		&self,
		user_id: UserId,
		service: ServiceKind,
		link: &str,
	) -> Result<bool, StorageError> {
		let orders: Vec<Order> = self
			.storage
			.list(StorageNamespace::Orders.as_str())
			.await?;
		Ok(orders.iter().any(|order| {
			order.user_id == user_id
				&& order.service == service
				&& order.link == link
				&& !order.status.is_terminal()
		}))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testutil::TestHarness;
	use rust_decimal_macros::dec;

	const LINK: &str = "https://example.com/p/42";

	#[tokio::test]
	async fn rejects_when_balance_is_insufficient() {
		// Scenario: new user with balance 0 confirms a 1.20 order.
		let h = TestHarness::new().await;
		h.ledger.get_or_create(UserId(1), "alice").await.unwrap();
		h.provider.queue_order("900");

		let outcome = h
			.placement
			.place(UserId(1), ServiceKind::Likes, LINK, 1000, dec!(1.20))
			.await
			.unwrap();

		assert!(matches!(
			outcome,
			PlacementOutcome::InsufficientBalance { balance, cost }
				if balance == dec!(0) && cost == dec!(1.20)
		));
		// No order record, no debit, no provider call consumed.
		assert!(h.orders().await.is_empty());
		let user = h.ledger.get(UserId(1)).await.unwrap().unwrap();
		assert_eq!(user.balance, dec!(0));
		assert_eq!(user.total_spent, dec!(0));
		assert!(h.provider.created().is_empty());
	}

	#[tokio::test]
	async fn places_and_debits_on_success() {
		// Scenario: balance 5.00, views at 0.90 per 1000, quantity 1000.
		let h = TestHarness::new().await;
		h.ledger.get_or_create(UserId(1), "alice").await.unwrap();
		h.ledger.credit(UserId(1), dec!(5.00)).await.unwrap();
		h.settings
			.set_provider_service(ServiceKind::Views, "811")
			.await
			.unwrap();
		h.provider.queue_order("555");

		let outcome = h
			.placement
			.place(UserId(1), ServiceKind::Views, LINK, 1000, dec!(0.90))
			.await
			.unwrap();

		let PlacementOutcome::Placed { order } = outcome else {
			panic!("expected placement");
		};
		assert_eq!(order.id, "555");
		assert_eq!(order.status, OrderStatus::Pending);
		assert_eq!(order.cost, dec!(0.90));

		let user = h.ledger.get(UserId(1)).await.unwrap().unwrap();
		assert_eq!(user.balance, dec!(4.10));
		assert_eq!(user.total_spent, dec!(0.90));

		let created = h.provider.created();
		assert_eq!(created.len(), 1);
		assert_eq!(created[0].service_id, "811");
		assert_eq!(created[0].quantity, 1000);
	}

	#[tokio::test]
	async fn duplicate_active_order_is_refused() {
		let h = TestHarness::new().await;
		h.ledger.get_or_create(UserId(1), "alice").await.unwrap();
		h.ledger.credit(UserId(1), dec!(10.00)).await.unwrap();
		h.settings
			.set_provider_service(ServiceKind::Likes, "801")
			.await
			.unwrap();
		h.provider.queue_order("700");
		h.provider.queue_order("701");

		let first = h
			.placement
			.place(UserId(1), ServiceKind::Likes, LINK, 500, dec!(0.60))
			.await
			.unwrap();
		assert!(matches!(first, PlacementOutcome::Placed { .. }));

		let second = h
			.placement
			.place(UserId(1), ServiceKind::Likes, LINK, 500, dec!(0.60))
			.await
			.unwrap();
		assert!(matches!(second, PlacementOutcome::DuplicateActive));

		// Exactly one order and one debit.
		assert_eq!(h.orders().await.len(), 1);
		let user = h.ledger.get(UserId(1)).await.unwrap().unwrap();
		assert_eq!(user.balance, dec!(9.40));
		assert_eq!(user.total_spent, dec!(0.60));
	}

	#[tokio::test]
	async fn same_link_different_service_is_not_a_duplicate() {
		let h = TestHarness::new().await;
		h.ledger.get_or_create(UserId(1), "alice").await.unwrap();
		h.ledger.credit(UserId(1), dec!(10.00)).await.unwrap();
		h.settings
			.set_provider_service(ServiceKind::Likes, "801")
			.await
			.unwrap();
		h.settings
			.set_provider_service(ServiceKind::Views, "811")
			.await
			.unwrap();
		h.provider.queue_order("700");
		h.provider.queue_order("701");

		let likes = h
			.placement
			.place(UserId(1), ServiceKind::Likes, LINK, 500, dec!(0.60))
			.await
			.unwrap();
		let views = h
			.placement
			.place(UserId(1), ServiceKind::Views, LINK, 1000, dec!(0.90))
			.await
			.unwrap();
		assert!(matches!(likes, PlacementOutcome::Placed { .. }));
		assert!(matches!(views, PlacementOutcome::Placed { .. }));
	}

	#[tokio::test]
	async fn terminal_orders_do_not_block_reordering() {
		let h = TestHarness::new().await;
		h.ledger.get_or_create(UserId(1), "alice").await.unwrap();
		h.ledger.credit(UserId(1), dec!(10.00)).await.unwrap();
		h.settings
			.set_provider_service(ServiceKind::Likes, "801")
			.await
			.unwrap();
		h.provider.queue_order("700");
		h.provider.queue_order("701");

		let first = h
			.placement
			.place(UserId(1), ServiceKind::Likes, LINK, 500, dec!(0.60))
			.await
			.unwrap();
		let PlacementOutcome::Placed { order } = first else {
			panic!("expected placement");
		};
		h.complete_order(&order.id).await;

		let second = h
			.placement
			.place(UserId(1), ServiceKind::Likes, LINK, 500, dec!(0.60))
			.await
			.unwrap();
		assert!(matches!(second, PlacementOutcome::Placed { .. }));
	}

	#[tokio::test]
	async fn provider_failure_leaves_no_state() {
		let h = TestHarness::new().await;
		h.ledger.get_or_create(UserId(1), "alice").await.unwrap();
		h.ledger.credit(UserId(1), dec!(5.00)).await.unwrap();
		h.settings
			.set_provider_service(ServiceKind::Views, "811")
			.await
			.unwrap();
		h.provider.queue_failure("connection reset");

		let outcome = h
			.placement
			.place(UserId(1), ServiceKind::Views, LINK, 1000, dec!(0.90))
			.await
			.unwrap();

		assert!(matches!(outcome, PlacementOutcome::ProviderUnavailable));
		assert!(h.orders().await.is_empty());
		let user = h.ledger.get(UserId(1)).await.unwrap().unwrap();
		assert_eq!(user.balance, dec!(5.00));
		assert_eq!(user.total_spent, dec!(0));
	}

	#[tokio::test]
	async fn missing_service_id_reads_as_provider_unavailable() {
		let h = TestHarness::new().await;
		h.ledger.get_or_create(UserId(1), "alice").await.unwrap();
		h.ledger.credit(UserId(1), dec!(5.00)).await.unwrap();
		h.provider.queue_order("900");

		let outcome = h
			.placement
			.place(UserId(1), ServiceKind::Views, LINK, 1000, dec!(0.90))
			.await
			.unwrap();

		assert!(matches!(outcome, PlacementOutcome::ProviderUnavailable));
		assert!(h.provider.created().is_empty());
	}
}
