//! Status reconciliation loop.
//!
//! Periodically polls the provider for every order still in a non-terminal
//! state, maps the provider's vocabulary onto the local status machine and
//! applies at-most-once side effects on each transition. A cycle holds an
//! exclusive execution token for its duration: a cycle attempting to start
//! while one is in flight is skipped and logged, not queued.

use crate::event_bus::EventBus;
use crate::ledger::BalanceLedger;
use boost_provider::ProviderService;
use boost_storage::StorageService;
use boost_types::{
	current_timestamp, map_provider_status, truncate_id, Order, OrderEvent, OrderStatus,
	StatusMapping, StoreEvent, StorageNamespace,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Counters describing one reconciliation cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleSummary {
	/// True when the cycle was skipped because another was in flight.
	pub skipped: bool,
	/// Orders polled this cycle.
	pub polled: usize,
	/// Status transitions committed.
	pub transitioned: usize,
	/// Transitions that ended in `Completed`.
	pub completed: usize,
	/// Transitions that ended in `Cancelled` and were refunded.
	pub refunded: usize,
	/// Provider statuses outside the known vocabulary.
	pub unrecognized: usize,
	/// Provider queries that failed and were deferred to the next cycle.
	pub failures: usize,
}

/// Polls the provider and applies order status transitions.
pub struct StatusReconciler {
	storage: Arc<StorageService>,
	ledger: Arc<BalanceLedger>,
	provider: Arc<ProviderService>,
	event_bus: EventBus,
	batch_limit: usize,
	/// Single-flight token; held for the duration of a cycle.
	pub(crate) cycle_lock: Mutex<()>,
}

impl StatusReconciler {
	pub fn new(
		storage: Arc<StorageService>,
		ledger: Arc<BalanceLedger>,
		provider: Arc<ProviderService>,
		event_bus: EventBus,
		batch_limit: usize,
	) -> Self {
		Self {
			storage,
			ledger,
			provider,
			event_bus,
			batch_limit,
			cycle_lock: Mutex::new(()),
		}
	}

	/// Runs reconciliation cycles on a fixed wall-clock interval until the
	/// task is aborted.
	pub async fn run(self: Arc<Self>, interval: Duration) {
		let mut ticker = tokio::time::interval(interval);
		// The first tick fires immediately; skip it so startup settles.
		ticker.tick().await;
		loop {
			ticker.tick().await;
			let summary = self.run_cycle().await;
			if summary.skipped {
				continue;
			}
			tracing::debug!(
				polled = summary.polled,
				transitioned = summary.transitioned,
				refunded = summary.refunded,
				unrecognized = summary.unrecognized,
				failures = summary.failures,
				"Reconciliation cycle finished"
			);
		}
	}

	/// Runs one reconciliation cycle.
	///
	/// Orders are processed strictly sequentially — one outstanding
	/// provider call at a time — to keep provider call volume predictable.
	pub async fn run_cycle(&self) -> CycleSummary {
		let Ok(_guard) = self.cycle_lock.try_lock() else {
			tracing::warn!("Reconciliation cycle still in flight, skipping this tick");
			return CycleSummary {
				skipped: true,
				..CycleSummary::default()
			};
		};

		let mut summary = CycleSummary::default();

		let mut open_orders: Vec<Order> = match self
			.storage
			.list(StorageNamespace::Orders.as_str())
			.await
		{
			Ok(orders) => orders,
			Err(e) => {
				tracing::error!(error = %e, "Could not list orders, skipping cycle");
				return summary;
			},
		};
		open_orders.retain(|order| !order.status.is_terminal());
		open_orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
		if open_orders.len() > self.batch_limit {
			tracing::debug!(
				deferred = open_orders.len() - self.batch_limit,
				"Batch limit reached, deferring remaining orders to the next cycle"
			);
			open_orders.truncate(self.batch_limit);
		}

		for order in open_orders {
			summary.polled += 1;
			self.reconcile_order(&order, &mut summary).await;
		}

		summary
	}

	async fn reconcile_order(&self, order: &Order, summary: &mut CycleSummary) {
		let provider_status = match self.provider.order_status(&order.id).await {
			Ok(response) => response.status,
			Err(e) => {
				// Retried next cycle; not an error worth surfacing.
				tracing::debug!(
					order_id = %truncate_id(&order.id),
					error = %e,
					"Status query failed, deferring"
				);
				summary.failures += 1;
				return;
			},
		};

		let new_status = match map_provider_status(&provider_status) {
			StatusMapping::Known(status) => status,
			StatusMapping::Unrecognized => {
				tracing::warn!(
					order_id = %truncate_id(&order.id),
					provider_status = %provider_status,
					"Unrecognized provider status"
				);
				summary.unrecognized += 1;
				self.event_bus
					.publish(StoreEvent::Order(OrderEvent::Unrecognized {
						order_id: order.id.clone(),
						provider_status,
					}))
					.ok();
				return;
			},
		};

		// Commit the transition only if the stored order is still
		// non-terminal and actually changes value. A re-poll reporting the
		// same status is a no-op and fires nothing.
		let committed = self
			.storage
			.modify_if(
				StorageNamespace::Orders.as_str(),
				&order.id,
				|current: &Order| {
					if current.status == new_status || current.status.is_terminal() {
						return None;
					}
					let mut next = current.clone();
					next.status = new_status;
					next.provider_status = provider_status.clone();
					next.updated_at = current_timestamp();
					Some(next)
				},
			)
			.await;

		let updated = match committed {
			Ok(Some(updated)) => updated,
			Ok(None) => return,
			Err(e) => {
				tracing::error!(
					order_id = %truncate_id(&order.id),
					error = %e,
					"Could not commit status transition"
				);
				summary.failures += 1;
				return;
			},
		};

		summary.transitioned += 1;
		tracing::info!(
			order_id = %truncate_id(&updated.id),
			from = %order.status,
			to = %updated.status,
			"Order status changed"
		);
		self.event_bus
			.publish(StoreEvent::Order(OrderEvent::StatusChanged {
				order: updated.clone(),
				from: order.status,
				to: updated.status,
			}))
			.ok();

		match updated.status {
			OrderStatus::Completed => {
				summary.completed += 1;
				self.event_bus
					.publish(StoreEvent::Order(OrderEvent::Completed {
						order: updated.clone(),
					}))
					.ok();
			},
			OrderStatus::Cancelled => {
				// The terminal transition above commits at most once, so
				// this credit cannot run twice for one order.
				match self.ledger.credit(updated.user_id, updated.cost).await {
					Ok(_) => {
						summary.refunded += 1;
						self.event_bus
							.publish(StoreEvent::Order(OrderEvent::Refunded {
								order: updated.clone(),
							}))
							.ok();
					},
					Err(e) => {
						tracing::error!(
							order_id = %truncate_id(&updated.id),
							user = %updated.user_id,
							error = %e,
							"Refund credit failed"
						);
					},
				}
			},
			_ => {},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testutil::TestHarness;
	use boost_types::{ServiceKind, UserId};
	use rust_decimal_macros::dec;

	async fn place_order(h: &TestHarness, order_id: &str, cost: rust_decimal::Decimal) {
		h.ledger.get_or_create(UserId(1), "alice").await.unwrap();
		h.ledger.credit(UserId(1), dec!(5.00)).await.unwrap();
		h.settings
			.set_provider_service(ServiceKind::Views, "811")
			.await
			.unwrap();
		h.provider.queue_order(order_id);
		let outcome = h
			.placement
			.place(
				UserId(1),
				ServiceKind::Views,
				"https://example.com/v/1",
				1000,
				cost,
			)
			.await
			.unwrap();
		assert!(matches!(
			outcome,
			crate::placement::PlacementOutcome::Placed { .. }
		));
	}

	#[tokio::test]
	async fn progresses_through_processing_to_completed_once() {
		// Scenario: "In Progress" -> processing, "Completed" -> completed,
		// and a third identical poll stays silent.
		let h = TestHarness::new().await;
		place_order(&h, "555", dec!(0.90)).await;
		let mut events = h.event_bus.subscribe();
		while events.try_recv().is_ok() {}

		h.provider.set_status("555", "In Progress");
		let summary = h.reconciler.run_cycle().await;
		assert_eq!(summary.transitioned, 1);
		assert_eq!(h.order("555").await.status, OrderStatus::Processing);

		h.provider.set_status("555", "Completed");
		let summary = h.reconciler.run_cycle().await;
		assert_eq!(summary.transitioned, 1);
		assert_eq!(summary.completed, 1);
		assert_eq!(h.order("555").await.status, OrderStatus::Completed);

		// Terminal orders leave the pollable set entirely.
		let polls_before = h.provider.status_polls().len();
		let summary = h.reconciler.run_cycle().await;
		assert_eq!(summary.polled, 0);
		assert_eq!(h.provider.status_polls().len(), polls_before);

		// Exactly one Completed event across all three cycles.
		let mut completed_events = 0;
		while let Ok(event) = events.try_recv() {
			if matches!(event, StoreEvent::Order(OrderEvent::Completed { .. })) {
				completed_events += 1;
			}
		}
		assert_eq!(completed_events, 1);
	}

	#[tokio::test]
	async fn repolling_an_unchanged_status_fires_nothing() {
		let h = TestHarness::new().await;
		place_order(&h, "555", dec!(0.90)).await;

		h.provider.set_status("555", "In Progress");
		let first = h.reconciler.run_cycle().await;
		assert_eq!(first.transitioned, 1);

		let second = h.reconciler.run_cycle().await;
		assert_eq!(second.polled, 1);
		assert_eq!(second.transitioned, 0);
		let order = h.order("555").await;
		assert_eq!(order.status, OrderStatus::Processing);
	}

	#[tokio::test]
	async fn refund_credits_the_fixed_cost_exactly_once() {
		// Scenario: order 555 at 0.90 transitions to "Refunded".
		let h = TestHarness::new().await;
		place_order(&h, "555", dec!(0.90)).await;
		let before = h.ledger.get(UserId(1)).await.unwrap().unwrap();
		assert_eq!(before.balance, dec!(4.10));

		h.provider.set_status("555", "Refunded");
		let summary = h.reconciler.run_cycle().await;
		assert_eq!(summary.refunded, 1);
		assert_eq!(h.order("555").await.status, OrderStatus::Cancelled);

		let after = h.ledger.get(UserId(1)).await.unwrap().unwrap();
		assert_eq!(after.balance, dec!(5.00));
		// total_spent is monotone; a refund does not roll it back.
		assert_eq!(after.total_spent, dec!(0.90));

		// Subsequent cycles exclude the order: no poll, no second credit.
		let summary = h.reconciler.run_cycle().await;
		assert_eq!(summary.polled, 0);
		let later = h.ledger.get(UserId(1)).await.unwrap().unwrap();
		assert_eq!(later.balance, dec!(5.00));
	}

	#[tokio::test]
	async fn unrecognized_status_is_observable_and_mutates_nothing() {
		let h = TestHarness::new().await;
		place_order(&h, "555", dec!(0.90)).await;
		let mut events = h.event_bus.subscribe();
		while events.try_recv().is_ok() {}

		h.provider.set_status("555", "Queued");
		let summary = h.reconciler.run_cycle().await;
		assert_eq!(summary.unrecognized, 1);
		assert_eq!(summary.transitioned, 0);
		assert_eq!(h.order("555").await.status, OrderStatus::Pending);

		assert!(matches!(
			events.try_recv(),
			Ok(StoreEvent::Order(OrderEvent::Unrecognized { .. }))
		));
	}

	#[tokio::test]
	async fn provider_failure_defers_the_order_to_the_next_cycle() {
		let h = TestHarness::new().await;
		place_order(&h, "555", dec!(0.90)).await;

		// No scripted status: the query fails softly.
		let summary = h.reconciler.run_cycle().await;
		assert_eq!(summary.failures, 1);
		assert_eq!(h.order("555").await.status, OrderStatus::Pending);

		// Next cycle retries and succeeds.
		h.provider.set_status("555", "Completed");
		let summary = h.reconciler.run_cycle().await;
		assert_eq!(summary.completed, 1);
	}

	#[tokio::test]
	async fn cycles_are_bounded_by_the_batch_limit() {
		let h = TestHarness::with_batch_limit(2).await;
		h.ledger.get_or_create(UserId(1), "alice").await.unwrap();
		h.ledger.credit(UserId(1), dec!(50.00)).await.unwrap();
		h.settings
			.set_provider_service(ServiceKind::Views, "811")
			.await
			.unwrap();
		for (order_id, link) in [
			("601", "https://example.com/v/1"),
			("602", "https://example.com/v/2"),
			("603", "https://example.com/v/3"),
		] {
			h.provider.queue_order(order_id);
			h.placement
				.place(UserId(1), ServiceKind::Views, link, 1000, dec!(0.90))
				.await
				.unwrap();
			h.provider.set_status(order_id, "In Progress");
		}

		let summary = h.reconciler.run_cycle().await;
		assert_eq!(summary.polled, 2);
		assert_eq!(h.provider.status_polls().len(), 2);
	}

	#[tokio::test]
	async fn overlapping_cycles_are_skipped_not_queued() {
		let h = TestHarness::new().await;
		let _in_flight = h.reconciler.cycle_lock.lock().await;
		let summary = h.reconciler.run_cycle().await;
		assert!(summary.skipped);
	}
}
