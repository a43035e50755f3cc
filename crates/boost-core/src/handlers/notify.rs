//! Notification handler.
//!
//! Consumes bus events and turns them into chat messages. Because the
//! mutating components publish each event at most once per transition, a
//! notification can never fire twice for the same state change; and because
//! every send here is best-effort, a chat failure can never block or roll
//! back the transition that caused it.

use crate::handlers::fmt_money;
use crate::settings::SettingsStore;
use boost_chat::ChatService;
use boost_types::{DepositEvent, Order, OrderEvent, StoreEvent, UserId};
use std::sync::Arc;

/// Sends user and channel notifications for bus events.
pub struct NotificationHandler {
	chat: Arc<ChatService>,
	settings: Arc<SettingsStore>,
	currency: String,
}

impl NotificationHandler {
	pub fn new(chat: Arc<ChatService>, settings: Arc<SettingsStore>, currency: String) -> Self {
		Self {
			chat,
			settings,
			currency,
		}
	}

	/// Handles one bus event.
	pub async fn handle(&self, event: StoreEvent) {
		match event {
			StoreEvent::Order(OrderEvent::Placed { order }) => {
				self.announce(&format!(
					"New order #{}: {} {} for {}.",
					order.id,
					order.quantity,
					order.service,
					fmt_money(&self.currency, order.cost),
				))
				.await;
			},
			StoreEvent::Order(OrderEvent::Completed { order }) => {
				self.chat
					.notify(
						order.user_id,
						&format!(
							"Your order #{} ({} {}) is completed.",
							order.id, order.quantity, order.service,
						),
					)
					.await;
			},
			StoreEvent::Order(OrderEvent::Refunded { order }) => {
				self.notify_refund(&order).await;
			},
			StoreEvent::Deposit(DepositEvent::Submitted { deposit }) => {
				self.announce(&format!(
					"Deposit of {} from user {} is pending review.",
					fmt_money(&self.currency, deposit.amount),
					deposit.user_id,
				))
				.await;
			},
			// Transitions without a user-facing side effect.
			StoreEvent::Order(OrderEvent::StatusChanged { .. })
			| StoreEvent::Order(OrderEvent::Unrecognized { .. }) => {},
		}
	}

	async fn notify_refund(&self, order: &Order) {
		self.chat
			.notify(
				order.user_id,
				&format!(
					"Your order #{} was cancelled. {} has been returned to your balance.",
					order.id,
					fmt_money(&self.currency, order.cost),
				),
			)
			.await;
	}

	/// Best-effort announcement to the configured channel, if any.
	async fn announce(&self, text: &str) {
		match self.settings.notify_channel().await {
			Ok(Some(channel)) => self.chat.notify(UserId(channel), text).await,
			Ok(None) => {},
			Err(e) => {
				tracing::debug!(error = %e, "Could not read notify channel");
			},
		}
	}
}
