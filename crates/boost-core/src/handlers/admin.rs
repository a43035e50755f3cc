//! Administrative command handler.
//!
//! Thin callers into the settings store and the balance ledger. The only
//! piece of logic owned here is the authorization check: the caller id must
//! be in the configured allow-list.

use crate::handlers::fmt_money;
use crate::ledger::BalanceLedger;
use crate::settings::SettingsStore;
use boost_chat::ChatService;
use boost_session::SessionStore;
use boost_storage::StorageService;
use boost_types::{Command, Order, PendingDeposit, StorageNamespace, UserId};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Executes allow-listed administrative commands.
pub struct AdminHandler {
	settings: Arc<SettingsStore>,
	ledger: Arc<BalanceLedger>,
	storage: Arc<StorageService>,
	sessions: Arc<SessionStore>,
	chat: Arc<ChatService>,
	admin_ids: Vec<i64>,
	currency: String,
}

impl AdminHandler {
	pub fn new(
		settings: Arc<SettingsStore>,
		ledger: Arc<BalanceLedger>,
		storage: Arc<StorageService>,
		sessions: Arc<SessionStore>,
		chat: Arc<ChatService>,
		admin_ids: Vec<i64>,
		currency: String,
	) -> Self {
		Self {
			settings,
			ledger,
			storage,
			sessions,
			chat,
			admin_ids,
			currency,
		}
	}

	/// Whether the caller may run administrative commands.
	pub fn is_admin(&self, user: UserId) -> bool {
		self.admin_ids.contains(&user.0)
	}

	/// Executes an administrative command, returning the reply to send.
	pub async fn handle(&self, caller: UserId, command: Command) -> Option<String> {
		if !self.is_admin(caller) {
			tracing::warn!(user = %caller, ?command, "Unauthorized admin command");
			return Some("Not authorized.".to_string());
		}

		let reply = match command {
			Command::SetPrice { service, price } => {
				if price <= Decimal::ZERO {
					"Price must be positive.".to_string()
				} else {
					match self.settings.set_price(service, price).await {
						Ok(()) => format!(
							"Price for {} set to {} per 1000.",
							service,
							fmt_money(&self.currency, price)
						),
						Err(e) => {
							tracing::error!(error = %e, "Could not store price");
							"Could not store the price.".to_string()
						},
					}
				}
			},
			Command::SetService { service, id } => {
				match self.settings.set_provider_service(service, &id).await {
					Ok(()) => format!("Provider service for {} set to {}.", service, id),
					Err(e) => {
						tracing::error!(error = %e, "Could not store service id");
						"Could not store the service id.".to_string()
					},
				}
			},
			Command::Credit { user, amount } => self.handle_credit(user, amount).await,
			Command::Broadcast { text } => self.handle_broadcast(&text).await,
			Command::Panel => self.handle_panel().await,
			// User commands are routed before this handler is reached.
			Command::Profile | Command::Orders => return None,
		};
		Some(reply)
	}

	/// Credits a user's balance after a deposit review.
	async fn handle_credit(&self, user: UserId, amount: Decimal) -> String {
		if amount <= Decimal::ZERO {
			return "Amount must be positive.".to_string();
		}
		match self.ledger.get(user).await {
			Ok(Some(_)) => {},
			Ok(None) => return format!("Unknown user {}.", user),
			Err(e) => {
				tracing::error!(user = %user, error = %e, "Could not load user");
				return "Could not load the user.".to_string();
			},
		}
		match self.ledger.credit(user, amount).await {
			Ok(updated) => {
				self.chat
					.notify(
						user,
						&format!(
							"Your balance was credited with {}. New balance: {}.",
							fmt_money(&self.currency, amount),
							fmt_money(&self.currency, updated.balance),
						),
					)
					.await;
				format!(
					"Credited {} to {}. New balance: {}.",
					fmt_money(&self.currency, amount),
					user,
					fmt_money(&self.currency, updated.balance),
				)
			},
			Err(e) => {
				tracing::error!(user = %user, error = %e, "Credit failed");
				"Credit failed.".to_string()
			},
		}
	}

	/// Sends a text to every known, non-banned user.
	async fn handle_broadcast(&self, text: &str) -> String {
		let users = match self.ledger.all_users().await {
			Ok(users) => users,
			Err(e) => {
				tracing::error!(error = %e, "Could not list users");
				return "Could not list users.".to_string();
			},
		};
		let targets: Vec<UserId> = users
			.iter()
			.filter(|user| !user.banned)
			.map(|user| user.id)
			.collect();
		let delivered = self.chat.broadcast(&targets, text).await;
		format!("Broadcast delivered to {} of {} users.", delivered, targets.len())
	}

	/// Summarizes storefront totals.
	async fn handle_panel(&self) -> String {
		let users = self.ledger.all_users().await.unwrap_or_default();
		let orders: Vec<Order> = self
			.storage
			.list(StorageNamespace::Orders.as_str())
			.await
			.unwrap_or_default();
		let deposits: Vec<PendingDeposit> = self
			.storage
			.list(StorageNamespace::Deposits.as_str())
			.await
			.unwrap_or_default();

		let revenue: Decimal = users.iter().map(|user| user.total_spent).sum();
		let active = orders
			.iter()
			.filter(|order| !order.status.is_terminal())
			.count();
		format!(
			"Users: {}\nOrders: {} ({} active)\nRevenue: {}\nDeposits pending review: {}\nActive dialogs: {}",
			users.len(),
			orders.len(),
			active,
			fmt_money(&self.currency, revenue),
			deposits.len(),
			self.sessions.active(),
		)
	}
}
