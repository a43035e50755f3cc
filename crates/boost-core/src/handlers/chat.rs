//! Chat event handler.
//!
//! Routes every inbound chat event through the conversation state machine
//! and, on a confirmed order, hands control to the placement engine. Any
//! event that does not match the active dialog step's expected input falls
//! through unconsumed — ordinary conversation, not an error. All replies
//! are best-effort: a failed send never fails the handling of an event.

use crate::event_bus::EventBus;
use crate::handlers::{fmt_money, AdminHandler};
use crate::ledger::BalanceLedger;
use crate::placement::{OrderPlacementEngine, PlacementOutcome};
use crate::settings::SettingsStore;
use boost_chat::ChatService;
use boost_session::dialog::{AmountOutcome, LinkOutcome, QuantityOutcome};
use boost_session::{dialog, SessionStore};
use boost_storage::{StorageError, StorageService};
use boost_types::{
	current_timestamp, order_cost, Button, ButtonAction, Command, DepositEvent, InboundEvent,
	InboundKind, Order, PendingDeposit, ServiceKind, SessionState, StoreEvent, StorageNamespace,
	UserId,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

/// How many orders `/orders` lists.
const ORDER_HISTORY_LIMIT: usize = 10;

/// Drives the per-user conversational state machine.
pub struct ChatHandler {
	sessions: Arc<SessionStore>,
	ledger: Arc<BalanceLedger>,
	settings: Arc<SettingsStore>,
	storage: Arc<StorageService>,
	placement: Arc<OrderPlacementEngine>,
	chat: Arc<ChatService>,
	event_bus: EventBus,
	admin: Arc<AdminHandler>,
	min_deposit: Decimal,
	currency: String,
}

impl ChatHandler {
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		sessions: Arc<SessionStore>,
		ledger: Arc<BalanceLedger>,
		settings: Arc<SettingsStore>,
		storage: Arc<StorageService>,
		placement: Arc<OrderPlacementEngine>,
		chat: Arc<ChatService>,
		event_bus: EventBus,
		admin: Arc<AdminHandler>,
		min_deposit: Decimal,
		currency: String,
	) -> Self {
		Self {
			sessions,
			ledger,
			settings,
			storage,
			placement,
			chat,
			event_bus,
			admin,
			min_deposit,
			currency,
		}
	}

	/// Handles one inbound chat event.
	///
	/// Never returns an error: everything that can go wrong here is either
	/// a user mistake (answered in chat) or a collaborator failure (logged
	/// and swallowed).
	pub async fn handle(&self, event: InboundEvent) {
		let user = match self.ledger.get_or_create(event.user_id, &event.handle).await {
			Ok(user) => user,
			Err(e) => {
				tracing::error!(user = %event.user_id, error = %e, "Could not load user");
				return;
			},
		};
		if user.banned {
			if matches!(event.kind, InboundKind::Start) {
				self.chat
					.notify(event.user_id, "Your account is suspended.")
					.await;
			}
			return;
		}

		match event.kind {
			InboundKind::Start => self.handle_start(event.user_id).await,
			InboundKind::Button(tag) => match ButtonAction::from_tag(&tag) {
				Some(action) => self.handle_button(event.user_id, action).await,
				None => {
					tracing::debug!(user = %event.user_id, tag = %tag, "Unknown button tag");
				},
			},
			InboundKind::Text(text) => self.handle_text(event.user_id, &text).await,
			InboundKind::Photo { file_ref } => self.handle_photo(event.user_id, &file_ref).await,
			InboundKind::Command(command) => self.handle_command(event.user_id, command).await,
		}
	}

	async fn handle_start(&self, user: UserId) {
		// A restart always abandons whatever dialog was active.
		self.sessions.clear(user);
		let keyboard = vec![
			vec![
				Button::new("Order likes", ButtonAction::Order(ServiceKind::Likes)),
				Button::new("Order views", ButtonAction::Order(ServiceKind::Views)),
			],
			vec![Button::new("Add funds", ButtonAction::AddFunds)],
		];
		let text = "Welcome to the boost store!\n\
			Pick a service to order, or add funds first.\n\
			/profile shows your balance, /orders your order history.";
		if let Err(e) = self.chat.send_keyboard(user, text, &keyboard).await {
			tracing::warn!(user = %user, error = %e, "Could not send welcome");
		}
	}

	async fn handle_button(&self, user: UserId, action: ButtonAction) {
		match action {
			ButtonAction::AddFunds => {
				self.sessions.begin(user, SessionState::AwaitingAmount);
				self.chat
					.notify(
						user,
						&format!(
							"Enter the amount you want to add (minimum {}).",
							fmt_money(&self.currency, self.min_deposit)
						),
					)
					.await;
			},
			ButtonAction::Order(service) => {
				self.sessions
					.begin(user, SessionState::AwaitingLink { service });
				self.chat
					.notify(
						user,
						&format!("Send the link you want {} delivered to.", service),
					)
					.await;
			},
			ButtonAction::Confirm => self.handle_confirm(user).await,
			ButtonAction::Cancel => {
				self.sessions.clear(user);
				self.chat.notify(user, "Cancelled.").await;
			},
		}
	}

	async fn handle_confirm(&self, user: UserId) {
		let Some(session) = self.sessions.get(user) else {
			return;
		};
		let SessionState::AwaitingConfirmation {
			service,
			link,
			quantity,
			cost,
		} = session.state.clone()
		else {
			return;
		};
		// The cursor is cleared on every confirmation outcome; losing the
		// version race means another event already superseded this dialog.
		if !self.sessions.clear_if(user, session.version) {
			return;
		}

		match self
			.placement
			.place(user, service, &link, quantity, cost)
			.await
		{
			Ok(PlacementOutcome::Placed { order }) => {
				let balance = self
					.ledger
					.get(user)
					.await
					.ok()
					.flatten()
					.map(|u| u.balance)
					.unwrap_or_default();
				self.chat
					.notify(
						user,
						&format!(
							"Order {} placed: {} {} for {}.\nNew balance: {}.",
							order.id,
							order.quantity,
							order.service,
							fmt_money(&self.currency, order.cost),
							fmt_money(&self.currency, balance),
						),
					)
					.await;
			},
			Ok(PlacementOutcome::DuplicateActive) => {
				self.chat
					.notify(
						user,
						"You already have an active order for this link. Wait for it to finish first.",
					)
					.await;
			},
			Ok(PlacementOutcome::InsufficientBalance { balance, cost }) => {
				self.chat
					.notify(
						user,
						&format!(
							"Insufficient balance: the order costs {} but you have {}. Use Add funds first.",
							fmt_money(&self.currency, cost),
							fmt_money(&self.currency, balance),
						),
					)
					.await;
			},
			Ok(PlacementOutcome::ProviderUnavailable) => {
				self.chat
					.notify(user, "The service is temporarily unavailable. Please try again later.")
					.await;
			},
			Err(e) => {
				tracing::error!(user = %user, error = %e, "Placement failed");
				self.chat
					.notify(user, "Something went wrong. Please try again later.")
					.await;
			},
		}
	}

	async fn handle_text(&self, user: UserId, text: &str) {
		let Some(session) = self.sessions.get(user) else {
			// No dialog active; ordinary conversation.
			return;
		};

		match session.state.clone() {
			SessionState::AwaitingAmount => {
				match dialog::parse_amount(text, self.min_deposit) {
					AmountOutcome::Accepted { amount } => {
						let next = SessionState::AwaitingProof {
							amount,
							submitted_at: current_timestamp(),
						};
						if self.sessions.transition(user, session.version, next) {
							self.chat
								.notify(
									user,
									&format!(
										"Adding {}. Now send a screenshot of your payment as proof.",
										fmt_money(&self.currency, amount)
									),
								)
								.await;
						}
					},
					AmountOutcome::BelowMinimum { minimum } => {
						self.chat
							.notify(
								user,
								&format!(
									"The minimum amount is {}.",
									fmt_money(&self.currency, minimum)
								),
							)
							.await;
					},
					AmountOutcome::NotANumber => {
						self.chat
							.notify(user, "Please enter a number, e.g. 10.00.")
							.await;
					},
				}
			},
			SessionState::AwaitingLink { service } => match dialog::extract_link(text) {
				LinkOutcome::Accepted { link } => {
					let (min, max) = service.bounds();
					let next = SessionState::AwaitingQuantity { service, link };
					if self.sessions.transition(user, session.version, next) {
						self.chat
							.notify(
								user,
								&format!("How many {}? ({} to {})", service, min, max),
							)
							.await;
					}
				},
				LinkOutcome::Invalid => {
					self.chat
						.notify(user, "That does not look like a link. Send a full URL.")
						.await;
				},
			},
			SessionState::AwaitingQuantity { service, link } => {
				match dialog::parse_quantity(text, service) {
					QuantityOutcome::Accepted { quantity } => {
						self.quote_order(user, session.version, service, link, quantity)
							.await;
					},
					QuantityOutcome::OutOfBounds { min, max } => {
						self.chat
							.notify(
								user,
								&format!("Quantity must be between {} and {}.", min, max),
							)
							.await;
					},
					QuantityOutcome::NotANumber => {
						self.chat
							.notify(user, "Please enter a whole number.")
							.await;
					},
				}
			},
			// Text is not the expected input for these steps; the event
			// falls through unconsumed.
			SessionState::AwaitingProof { .. } | SessionState::AwaitingConfirmation { .. } => {},
		}
	}

	/// Prices the order at the current setting and moves the dialog to the
	/// confirmation step. The computed cost is fixed from here on.
	async fn quote_order(
		&self,
		user: UserId,
		session_version: u64,
		service: ServiceKind,
		link: String,
		quantity: u64,
	) {
		let price = match self.settings.price(service).await {
			Ok(Some(price)) => price,
			Ok(None) => {
				tracing::error!(service = %service, "No price configured");
				self.chat
					.notify(user, "This service is temporarily unavailable.")
					.await;
				return;
			},
			Err(e) => {
				tracing::error!(service = %service, error = %e, "Could not read price");
				self.chat
					.notify(user, "Something went wrong. Please try again later.")
					.await;
				return;
			},
		};

		let cost = order_cost(price, quantity);
		let next = SessionState::AwaitingConfirmation {
			service,
			link,
			quantity,
			cost,
		};
		if !self.sessions.transition(user, session_version, next) {
			return;
		}

		let keyboard = vec![vec![
			Button::new("Confirm", ButtonAction::Confirm),
			Button::new("Cancel", ButtonAction::Cancel),
		]];
		let text = format!(
			"Order summary:\n{} {}\nCost: {}\nConfirm?",
			quantity,
			service,
			fmt_money(&self.currency, cost),
		);
		if let Err(e) = self.chat.send_keyboard(user, &text, &keyboard).await {
			tracing::warn!(user = %user, error = %e, "Could not send order summary");
		}
	}

	async fn handle_photo(&self, user: UserId, file_ref: &str) {
		let Some(session) = self.sessions.get(user) else {
			return;
		};
		let SessionState::AwaitingProof {
			amount,
			submitted_at,
		} = session.state
		else {
			// An image outside the proof step falls through unconsumed.
			return;
		};
		if !self.sessions.clear_if(user, session.version) {
			return;
		}

		let deposit = PendingDeposit {
			id: Uuid::new_v4(),
			user_id: user,
			amount,
			submitted_at,
			proof_ref: Some(file_ref.to_string()),
		};
		if let Err(e) = self
			.storage
			.insert(
				StorageNamespace::Deposits.as_str(),
				&deposit.id.to_string(),
				&deposit,
			)
			.await
		{
			tracing::error!(user = %user, error = %e, "Could not record deposit");
			self.chat
				.notify(user, "Something went wrong. Please try again later.")
				.await;
			return;
		}

		self.event_bus
			.publish(StoreEvent::Deposit(DepositEvent::Submitted {
				deposit: deposit.clone(),
			}))
			.ok();
		self.chat
			.notify(
				user,
				&format!(
					"Payment proof received for {}. Your balance will be credited after review.",
					fmt_money(&self.currency, amount)
				),
			)
			.await;
	}

	async fn handle_command(&self, user: UserId, command: Command) {
		match command {
			Command::Profile => self.handle_profile(user).await,
			Command::Orders => self.handle_orders(user).await,
			admin_command => {
				if let Some(reply) = self.admin.handle(user, admin_command).await {
					self.chat.notify(user, &reply).await;
				}
			},
		}
	}

	async fn handle_profile(&self, user: UserId) {
		let Ok(Some(record)) = self.ledger.get(user).await else {
			return;
		};
		let joined = chrono::DateTime::from_timestamp(record.joined_at as i64, 0)
			.map(|ts| ts.format("%Y-%m-%d").to_string())
			.unwrap_or_else(|| "unknown".to_string());
		self.chat
			.notify(
				user,
				&format!(
					"@{}\nBalance: {}\nTotal spent: {}\nMember since {}.",
					record.handle,
					fmt_money(&self.currency, record.balance),
					fmt_money(&self.currency, record.total_spent),
					joined,
				),
			)
			.await;
	}

	async fn handle_orders(&self, user: UserId) {
		let orders: Result<Vec<Order>, StorageError> =
			self.storage.list(StorageNamespace::Orders.as_str()).await;
		let mut orders = match orders {
			Ok(orders) => orders,
			Err(e) => {
				tracing::error!(user = %user, error = %e, "Could not list orders");
				return;
			},
		};
		orders.retain(|order| order.user_id == user);
		orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
		orders.truncate(ORDER_HISTORY_LIMIT);

		if orders.is_empty() {
			self.chat.notify(user, "You have no orders yet.").await;
			return;
		}
		let lines: Vec<String> = orders
			.iter()
			.map(|order| {
				format!(
					"#{} {} {} — {} ({})",
					order.id,
					order.quantity,
					order.service,
					order.status,
					fmt_money(&self.currency, order.cost),
				)
			})
			.collect();
		self.chat
			.notify(user, &format!("Your orders:\n{}", lines.join("\n")))
			.await;
	}
}
