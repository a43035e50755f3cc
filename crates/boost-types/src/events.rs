//! Event types for inter-service communication.
//!
//! Events flow through a broadcast bus; the notification handler reacts to
//! them so that user-facing messages stay decoupled from the mutations that
//! caused them. Every event is published at most once per underlying state
//! transition.

use serde::{Deserialize, Serialize};

use crate::{Order, OrderStatus, PendingDeposit};

/// Main event type encompassing all storefront events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StoreEvent {
	/// Events from the order placement engine and the reconciler.
	Order(OrderEvent),
	/// Events from the funding flow.
	Deposit(DepositEvent),
}

/// Events related to the order lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderEvent {
	/// A new order was accepted by the provider and persisted.
	Placed { order: Order },
	/// The reconciler committed a status transition.
	StatusChanged {
		order: Order,
		from: OrderStatus,
		to: OrderStatus,
	},
	/// An order reached `Completed`.
	Completed { order: Order },
	/// An order was cancelled and its cost credited back.
	Refunded { order: Order },
	/// The provider reported a status outside the known vocabulary.
	Unrecognized {
		order_id: String,
		provider_status: String,
	},
}

/// Events related to balance funding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DepositEvent {
	/// A user submitted a payment proof; awaiting manual review.
	Submitted { deposit: PendingDeposit },
}
