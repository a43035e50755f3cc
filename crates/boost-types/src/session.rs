//! Conversation session types.
//!
//! The session state is the per-user "conversation cursor": the marker of
//! which multi-step dialog input is currently expected. It is mutually
//! exclusive per user and cleared on completion, cancellation or
//! superseding input. Sessions are held in memory, apart from the persisted
//! user profile; a restart drops half-finished dialogs but never money.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ServiceKind, UserId};

/// The dialog step a user's conversation is currently in.
///
/// Absence of a session means the user is idle. Every variant carries the
/// data collected so far, so a step never has to re-read earlier inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionState {
	/// Add-funds flow: waiting for a numeric amount.
	AwaitingAmount,
	/// Add-funds flow: amount accepted, waiting for a payment proof image.
	AwaitingProof {
		amount: Decimal,
		submitted_at: u64,
	},
	/// Order flow: service chosen, waiting for the target link.
	AwaitingLink { service: ServiceKind },
	/// Order flow: link accepted, waiting for a quantity within bounds.
	AwaitingQuantity {
		service: ServiceKind,
		link: String,
	},
	/// Order flow: all parameters collected, waiting for confirm/cancel.
	///
	/// `cost` was computed when the quantity was accepted, at the price in
	/// effect at that moment, and is what the ledger will be debited.
	AwaitingConfirmation {
		service: ServiceKind,
		link: String,
		quantity: u64,
		cost: Decimal,
	},
}

/// A funding submission awaiting manual review.
///
/// Recording the proof does not mutate the balance; crediting is an
/// administrative action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingDeposit {
	/// Locally assigned deposit identifier.
	pub id: Uuid,
	/// User that submitted the deposit.
	pub user_id: UserId,
	/// Declared amount.
	pub amount: Decimal,
	/// Unix timestamp of the amount submission.
	pub submitted_at: u64,
	/// Chat file reference of the uploaded proof image, when present.
	pub proof_ref: Option<String>,
}
