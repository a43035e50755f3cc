//! Order types for the boost storefront.
//!
//! This module defines the service catalogue, the order record, the local
//! order status machine and the mapping from the provider's free-text status
//! vocabulary onto it. The mapping is an explicit enumeration with an
//! `Unrecognized` outcome so that unmapped provider values stay observable.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::UserId;

/// The category of deliverable sold by the storefront.
///
/// Each kind carries its own price setting, provider service id and fixed
/// quantity bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
	Likes,
	Views,
}

impl ServiceKind {
	/// All service kinds, in catalogue order.
	pub fn all() -> [ServiceKind; 2] {
		[ServiceKind::Likes, ServiceKind::Views]
	}

	/// Inclusive quantity bounds for one order of this kind.
	///
	/// Fixed constants, distinct from the runtime-configurable pricing.
	pub fn bounds(&self) -> (u64, u64) {
		match self {
			ServiceKind::Likes => (500, 50_000),
			ServiceKind::Views => (1_000, 1_000_000),
		}
	}

	/// Stable lowercase tag used in button actions and settings keys.
	pub fn as_str(&self) -> &'static str {
		match self {
			ServiceKind::Likes => "likes",
			ServiceKind::Views => "views",
		}
	}
}

impl fmt::Display for ServiceKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Error returned when parsing an unknown service tag.
#[derive(Debug, thiserror::Error)]
#[error("unknown service kind: {0}")]
pub struct ParseServiceKindError(pub String);

impl FromStr for ServiceKind {
	type Err = ParseServiceKindError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"likes" => Ok(ServiceKind::Likes),
			"views" => Ok(ServiceKind::Views),
			other => Err(ParseServiceKindError(other.to_string())),
		}
	}
}

/// Local status of an order.
///
/// `Pending` is the initial state; `Completed`, `Partial` and `Cancelled`
/// are terminal. The reconciler only polls non-terminal orders, so a
/// terminal order can never fire side effects again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
	Pending,
	Processing,
	Completed,
	Partial,
	Cancelled,
}

impl OrderStatus {
	/// Whether this status excludes the order from further reconciliation.
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			OrderStatus::Completed | OrderStatus::Partial | OrderStatus::Cancelled
		)
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OrderStatus::Pending => write!(f, "pending"),
			OrderStatus::Processing => write!(f, "processing"),
			OrderStatus::Completed => write!(f, "completed"),
			OrderStatus::Partial => write!(f, "partial"),
			OrderStatus::Cancelled => write!(f, "cancelled"),
		}
	}
}

/// Outcome of mapping a provider status string to a local status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusMapping {
	/// The provider text maps onto a known local status.
	Known(OrderStatus),
	/// The provider text matches nothing in the fixed vocabulary.
	Unrecognized,
}

/// Maps the provider's free-text status onto the local status machine.
///
/// Matching is case-insensitive by substring against a fixed vocabulary.
/// Partial is checked before completed so that compound strings such as
/// "Partially completed" resolve to the partial outcome.
pub fn map_provider_status(text: &str) -> StatusMapping {
	let lower = text.to_lowercase();
	if lower.contains("partial") {
		StatusMapping::Known(OrderStatus::Partial)
	} else if lower.contains("completed") {
		StatusMapping::Known(OrderStatus::Completed)
	} else if lower.contains("processing") || lower.contains("in progress") {
		StatusMapping::Known(OrderStatus::Processing)
	} else if lower.contains("cancel") || lower.contains("refunded") {
		StatusMapping::Known(OrderStatus::Cancelled)
	} else {
		StatusMapping::Unrecognized
	}
}

/// Computes the cost of an order at the current per-1000 price.
///
/// The result is rounded to two decimals, half away from zero. The value is
/// computed once when the quantity is accepted and stored on the order; it
/// is never recomputed from later prices.
pub fn order_cost(price_per_1k: Decimal, quantity: u64) -> Decimal {
	(price_per_1k * Decimal::from(quantity) / Decimal::from(1000))
		.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// An order placed against the provider.
///
/// Created once by the placement engine; mutated only by the reconciler
/// thereafter. Never deleted: terminal orders are retained for history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
	/// Provider-assigned order identifier.
	pub id: String,
	/// Owning user.
	pub user_id: UserId,
	/// Service kind this order delivers.
	pub service: ServiceKind,
	/// Target link the engagement is delivered to.
	pub link: String,
	/// Ordered quantity. Positive, within the service bounds.
	pub quantity: u64,
	/// Cost fixed at creation. Ledger effects reference this value only.
	pub cost: Decimal,
	/// Current local status.
	pub status: OrderStatus,
	/// Last raw status text seen from the provider.
	#[serde(default)]
	pub provider_status: String,
	/// Unix timestamp of creation.
	pub created_at: u64,
	/// Unix timestamp of the last reconciler mutation.
	pub updated_at: u64,
}
