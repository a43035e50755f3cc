//! User account types for the boost storefront.
//!
//! A user record carries the internal balance and cumulative spend that the
//! ledger mutates. Conversation state is deliberately NOT part of this
//! record; it lives in its own session store keyed by [`UserId`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform-assigned chat user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// A storefront user with an internal funded balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
	/// Platform user id, unique per user.
	pub id: UserId,
	/// Display handle as reported by the chat platform.
	pub handle: String,
	/// Current balance. Non-negative, two-decimal precision.
	pub balance: Decimal,
	/// Cumulative spend. Monotonically non-decreasing.
	pub total_spent: Decimal,
	/// Unix timestamp of first contact.
	pub joined_at: u64,
	/// Banned users are ignored by the storefront.
	#[serde(default)]
	pub banned: bool,
}

impl User {
	/// Creates a fresh user record with a zero balance.
	pub fn new(id: UserId, handle: impl Into<String>, joined_at: u64) -> Self {
		Self {
			id,
			handle: handle.into(),
			balance: Decimal::ZERO,
			total_spent: Decimal::ZERO,
			joined_at,
			banned: false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn new_user_starts_empty() {
		let user = User::new(UserId(42), "alice", 1_700_000_000);
		assert_eq!(user.balance, Decimal::ZERO);
		assert_eq!(user.total_spent, Decimal::ZERO);
		assert!(!user.banned);
	}
}
