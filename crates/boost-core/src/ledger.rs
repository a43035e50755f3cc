//! Balance ledger operations.
//!
//! Two operations mutate a user's money: `debit` (balance down, cumulative
//! spend up) and `credit` (balance up). Both are unconditional at this
//! layer — sufficiency checking is the caller's responsibility and must
//! happen before the debit call. Each operation is a single conditional
//! read-modify-write on the user record, so concurrent mutations serialize
//! without lost updates.

use boost_storage::{StorageError, StorageService};
use boost_types::{current_timestamp, StorageNamespace, User, UserId};
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
	#[error("Storage error: {0}")]
	Storage(String),
	#[error("User not found: {0}")]
	UserNotFound(UserId),
}

impl From<StorageError> for LedgerError {
	fn from(err: StorageError) -> Self {
		LedgerError::Storage(err.to_string())
	}
}

/// The debit/credit operations on user balances.
pub struct BalanceLedger {
	storage: Arc<StorageService>,
}

impl BalanceLedger {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// Fetches a user record.
	pub async fn get(&self, user: UserId) -> Result<Option<User>, LedgerError> {
		match self
			.storage
			.retrieve(StorageNamespace::Users.as_str(), &user.to_string())
			.await
		{
			Ok(user) => Ok(Some(user)),
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(e.into()),
		}
	}

	/// Fetches a user record, creating it on first contact.
	pub async fn get_or_create(
		&self,
		user: UserId,
		handle: &str,
	) -> Result<User, LedgerError> {
		if let Some(existing) = self.get(user).await? {
			return Ok(existing);
		}
		let fresh = User::new(user, handle, current_timestamp());
		match self
			.storage
			.insert(StorageNamespace::Users.as_str(), &user.to_string(), &fresh)
			.await
		{
			Ok(()) => Ok(fresh),
			// Two concurrent first contacts; the other one won.
			Err(StorageError::AlreadyExists) => self
				.get(user)
				.await?
				.ok_or(LedgerError::UserNotFound(user)),
			Err(e) => Err(e.into()),
		}
	}

	/// Debits a user: `balance -= amount`, `total_spent += amount`.
	///
	/// Unconditional; the caller has already checked sufficiency.
	pub async fn debit(&self, user: UserId, amount: Decimal) -> Result<User, LedgerError> {
		self.apply(user, |record| {
			record.balance -= amount;
			record.total_spent += amount;
		})
		.await
	}

	/// Credits a user: `balance += amount`.
	pub async fn credit(&self, user: UserId, amount: Decimal) -> Result<User, LedgerError> {
		self.apply(user, |record| {
			record.balance += amount;
		})
		.await
	}

	/// Sets or clears the banned flag.
	pub async fn set_banned(&self, user: UserId, banned: bool) -> Result<User, LedgerError> {
		self.apply(user, |record| {
			record.banned = banned;
		})
		.await
	}

	/// Every known user, for broadcasts and the admin panel.
	pub async fn all_users(&self) -> Result<Vec<User>, LedgerError> {
		Ok(self.storage.list(StorageNamespace::Users.as_str()).await?)
	}

	async fn apply<F>(&self, user: UserId, mutation: F) -> Result<User, LedgerError>
	where
		F: Fn(&mut User),
	{
		match self
			.storage
			.modify(StorageNamespace::Users.as_str(), &user.to_string(), mutation)
			.await
		{
			Ok(updated) => Ok(updated),
			Err(StorageError::NotFound) => Err(LedgerError::UserNotFound(user)),
			Err(e) => Err(e.into()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use boost_storage::implementations::memory::MemoryStorage;
	use rust_decimal_macros::dec;

	fn ledger() -> BalanceLedger {
		BalanceLedger::new(Arc::new(StorageService::new(Box::new(MemoryStorage::new()))))
	}

	#[tokio::test]
	async fn debit_moves_balance_into_total_spent() {
		let ledger = ledger();
		let user = UserId(1);
		ledger.get_or_create(user, "alice").await.unwrap();
		ledger.credit(user, dec!(5.00)).await.unwrap();

		let after = ledger.debit(user, dec!(0.90)).await.unwrap();
		assert_eq!(after.balance, dec!(4.10));
		assert_eq!(after.total_spent, dec!(0.90));
	}

	#[tokio::test]
	async fn credit_restores_exactly_the_amount() {
		let ledger = ledger();
		let user = UserId(1);
		ledger.get_or_create(user, "alice").await.unwrap();
		ledger.credit(user, dec!(5.00)).await.unwrap();
		ledger.debit(user, dec!(0.90)).await.unwrap();

		let after = ledger.credit(user, dec!(0.90)).await.unwrap();
		assert_eq!(after.balance, dec!(5.00));
		// A refund does not undo the spend counter.
		assert_eq!(after.total_spent, dec!(0.90));
	}

	#[tokio::test]
	async fn get_or_create_is_idempotent() {
		let ledger = ledger();
		let user = UserId(7);
		let first = ledger.get_or_create(user, "bob").await.unwrap();
		ledger.credit(user, dec!(3.00)).await.unwrap();
		let second = ledger.get_or_create(user, "bob-renamed").await.unwrap();
		assert_eq!(second.handle, first.handle);
		assert_eq!(second.balance, dec!(3.00));
	}

	#[tokio::test]
	async fn mutating_a_missing_user_fails() {
		let ledger = ledger();
		assert!(matches!(
			ledger.debit(UserId(9), dec!(1)).await,
			Err(LedgerError::UserNotFound(_))
		));
	}
}
