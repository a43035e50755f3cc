//! Runtime settings store.
//!
//! Thin typed accessor over the `settings` namespace: prices per 1000
//! units, provider service ids and the optional announcement channel.
//! Values are read fresh on every pricing/order decision — there is no
//! cache to invalidate when an admin changes a price mid-dialog.

use boost_storage::{StorageError, StorageService};
use boost_types::{ServiceKind, SettingKey, StorageNamespace};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

/// Typed accessor for the runtime-mutable settings collection.
pub struct SettingsStore {
	storage: Arc<StorageService>,
}

impl SettingsStore {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// Reads a setting, mapping absence to `None`.
	pub async fn get<T: DeserializeOwned>(
		&self,
		key: SettingKey,
	) -> Result<Option<T>, StorageError> {
		match self
			.storage
			.retrieve(StorageNamespace::Settings.as_str(), &key.as_str())
			.await
		{
			Ok(value) => Ok(Some(value)),
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(e),
		}
	}

	/// Writes a setting, creating or overwriting.
	pub async fn set<T: Serialize>(&self, key: SettingKey, value: &T) -> Result<(), StorageError> {
		self.storage
			.store(StorageNamespace::Settings.as_str(), &key.as_str(), value)
			.await
	}

	/// Current price per 1000 units for a service, if configured.
	pub async fn price(&self, service: ServiceKind) -> Result<Option<Decimal>, StorageError> {
		self.get(SettingKey::PricePer1k(service)).await
	}

	/// Sets the price per 1000 units for a service.
	pub async fn set_price(
		&self,
		service: ServiceKind,
		price: Decimal,
	) -> Result<(), StorageError> {
		self.set(SettingKey::PricePer1k(service), &price).await
	}

	/// Provider service id used when creating orders of a kind.
	pub async fn provider_service(
		&self,
		service: ServiceKind,
	) -> Result<Option<String>, StorageError> {
		self.get(SettingKey::ProviderService(service)).await
	}

	/// Sets the provider service id for a kind.
	pub async fn set_provider_service(
		&self,
		service: ServiceKind,
		id: &str,
	) -> Result<(), StorageError> {
		self.set(SettingKey::ProviderService(service), &id.to_string())
			.await
	}

	/// Optional chat id announcements are sent to.
	pub async fn notify_channel(&self) -> Result<Option<i64>, StorageError> {
		self.get(SettingKey::NotifyChannel).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use boost_storage::implementations::memory::MemoryStorage;
	use rust_decimal_macros::dec;

	fn store() -> SettingsStore {
		SettingsStore::new(Arc::new(StorageService::new(Box::new(MemoryStorage::new()))))
	}

	#[tokio::test]
	async fn unset_settings_read_as_none() {
		let settings = store();
		assert_eq!(settings.price(ServiceKind::Likes).await.unwrap(), None);
		assert_eq!(
			settings.provider_service(ServiceKind::Views).await.unwrap(),
			None
		);
		assert_eq!(settings.notify_channel().await.unwrap(), None);
	}

	#[tokio::test]
	async fn prices_are_read_back_fresh() {
		let settings = store();
		settings
			.set_price(ServiceKind::Likes, dec!(1.20))
			.await
			.unwrap();
		assert_eq!(
			settings.price(ServiceKind::Likes).await.unwrap(),
			Some(dec!(1.20))
		);

		// A later admin change is visible immediately.
		settings
			.set_price(ServiceKind::Likes, dec!(2.00))
			.await
			.unwrap();
		assert_eq!(
			settings.price(ServiceKind::Likes).await.unwrap(),
			Some(dec!(2.00))
		);
	}
}
