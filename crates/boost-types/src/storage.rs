//! Storage namespace and settings key types.

use std::fmt;

use crate::ServiceKind;

/// Namespaces of the document store.
///
/// Every persisted record lives under exactly one of these; keys are
/// `namespace:id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageNamespace {
	/// User records, keyed by platform user id.
	Users,
	/// Order records, keyed by provider order id.
	Orders,
	/// Deposit submissions awaiting manual review, keyed by deposit id.
	Deposits,
	/// Runtime settings, keyed by [`SettingKey`].
	Settings,
}

impl StorageNamespace {
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageNamespace::Users => "users",
			StorageNamespace::Orders => "orders",
			StorageNamespace::Deposits => "deposits",
			StorageNamespace::Settings => "settings",
		}
	}
}

impl fmt::Display for StorageNamespace {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Keys of the runtime-mutable settings collection.
///
/// All are read fresh on each pricing/order decision; admin commands are
/// the only writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
	/// Price per 1000 units of a service.
	PricePer1k(ServiceKind),
	/// Provider service id used when creating orders of a kind.
	ProviderService(ServiceKind),
	/// Optional chat target for order announcements.
	NotifyChannel,
}

impl SettingKey {
	pub fn as_str(&self) -> String {
		match self {
			SettingKey::PricePer1k(kind) => format!("price_per_1k_{}", kind.as_str()),
			SettingKey::ProviderService(kind) => format!("provider_service_{}", kind.as_str()),
			SettingKey::NotifyChannel => "notify_channel".to_string(),
		}
	}
}

impl SettingKey {
	/// Parses a stored key string back into a [`SettingKey`].
	pub fn parse(s: &str) -> Option<SettingKey> {
		if s == "notify_channel" {
			return Some(SettingKey::NotifyChannel);
		}
		if let Some(kind) = s.strip_prefix("price_per_1k_") {
			return kind.parse::<ServiceKind>().ok().map(SettingKey::PricePer1k);
		}
		if let Some(kind) = s.strip_prefix("provider_service_") {
			return kind
				.parse::<ServiceKind>()
				.ok()
				.map(SettingKey::ProviderService);
		}
		None
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn setting_keys_round_trip() {
		let keys = [
			SettingKey::PricePer1k(ServiceKind::Likes),
			SettingKey::PricePer1k(ServiceKind::Views),
			SettingKey::ProviderService(ServiceKind::Likes),
			SettingKey::ProviderService(ServiceKind::Views),
			SettingKey::NotifyChannel,
		];
		for key in keys {
			assert_eq!(SettingKey::parse(&key.as_str()), Some(key));
		}
	}
}
