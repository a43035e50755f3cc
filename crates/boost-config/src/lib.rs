//! Configuration module for the boost storefront.
//!
//! This module provides structures and utilities for managing storefront
//! configuration. It supports loading configuration from TOML files and
//! validates that all required values are properly set before the service
//! starts; a missing or invalid startup configuration is the only fatal
//! error class in the system.
//!
//! Secrets can be referenced as `${ENV_VAR}` placeholders, which the loader
//! substitutes from the environment before parsing.

mod loader;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

pub use loader::substitute_env;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the boost storefront.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Configuration specific to this storefront instance.
	pub store: StoreConfig,
	/// Configuration for the storage backend.
	pub storage: StorageConfig,
	/// Configuration for the provider client.
	pub provider: ProviderConfig,
	/// Configuration for the chat transport.
	pub chat: ChatConfig,
	/// Configuration for the status reconciliation loop.
	#[serde(default)]
	pub reconciler: ReconcilerConfig,
	/// Configuration for the HTTP health server.
	pub api: Option<ApiConfig>,
}

/// Configuration specific to the storefront instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
	/// Unique identifier for this storefront instance.
	pub id: String,
	/// Minimum accepted funding amount.
	#[serde(default = "default_min_deposit")]
	pub min_deposit: Decimal,
	/// Currency symbol used in user-facing messages.
	#[serde(default = "default_currency_symbol")]
	pub currency_symbol: String,
	/// Chat user ids allowed to run administrative commands.
	#[serde(default)]
	pub admin_ids: Vec<i64>,
}

fn default_min_deposit() -> Decimal {
	Decimal::ONE
}

fn default_currency_symbol() -> String {
	"$".to_string()
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the provider client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of provider implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the chat transport.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of chat implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the status reconciliation loop.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconcilerConfig {
	/// Seconds between reconciliation cycles.
	#[serde(default = "default_reconcile_interval")]
	pub interval_seconds: u64,
	/// Maximum non-terminal orders polled per cycle.
	#[serde(default = "default_batch_limit")]
	pub batch_limit: usize,
}

impl Default for ReconcilerConfig {
	fn default() -> Self {
		Self {
			interval_seconds: default_reconcile_interval(),
			batch_limit: default_batch_limit(),
		}
	}
}

fn default_reconcile_interval() -> u64 {
	60
}

fn default_batch_limit() -> usize {
	50
}

/// Configuration for the HTTP health server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the health server is enabled.
	#[serde(default)]
	pub enabled: bool,
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

impl Config {
	/// Loads configuration from a TOML file, substituting `${ENV_VAR}`
	/// placeholders from the environment.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let raw = std::fs::read_to_string(path)?;
		Self::from_toml(&raw)
	}

	/// Parses configuration from a TOML string.
	pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
		let substituted = loader::substitute_env(raw)?;
		let config: Config = toml::from_str(&substituted)?;
		config.validate()?;
		Ok(config)
	}

	/// Validates cross-field constraints the type system cannot express.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.store.id.is_empty() {
			return Err(ConfigError::Validation("store.id must not be empty".into()));
		}
		if self.store.min_deposit <= Decimal::ZERO {
			return Err(ConfigError::Validation(
				"store.min_deposit must be positive".into(),
			));
		}
		if self.reconciler.interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"reconciler.interval_seconds must be at least 1".into(),
			));
		}
		if self.reconciler.batch_limit == 0 {
			return Err(ConfigError::Validation(
				"reconciler.batch_limit must be at least 1".into(),
			));
		}
		for (section, primary, implementations) in [
			("storage", &self.storage.primary, &self.storage.implementations),
			(
				"provider",
				&self.provider.primary,
				&self.provider.implementations,
			),
			("chat", &self.chat.primary, &self.chat.implementations),
		] {
			if !implementations.contains_key(primary) {
				return Err(ConfigError::Validation(format!(
					"{section}.primary '{primary}' has no matching implementation section"
				)));
			}
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal_macros::dec;

	const MINIMAL: &str = r#"
		[store]
		id = "boost-test"
		admin_ids = [1000]

		[storage]
		primary = "memory"
		[storage.implementations.memory]

		[provider]
		primary = "mock"
		[provider.implementations.mock]

		[chat]
		primary = "mock"
		[chat.implementations.mock]
	"#;

	#[test]
	fn minimal_config_loads_with_defaults() {
		let config = Config::from_toml(MINIMAL).unwrap();
		assert_eq!(config.store.id, "boost-test");
		assert_eq!(config.store.min_deposit, dec!(1));
		assert_eq!(config.reconciler.interval_seconds, 60);
		assert_eq!(config.reconciler.batch_limit, 50);
		assert!(config.api.is_none());
	}

	#[test]
	fn primary_without_implementation_fails() {
		let broken = MINIMAL.replace("primary = \"memory\"", "primary = \"redis\"");
		let err = Config::from_toml(&broken).unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
	}

	#[test]
	fn zero_interval_fails() {
		let raw = format!("{MINIMAL}\n[reconciler]\ninterval_seconds = 0\n");
		let err = Config::from_toml(&raw).unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
	}
}
