//! Provider client module for the boost storefront.
//!
//! This module handles communication with the external delivery service
//! that fulfills likes/views orders. Both operations fail softly: a
//! transport or parse failure surfaces as an error value the engine treats
//! as "no response", never as something to raise.

use async_trait::async_trait;
use boost_types::{ProviderOrder, ProviderOrderStatus};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod http;
	pub mod mock;
}

/// Errors that can occur during provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// Error that occurs when the provider response cannot be parsed.
	#[error("Parse error: {0}")]
	Parse(String),
	/// Error that occurs when the provider explicitly rejects a request.
	#[error("Rejected: {0}")]
	Rejected(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for delivery-provider clients.
///
/// This trait must be implemented by any provider client that wants to
/// integrate with the storefront. Responses lacking an order identifier are
/// reported as errors here so callers never see a half-formed order.
#[async_trait]
pub trait ProviderInterface: Send + Sync {
	/// Submits an order-creation request.
	///
	/// `service_id` is the provider's identifier for the purchased service,
	/// as configured in the settings store.
	async fn create_order(
		&self,
		service_id: &str,
		link: &str,
		quantity: u64,
	) -> Result<ProviderOrder, ProviderError>;

	/// Queries the current status of a previously created order.
	async fn order_status(&self, order_id: &str) -> Result<ProviderOrderStatus, ProviderError>;
}

// Shared handles delegate, so tests can keep a reference to a client
// after handing it to the service.
#[async_trait]
impl<T: ProviderInterface + ?Sized> ProviderInterface for std::sync::Arc<T> {
	async fn create_order(
		&self,
		service_id: &str,
		link: &str,
		quantity: u64,
	) -> Result<ProviderOrder, ProviderError> {
		(**self).create_order(service_id, link, quantity).await
	}

	async fn order_status(&self, order_id: &str) -> Result<ProviderOrderStatus, ProviderError> {
		(**self).order_status(order_id).await
	}
}

/// Type alias for provider factory functions.
///
/// This is the function signature that all provider implementations must
/// provide to create instances of their provider interface.
pub type ProviderFactory = fn(&toml::Value) -> Result<Box<dyn ProviderInterface>, ProviderError>;

/// Service that wraps the configured provider client.
///
/// The ProviderService delegates to the primary implementation and attaches
/// request-level diagnostics; callers decide how soft to treat a failure.
pub struct ProviderService {
	/// The underlying provider implementation.
	implementation: Box<dyn ProviderInterface>,
}

impl ProviderService {
	/// Creates a new ProviderService with the specified implementation.
	pub fn new(implementation: Box<dyn ProviderInterface>) -> Self {
		Self { implementation }
	}

	/// Submits an order-creation request to the provider.
	pub async fn create_order(
		&self,
		service_id: &str,
		link: &str,
		quantity: u64,
	) -> Result<ProviderOrder, ProviderError> {
		let result = self
			.implementation
			.create_order(service_id, link, quantity)
			.await;
		if let Err(e) = &result {
			tracing::warn!(service_id, quantity, error = %e, "Provider order creation failed");
		}
		result
	}

	/// Queries the provider for the status of an order.
	pub async fn order_status(&self, order_id: &str) -> Result<ProviderOrderStatus, ProviderError> {
		self.implementation.order_status(order_id).await
	}
}
