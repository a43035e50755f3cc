//! Scriptable in-memory provider implementation.
//!
//! Used by engine tests and local development. Order-creation responses are
//! queued ahead of time; statuses are set per order id and returned until
//! changed, which mirrors how a real panel reports the same status across
//! repeated polls.

use crate::{ProviderError, ProviderInterface};
use async_trait::async_trait;
use boost_types::{ProviderOrder, ProviderOrderStatus};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// A recorded order-creation call.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedOrder {
	pub service_id: String,
	pub link: String,
	pub quantity: u64,
}

/// In-memory provider whose responses are scripted by the test.
#[derive(Default)]
pub struct MockProvider {
	create_queue: Mutex<VecDeque<Result<ProviderOrder, ProviderError>>>,
	statuses: Mutex<HashMap<String, String>>,
	created: Mutex<Vec<CreatedOrder>>,
	status_polls: Mutex<Vec<String>>,
}

impl MockProvider {
	pub fn new() -> Self {
		Self::default()
	}

	/// Queues a successful order-creation response with the given id.
	pub fn queue_order(&self, order_id: &str) {
		self.create_queue.lock().unwrap().push_back(Ok(ProviderOrder {
			order_id: order_id.to_string(),
			status: None,
		}));
	}

	/// Queues a failed order-creation response.
	pub fn queue_failure(&self, message: &str) {
		self.create_queue
			.lock()
			.unwrap()
			.push_back(Err(ProviderError::Network(message.to_string())));
	}

	/// Sets the status text returned for an order id from now on.
	pub fn set_status(&self, order_id: &str, status: &str) {
		self.statuses
			.lock()
			.unwrap()
			.insert(order_id.to_string(), status.to_string());
	}

	/// Makes status queries for an order id fail from now on.
	pub fn clear_status(&self, order_id: &str) {
		self.statuses.lock().unwrap().remove(order_id);
	}

	/// Order-creation calls observed so far.
	pub fn created(&self) -> Vec<CreatedOrder> {
		self.created.lock().unwrap().clone()
	}

	/// Order ids polled for status so far, in order.
	pub fn status_polls(&self) -> Vec<String> {
		self.status_polls.lock().unwrap().clone()
	}
}

#[async_trait]
impl ProviderInterface for MockProvider {
	async fn create_order(
		&self,
		service_id: &str,
		link: &str,
		quantity: u64,
	) -> Result<ProviderOrder, ProviderError> {
		self.created.lock().unwrap().push(CreatedOrder {
			service_id: service_id.to_string(),
			link: link.to_string(),
			quantity,
		});
		self.create_queue
			.lock()
			.unwrap()
			.pop_front()
			.unwrap_or_else(|| Err(ProviderError::Network("no scripted response".to_string())))
	}

	async fn order_status(&self, order_id: &str) -> Result<ProviderOrderStatus, ProviderError> {
		self.status_polls.lock().unwrap().push(order_id.to_string());
		self.statuses
			.lock()
			.unwrap()
			.get(order_id)
			.map(|status| ProviderOrderStatus {
				status: status.clone(),
			})
			.ok_or_else(|| ProviderError::Network("no scripted status".to_string()))
	}
}

/// Factory function to create a mock provider from configuration.
///
/// Configuration parameters:
/// - None required
pub fn create_provider(
	_config: &toml::Value,
) -> Result<Box<dyn ProviderInterface>, ProviderError> {
	Ok(Box::new(MockProvider::new()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn scripted_create_and_status() {
		let provider = MockProvider::new();
		provider.queue_order("555");
		provider.set_status("555", "In progress");

		let order = provider.create_order("811", "https://x/p/1", 1000).await.unwrap();
		assert_eq!(order.order_id, "555");
		assert_eq!(
			provider.created(),
			vec![CreatedOrder {
				service_id: "811".to_string(),
				link: "https://x/p/1".to_string(),
				quantity: 1000,
			}]
		);

		let status = provider.order_status("555").await.unwrap();
		assert_eq!(status.status, "In progress");
		assert!(provider.order_status("556").await.is_err());
	}

	#[tokio::test]
	async fn unscripted_create_fails() {
		let provider = MockProvider::new();
		assert!(provider.create_order("811", "link", 10).await.is_err());
	}
}
