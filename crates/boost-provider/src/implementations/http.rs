//! HTTP provider client implementation.
//!
//! Speaks the single-endpoint form API common to engagement panels: every
//! request is a POST of form fields to one URL, with an `action` field
//! selecting the operation and the API key sent alongside.

use crate::{ProviderError, ProviderInterface};
use async_trait::async_trait;
use boost_types::{ProviderOrder, ProviderOrderStatus};
use serde::Deserialize;

/// HTTP client for the delivery provider's panel API.
pub struct HttpProvider {
	client: reqwest::Client,
	api_url: String,
	api_key: String,
}

impl HttpProvider {
	/// Creates a new HttpProvider against the given endpoint.
	pub fn new(api_url: String, api_key: String) -> Result<Self, ProviderError> {
		let client = reqwest::Client::builder()
			.timeout(std::time::Duration::from_secs(30))
			.build()
			.map_err(|e| ProviderError::Configuration(e.to_string()))?;
		Ok(Self {
			client,
			api_url,
			api_key,
		})
	}

	async fn post_form(&self, form: &[(&str, String)]) -> Result<serde_json::Value, ProviderError> {
		let response = self
			.client
			.post(&self.api_url)
			.form(form)
			.send()
			.await
			.map_err(|e| ProviderError::Network(e.to_string()))?;

		response
			.json::<serde_json::Value>()
			.await
			.map_err(|e| ProviderError::Parse(e.to_string()))
	}
}

/// Shape of an order-creation response.
///
/// The panel returns `{"order": <id>}` on success; the id may arrive as a
/// number or a string depending on the panel software.
#[derive(Debug, Deserialize)]
struct AddResponse {
	#[serde(default)]
	order: Option<serde_json::Value>,
	#[serde(default)]
	error: Option<String>,
}

/// Shape of a status response.
#[derive(Debug, Deserialize)]
struct StatusResponse {
	#[serde(default)]
	status: Option<String>,
	#[serde(default)]
	error: Option<String>,
}

fn value_to_id(value: &serde_json::Value) -> Option<String> {
	match value {
		serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
		serde_json::Value::Number(n) => Some(n.to_string()),
		_ => None,
	}
}

#[async_trait]
impl ProviderInterface for HttpProvider {
	async fn create_order(
		&self,
		service_id: &str,
		link: &str,
		quantity: u64,
	) -> Result<ProviderOrder, ProviderError> {
		let form = [
			("key", self.api_key.clone()),
			("action", "add".to_string()),
			("service", service_id.to_string()),
			("link", link.to_string()),
			("quantity", quantity.to_string()),
		];
		let body = self.post_form(&form).await?;
		let parsed: AddResponse = serde_json::from_value(body)
			.map_err(|e| ProviderError::Parse(e.to_string()))?;

		if let Some(error) = parsed.error {
			return Err(ProviderError::Rejected(error));
		}
		let order_id = parsed
			.order
			.as_ref()
			.and_then(value_to_id)
			.ok_or_else(|| ProviderError::Parse("response lacks an order id".to_string()))?;

		Ok(ProviderOrder {
			order_id,
			status: None,
		})
	}

	async fn order_status(&self, order_id: &str) -> Result<ProviderOrderStatus, ProviderError> {
		let form = [
			("key", self.api_key.clone()),
			("action", "status".to_string()),
			("order", order_id.to_string()),
		];
		let body = self.post_form(&form).await?;
		let parsed: StatusResponse = serde_json::from_value(body)
			.map_err(|e| ProviderError::Parse(e.to_string()))?;

		if let Some(error) = parsed.error {
			return Err(ProviderError::Rejected(error));
		}
		let status = parsed
			.status
			.filter(|s| !s.is_empty())
			.ok_or_else(|| ProviderError::Parse("response lacks a status".to_string()))?;

		Ok(ProviderOrderStatus { status })
	}
}

/// Factory function to create an HTTP provider client from configuration.
///
/// Configuration parameters:
/// - `api_url`: Panel API endpoint (required)
/// - `api_key`: API key sent with every request (required)
pub fn create_provider(
	config: &toml::Value,
) -> Result<Box<dyn ProviderInterface>, ProviderError> {
	let api_url = config
		.get("api_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| ProviderError::Configuration("api_url is required".to_string()))?
		.to_string();
	let api_key = config
		.get("api_key")
		.and_then(|v| v.as_str())
		.ok_or_else(|| ProviderError::Configuration("api_key is required".to_string()))?
		.to_string();

	Ok(Box::new(HttpProvider::new(api_url, api_key)?))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn order_ids_accept_numbers_and_strings() {
		assert_eq!(
			value_to_id(&serde_json::json!(23501)),
			Some("23501".to_string())
		);
		assert_eq!(
			value_to_id(&serde_json::json!("23501")),
			Some("23501".to_string())
		);
		assert_eq!(value_to_id(&serde_json::json!("")), None);
		assert_eq!(value_to_id(&serde_json::json!(null)), None);
	}
}
