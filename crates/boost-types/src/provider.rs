//! Provider wire types.
//!
//! The delivery provider is an external request/response collaborator.
//! Both operations fail softly at the client; these types carry only the
//! fields the engine consumes.

use serde::{Deserialize, Serialize};

/// Response to an order-creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderOrder {
	/// Provider-assigned order identifier.
	pub order_id: String,
	/// Initial status text, when the provider reports one.
	#[serde(default)]
	pub status: Option<String>,
}

/// Response to a status query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderOrderStatus {
	/// Free-text status in the provider's vocabulary.
	pub status: String,
}
