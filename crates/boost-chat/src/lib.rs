//! Chat transport module for the boost storefront.
//!
//! The chat platform carries no lifecycle logic of its own; this module is
//! the seam through which it is consumed. Outbound messages go through
//! [`ChatService`], which offers both strict sends and the best-effort
//! `notify` used for transition side effects; inbound traffic is pushed as
//! normalized [`InboundEvent`]s through an mpsc channel.

use async_trait::async_trait;
use boost_types::{Button, InboundEvent, UserId};
use thiserror::Error;
use tokio::sync::mpsc;

/// Re-export implementations
pub mod implementations {
	pub mod http;
	pub mod mock;
}

/// Errors that can occur during chat transport operations.
#[derive(Debug, Error)]
pub enum ChatError {
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// Error that occurs when decoding platform payloads.
	#[error("Parse error: {0}")]
	Parse(String),
	/// Error that occurs when trying to start updates twice.
	#[error("Already listening")]
	AlreadyListening,
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for chat transports.
///
/// This trait must be implemented by any chat transport that wants to
/// integrate with the storefront. It covers outbound delivery and the
/// inbound update stream.
#[async_trait]
pub trait ChatInterface: Send + Sync {
	/// Sends a plain text message to a user.
	async fn send_message(&self, user: UserId, text: &str) -> Result<(), ChatError>;

	/// Sends a text message with an inline keyboard.
	async fn send_keyboard(
		&self,
		user: UserId,
		text: &str,
		keyboard: &[Vec<Button>],
	) -> Result<(), ChatError>;

	/// Starts pushing inbound events through the provided channel.
	///
	/// The implementation keeps listening until `stop_updates` is called
	/// or the process shuts down.
	async fn start_updates(
		&self,
		sender: mpsc::UnboundedSender<InboundEvent>,
	) -> Result<(), ChatError>;

	/// Stops the inbound update stream.
	async fn stop_updates(&self) -> Result<(), ChatError>;
}

// Shared handles delegate, so tests can keep a reference to a transport
// after handing it to the service.
#[async_trait]
impl<T: ChatInterface + ?Sized> ChatInterface for std::sync::Arc<T> {
	async fn send_message(&self, user: UserId, text: &str) -> Result<(), ChatError> {
		(**self).send_message(user, text).await
	}

	async fn send_keyboard(
		&self,
		user: UserId,
		text: &str,
		keyboard: &[Vec<Button>],
	) -> Result<(), ChatError> {
		(**self).send_keyboard(user, text, keyboard).await
	}

	async fn start_updates(
		&self,
		sender: mpsc::UnboundedSender<InboundEvent>,
	) -> Result<(), ChatError> {
		(**self).start_updates(sender).await
	}

	async fn stop_updates(&self) -> Result<(), ChatError> {
		(**self).stop_updates().await
	}
}

/// Type alias for chat transport factory functions.
pub type ChatFactory = fn(&toml::Value) -> Result<Box<dyn ChatInterface>, ChatError>;

/// Service that wraps the configured chat transport.
///
/// Adds the delivery semantics the engine relies on: `send` propagates
/// failures to the caller, `notify` swallows them with a diagnostic, and
/// `broadcast` counts non-deliveries without ever aborting the batch.
pub struct ChatService {
	/// The underlying chat transport implementation.
	implementation: Box<dyn ChatInterface>,
}

impl ChatService {
	/// Creates a new ChatService with the specified implementation.
	pub fn new(implementation: Box<dyn ChatInterface>) -> Self {
		Self { implementation }
	}

	/// Sends a message, propagating transport failures.
	pub async fn send(&self, user: UserId, text: &str) -> Result<(), ChatError> {
		self.implementation.send_message(user, text).await
	}

	/// Sends a message with an inline keyboard, propagating failures.
	pub async fn send_keyboard(
		&self,
		user: UserId,
		text: &str,
		keyboard: &[Vec<Button>],
	) -> Result<(), ChatError> {
		self.implementation
			.send_keyboard(user, text, keyboard)
			.await
	}

	/// Sends a message best-effort.
	///
	/// A failed notification must never fail the transition that caused
	/// it; the error is logged and dropped.
	pub async fn notify(&self, user: UserId, text: &str) {
		if let Err(e) = self.implementation.send_message(user, text).await {
			tracing::warn!(user = %user, error = %e, "Notification not delivered");
		}
	}

	/// Sends a text to many users, returning how many deliveries succeeded.
	pub async fn broadcast(&self, users: &[UserId], text: &str) -> usize {
		let mut delivered = 0;
		for user in users {
			match self.implementation.send_message(*user, text).await {
				Ok(()) => delivered += 1,
				Err(e) => {
					tracing::debug!(user = %user, error = %e, "Broadcast delivery failed");
				},
			}
		}
		delivered
	}

	/// Starts the inbound update stream.
	pub async fn start_updates(
		&self,
		sender: mpsc::UnboundedSender<InboundEvent>,
	) -> Result<(), ChatError> {
		self.implementation.start_updates(sender).await
	}

	/// Stops the inbound update stream.
	pub async fn stop_updates(&self) -> Result<(), ChatError> {
		self.implementation.stop_updates().await
	}
}
