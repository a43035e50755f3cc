//! In-memory chat transport for tests and local development.
//!
//! Records every outbound message so tests can assert on notification
//! behavior, and can be switched into a failing mode to exercise the
//! best-effort delivery paths.

use crate::{ChatError, ChatInterface};
use async_trait::async_trait;
use boost_types::{Button, InboundEvent, UserId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// A recorded outbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
	pub user: UserId,
	pub text: String,
}

/// In-memory chat transport that records outbound traffic.
#[derive(Default)]
pub struct MockChat {
	sent: Mutex<Vec<SentMessage>>,
	failing: AtomicBool,
}

impl MockChat {
	pub fn new() -> Self {
		Self::default()
	}

	/// Makes every subsequent send fail, for exercising soft-failure paths.
	pub fn set_failing(&self, failing: bool) {
		self.failing.store(failing, Ordering::SeqCst);
	}

	/// All messages sent so far, in order.
	pub fn sent(&self) -> Vec<SentMessage> {
		self.sent.lock().unwrap().clone()
	}

	/// Messages sent to one user, in order.
	pub fn sent_to(&self, user: UserId) -> Vec<String> {
		self.sent
			.lock()
			.unwrap()
			.iter()
			.filter(|m| m.user == user)
			.map(|m| m.text.clone())
			.collect()
	}

	fn record(&self, user: UserId, text: &str) -> Result<(), ChatError> {
		if self.failing.load(Ordering::SeqCst) {
			return Err(ChatError::Network("mock send failure".to_string()));
		}
		self.sent.lock().unwrap().push(SentMessage {
			user,
			text: text.to_string(),
		});
		Ok(())
	}
}

#[async_trait]
impl ChatInterface for MockChat {
	async fn send_message(&self, user: UserId, text: &str) -> Result<(), ChatError> {
		self.record(user, text)
	}

	async fn send_keyboard(
		&self,
		user: UserId,
		text: &str,
		_keyboard: &[Vec<Button>],
	) -> Result<(), ChatError> {
		self.record(user, text)
	}

	async fn start_updates(
		&self,
		_sender: mpsc::UnboundedSender<InboundEvent>,
	) -> Result<(), ChatError> {
		Ok(())
	}

	async fn stop_updates(&self) -> Result<(), ChatError> {
		Ok(())
	}
}

/// Factory function to create a mock chat transport from configuration.
///
/// Configuration parameters:
/// - None required
pub fn create_chat(_config: &toml::Value) -> Result<Box<dyn ChatInterface>, ChatError> {
	Ok(Box::new(MockChat::new()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ChatService;

	#[tokio::test]
	async fn broadcast_counts_only_deliveries() {
		let chat = MockChat::new();
		chat.set_failing(false);
		let service = ChatService::new(Box::new(chat));

		let users = [UserId(1), UserId(2), UserId(3)];
		assert_eq!(service.broadcast(&users, "hello").await, 3);
	}

	#[tokio::test]
	async fn notify_swallows_failures() {
		let chat = MockChat::new();
		chat.set_failing(true);
		let service = ChatService::new(Box::new(chat));

		// Must not panic or propagate.
		service.notify(UserId(1), "hello").await;
	}
}
