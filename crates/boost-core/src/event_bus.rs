//! Broadcast event bus for inter-service communication.
//!
//! Mutating components publish a [`StoreEvent`] exactly once per state
//! transition; the notification handler consumes them so user-facing side
//! effects stay decoupled from the mutations that caused them.

use boost_types::StoreEvent;
use tokio::sync::broadcast;

/// Clonable handle onto the shared event channel.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<StoreEvent>,
}

impl EventBus {
	/// Creates a new event bus with the given buffer capacity.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Publishes an event to all current subscribers.
	///
	/// Publishing with no subscribers is not an error the publisher cares
	/// about; callers use `.ok()` on the result.
	pub fn publish(
		&self,
		event: StoreEvent,
	) -> Result<usize, broadcast::error::SendError<StoreEvent>> {
		self.sender.send(event)
	}

	/// Creates a new subscription starting at the current position.
	pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
		self.sender.subscribe()
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(1000)
	}
}
