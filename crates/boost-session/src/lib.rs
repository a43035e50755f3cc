//! Conversation session management for the boost storefront.
//!
//! Sessions track which multi-step dialog input a user is expected to send
//! next. They are explicit objects keyed by user id and held apart from the
//! persisted profile, with versioned compare-and-swap transitions: two
//! near-simultaneous inbound events for one user race on the version, the
//! loser's transition is rejected, and its event falls through unconsumed
//! instead of corrupting the cursor.

pub mod dialog;

use boost_types::{SessionState, UserId};
use dashmap::DashMap;

/// A user's active dialog session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
	/// Current dialog step and the data collected so far.
	pub state: SessionState,
	/// Monotonic version, bumped on every mutation of this user's session.
	pub version: u64,
}

/// In-memory store of active dialog sessions.
///
/// Absence of an entry means the user is idle. Dropped on restart by
/// design: a half-finished dialog is recoverable by the user, money is not
/// kept here.
#[derive(Default)]
pub struct SessionStore {
	sessions: DashMap<UserId, Session>,
}

impl SessionStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns a snapshot of the user's session, if any.
	pub fn get(&self, user: UserId) -> Option<Session> {
		self.sessions.get(&user).map(|entry| entry.clone())
	}

	/// Starts or supersedes the user's session with the given state.
	///
	/// Selecting a new dialog always wins over whatever step was active;
	/// returns the new version.
	pub fn begin(&self, user: UserId, state: SessionState) -> u64 {
		let mut session = self.sessions.entry(user).or_insert(Session {
			state: state.clone(),
			version: 0,
		});
		session.version += 1;
		session.state = state;
		session.version
	}

	/// Advances the session only if it is still at `expected_version`.
	///
	/// Returns `false` when another event got there first; the caller
	/// treats its input as unconsumed.
	pub fn transition(&self, user: UserId, expected_version: u64, next: SessionState) -> bool {
		match self.sessions.get_mut(&user) {
			Some(mut entry) if entry.version == expected_version => {
				entry.version += 1;
				entry.state = next;
				true
			},
			_ => false,
		}
	}

	/// Ends the session only if it is still at `expected_version`.
	pub fn clear_if(&self, user: UserId, expected_version: u64) -> bool {
		self.sessions
			.remove_if(&user, |_, session| session.version == expected_version)
			.is_some()
	}

	/// Ends the session unconditionally.
	pub fn clear(&self, user: UserId) {
		self.sessions.remove(&user);
	}

	/// Number of active sessions, for the admin panel.
	pub fn active(&self) -> usize {
		self.sessions.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use boost_types::ServiceKind;

	#[test]
	fn begin_supersedes_previous_dialog() {
		let store = SessionStore::new();
		let user = UserId(1);

		let v1 = store.begin(user, SessionState::AwaitingAmount);
		assert_eq!(v1, 1);
		let v2 = store.begin(
			user,
			SessionState::AwaitingLink {
				service: ServiceKind::Likes,
			},
		);
		assert_eq!(v2, 2);
		assert!(matches!(
			store.get(user).unwrap().state,
			SessionState::AwaitingLink { .. }
		));
	}

	#[test]
	fn stale_transition_is_rejected() {
		let store = SessionStore::new();
		let user = UserId(1);

		let v = store.begin(user, SessionState::AwaitingAmount);
		assert!(store.transition(
			user,
			v,
			SessionState::AwaitingProof {
				amount: rust_decimal::Decimal::TEN,
				submitted_at: 0,
			},
		));
		// The old version lost the race; state must be untouched.
		assert!(!store.transition(user, v, SessionState::AwaitingAmount));
		assert!(matches!(
			store.get(user).unwrap().state,
			SessionState::AwaitingProof { .. }
		));
	}

	#[test]
	fn clear_if_respects_versions() {
		let store = SessionStore::new();
		let user = UserId(1);

		let v = store.begin(user, SessionState::AwaitingAmount);
		assert!(!store.clear_if(user, v + 1));
		assert!(store.get(user).is_some());
		assert!(store.clear_if(user, v));
		assert!(store.get(user).is_none());
	}

	#[test]
	fn transition_without_session_fails() {
		let store = SessionStore::new();
		assert!(!store.transition(UserId(9), 1, SessionState::AwaitingAmount));
	}
}
