//! Chat event types.
//!
//! The chat transport itself is an external collaborator; these types are
//! the seam it speaks through. Inbound traffic is normalized into
//! [`InboundEvent`]s before it reaches the engine, and button presses carry
//! an opaque action tag that [`ButtonAction`] round-trips.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{ServiceKind, UserId};

/// A normalized inbound chat event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
	/// Sender's platform user id.
	pub user_id: UserId,
	/// Sender's display handle at the time of the event.
	pub handle: String,
	/// What arrived.
	pub kind: InboundKind,
}

/// The payload of an inbound chat event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InboundKind {
	/// First contact or explicit restart.
	Start,
	/// A button press carrying its opaque action tag.
	Button(String),
	/// Free text.
	Text(String),
	/// An image attachment, referenced by the platform's file id.
	Photo { file_ref: String },
	/// A slash command with its raw argument tail.
	Command(Command),
}

/// Actions encoded into inline keyboard buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
	/// Start the add-funds dialog.
	AddFunds,
	/// Start the order dialog for a service.
	Order(ServiceKind),
	/// Confirm the pending order.
	Confirm,
	/// Cancel the pending dialog.
	Cancel,
}

impl ButtonAction {
	/// Serializes the action into its wire tag.
	pub fn as_tag(&self) -> String {
		match self {
			ButtonAction::AddFunds => "add_funds".to_string(),
			ButtonAction::Order(kind) => format!("order:{}", kind.as_str()),
			ButtonAction::Confirm => "confirm".to_string(),
			ButtonAction::Cancel => "cancel".to_string(),
		}
	}

	/// Decodes a wire tag back into an action.
	pub fn from_tag(tag: &str) -> Option<ButtonAction> {
		match tag {
			"add_funds" => Some(ButtonAction::AddFunds),
			"confirm" => Some(ButtonAction::Confirm),
			"cancel" => Some(ButtonAction::Cancel),
			other => {
				let kind = other.strip_prefix("order:")?;
				kind.parse::<ServiceKind>().ok().map(ButtonAction::Order)
			},
		}
	}
}

/// An inline keyboard button.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Button {
	/// Text shown to the user.
	pub label: String,
	/// Opaque action tag delivered back on press.
	pub action: String,
}

impl Button {
	pub fn new(label: impl Into<String>, action: ButtonAction) -> Self {
		Self {
			label: label.into(),
			action: action.as_tag(),
		}
	}
}

/// Parsed slash commands.
///
/// User commands are open to everyone; the admin variants are only honored
/// when the caller is in the configured allow-list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
	/// Show handle, balance, total spent and join date.
	Profile,
	/// List the caller's most recent orders.
	Orders,
	/// Admin: set the per-1000 price for a service.
	SetPrice { service: ServiceKind, price: Decimal },
	/// Admin: set the provider service id for a service.
	SetService { service: ServiceKind, id: String },
	/// Admin: credit a user's balance after reviewing a deposit.
	Credit { user: UserId, amount: Decimal },
	/// Admin: send a text to every known user.
	Broadcast { text: String },
	/// Admin: show storefront totals.
	Panel,
}

impl Command {
	/// Parses a `/command args` line. Returns `None` for unknown commands
	/// or malformed arguments; the caller treats those as plain text.
	pub fn parse(line: &str) -> Option<Command> {
		let line = line.trim();
		let rest = line.strip_prefix('/')?;
		let (name, tail) = match rest.split_once(char::is_whitespace) {
			Some((name, tail)) => (name, tail.trim()),
			None => (rest, ""),
		};

		match name {
			"profile" => Some(Command::Profile),
			"orders" => Some(Command::Orders),
			"panel" => Some(Command::Panel),
			"broadcast" if !tail.is_empty() => Some(Command::Broadcast {
				text: tail.to_string(),
			}),
			"price" => {
				let mut parts = tail.split_whitespace();
				let service = parts.next()?.parse::<ServiceKind>().ok()?;
				let price = Decimal::from_str(parts.next()?).ok()?;
				Some(Command::SetPrice { service, price })
			},
			"service" => {
				let mut parts = tail.split_whitespace();
				let service = parts.next()?.parse::<ServiceKind>().ok()?;
				let id = parts.next()?.to_string();
				Some(Command::SetService { service, id })
			},
			"balance" => {
				let mut parts = tail.split_whitespace();
				let user = UserId(parts.next()?.parse::<i64>().ok()?);
				let amount = Decimal::from_str(parts.next()?).ok()?;
				Some(Command::Credit { user, amount })
			},
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal_macros::dec;

	#[test]
	fn button_tags_round_trip() {
		for action in [
			ButtonAction::AddFunds,
			ButtonAction::Order(ServiceKind::Likes),
			ButtonAction::Order(ServiceKind::Views),
			ButtonAction::Confirm,
			ButtonAction::Cancel,
		] {
			assert_eq!(ButtonAction::from_tag(&action.as_tag()), Some(action));
		}
		assert_eq!(ButtonAction::from_tag("order:follows"), None);
		assert_eq!(ButtonAction::from_tag("nope"), None);
	}

	#[test]
	fn parses_user_commands() {
		assert_eq!(Command::parse("/profile"), Some(Command::Profile));
		assert_eq!(Command::parse("/orders"), Some(Command::Orders));
		assert_eq!(Command::parse("hello"), None);
	}

	#[test]
	fn parses_admin_commands() {
		assert_eq!(
			Command::parse("/price likes 1.20"),
			Some(Command::SetPrice {
				service: ServiceKind::Likes,
				price: dec!(1.20),
			})
		);
		assert_eq!(
			Command::parse("/service views 811"),
			Some(Command::SetService {
				service: ServiceKind::Views,
				id: "811".to_string(),
			})
		);
		assert_eq!(
			Command::parse("/balance 123456 10.00"),
			Some(Command::Credit {
				user: UserId(123456),
				amount: dec!(10.00),
			})
		);
		assert_eq!(
			Command::parse("/broadcast maintenance at noon"),
			Some(Command::Broadcast {
				text: "maintenance at noon".to_string(),
			})
		);
	}

	#[test]
	fn rejects_malformed_arguments() {
		assert_eq!(Command::parse("/price likes"), None);
		assert_eq!(Command::parse("/price follows 1.20"), None);
		assert_eq!(Command::parse("/balance abc 10"), None);
		assert_eq!(Command::parse("/broadcast"), None);
	}
}
