//! Inbound event handlers.
//!
//! One handler per event family: `chat` drives the per-user dialogs,
//! `admin` executes the allow-listed administrative commands, and `notify`
//! turns bus events into user-facing messages.

pub mod admin;
pub mod chat;
pub mod notify;

pub use admin::AdminHandler;
pub use chat::ChatHandler;
pub use notify::NotificationHandler;

use rust_decimal::Decimal;

/// Formats a money amount with the configured currency symbol.
pub(crate) fn fmt_money(symbol: &str, amount: Decimal) -> String {
	format!("{}{:.2}", symbol, amount)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal_macros::dec;

	#[test]
	fn money_always_shows_two_decimals() {
		assert_eq!(fmt_money("$", dec!(5)), "$5.00");
		assert_eq!(fmt_money("$", dec!(4.1)), "$4.10");
		assert_eq!(fmt_money("€", dec!(0.90)), "€0.90");
	}
}
