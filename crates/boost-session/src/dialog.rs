//! Pure input-validation steps for the dialog flows.
//!
//! Each function judges one piece of user input against the rules of its
//! dialog step and returns a structured outcome; rendering the reply and
//! mutating the session is the caller's job. Keeping these pure makes the
//! bounds and parsing rules directly testable.

use boost_types::ServiceKind;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

static LINK_RE: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"https?://\S+").expect("link pattern is valid"));

/// Outcome of judging a funding amount.
#[derive(Debug, Clone, PartialEq)]
pub enum AmountOutcome {
	/// Amount accepted, normalized to two decimals.
	Accepted { amount: Decimal },
	/// Numeric but under the configured minimum.
	BelowMinimum { minimum: Decimal },
	/// Not a number at all.
	NotANumber,
}

/// Judges a funding amount against the configured minimum.
pub fn parse_amount(text: &str, minimum: Decimal) -> AmountOutcome {
	let Ok(amount) = Decimal::from_str(text.trim()) else {
		return AmountOutcome::NotANumber;
	};
	let amount = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
	if amount < minimum {
		AmountOutcome::BelowMinimum { minimum }
	} else {
		AmountOutcome::Accepted { amount }
	}
}

/// Outcome of judging a target link.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkOutcome {
	/// A link was found in the text.
	Accepted { link: String },
	/// The text contains nothing that looks like a link.
	Invalid,
}

/// Extracts the first link from the text, if any.
pub fn extract_link(text: &str) -> LinkOutcome {
	match LINK_RE.find(text) {
		Some(found) => LinkOutcome::Accepted {
			link: found.as_str().to_string(),
		},
		None => LinkOutcome::Invalid,
	}
}

/// Outcome of judging an order quantity.
#[derive(Debug, Clone, PartialEq)]
pub enum QuantityOutcome {
	/// Quantity accepted.
	Accepted { quantity: u64 },
	/// Numeric but outside the service's fixed bounds.
	OutOfBounds { min: u64, max: u64 },
	/// Not a number at all.
	NotANumber,
}

/// Judges a quantity against the service's fixed bounds.
pub fn parse_quantity(text: &str, service: ServiceKind) -> QuantityOutcome {
	let Ok(quantity) = text.trim().parse::<u64>() else {
		return QuantityOutcome::NotANumber;
	};
	let (min, max) = service.bounds();
	if quantity < min || quantity > max {
		QuantityOutcome::OutOfBounds { min, max }
	} else {
		QuantityOutcome::Accepted { quantity }
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal_macros::dec;

	#[test]
	fn amounts_respect_the_minimum() {
		assert_eq!(
			parse_amount("10", dec!(5)),
			AmountOutcome::Accepted { amount: dec!(10) }
		);
		assert_eq!(
			parse_amount(" 5.00 ", dec!(5)),
			AmountOutcome::Accepted { amount: dec!(5.00) }
		);
		assert_eq!(
			parse_amount("4.99", dec!(5)),
			AmountOutcome::BelowMinimum { minimum: dec!(5) }
		);
		assert_eq!(parse_amount("ten", dec!(5)), AmountOutcome::NotANumber);
	}

	#[test]
	fn amounts_normalize_to_two_decimals() {
		assert_eq!(
			parse_amount("10.005", dec!(5)),
			AmountOutcome::Accepted { amount: dec!(10.01) }
		);
	}

	#[test]
	fn links_are_extracted_from_surrounding_text() {
		assert_eq!(
			extract_link("here: https://example.com/p/42 thanks"),
			LinkOutcome::Accepted {
				link: "https://example.com/p/42".to_string(),
			}
		);
		assert_eq!(
			extract_link("http://example.com/p/42"),
			LinkOutcome::Accepted {
				link: "http://example.com/p/42".to_string(),
			}
		);
		assert_eq!(extract_link("no link here"), LinkOutcome::Invalid);
	}

	#[test]
	fn quantities_respect_service_bounds() {
		assert_eq!(
			parse_quantity("1000", ServiceKind::Likes),
			QuantityOutcome::Accepted { quantity: 1000 }
		);
		assert_eq!(
			parse_quantity("499", ServiceKind::Likes),
			QuantityOutcome::OutOfBounds {
				min: 500,
				max: 50_000,
			}
		);
		assert_eq!(
			parse_quantity("50001", ServiceKind::Likes),
			QuantityOutcome::OutOfBounds {
				min: 500,
				max: 50_000,
			}
		);
		assert_eq!(
			parse_quantity("999", ServiceKind::Views),
			QuantityOutcome::OutOfBounds {
				min: 1_000,
				max: 1_000_000,
			}
		);
		assert_eq!(
			parse_quantity("1000000", ServiceKind::Views),
			QuantityOutcome::Accepted { quantity: 1_000_000 }
		);
		assert_eq!(
			parse_quantity("12.5", ServiceKind::Views),
			QuantityOutcome::NotANumber
		);
	}
}
