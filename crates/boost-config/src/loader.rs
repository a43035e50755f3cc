//! Environment substitution for configuration files.
//!
//! Secrets such as API keys and bot tokens should not live in the config
//! file itself; `${VAR_NAME}` placeholders are replaced with the value of
//! the named environment variable before the TOML is parsed.

use regex::Regex;

use crate::ConfigError;

/// Replaces every `${VAR_NAME}` placeholder with the environment value.
///
/// An unset variable is a hard error: starting with a silently empty secret
/// is worse than refusing to start.
pub fn substitute_env(raw: &str) -> Result<String, ConfigError> {
	let pattern = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
		.map_err(|e| ConfigError::Parse(e.to_string()))?;

	let mut result = String::with_capacity(raw.len());
	let mut last_end = 0;
	for captures in pattern.captures_iter(raw) {
		let Some(whole) = captures.get(0) else {
			continue;
		};
		let name = &captures[1];
		let value = std::env::var(name).map_err(|_| {
			ConfigError::Validation(format!("environment variable {} is not set", name))
		})?;
		result.push_str(&raw[last_end..whole.start()]);
		result.push_str(&value);
		last_end = whole.end();
	}
	result.push_str(&raw[last_end..]);
	Ok(result)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn passes_through_plain_text() {
		assert_eq!(substitute_env("key = \"v\"").unwrap(), "key = \"v\"");
	}

	#[test]
	fn substitutes_set_variables() {
		std::env::set_var("BOOST_TEST_TOKEN", "sekrit");
		let out = substitute_env("token = \"${BOOST_TEST_TOKEN}\"").unwrap();
		assert_eq!(out, "token = \"sekrit\"");
	}

	#[test]
	fn unset_variable_is_an_error() {
		let err = substitute_env("token = \"${BOOST_TEST_UNSET_VAR}\"").unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
	}
}
