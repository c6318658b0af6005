//! Configuration validation.
//!
//! Checks numeric ranges and collects every problem into a single
//! `ConfigError`. [`repair`] resets just the offending fields.

use crate::schema::{DuckConfig, HttpConfig};
use duck_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &DuckConfig) -> Result<(), ConfigError> {
    repair(&mut config.clone())
}

/// Reset every invalid field to its default, leaving valid ones alone.
/// The error lists what was reset.
pub fn repair(config: &mut DuckConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();
    let defaults = HttpConfig::default();

    if !in_range(
        &mut errors,
        "http.connect_timeout_secs",
        config.http.connect_timeout_secs,
        1,
        300,
    ) {
        config.http.connect_timeout_secs = defaults.connect_timeout_secs;
    }
    if let Some(timeout) = config.http.timeout_secs {
        if !in_range(&mut errors, "http.timeout_secs", timeout, 1, 3600) {
            config.http.timeout_secs = defaults.timeout_secs;
        }
    }
    if config.http.user_agent.as_deref().is_some_and(blank) {
        errors.push("http.user_agent must not be empty".into());
        config.http.user_agent = defaults.user_agent;
    }
    if config.model.as_deref().is_some_and(blank) {
        errors.push("model must not be empty".into());
        config.model = None;
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Push an error and return false if `value` is outside `[min, max]`.
fn in_range(errors: &mut Vec<String>, name: &str, value: u64, min: u64, max: u64) -> bool {
    if value < min || value > max {
        errors.push(format!("{name} = {value} is out of range [{min}, {max}]"));
        return false;
    }
    true
}
