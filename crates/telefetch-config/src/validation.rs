// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-zero intervals and a scan budget that fits inside its interval.

use crate::diagnostic::ConfigError;
use crate::model::TelefetchConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &TelefetchConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let automation = &config.automation;

    for (key, value) in [
        (
            "automation.history_scan_interval_secs",
            automation.history_scan_interval_secs,
        ),
        (
            "automation.history_scan_budget_secs",
            automation.history_scan_budget_secs,
        ),
        (
            "automation.dispatch_interval_secs",
            automation.dispatch_interval_secs,
        ),
        (
            "automation.preload_scan_interval_secs",
            automation.preload_scan_interval_secs,
        ),
        (
            "transfer.backfill_interval_secs",
            config.transfer.backfill_interval_secs,
        ),
        ("transfer.shutdown_poll_ms", config.transfer.shutdown_poll_ms),
    ] {
        if value == 0 {
            errors.push(ConfigError::Validation {
                message: format!("{key} must be greater than 0"),
            });
        }
    }

    if automation.queue_capacity == 0 {
        errors.push(ConfigError::Validation {
            message: "automation.queue_capacity must be at least 1".to_string(),
        });
    }

    if automation.history_scan_budget_secs > automation.history_scan_interval_secs {
        errors.push(ConfigError::Validation {
            message: format!(
                "automation.history_scan_budget_secs ({}) must not exceed \
                 automation.history_scan_interval_secs ({})",
                automation.history_scan_budget_secs, automation.history_scan_interval_secs
            ),
        });
    }

    if config.speed.window_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "speed.window_secs must be greater than 0".to_string(),
        });
    }

    if config.speed.smoothing_points == 0 {
        errors.push(ConfigError::Validation {
            message: "speed.smoothing_points must be at least 1".to_string(),
        });
    }

    let level = config.logging.level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        let hint = crate::diagnostic::suggest_key(&level, LOG_LEVELS)
            .map(|s| format!(" (did you mean `{s}`?)"))
            .unwrap_or_default();
        errors.push(ConfigError::Validation {
            message: format!(
                "logging.level `{}` is not one of {}{hint}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
