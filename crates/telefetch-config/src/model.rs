// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Telefetch download scheduler.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Telefetch configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelefetchConfig {
    /// Discovery, admission and dispatch settings.
    #[serde(default)]
    pub automation: AutomationConfig,

    /// Post-download relocation settings.
    #[serde(default)]
    pub transfer: TransferConfig,

    /// Download speed estimation settings.
    #[serde(default)]
    pub speed: SpeedConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Discovery, admission and dispatch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AutomationConfig {
    /// Maximum concurrent downloads per account. Overridden at runtime by the
    /// `autoDownloadLimit` setting when present.
    #[serde(default = "default_download_limit")]
    pub download_limit: u32,

    /// Per-account waiting queue capacity for history scans.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Seconds between history scan passes.
    #[serde(default = "default_history_scan_interval_secs")]
    pub history_scan_interval_secs: u64,

    /// Wall-clock budget in seconds for scanning one subscription per pass.
    #[serde(default = "default_history_scan_budget_secs")]
    pub history_scan_budget_secs: u64,

    /// Seconds between dispatch ticks.
    #[serde(default = "default_dispatch_interval_secs")]
    pub dispatch_interval_secs: u64,

    /// Seconds between preload scan passes.
    #[serde(default = "default_preload_scan_interval_secs")]
    pub preload_scan_interval_secs: u64,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            download_limit: default_download_limit(),
            queue_capacity: default_queue_capacity(),
            history_scan_interval_secs: default_history_scan_interval_secs(),
            history_scan_budget_secs: default_history_scan_budget_secs(),
            dispatch_interval_secs: default_dispatch_interval_secs(),
            preload_scan_interval_secs: default_preload_scan_interval_secs(),
        }
    }
}

impl AutomationConfig {
    pub fn history_scan_interval(&self) -> Duration {
        Duration::from_secs(self.history_scan_interval_secs)
    }

    pub fn history_scan_budget(&self) -> Duration {
        Duration::from_secs(self.history_scan_budget_secs)
    }

    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_secs(self.dispatch_interval_secs)
    }

    pub fn preload_scan_interval(&self) -> Duration {
        Duration::from_secs(self.preload_scan_interval_secs)
    }
}

fn default_download_limit() -> u32 {
    5
}

fn default_queue_capacity() -> usize {
    30
}

fn default_history_scan_interval_secs() -> u64 {
    120
}

fn default_history_scan_budget_secs() -> u64 {
    10
}

fn default_dispatch_interval_secs() -> u64 {
    10
}

fn default_preload_scan_interval_secs() -> u64 {
    30
}

/// Transfer pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TransferConfig {
    /// Seconds between historical backfill passes.
    #[serde(default = "default_backfill_interval_secs")]
    pub backfill_interval_secs: u64,

    /// Upper bound on how long shutdown waits for an in-flight transfer.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    /// Poll period while waiting for the in-flight transfer at shutdown.
    #[serde(default = "default_shutdown_poll_ms")]
    pub shutdown_poll_ms: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            backfill_interval_secs: default_backfill_interval_secs(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            shutdown_poll_ms: default_shutdown_poll_ms(),
        }
    }
}

impl TransferConfig {
    pub fn backfill_interval(&self) -> Duration {
        Duration::from_secs(self.backfill_interval_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn shutdown_poll(&self) -> Duration {
        Duration::from_millis(self.shutdown_poll_ms)
    }
}

fn default_backfill_interval_secs() -> u64 {
    120
}

fn default_shutdown_timeout_secs() -> u64 {
    60
}

fn default_shutdown_poll_ms() -> u64 {
    500
}

/// Speed estimator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SpeedConfig {
    /// Sliding window of retained samples, in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u32,

    /// Number of recent samples used for outlier-filtered smoothing.
    #[serde(default = "default_smoothing_points")]
    pub smoothing_points: usize,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            smoothing_points: default_smoothing_points(),
        }
    }
}

fn default_window_secs() -> u32 {
    300
}

fn default_smoothing_points() -> usize {
    6
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
