// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-account speed tracking.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use tracing::trace;

use telefetch_core::AccountId;

use crate::estimator::{SpeedEstimator, SpeedStats};

/// One [`SpeedEstimator`] per account, created on first sample.
#[derive(Debug)]
pub struct SpeedTracker {
    window_secs: u32,
    smoothing: usize,
    accounts: Mutex<HashMap<AccountId, SpeedEstimator>>,
}

impl SpeedTracker {
    pub fn new(window_secs: u32, smoothing: usize) -> Self {
        Self {
            window_secs,
            smoothing,
            accounts: Mutex::new(HashMap::new()),
        }
    }

    /// Record the account's cumulative downloaded bytes at `at_ms`.
    pub fn record(&self, account: AccountId, downloaded: u64, at_ms: u64) {
        let mut accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        let estimator = accounts
            .entry(account)
            .or_insert_with(|| SpeedEstimator::new(self.window_secs, self.smoothing));
        estimator.update(downloaded, at_ms);
        trace!(account = %account, downloaded, speed = estimator.speed(), "speed sample recorded");
    }

    /// Record a sample stamped with the current wall clock.
    pub fn record_now(&self, account: AccountId, downloaded: u64) {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        self.record(account, downloaded, now);
    }

    /// Statistics for an account, or `None` if it never reported.
    pub fn stats(&self, account: AccountId) -> Option<SpeedStats> {
        let accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        accounts.get(&account).map(SpeedEstimator::stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accounts_are_tracked_independently() {
        let tracker = SpeedTracker::new(300, 6);
        tracker.record(AccountId(1), 1000, 1_000);
        tracker.record(AccountId(1), 3000, 2_000);
        tracker.record(AccountId(2), 500, 1_000);
        tracker.record(AccountId(2), 600, 2_000);

        assert_eq!(tracker.stats(AccountId(1)).unwrap().avg_speed, 2000);
        assert_eq!(tracker.stats(AccountId(2)).unwrap().avg_speed, 100);
        assert!(tracker.stats(AccountId(3)).is_none());
    }

    #[test]
    fn stats_report_configured_window() {
        let tracker = SpeedTracker::new(120, 6);
        tracker.record_now(AccountId(9), 10);
        assert_eq!(tracker.stats(AccountId(9)).unwrap().interval, 120);
    }
}
