// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sliding-window speed estimator.
//!
//! Samples are cumulative byte counts keyed by millisecond timestamp. Each
//! sample stores the instantaneous speed measured against the earliest of
//! the last `smoothing` samples; once enough samples exist that speed is
//! outlier-filtered (3 sigma) and recency-weighted. Samples older than the
//! window are dropped on every update.

use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, Copy)]
struct SpeedPoint {
    downloaded: u64,
    /// Bytes per second measured when this point was recorded.
    speed: u64,
}

/// Summary of the retained samples, all speeds in bytes per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedStats {
    /// Window length in seconds.
    pub interval: u32,
    pub avg_speed: u64,
    pub median_speed: u64,
    pub max_speed: u64,
    pub min_speed: u64,
}

#[derive(Debug, Clone)]
pub struct SpeedEstimator {
    window_secs: u32,
    smoothing: usize,
    points: BTreeMap<u64, SpeedPoint>,
}

impl Default for SpeedEstimator {
    fn default() -> Self {
        Self::new(300, 6)
    }
}

/// Bytes per second for `bytes` over `elapsed_ms`, zero when no time passed.
fn rate(bytes: u64, elapsed_ms: u64) -> u64 {
    if elapsed_ms == 0 {
        return 0;
    }
    let per_sec = u128::from(bytes) * 1000 / u128::from(elapsed_ms);
    u64::try_from(per_sec).unwrap_or(u64::MAX)
}

/// Bytes gained from `earlier` to `later`. A smaller later count means the
/// download restarted, so everything counted since the restart is new.
fn gained(earlier: u64, later: u64) -> u64 {
    if later >= earlier { later - earlier } else { later }
}

impl SpeedEstimator {
    /// `smoothing` is clamped to at least one sample.
    pub fn new(window_secs: u32, smoothing: usize) -> Self {
        Self {
            window_secs,
            smoothing: smoothing.max(1),
            points: BTreeMap::new(),
        }
    }

    /// Record the cumulative byte count at `at_ms`.
    ///
    /// A zero count records nothing but still ages out old samples, so an
    /// idle account decays to zero speed.
    pub fn update(&mut self, downloaded: u64, at_ms: u64) {
        if downloaded == 0 {
            self.prune(at_ms);
            return;
        }

        let mut speed = self.instant_speed(downloaded, at_ms);
        if self.points.len() >= self.smoothing {
            speed = self.smooth(speed);
        }
        self.points.insert(at_ms, SpeedPoint { downloaded, speed });
        self.prune(at_ms);
    }

    fn prune(&mut self, now_ms: u64) {
        let cutoff = now_ms.saturating_sub(u64::from(self.window_secs) * 1000);
        self.points = self.points.split_off(&cutoff);
    }

    fn instant_speed(&self, downloaded: u64, at_ms: u64) -> u64 {
        let considered = self.smoothing.min(self.points.len());
        let Some((&earliest_at, earliest)) = self.points.iter().nth(self.points.len() - considered)
        else {
            return 0;
        };
        match at_ms.checked_sub(earliest_at) {
            Some(elapsed) if elapsed > 0 => rate(gained(earliest.downloaded, downloaded), elapsed),
            _ => 0,
        }
    }

    fn smooth(&self, current: u64) -> u64 {
        let skip = self.points.len().saturating_sub(self.smoothing);
        let mut recent: Vec<u64> = self.points.values().skip(skip).map(|p| p.speed).collect();
        recent.push(current);
        if recent.len() < 2 {
            return current;
        }

        let n = recent.len() as f64;
        let mean = recent.iter().map(|&s| s as f64).sum::<f64>() / n;
        let variance = recent
            .iter()
            .map(|&s| {
                let diff = s as f64 - mean;
                diff * diff
            })
            .sum::<f64>()
            / n;
        let band = 3.0 * variance.sqrt();

        let kept: Vec<f64> = recent
            .into_iter()
            .map(|s| s as f64)
            .filter(|s| (mean - band..=mean + band).contains(s))
            .collect();
        if kept.is_empty() {
            return current;
        }

        let size = kept.len() as f64;
        let (weighted, total) = kept
            .iter()
            .enumerate()
            .fold((0.0, 0.0), |(sum, total), (i, s)| {
                let weight = (i as f64 + 1.0) / size;
                (sum + s * weight, total + weight)
            });
        (weighted / total) as u64
    }

    /// Average speed between the oldest and newest retained samples.
    pub fn speed(&self) -> u64 {
        if self.points.len() < 2 {
            return 0;
        }
        let (Some((&first_at, first)), Some((&last_at, last))) =
            (self.points.first_key_value(), self.points.last_key_value())
        else {
            return 0;
        };
        rate(gained(first.downloaded, last.downloaded), last_at - first_at)
    }

    /// Median of the positive recorded speeds (upper median for even counts).
    pub fn median_speed(&self) -> u64 {
        if self.points.len() < 2 {
            return 0;
        }
        let mut speeds: Vec<u64> = self
            .points
            .values()
            .map(|p| p.speed)
            .filter(|&s| s > 0)
            .collect();
        if speeds.is_empty() {
            return 0;
        }
        speeds.sort_unstable();
        speeds[speeds.len() / 2]
    }

    pub fn max_speed(&self) -> u64 {
        self.points.values().map(|p| p.speed).max().unwrap_or(0)
    }

    /// Smallest positive recorded speed.
    pub fn min_speed(&self) -> u64 {
        self.points
            .values()
            .map(|p| p.speed)
            .filter(|&s| s > 0)
            .min()
            .unwrap_or(0)
    }

    pub fn stats(&self) -> SpeedStats {
        SpeedStats {
            interval: self.window_secs,
            avg_speed: self.speed(),
            median_speed: self.median_speed(),
            max_speed: self.max_speed(),
            min_speed: self.min_speed(),
        }
    }

    pub fn sample_count(&self) -> usize {
        self.points.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const BASE: u64 = 1_700_000_000_000;

    fn estimator() -> SpeedEstimator {
        SpeedEstimator::new(100, 3)
    }

    #[test]
    fn initial_state_reports_zero() {
        let est = estimator();
        assert_eq!(est.stats(), SpeedStats {
            interval: 100,
            ..SpeedStats::default()
        });
    }

    #[test]
    fn constant_speed() {
        let mut est = estimator();
        est.update(0, BASE);
        est.update(1000, BASE + 10_000);
        est.update(2000, BASE + 20_000);
        assert_eq!(est.stats().avg_speed, 100);
    }

    #[test]
    fn pause_lowers_average() {
        let mut est = estimator();
        est.update(1000, BASE + 10_000);
        est.update(1000, BASE + 20_000);
        est.update(2000, BASE + 30_000);
        assert_eq!(est.speed(), 50);
    }

    #[test]
    fn restart_never_goes_negative() {
        let mut est = estimator();
        est.update(1000, BASE + 10_000);
        est.update(2000, BASE + 15_000);
        est.update(500, BASE + 20_000);
        let stats = est.stats();
        assert!(stats.max_speed >= 100);
        // 500 bytes since the restart over the 10s span
        assert_eq!(stats.avg_speed, 50);
    }

    #[test]
    fn fluctuation_is_captured_by_max_and_min() {
        let mut est = estimator();
        est.update(500, BASE + 5_000);
        est.update(2500, BASE + 10_000);
        est.update(3000, BASE + 15_000);
        let stats = est.stats();
        assert!(stats.max_speed >= 250, "{stats:?}");
        assert!(stats.min_speed <= 400, "{stats:?}");
        assert!(stats.min_speed > 0);
    }

    #[test]
    fn spike_is_smoothed() {
        let mut est = estimator();
        est.update(1000, BASE + 10_000);
        est.update(2000, BASE + 20_000);
        est.update(3000, BASE + 30_000);
        est.update(8000, BASE + 40_000);
        est.update(9000, BASE + 50_000);
        assert!(est.max_speed() < 500, "spike should be damped: {}", est.max_speed());
    }

    #[test]
    fn old_samples_leave_the_window() {
        let mut est = estimator();
        est.update(1000, BASE + 10_000);
        est.update(2000, BASE + 100_000 + 20_000);
        assert_eq!(est.sample_count(), 1);
        assert_eq!(est.speed(), 0);
    }

    #[test]
    fn zero_report_prunes_without_recording() {
        let mut est = estimator();
        est.update(1000, BASE);
        est.update(2000, BASE + 1_000);
        est.update(0, BASE + 500_000);
        assert_eq!(est.sample_count(), 0);
    }

    #[test]
    fn median_is_between_extremes() {
        let mut est = estimator();
        est.update(1000, BASE + 5_000);
        est.update(1500, BASE + 10_000);
        est.update(3500, BASE + 15_000);
        let median = est.median_speed();
        assert!(median >= est.min_speed() && median <= est.max_speed());
    }

    #[test]
    fn same_timestamp_yields_zero() {
        let mut est = estimator();
        est.update(100, BASE);
        est.update(200, BASE);
        assert_eq!(est.speed(), 0);
    }

    proptest! {
        #[test]
        fn constant_rate_converges(rate_bps in 1u64..10_000_000, steps in 8usize..60) {
            let mut est = SpeedEstimator::new(300, 6);
            for k in 1..=steps as u64 {
                est.update(rate_bps * k, BASE + k * 1000);
            }
            prop_assert_eq!(est.speed(), rate_bps);
            let smoothed = est.max_speed();
            prop_assert!(smoothed <= rate_bps + rate_bps / 100 + 1);
        }

        #[test]
        fn arbitrary_counts_never_panic(samples in proptest::collection::vec((0u64..1u64 << 40, 0u64..5_000), 1..80)) {
            let mut est = SpeedEstimator::default();
            let mut at = BASE;
            for (bytes, step) in samples {
                at += step;
                est.update(bytes, at);
            }
            let stats = est.stats();
            prop_assert!(stats.min_speed <= stats.max_speed);
        }
    }
}
