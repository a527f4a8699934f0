// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade; the host decides which recorder, if any,
//! collects them.

use metrics::{describe_counter, describe_gauge};

use telefetch_core::AccountId;

/// Register all Telefetch metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "telefetch_files_queued_total",
        "Files added to waiting queues"
    );
    describe_counter!(
        "telefetch_downloads_started_total",
        "Downloads started by the dispatch loop"
    );
    describe_counter!(
        "telefetch_dispatch_failures_total",
        "Queued files dropped because the download could not start"
    );
    describe_gauge!(
        "telefetch_waiting_queue_length",
        "Files waiting for a download slot, per account"
    );
    describe_gauge!(
        "telefetch_download_limit",
        "Concurrent downloads allowed per account"
    );
    telefetch_transfer::recording::register_metrics();
}

pub fn record_queued(count: usize) {
    metrics::counter!("telefetch_files_queued_total").increment(count as u64);
}

pub fn record_download_started() {
    metrics::counter!("telefetch_downloads_started_total").increment(1);
}

pub fn record_dispatch_failure() {
    metrics::counter!("telefetch_dispatch_failures_total").increment(1);
}

pub fn set_waiting_length(account: AccountId, len: usize) {
    metrics::gauge!("telefetch_waiting_queue_length", "account" => account.to_string())
        .set(len as f64);
}

pub fn set_download_limit(limit: u32) {
    metrics::gauge!("telefetch_download_limit").set(f64::from(limit));
}
