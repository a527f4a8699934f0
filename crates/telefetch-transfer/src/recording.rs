// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transfer metrics.

use metrics::{describe_counter, describe_gauge};

/// Register transfer metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        "telefetch_transfers_total",
        "Transfer jobs finished, by outcome"
    );
    describe_gauge!(
        "telefetch_transfer_queue_length",
        "Transfer jobs waiting for the worker"
    );
}

/// Record a finished transfer job.
pub fn record_transfer(outcome: &'static str) {
    metrics::counter!("telefetch_transfers_total", "outcome" => outcome).increment(1);
}

pub fn set_queue_length(len: usize) {
    metrics::gauge!("telefetch_transfer_queue_length").set(len as f64);
}
