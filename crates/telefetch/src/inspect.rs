// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `telefetch subscriptions` command implementation.
//!
//! Reads a stored `autoDownload` blob and prints one line per subscription
//! with its cursors and reached milestones.

use std::fmt::Write as _;
use std::path::Path;

use strum::IntoEnumIterator;
use tracing::debug;

use telefetch_core::{Milestone, Subscription, TelefetchError};
use telefetch_registry::StoredSubscriptions;

/// Parse a blob file into its subscriptions.
pub fn read_blob(path: &Path) -> Result<StoredSubscriptions, TelefetchError> {
    let raw = std::fs::read_to_string(path).map_err(|e| TelefetchError::io(path, e))?;
    if raw.trim().is_empty() {
        return Ok(StoredSubscriptions::default());
    }
    let stored: StoredSubscriptions = serde_json::from_str(&raw)?;
    debug!(path = %path.display(), count = stored.items.len(), "subscription blob read");
    Ok(stored)
}

fn describe(subscription: &Subscription) -> String {
    let milestones: Vec<String> = Milestone::iter()
        .filter(|m| subscription.state.is_complete(*m))
        .map(|m| m.to_string())
        .collect();
    let types: Vec<String> = subscription
        .file_types()
        .iter()
        .map(ToString::to_string)
        .collect();

    let mut line = format!(
        "{}  download={} preload={} types=[{}] cursor={}@{} preload-cursor={}",
        subscription.key(),
        subscription.download_enabled,
        subscription.preload_enabled,
        types.join(","),
        subscription.current_file_type(),
        subscription.next_from_message_id,
        subscription.next_from_message_id_for_preload,
    );
    if let Some(query) = subscription.query() {
        let _ = write!(line, " query={query:?}");
    }
    if let Some(rule) = subscription.transfer_rule() {
        let _ = write!(
            line,
            " transfer={} ({:?}, {:?}, history={})",
            rule.destination.display(),
            rule.transfer_policy,
            rule.duplication_policy,
            rule.transfer_history
        );
    }
    if !milestones.is_empty() {
        let _ = write!(line, " done=[{}]", milestones.join(","));
    }
    line
}

/// Human-readable report, one subscription per line.
pub fn render(stored: &StoredSubscriptions) -> String {
    if stored.items.is_empty() {
        return "no subscriptions\n".to_string();
    }
    let mut out = String::new();
    for subscription in &stored.items {
        out.push_str(&describe(subscription));
        out.push('\n');
    }
    out
}
