// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Where a transferred file goes.

use std::path::{Path, PathBuf};

use telefetch_core::{FileRecord, TransferPolicy, TransferRule};

/// Target path for `source` under the rule's destination, or `None` when the
/// source has no file name.
pub fn destination_path(rule: &TransferRule, record: &FileRecord, source: &Path) -> Option<PathBuf> {
    let name = source.file_name()?;
    let dir = match rule.transfer_policy {
        TransferPolicy::GroupByChat => rule
            .destination
            .join(record.account_id.to_string())
            .join(record.chat_id.to_string()),
        TransferPolicy::GroupByType => rule.destination.join(record.file_type.to_string()),
    };
    Some(dir.join(name))
}
