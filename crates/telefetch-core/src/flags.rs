// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Completion milestones recorded on a subscription.
//!
//! Each milestone marks a backward history scan that has run out of
//! candidates. The set is persisted as a single integer where milestone `n`
//! occupies bit `1 << n`, which keeps existing settings blobs readable.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// A backward scan that can be exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum Milestone {
    /// Every historical message of the chat has a file record.
    PreloadHistory,
    /// Reserved: the download scan never marks itself complete because new
    /// messages can still arrive.
    DownloadHistory,
    /// No completed-but-untransferred files are left for the chat.
    TransferHistory,
}

impl Milestone {
    const fn bit(self) -> u8 {
        match self {
            Milestone::PreloadHistory => 1 << 1,
            Milestone::DownloadHistory => 1 << 2,
            Milestone::TransferHistory => 1 << 3,
        }
    }
}

/// Set of reached milestones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompletionFlags(u8);

impl CompletionFlags {
    pub fn empty() -> Self {
        Self(0)
    }

    /// Mark a milestone as reached. Idempotent.
    pub fn complete(&mut self, milestone: Milestone) {
        self.0 |= milestone.bit();
    }

    pub fn is_complete(&self, milestone: Milestone) -> bool {
        self.0 & milestone.bit() != 0
    }

    /// Raw persisted value.
    pub fn bits(&self) -> u8 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn empty_flags_have_no_milestones() {
        let flags = CompletionFlags::empty();
        for milestone in Milestone::iter() {
            assert!(!flags.is_complete(milestone));
        }
    }

    #[test]
    fn milestones_are_independent() {
        let mut flags = CompletionFlags::empty();
        flags.complete(Milestone::TransferHistory);
        assert!(flags.is_complete(Milestone::TransferHistory));
        assert!(!flags.is_complete(Milestone::PreloadHistory));
        assert!(!flags.is_complete(Milestone::DownloadHistory));
    }

    #[test]
    fn complete_is_idempotent() {
        let mut flags = CompletionFlags::empty();
        flags.complete(Milestone::PreloadHistory);
        let once = flags;
        flags.complete(Milestone::PreloadHistory);
        assert_eq!(once, flags);
    }

    #[test]
    fn persisted_value_uses_legacy_bit_positions() {
        let mut flags = CompletionFlags::empty();
        flags.complete(Milestone::PreloadHistory);
        assert_eq!(flags.bits(), 2);
        flags.complete(Milestone::TransferHistory);
        assert_eq!(flags.bits(), 10);

        let json = serde_json::to_string(&flags).unwrap();
        assert_eq!(json, "10");
        let parsed: CompletionFlags = serde_json::from_str("4").unwrap();
        assert!(parsed.is_complete(Milestone::DownloadHistory));
    }
}
