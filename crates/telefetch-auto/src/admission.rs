// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-account concurrent download ceiling.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{debug, info, warn};

use telefetch_core::{AccountId, DownloadStatus, FileStore, SettingKey, SettingStore};

use crate::recording;

/// Computes how many more downloads an account may start.
///
/// The downloading count is read from the file store without locking, so
/// racing dispatches may briefly overshoot the limit.
pub struct Admission {
    limit: AtomicU32,
    files: Arc<dyn FileStore>,
}

impl Admission {
    pub fn new(limit: u32, files: Arc<dyn FileStore>) -> Self {
        recording::set_download_limit(limit);
        Self {
            limit: AtomicU32::new(limit),
            files,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit.load(Ordering::Relaxed)
    }

    /// Change the limit; takes effect on the next admission check.
    pub fn set_limit(&self, limit: u32) {
        let previous = self.limit.swap(limit, Ordering::Relaxed);
        if previous != limit {
            info!(previous, limit, "download limit changed");
        }
        recording::set_download_limit(limit);
    }

    /// Apply the stored `autoDownloadLimit` setting, keeping the current
    /// limit when it is absent or unreadable.
    pub async fn load_limit(&self, settings: &dyn SettingStore) {
        match settings.get_setting(SettingKey::AutoDownloadLimit).await {
            Ok(Some(raw)) => match raw.trim().parse::<u32>() {
                Ok(limit) => self.set_limit(limit),
                Err(e) => warn!(value = %raw, error = %e, "ignoring invalid download limit setting"),
            },
            Ok(None) => debug!(limit = self.limit(), "no stored download limit, using configured"),
            Err(e) => warn!(error = %e, "download limit setting unreadable"),
        }
    }

    /// Remaining download slots. An unreadable count is taken as nothing in flight.
    pub async fn quota(&self, account: AccountId) -> u32 {
        let limit = self.limit();
        let downloading = match self
            .files
            .count_by_status(account, DownloadStatus::Downloading)
            .await
        {
            Ok(count) => count,
            Err(e) => {
                warn!(account = %account, error = %e, "downloading count unavailable");
                0
            }
        };
        limit.saturating_sub(downloading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telefetch_core::{ChatId, FileHandle, FileId, FileRecord, FileType, MessageId};
    use telefetch_test_utils::{MemoryFileStore, MemorySettingStore};

    async fn downloading(store: &MemoryFileStore, account: i64, count: i64) {
        for id in 0..count {
            let handle = FileHandle {
                id: FileId(id),
                unique_id: format!("{account}-{id}"),
                file_type: FileType::Video,
                file_name: None,
                mime_type: None,
                size: 1,
            };
            let mut record =
                FileRecord::discovered(AccountId(account), ChatId(1), MessageId(id), &handle);
            record.download_status = DownloadStatus::Downloading;
            store.insert(record).await;
        }
    }

    #[tokio::test]
    async fn quota_subtracts_downloading_and_clamps() {
        let store = MemoryFileStore::new();
        downloading(&store, 1, 2).await;
        downloading(&store, 2, 7).await;
        let admission = Admission::new(5, Arc::new(store));

        assert_eq!(admission.quota(AccountId(1)).await, 3);
        assert_eq!(admission.quota(AccountId(2)).await, 0);
        assert_eq!(admission.quota(AccountId(3)).await, 5);
    }

    #[tokio::test]
    async fn unreadable_count_means_full_quota() {
        let store = MemoryFileStore::new();
        downloading(&store, 1, 4).await;
        store.fail_counts(true);
        let admission = Admission::new(5, Arc::new(store));
        assert_eq!(admission.quota(AccountId(1)).await, 5);
    }

    #[tokio::test]
    async fn stored_limit_overrides_configured() {
        let settings = MemorySettingStore::new();
        let admission = Admission::new(5, Arc::new(MemoryFileStore::new()));

        admission.load_limit(&settings).await;
        assert_eq!(admission.limit(), 5);

        settings
            .put_setting(SettingKey::AutoDownloadLimit, "not a number")
            .await
            .unwrap();
        admission.load_limit(&settings).await;
        assert_eq!(admission.limit(), 5);

        settings
            .put_setting(SettingKey::AutoDownloadLimit, " 2 ")
            .await
            .unwrap();
        admission.load_limit(&settings).await;
        assert_eq!(admission.limit(), 2);
    }
}
