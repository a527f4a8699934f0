// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory file and setting stores.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use telefetch_core::{
    AccountId, AdapterType, ChatId, DownloadStatus, DownloadStatusUpdate, FileRecord, FileStore,
    HealthStatus, PluginAdapter, SettingKey, SettingStore, TelefetchError, TransferStatus,
};

fn storage_error(message: &str) -> TelefetchError {
    TelefetchError::Storage {
        source: Box::new(std::io::Error::other(message.to_string())),
    }
}

/// File records keyed by unique id.
#[derive(Clone, Default)]
pub struct MemoryFileStore {
    records: Arc<Mutex<HashMap<String, FileRecord>>>,
    fail_counts: Arc<AtomicBool>,
    fail_creates: Arc<AtomicBool>,
    transfer_delay_ms: Arc<AtomicU64>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record.
    pub async fn insert(&self, record: FileRecord) {
        self.records
            .lock()
            .await
            .insert(record.unique_id.clone(), record);
    }

    pub async fn get(&self, unique_id: &str) -> Option<FileRecord> {
        self.records.lock().await.get(unique_id).cloned()
    }

    pub async fn all(&self) -> Vec<FileRecord> {
        self.records.lock().await.values().cloned().collect()
    }

    /// Make `count_by_status` fail.
    pub fn fail_counts(&self, fail: bool) {
        self.fail_counts.store(fail, Ordering::SeqCst);
    }

    /// Make `create_if_absent` fail.
    pub fn fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    /// Hold every `update_transfer_status` call for `delay`.
    pub fn delay_transfer_updates(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.transfer_delay_ms.store(millis, Ordering::SeqCst);
    }
}

#[async_trait]
impl PluginAdapter for MemoryFileStore {
    fn name(&self) -> &str {
        "memory-file-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::FileStore
    }

    async fn health_check(&self) -> Result<HealthStatus, TelefetchError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TelefetchError> {
        Ok(())
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn create_if_absent(&self, record: &FileRecord) -> Result<bool, TelefetchError> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(storage_error("insert failed"));
        }
        let mut records = self.records.lock().await;
        if records.contains_key(&record.unique_id) {
            return Ok(false);
        }
        records.insert(record.unique_id.clone(), record.clone());
        Ok(true)
    }

    async fn find_by_unique_ids(
        &self,
        unique_ids: &[String],
    ) -> Result<HashMap<String, FileRecord>, TelefetchError> {
        let records = self.records.lock().await;
        Ok(unique_ids
            .iter()
            .filter_map(|id| records.get(id).map(|r| (id.clone(), r.clone())))
            .collect())
    }

    async fn get_by_unique_id(
        &self,
        unique_id: &str,
    ) -> Result<Option<FileRecord>, TelefetchError> {
        Ok(self.records.lock().await.get(unique_id).cloned())
    }

    async fn count_by_status(
        &self,
        account: AccountId,
        status: DownloadStatus,
    ) -> Result<u32, TelefetchError> {
        if self.fail_counts.load(Ordering::SeqCst) {
            return Err(storage_error("count failed"));
        }
        let records = self.records.lock().await;
        let count = records
            .values()
            .filter(|r| r.account_id == account && r.download_status == status)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn update_download_status(
        &self,
        update: &DownloadStatusUpdate,
    ) -> Result<(), TelefetchError> {
        let mut records = self.records.lock().await;
        let Some(record) = records.get_mut(&update.unique_id) else {
            return Err(TelefetchError::NotFound(format!("file {}", update.unique_id)));
        };
        record.download_status = update.status;
        if update.status == DownloadStatus::Downloading && record.start_date.is_none() {
            record.start_date = Some(Utc::now());
        }
        if let Some(path) = &update.local_path {
            record.local_path = Some(path.clone());
        }
        if update.completion_date.is_some() {
            record.completion_date = update.completion_date;
        }
        Ok(())
    }

    async fn update_transfer_status(
        &self,
        unique_id: &str,
        status: TransferStatus,
        local_path: Option<&Path>,
    ) -> Result<Option<FileRecord>, TelefetchError> {
        let delay = self.transfer_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        let mut records = self.records.lock().await;
        Ok(records.get_mut(unique_id).map(|record| {
            record.transfer_status = status;
            if let Some(path) = local_path {
                record.local_path = Some(path.to_path_buf());
            }
            record.clone()
        }))
    }

    async fn list_transfer_candidates(
        &self,
        account: AccountId,
        chat: ChatId,
    ) -> Result<Vec<FileRecord>, TelefetchError> {
        let records = self.records.lock().await;
        let mut candidates: Vec<FileRecord> = records
            .values()
            .filter(|r| {
                r.account_id == account
                    && r.chat_id == chat
                    && r.download_status == DownloadStatus::Completed
                    && r.transfer_status == TransferStatus::Idle
            })
            .cloned()
            .collect();
        candidates.sort_by_key(|r| r.message_id);
        Ok(candidates)
    }
}

/// Settings kept in a map.
#[derive(Clone, Default)]
pub struct MemorySettingStore {
    values: Arc<Mutex<HashMap<SettingKey, String>>>,
}

impl MemorySettingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PluginAdapter for MemorySettingStore {
    fn name(&self) -> &str {
        "memory-setting-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::SettingStore
    }

    async fn health_check(&self) -> Result<HealthStatus, TelefetchError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TelefetchError> {
        Ok(())
    }
}

#[async_trait]
impl SettingStore for MemorySettingStore {
    async fn get_setting(&self, key: SettingKey) -> Result<Option<String>, TelefetchError> {
        Ok(self.values.lock().await.get(&key).cloned())
    }

    async fn put_setting(&self, key: SettingKey, value: &str) -> Result<(), TelefetchError> {
        self.values.lock().await.insert(key, value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telefetch_core::{FileHandle, FileId, FileType, MessageId};

    fn record(unique: &str, account: i64, status: DownloadStatus) -> FileRecord {
        let handle = FileHandle {
            id: FileId(1),
            unique_id: unique.to_string(),
            file_type: FileType::Photo,
            file_name: None,
            mime_type: None,
            size: 1,
        };
        let mut r = FileRecord::discovered(AccountId(account), ChatId(1), MessageId(1), &handle);
        r.download_status = status;
        r
    }

    #[tokio::test]
    async fn create_if_absent_keeps_first_record() {
        let store = MemoryFileStore::new();
        assert!(store.create_if_absent(&record("a", 1, DownloadStatus::Idle)).await.unwrap());
        assert!(
            !store
                .create_if_absent(&record("a", 1, DownloadStatus::Completed))
                .await
                .unwrap()
        );
        assert_eq!(store.get("a").await.unwrap().download_status, DownloadStatus::Idle);

        store.fail_creates(true);
        assert!(store.create_if_absent(&record("b", 1, DownloadStatus::Idle)).await.is_err());
        assert!(store.get("b").await.is_none());
    }

    #[tokio::test]
    async fn counts_by_account_and_status() {
        let store = MemoryFileStore::new();
        store.insert(record("a", 1, DownloadStatus::Downloading)).await;
        store.insert(record("b", 1, DownloadStatus::Downloading)).await;
        store.insert(record("c", 2, DownloadStatus::Downloading)).await;
        store.insert(record("d", 1, DownloadStatus::Completed)).await;
        assert_eq!(
            store.count_by_status(AccountId(1), DownloadStatus::Downloading).await.unwrap(),
            2
        );
        store.fail_counts(true);
        assert!(store.count_by_status(AccountId(1), DownloadStatus::Downloading).await.is_err());
    }

    #[tokio::test]
    async fn settings_round_trip() {
        let store = MemorySettingStore::new();
        assert!(store.get_setting(SettingKey::AutoDownloadLimit).await.unwrap().is_none());
        store.put_setting(SettingKey::AutoDownloadLimit, "3").await.unwrap();
        assert_eq!(
            store.get_setting(SettingKey::AutoDownloadLimit).await.unwrap().as_deref(),
            Some("3")
        );
    }
}
