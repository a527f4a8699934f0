// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter traits for file records and settings.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;

use crate::error::TelefetchError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    AccountId, ChatId, DownloadStatus, DownloadStatusUpdate, FileRecord, SettingKey,
    TransferStatus,
};

/// Persistent file records, keyed by the platform-wide unique id.
#[async_trait]
pub trait FileStore: PluginAdapter {
    /// Insert the record unless one with the same unique id exists.
    /// Returns `true` when a row was inserted.
    async fn create_if_absent(&self, record: &FileRecord) -> Result<bool, TelefetchError>;

    /// Records matching any of `unique_ids`, keyed by unique id.
    async fn find_by_unique_ids(
        &self,
        unique_ids: &[String],
    ) -> Result<HashMap<String, FileRecord>, TelefetchError>;

    async fn get_by_unique_id(&self, unique_id: &str)
    -> Result<Option<FileRecord>, TelefetchError>;

    /// Number of the account's records in `status`.
    async fn count_by_status(
        &self,
        account: AccountId,
        status: DownloadStatus,
    ) -> Result<u32, TelefetchError>;

    async fn update_download_status(
        &self,
        update: &DownloadStatusUpdate,
    ) -> Result<(), TelefetchError>;

    /// Set the transfer status (and the new local path, if moved).
    /// Returns the updated record, or `None` when no record matched.
    async fn update_transfer_status(
        &self,
        unique_id: &str,
        status: TransferStatus,
        local_path: Option<&Path>,
    ) -> Result<Option<FileRecord>, TelefetchError>;

    /// Completed downloads of a chat that have not been transferred yet.
    async fn list_transfer_candidates(
        &self,
        account: AccountId,
        chat: ChatId,
    ) -> Result<Vec<FileRecord>, TelefetchError>;
}

/// Key/value settings persisted as strings.
#[async_trait]
pub trait SettingStore: PluginAdapter {
    async fn get_setting(&self, key: SettingKey) -> Result<Option<String>, TelefetchError>;

    async fn put_setting(&self, key: SettingKey, value: &str) -> Result<(), TelefetchError>;
}
