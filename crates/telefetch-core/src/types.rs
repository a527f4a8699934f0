// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Telefetch scheduler.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identifier of an authenticated chat-platform account.
    AccountId
);
id_type!(
    /// Identifier of a chat within an account.
    ChatId
);
id_type!(
    /// Identifier of a message within a chat. Zero is the "newest" search position.
    MessageId
);
id_type!(
    /// Client-local identifier of a file, scoped to one account.
    FileId
);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    ChatClient,
    FileStore,
    SettingStore,
}

/// Kind of downloadable attachment, also used as the search filter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FileType {
    Photo,
    Video,
    Audio,
    File,
}

impl FileType {
    /// Scan order used when a rule lists no file types.
    pub const DEFAULT_ORDER: [FileType; 4] =
        [FileType::Photo, FileType::Video, FileType::Audio, FileType::File];
}

/// Download lifecycle of a stored file record.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DownloadStatus {
    #[default]
    Idle,
    Downloading,
    Paused,
    Completed,
    Error,
}

/// Transfer lifecycle of a stored file record. `Error` is terminal.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransferStatus {
    #[default]
    Idle,
    Transferring,
    Completed,
    Error,
}

/// Keys of the settings persisted through the [`SettingStore`](crate::SettingStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "camelCase")]
pub enum SettingKey {
    /// JSON blob holding every subscription.
    AutoDownload,
    /// Per-account concurrent download ceiling.
    AutoDownloadLimit,
}

/// A downloadable attachment as reported by the chat client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHandle {
    pub id: FileId,
    /// Platform-wide identifier, stable across accounts and re-uploads.
    pub unique_id: String,
    pub file_type: FileType,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub size: u64,
}

/// A chat message, optionally carrying a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub file: Option<FileHandle>,
}

/// Backward search over a chat's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub chat_id: ChatId,
    pub query: Option<String>,
    /// `None` searches every message regardless of attachment kind.
    pub filter: Option<FileType>,
    pub from_message_id: MessageId,
    pub limit: u32,
}

/// One page of search results with the continuation token for the next page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoundMessages {
    pub messages: Vec<ChatMessage>,
    pub next_from_message_id: MessageId,
}

/// Live state of a file inside the chat client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub id: FileId,
    pub unique_id: String,
    pub local_path: Option<PathBuf>,
    pub is_downloading_active: bool,
    pub is_downloading_completed: bool,
    pub downloaded_size: u64,
    pub size: u64,
}

/// A stored file row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileId,
    pub unique_id: String,
    pub account_id: AccountId,
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub file_type: FileType,
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
    pub size: u64,
    pub local_path: Option<PathBuf>,
    pub download_status: DownloadStatus,
    pub transfer_status: TransferStatus,
    pub start_date: Option<DateTime<Utc>>,
    pub completion_date: Option<DateTime<Utc>>,
}

impl FileRecord {
    /// Build an idle record for a file discovered in `chat_id`/`message_id`.
    pub fn discovered(
        account_id: AccountId,
        chat_id: ChatId,
        message_id: MessageId,
        file: &FileHandle,
    ) -> Self {
        Self {
            id: file.id,
            unique_id: file.unique_id.clone(),
            account_id,
            chat_id,
            message_id,
            file_type: file.file_type,
            mime_type: file.mime_type.clone(),
            file_name: file.file_name.clone(),
            size: file.size,
            local_path: None,
            download_status: DownloadStatus::Idle,
            transfer_status: TransferStatus::Idle,
            start_date: None,
            completion_date: None,
        }
    }
}

/// A download status change to apply to a stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadStatusUpdate {
    pub account_id: AccountId,
    pub file_id: FileId,
    pub unique_id: String,
    pub status: DownloadStatus,
    pub local_path: Option<PathBuf>,
    pub completion_date: Option<DateTime<Utc>>,
}

/// Key of a subscription: one chat watched on behalf of one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionKey {
    pub account_id: AccountId,
    pub chat_id: ChatId,
}

impl SubscriptionKey {
    pub fn new(account_id: AccountId, chat_id: ChatId) -> Self {
        Self {
            account_id,
            chat_id,
        }
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.account_id, self.chat_id)
    }
}
