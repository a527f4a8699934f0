// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Telefetch download scheduler.
//!
//! This crate provides the adapter traits for the chat client and the stores,
//! the shared error type, and the subscription and file models used
//! throughout the Telefetch workspace.

pub mod error;
pub mod flags;
pub mod subscription;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::TelefetchError;
pub use flags::{CompletionFlags, Milestone};
pub use subscription::{DuplicationPolicy, Rule, Subscription, TransferPolicy, TransferRule};
pub use types::{
    AccountId, AdapterType, ChatId, ChatMessage, DownloadStatus, DownloadStatusUpdate,
    FileDescriptor, FileHandle, FileId, FileRecord, FileType, FoundMessages, HealthStatus,
    MessageId, SearchRequest, SettingKey, SubscriptionKey, TransferStatus,
};

pub use traits::{ChatClient, FileStore, PluginAdapter, SettingStore};

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn telefetch_error_has_all_variants() {
        let _config = TelefetchError::Config("test".into());
        let _storage = TelefetchError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _client = TelefetchError::client("test");
        let _unauthorized = TelefetchError::Unauthorized {
            account: AccountId(1),
        };
        let _not_found = TelefetchError::NotFound("file".into());
        let _rejected = TelefetchError::DownloadRejected("already downloaded".into());
        let _io = TelefetchError::io("/tmp/x", std::io::Error::other("test"));
        let _timeout = TelefetchError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = TelefetchError::Internal("test".into());
    }

    #[test]
    fn io_error_mentions_path() {
        let err = TelefetchError::io("/data/a.jpg", std::io::Error::other("denied"));
        let msg = err.to_string();
        assert!(msg.contains("/data/a.jpg"), "got: {msg}");
        assert!(msg.contains("denied"));
    }

    #[test]
    fn setting_keys_use_persisted_names() {
        assert_eq!(SettingKey::AutoDownload.to_string(), "autoDownload");
        assert_eq!(SettingKey::AutoDownloadLimit.to_string(), "autoDownloadLimit");
        assert_eq!(
            SettingKey::from_str("autoDownloadLimit").unwrap(),
            SettingKey::AutoDownloadLimit
        );
    }

    #[test]
    fn file_type_string_forms_match_serde() {
        for ty in FileType::DEFAULT_ORDER {
            let json = serde_json::to_string(&ty).unwrap();
            assert_eq!(json, format!("\"{ty}\""));
            assert_eq!(FileType::from_str(&ty.to_string()).unwrap(), ty);
        }
    }

    #[test]
    fn statuses_default_to_idle() {
        assert_eq!(DownloadStatus::default(), DownloadStatus::Idle);
        assert_eq!(TransferStatus::default(), TransferStatus::Idle);
        assert_eq!(DownloadStatus::Completed.to_string(), "completed");
    }

    #[test]
    fn discovered_record_starts_idle() {
        let handle = FileHandle {
            id: FileId(3),
            unique_id: "AQAD".into(),
            file_type: FileType::Photo,
            file_name: Some("a.jpg".into()),
            mime_type: Some("image/jpeg".into()),
            size: 1024,
        };
        let record = FileRecord::discovered(AccountId(1), ChatId(2), MessageId(3), &handle);
        assert_eq!(record.unique_id, "AQAD");
        assert_eq!(record.download_status, DownloadStatus::Idle);
        assert_eq!(record.transfer_status, TransferStatus::Idle);
        assert!(record.local_path.is_none());
    }

    #[test]
    fn subscription_key_display() {
        let key = SubscriptionKey::new(AccountId(1), ChatId(-42));
        assert_eq!(key.to_string(), "1:-42");
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_chat_client<T: ChatClient>() {}
        fn _assert_file_store<T: FileStore>() {}
        fn _assert_setting_store<T: SettingStore>() {}
    }
}
