// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event payloads carried on the bus.
//!
//! `MessageReceived`, `FileUpdated` and `DownloadProgress` are published by
//! the chat connector. The rest are produced by the scheduler and consumed
//! by the transport layer.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use telefetch_core::{
    AccountId, ChatId, DownloadStatus, FileDescriptor, FileId, MessageId, Subscription,
    SubscriptionKey, TransferStatus,
};

/// A bus event with its envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub id: Uuid,
    pub at: DateTime<Utc>,
    pub event: Event,
}

impl Envelope {
    pub fn new(event: Event) -> Self {
        Self {
            id: Uuid::new_v4(),
            at: Utc::now(),
            event,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A new message arrived in a chat the account can see.
    MessageReceived {
        account_id: AccountId,
        chat_id: ChatId,
        message_id: MessageId,
    },
    /// The client reported a change to a file (progress, completion, path).
    FileUpdated {
        account_id: AccountId,
        file: FileDescriptor,
    },
    /// Total bytes downloaded so far across the account's active downloads.
    DownloadProgress {
        account_id: AccountId,
        downloaded_bytes: u64,
    },
    DownloadStatusChanged {
        account_id: AccountId,
        file_id: FileId,
        unique_id: String,
        download_status: DownloadStatus,
        local_path: Option<PathBuf>,
    },
    TransferStatusChanged {
        account_id: AccountId,
        unique_id: String,
        transfer_status: TransferStatus,
        local_path: Option<PathBuf>,
    },
    /// Subscriptions after a reconcile, in full.
    SubscriptionsChanged { items: Vec<Subscription> },
    /// Subscriptions dropped by a reconcile.
    SubscriptionsRemoved { keys: Vec<SubscriptionKey> },
}

impl Event {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::MessageReceived { .. } => "message_received",
            Event::FileUpdated { .. } => "file_updated",
            Event::DownloadProgress { .. } => "download_progress",
            Event::DownloadStatusChanged { .. } => "download_status_changed",
            Event::TransferStatusChanged { .. } => "transfer_status_changed",
            Event::SubscriptionsChanged { .. } => "subscriptions_changed",
            Event::SubscriptionsRemoved { .. } => "subscriptions_removed",
        }
    }
}
