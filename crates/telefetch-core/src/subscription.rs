// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subscription model: which chats are watched for which account, and how.
//!
//! The serde shape matches the persisted `autoDownload` settings blob
//! (camelCase field names, `telegramId` for the account).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::flags::CompletionFlags;
use crate::types::{AccountId, ChatId, FileType, MessageId, SubscriptionKey};

/// Directory layout of transferred files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferPolicy {
    /// `destination/<account>/<chat>/<file name>`
    GroupByChat,
    /// `destination/<file type>/<file name>`
    GroupByType,
}

/// What to do when the target path is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DuplicationPolicy {
    Overwrite,
    Rename,
    Skip,
    /// Drop the source when contents match, otherwise rename.
    Hash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRule {
    #[serde(default)]
    pub transfer_history: bool,
    pub destination: PathBuf,
    pub transfer_policy: TransferPolicy,
    pub duplication_policy: DuplicationPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub file_types: Vec<FileType>,
    #[serde(default)]
    pub transfer_rule: Option<TransferRule>,
}

/// One watched (account, chat) pair with its rule, scan cursors and milestones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(rename = "telegramId")]
    pub account_id: AccountId,
    pub chat_id: ChatId,
    #[serde(default)]
    pub rule: Option<Rule>,
    #[serde(default)]
    pub next_file_type: Option<FileType>,
    #[serde(default)]
    pub next_from_message_id: MessageId,
    #[serde(default = "default_true")]
    pub download_enabled: bool,
    #[serde(default)]
    pub preload_enabled: bool,
    #[serde(default)]
    pub next_from_message_id_for_preload: MessageId,
    #[serde(default)]
    pub state: CompletionFlags,
}

fn default_true() -> bool {
    true
}

impl Subscription {
    /// A download-enabled subscription with fresh cursors.
    pub fn new(account_id: AccountId, chat_id: ChatId, rule: Option<Rule>) -> Self {
        Self {
            account_id,
            chat_id,
            rule,
            next_file_type: None,
            next_from_message_id: MessageId::default(),
            download_enabled: true,
            preload_enabled: false,
            next_from_message_id_for_preload: MessageId::default(),
            state: CompletionFlags::empty(),
        }
    }

    pub fn key(&self) -> SubscriptionKey {
        SubscriptionKey::new(self.account_id, self.chat_id)
    }

    /// Non-blank search query, if any.
    pub fn query(&self) -> Option<&str> {
        self.rule
            .as_ref()
            .and_then(|r| r.query.as_deref())
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }

    /// Ordered file types to scan. An empty rule list means the default order.
    pub fn file_types(&self) -> Vec<FileType> {
        match &self.rule {
            Some(rule) if !rule.file_types.is_empty() => rule.file_types.clone(),
            _ => FileType::DEFAULT_ORDER.to_vec(),
        }
    }

    pub fn transfer_rule(&self) -> Option<&TransferRule> {
        self.rule.as_ref().and_then(|r| r.transfer_rule.as_ref())
    }

    /// File type the download cursor points at. A cursor that is unset or
    /// names a type no longer in the rule resolves to the first listed type.
    pub fn current_file_type(&self) -> FileType {
        let types = self.file_types();
        match self.next_file_type {
            Some(t) if types.contains(&t) => t,
            _ => types[0],
        }
    }

    /// Move the download cursor to the start of the next file type.
    ///
    /// Returns `false` (leaving the cursor untouched) when the current type is
    /// the last one.
    pub fn advance_file_type(&mut self) -> bool {
        let types = self.file_types();
        let current = self.current_file_type();
        let next = types
            .iter()
            .position(|t| *t == current)
            .and_then(|i| types.get(i + 1))
            .copied();
        match next {
            Some(t) => {
                self.next_file_type = Some(t);
                self.next_from_message_id = MessageId::default();
                true
            }
            None => {
                self.next_file_type = Some(current);
                false
            }
        }
    }
}
