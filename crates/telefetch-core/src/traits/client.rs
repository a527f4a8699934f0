// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat client adapter trait: the connector to the chat platform.

use async_trait::async_trait;

use crate::error::TelefetchError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    AccountId, ChatId, ChatMessage, FileDescriptor, FileId, FoundMessages, MessageId,
    SearchRequest,
};

/// Per-account access to chat history and the download machinery.
///
/// Every call names the account it acts for. Implementations own the
/// network protocol and authentication; the scheduler only drives them.
#[async_trait]
pub trait ChatClient: PluginAdapter {
    /// Whether the account is currently logged in.
    async fn is_authorized(&self, account: AccountId) -> bool;

    /// Search a chat backward from `request.from_message_id`.
    async fn search_messages(
        &self,
        account: AccountId,
        request: &SearchRequest,
    ) -> Result<FoundMessages, TelefetchError>;

    /// Fetch a single message.
    async fn get_message(
        &self,
        account: AccountId,
        chat: ChatId,
        message: MessageId,
    ) -> Result<ChatMessage, TelefetchError>;

    /// Ask the client to begin downloading a file.
    async fn start_download(
        &self,
        account: AccountId,
        chat: ChatId,
        message: MessageId,
        file: FileId,
    ) -> Result<(), TelefetchError>;

    /// Current client-side state of a file.
    async fn get_file(
        &self,
        account: AccountId,
        file: FileId,
    ) -> Result<FileDescriptor, TelefetchError>;
}
