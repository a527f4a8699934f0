// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat client for deterministic testing.
//!
//! `MockChatClient` serves scripted search pages keyed by the exact search
//! position, so a page that is not consumed is served again on the next
//! call. Downloads are captured instead of performed.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use telefetch_core::{
    AccountId, AdapterType, ChatClient, ChatId, ChatMessage, FileDescriptor, FileHandle, FileId,
    FileType, FoundMessages, HealthStatus, MessageId, PluginAdapter, SearchRequest,
    TelefetchError,
};

/// Search position a scripted page answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PageKey {
    account: AccountId,
    chat: ChatId,
    filter: Option<FileType>,
    from: MessageId,
}

/// A download the scheduler asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartedDownload {
    pub account: AccountId,
    pub chat: ChatId,
    pub message: MessageId,
    pub file: FileId,
}

#[derive(Default)]
struct State {
    authorized: HashSet<AccountId>,
    pages: HashMap<PageKey, FoundMessages>,
    failing_chats: HashSet<(AccountId, ChatId)>,
    messages: HashMap<(AccountId, ChatId, MessageId), ChatMessage>,
    files: HashMap<(AccountId, FileId), FileDescriptor>,
    failing_downloads: HashSet<FileId>,
    started: Vec<StartedDownload>,
    searches: Vec<(AccountId, SearchRequest)>,
    search_delay: Option<Duration>,
}

/// A mock chat client for testing.
#[derive(Clone, Default)]
pub struct MockChatClient {
    state: Arc<Mutex<State>>,
}

/// Build a message carrying a file of `file_type`; ids derive from `id`.
pub fn file_message(chat: ChatId, id: i64, file_type: FileType) -> ChatMessage {
    ChatMessage {
        id: MessageId(id),
        chat_id: chat,
        file: Some(FileHandle {
            id: FileId(id),
            unique_id: format!("unique-{id}"),
            file_type,
            file_name: Some(format!("file-{id}.bin")),
            mime_type: None,
            size: 1024,
        }),
    }
}

impl MockChatClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn authorize(&self, account: AccountId) {
        self.state.lock().await.authorized.insert(account);
    }

    pub async fn deauthorize(&self, account: AccountId) {
        self.state.lock().await.authorized.remove(&account);
    }

    /// Script the page returned for a search at exactly this position.
    /// Unscripted positions return an empty page.
    pub async fn script_page(
        &self,
        account: AccountId,
        chat: ChatId,
        filter: Option<FileType>,
        from: MessageId,
        page: FoundMessages,
    ) {
        let key = PageKey {
            account,
            chat,
            filter,
            from,
        };
        self.state.lock().await.pages.insert(key, page);
    }

    /// Make every search in the chat fail.
    pub async fn fail_searches(&self, account: AccountId, chat: ChatId) {
        self.state.lock().await.failing_chats.insert((account, chat));
    }

    /// Make every search take `delay` before answering.
    pub async fn delay_searches(&self, delay: Duration) {
        self.state.lock().await.search_delay = Some(delay);
    }

    /// Make `get_message` return this message.
    pub async fn put_message(&self, account: AccountId, message: ChatMessage) {
        let key = (account, message.chat_id, message.id);
        self.state.lock().await.messages.insert(key, message);
    }

    /// Make `get_file` return this descriptor.
    pub async fn put_file(&self, account: AccountId, file: FileDescriptor) {
        self.state.lock().await.files.insert((account, file.id), file);
    }

    /// Make `start_download` fail for a file.
    pub async fn fail_download(&self, file: FileId) {
        self.state.lock().await.failing_downloads.insert(file);
    }

    pub async fn started_downloads(&self) -> Vec<StartedDownload> {
        self.state.lock().await.started.clone()
    }

    pub async fn search_calls(&self) -> Vec<(AccountId, SearchRequest)> {
        self.state.lock().await.searches.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockChatClient {
    fn name(&self) -> &str {
        "mock-chat-client"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::ChatClient
    }

    async fn health_check(&self) -> Result<HealthStatus, TelefetchError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TelefetchError> {
        Ok(())
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn is_authorized(&self, account: AccountId) -> bool {
        self.state.lock().await.authorized.contains(&account)
    }

    async fn search_messages(
        &self,
        account: AccountId,
        request: &SearchRequest,
    ) -> Result<FoundMessages, TelefetchError> {
        let delay = self.state.lock().await.search_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().await;
        state.searches.push((account, request.clone()));
        if state.failing_chats.contains(&(account, request.chat_id)) {
            return Err(TelefetchError::client("search failed"));
        }
        let key = PageKey {
            account,
            chat: request.chat_id,
            filter: request.filter,
            from: request.from_message_id,
        };
        Ok(state.pages.get(&key).cloned().unwrap_or_default())
    }

    async fn get_message(
        &self,
        account: AccountId,
        chat: ChatId,
        message: MessageId,
    ) -> Result<ChatMessage, TelefetchError> {
        self.state
            .lock()
            .await
            .messages
            .get(&(account, chat, message))
            .cloned()
            .ok_or_else(|| TelefetchError::NotFound(format!("message {chat}/{message}")))
    }

    async fn start_download(
        &self,
        account: AccountId,
        chat: ChatId,
        message: MessageId,
        file: FileId,
    ) -> Result<(), TelefetchError> {
        let mut state = self.state.lock().await;
        if state.failing_downloads.contains(&file) {
            return Err(TelefetchError::client(format!("download of {file} refused")));
        }
        state.started.push(StartedDownload {
            account,
            chat,
            message,
            file,
        });
        Ok(())
    }

    async fn get_file(
        &self,
        account: AccountId,
        file: FileId,
    ) -> Result<FileDescriptor, TelefetchError> {
        let state = self.state.lock().await;
        Ok(state
            .files
            .get(&(account, file))
            .cloned()
            .unwrap_or_else(|| FileDescriptor {
                id: file,
                unique_id: format!("unique-{file}"),
                local_path: None,
                is_downloading_active: false,
                is_downloading_completed: false,
                downloaded_size: 0,
                size: 0,
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(chat: ChatId, from: MessageId) -> SearchRequest {
        SearchRequest {
            chat_id: chat,
            query: None,
            filter: Some(FileType::Photo),
            from_message_id: from,
            limit: 30,
        }
    }

    #[tokio::test]
    async fn scripted_page_is_served_until_replaced() {
        let client = MockChatClient::new();
        let page = FoundMessages {
            messages: vec![file_message(ChatId(1), 5, FileType::Photo)],
            next_from_message_id: MessageId(5),
        };
        client
            .script_page(AccountId(1), ChatId(1), Some(FileType::Photo), MessageId(0), page.clone())
            .await;

        for _ in 0..2 {
            let found = client
                .search_messages(AccountId(1), &request(ChatId(1), MessageId(0)))
                .await
                .unwrap();
            assert_eq!(found, page);
        }
        let empty = client
            .search_messages(AccountId(1), &request(ChatId(1), MessageId(5)))
            .await
            .unwrap();
        assert!(empty.messages.is_empty());
        assert_eq!(client.search_calls().await.len(), 3);
    }

    #[tokio::test]
    async fn downloads_are_captured_or_refused() {
        let client = MockChatClient::new();
        client.fail_download(FileId(2)).await;
        client
            .start_download(AccountId(1), ChatId(1), MessageId(1), FileId(1))
            .await
            .unwrap();
        assert!(
            client
                .start_download(AccountId(1), ChatId(1), MessageId(2), FileId(2))
                .await
                .is_err()
        );
        assert_eq!(client.started_downloads().await.len(), 1);
    }

    #[tokio::test]
    async fn authorization_is_per_account() {
        let client = MockChatClient::new();
        client.authorize(AccountId(1)).await;
        assert!(client.is_authorized(AccountId(1)).await);
        assert!(!client.is_authorized(AccountId(2)).await);
        client.deauthorize(AccountId(1)).await;
        assert!(!client.is_authorized(AccountId(1)).await);
    }
}
