// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Load and persist round trips through the setting store.

use telefetch_bus::EventBus;
use telefetch_core::{
    AccountId, ChatId, MessageId, Milestone, SettingKey, SettingStore, Subscription,
};
use telefetch_registry::{StoredSubscriptions, SubscriptionRegistry};
use telefetch_test_utils::{MemorySettingStore, MockChatClient};

const BLOB: &str = r#"{"items":[
    {"telegramId":1,"chatId":42,"nextFromMessageId":10,"rule":{"fileTypes":["photo"]}},
    {"telegramId":2,"chatId":7,"downloadEnabled":false,"preloadEnabled":true}
]}"#;

#[tokio::test]
async fn load_admits_only_authorized_accounts() {
    let settings = MemorySettingStore::new();
    settings
        .put_setting(SettingKey::AutoDownload, BLOB)
        .await
        .unwrap();
    let client = MockChatClient::new();
    client.authorize(AccountId(1)).await;

    let registry = SubscriptionRegistry::new(EventBus::default());
    let admitted = registry.load(&settings, &client).await.unwrap();

    assert_eq!(admitted, 1);
    assert!(registry.exists(AccountId(1), ChatId(42)).await);
    assert!(!registry.exists(AccountId(2), ChatId(7)).await);
}

#[tokio::test]
async fn missing_blob_is_an_empty_registry() {
    let settings = MemorySettingStore::new();
    let client = MockChatClient::new();
    let registry = SubscriptionRegistry::new(EventBus::default());
    assert_eq!(registry.load(&settings, &client).await.unwrap(), 0);
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn malformed_blob_is_an_error() {
    let settings = MemorySettingStore::new();
    settings
        .put_setting(SettingKey::AutoDownload, "{not json")
        .await
        .unwrap();
    let client = MockChatClient::new();
    let registry = SubscriptionRegistry::new(EventBus::default());
    assert!(registry.load(&settings, &client).await.is_err());
}

#[tokio::test]
async fn persist_merges_cursors_and_keeps_unloaded_entries() {
    let settings = MemorySettingStore::new();
    settings
        .put_setting(SettingKey::AutoDownload, BLOB)
        .await
        .unwrap();
    let client = MockChatClient::new();
    client.authorize(AccountId(1)).await;

    let registry = SubscriptionRegistry::new(EventBus::default());
    registry.load(&settings, &client).await.unwrap();
    let key = Subscription::new(AccountId(1), ChatId(42), None).key();
    registry
        .update(key, |s| {
            s.next_from_message_id = MessageId(99);
            s.state.complete(Milestone::PreloadHistory);
        })
        .await;

    registry.persist(&settings).await.unwrap();

    let stored = StoredSubscriptions::read(&settings).await.unwrap();
    assert_eq!(stored.items.len(), 2);
    let saved = stored.items.iter().find(|s| s.key() == key).unwrap();
    assert_eq!(saved.next_from_message_id, MessageId(99));
    assert!(saved.state.is_complete(Milestone::PreloadHistory));
    assert!(stored.items.iter().any(|s| s.account_id == AccountId(2)));
}
