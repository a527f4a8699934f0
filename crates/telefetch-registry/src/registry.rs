// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory subscription registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use telefetch_bus::{Event, EventBus};
use telefetch_core::{AccountId, ChatClient, ChatId, Subscription, SubscriptionKey};

use crate::observer::RemovalObserver;

/// What a [`SubscriptionRegistry::reconcile`] call changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: Vec<SubscriptionKey>,
    pub removed: Vec<SubscriptionKey>,
    /// New entries whose account is not authorized.
    pub skipped: Vec<SubscriptionKey>,
}

/// Source of truth for which chats are watched for which account.
///
/// At most one subscription exists per (account, chat). Reads hand out
/// clones, and no lock is held across a call to the chat client or to an
/// observer.
pub struct SubscriptionRegistry {
    items: RwLock<BTreeMap<SubscriptionKey, Subscription>>,
    observers: RwLock<Vec<Arc<dyn RemovalObserver>>>,
    bus: EventBus,
}

impl SubscriptionRegistry {
    pub fn new(bus: EventBus) -> Self {
        Self {
            items: RwLock::new(BTreeMap::new()),
            observers: RwLock::new(Vec::new()),
            bus,
        }
    }

    /// Register a component to be told about removed subscriptions.
    pub async fn register_observer(&self, observer: Arc<dyn RemovalObserver>) {
        debug!(observer = observer.name(), "removal observer registered");
        self.observers.write().await.push(observer);
    }

    /// Insert a subscription, replacing any existing one with the same key.
    pub async fn add(&self, subscription: Subscription) {
        let key = subscription.key();
        let replaced = self
            .items
            .write()
            .await
            .insert(key, subscription)
            .is_some();
        info!(subscription = %key, replaced, "subscription added");
    }

    /// Remove a subscription and purge everything queued for it before returning.
    pub async fn remove(&self, account: AccountId, chat: ChatId) -> Option<Subscription> {
        let key = SubscriptionKey::new(account, chat);
        let removed = self.items.write().await.remove(&key)?;
        info!(subscription = %key, "subscription removed");
        self.notify_removed(std::slice::from_ref(&removed)).await;
        Some(removed)
    }

    pub async fn exists(&self, account: AccountId, chat: ChatId) -> bool {
        self.items
            .read()
            .await
            .contains_key(&SubscriptionKey::new(account, chat))
    }

    pub async fn get(&self, account: AccountId, chat: ChatId) -> Option<Subscription> {
        self.items
            .read()
            .await
            .get(&SubscriptionKey::new(account, chat))
            .cloned()
    }

    /// Snapshot of every subscription, ordered by key.
    pub async fn list(&self) -> Vec<Subscription> {
        self.items.read().await.values().cloned().collect()
    }

    pub async fn list_download_enabled(&self) -> Vec<Subscription> {
        self.filtered(|s| s.download_enabled).await
    }

    pub async fn list_preload_enabled(&self) -> Vec<Subscription> {
        self.filtered(|s| s.preload_enabled).await
    }

    async fn filtered(&self, keep: impl Fn(&Subscription) -> bool) -> Vec<Subscription> {
        self.items
            .read()
            .await
            .values()
            .filter(|s| keep(s))
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Mutate a present subscription in place (cursor or milestone write-back).
    ///
    /// Returns `false` without calling `f` when the subscription was removed
    /// in the meantime, so a scan never resurrects a deleted entry.
    pub async fn update<F>(&self, key: SubscriptionKey, f: F) -> bool
    where
        F: FnOnce(&mut Subscription),
    {
        match self.items.write().await.get_mut(&key) {
            Some(subscription) => {
                f(subscription);
                true
            }
            None => {
                debug!(subscription = %key, "update skipped, subscription no longer present");
                false
            }
        }
    }

    /// Make the registry match `desired`.
    ///
    /// New entries are admitted only if their account is authorized;
    /// unauthorized ones are logged and skipped. Existing entries keep their
    /// cursors. Entries missing from `desired` are removed and observers are
    /// notified before this returns.
    pub async fn reconcile(
        &self,
        desired: Vec<Subscription>,
        client: &dyn ChatClient,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        let present: Vec<SubscriptionKey> = self.items.read().await.keys().copied().collect();
        let mut admitted = Vec::new();
        for subscription in &desired {
            let key = subscription.key();
            if present.contains(&key) || admitted.iter().any(|s: &Subscription| s.key() == key) {
                continue;
            }
            if client.is_authorized(subscription.account_id).await {
                admitted.push(subscription.clone());
            } else {
                warn!(
                    subscription = %key,
                    account = %subscription.account_id,
                    "subscription skipped, account not authorized"
                );
                report.skipped.push(key);
            }
        }

        let removed: Vec<Subscription> = {
            let mut items = self.items.write().await;
            for subscription in admitted {
                let key = subscription.key();
                if !items.contains_key(&key) {
                    items.insert(key, subscription);
                    info!(subscription = %key, "subscription added");
                    report.added.push(key);
                }
            }

            let gone: Vec<SubscriptionKey> = items
                .keys()
                .filter(|key| !desired.iter().any(|s| s.key() == **key))
                .copied()
                .collect();
            gone.iter().filter_map(|key| items.remove(key)).collect()
        };

        for subscription in &removed {
            info!(subscription = %subscription.key(), "subscription removed");
            report.removed.push(subscription.key());
        }
        if !removed.is_empty() {
            self.notify_removed(&removed).await;
        }

        self.bus.publish(Event::SubscriptionsChanged {
            items: self.list().await,
        });
        report
    }

    async fn notify_removed(&self, removed: &[Subscription]) {
        let observers = self.observers.read().await.clone();
        for observer in observers {
            observer.on_removed(removed).await;
            debug!(
                observer = observer.name(),
                count = removed.len(),
                "removal observer notified"
            );
        }
        self.bus.publish(Event::SubscriptionsRemoved {
            keys: removed.iter().map(Subscription::key).collect(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use telefetch_core::{FileType, MessageId, Rule};
    use telefetch_test_utils::MockChatClient;

    fn sub(account: i64, chat: i64) -> Subscription {
        Subscription::new(AccountId(account), ChatId(chat), None)
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<SubscriptionKey>>,
    }

    #[async_trait]
    impl RemovalObserver for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn on_removed(&self, removed: &[Subscription]) {
            self.seen
                .lock()
                .unwrap()
                .extend(removed.iter().map(Subscription::key));
        }
    }

    #[tokio::test]
    async fn add_replaces_by_key() {
        let registry = SubscriptionRegistry::new(EventBus::default());
        registry.add(sub(1, 42)).await;

        let mut replacement = sub(1, 42);
        replacement.rule = Some(Rule {
            file_types: vec![FileType::Video],
            ..Rule::default()
        });
        registry.add(replacement).await;

        assert_eq!(registry.len().await, 1);
        let stored = registry.get(AccountId(1), ChatId(42)).await.unwrap();
        assert_eq!(stored.file_types(), vec![FileType::Video]);
    }

    #[tokio::test]
    async fn enabled_filters() {
        let registry = SubscriptionRegistry::new(EventBus::default());
        let mut preload_only = sub(1, 1);
        preload_only.download_enabled = false;
        preload_only.preload_enabled = true;
        registry.add(preload_only).await;
        registry.add(sub(1, 2)).await;

        let download: Vec<_> = registry
            .list_download_enabled()
            .await
            .iter()
            .map(Subscription::key)
            .collect();
        assert_eq!(download, vec![SubscriptionKey::new(AccountId(1), ChatId(2))]);
        assert_eq!(registry.list_preload_enabled().await.len(), 1);
    }

    #[tokio::test]
    async fn update_does_not_resurrect_removed_entry() {
        let registry = SubscriptionRegistry::new(EventBus::default());
        registry.add(sub(1, 42)).await;
        let key = SubscriptionKey::new(AccountId(1), ChatId(42));

        assert!(registry.update(key, |s| s.next_from_message_id = MessageId(9)).await);
        assert_eq!(
            registry.get(AccountId(1), ChatId(42)).await.unwrap().next_from_message_id,
            MessageId(9)
        );

        registry.remove(AccountId(1), ChatId(42)).await;
        assert!(!registry.update(key, |s| s.next_from_message_id = MessageId(10)).await);
        assert!(!registry.exists(AccountId(1), ChatId(42)).await);
    }

    #[tokio::test]
    async fn remove_notifies_observers_before_returning() {
        let registry = SubscriptionRegistry::new(EventBus::default());
        let recorder = Arc::new(Recorder::default());
        registry.register_observer(recorder.clone()).await;
        registry.add(sub(1, 42)).await;

        registry.remove(AccountId(1), ChatId(42)).await;
        assert_eq!(
            *recorder.seen.lock().unwrap(),
            vec![SubscriptionKey::new(AccountId(1), ChatId(42))]
        );
        assert!(registry.remove(AccountId(1), ChatId(42)).await.is_none());
    }

    #[tokio::test]
    async fn reconcile_adds_authorized_and_removes_absent() {
        let bus = EventBus::default();
        let mut events = bus.subscribe();
        let registry = SubscriptionRegistry::new(bus);
        let recorder = Arc::new(Recorder::default());
        registry.register_observer(recorder.clone()).await;

        let client = MockChatClient::new();
        client.authorize(AccountId(1)).await;

        let mut existing = sub(1, 10);
        existing.next_from_message_id = MessageId(500);
        registry.add(existing).await;
        registry.add(sub(1, 11)).await;

        let report = registry
            .reconcile(vec![sub(1, 10), sub(1, 12), sub(2, 20)], &client)
            .await;

        assert_eq!(report.added, vec![SubscriptionKey::new(AccountId(1), ChatId(12))]);
        assert_eq!(report.removed, vec![SubscriptionKey::new(AccountId(1), ChatId(11))]);
        assert_eq!(report.skipped, vec![SubscriptionKey::new(AccountId(2), ChatId(20))]);
        assert_eq!(
            *recorder.seen.lock().unwrap(),
            vec![SubscriptionKey::new(AccountId(1), ChatId(11))]
        );

        // Existing entries keep their cursors.
        let kept = registry.get(AccountId(1), ChatId(10)).await.unwrap();
        assert_eq!(kept.next_from_message_id, MessageId(500));

        let mut kinds = Vec::new();
        while let Ok(env) = events.try_recv() {
            kinds.push(env.event.kind());
        }
        assert_eq!(kinds, vec!["subscriptions_removed", "subscriptions_changed"]);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn reconcile_warns_on_unauthorized_account() {
        let registry = SubscriptionRegistry::new(EventBus::default());
        let client = MockChatClient::new();

        let report = registry.reconcile(vec![sub(7, 1)], &client).await;

        assert!(report.added.is_empty());
        assert!(registry.is_empty().await);
        assert!(logs_contain("account not authorized"));
    }
}
