// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end scheduler tests.
//!
//! `TestHarness` assembles an [`AutomationService`] over the mock client and
//! in-memory stores. Loops are not spawned; tests drive scans and dispatch
//! ticks directly.

use std::sync::Arc;

use telefetch_auto::{AutomationService, ScanStop};
use telefetch_bus::EventBus;
use telefetch_config::TelefetchConfig;
use telefetch_core::{
    AccountId, ChatId, FileType, Rule, Subscription, SubscriptionKey, TelefetchError,
};

use crate::memory_store::{MemoryFileStore, MemorySettingStore};
use crate::mock_client::MockChatClient;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: TelefetchConfig,
    authorized: Vec<AccountId>,
    subscriptions: Vec<Subscription>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: TelefetchConfig::default(),
            authorized: Vec::new(),
            subscriptions: Vec::new(),
        }
    }

    pub fn with_download_limit(mut self, limit: u32) -> Self {
        self.config.automation.download_limit = limit;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.automation.queue_capacity = capacity;
        self
    }

    pub fn with_config(mut self, config: TelefetchConfig) -> Self {
        self.config = config;
        self
    }

    /// Mark an account as logged in with the mock client.
    pub fn authorized(mut self, account: AccountId) -> Self {
        self.authorized.push(account);
        self
    }

    /// Register a subscription directly in the registry.
    pub fn with_subscription(mut self, subscription: Subscription) -> Self {
        self.subscriptions.push(subscription);
        self
    }

    /// Subscribe `account` to `chat` downloading only `file_types`.
    pub fn watching(self, account: AccountId, chat: ChatId, file_types: Vec<FileType>) -> Self {
        self.with_subscription(Subscription::new(
            account,
            chat,
            Some(Rule {
                file_types,
                ..Rule::default()
            }),
        ))
    }

    pub async fn build(self) -> Result<TestHarness, TelefetchError> {
        let client = MockChatClient::new();
        for account in &self.authorized {
            client.authorize(*account).await;
        }
        let files = MemoryFileStore::new();
        let settings = MemorySettingStore::new();
        let bus = EventBus::default();

        let service = AutomationService::new(
            self.config,
            Arc::new(client.clone()),
            Arc::new(files.clone()),
            Arc::new(settings.clone()),
            bus.clone(),
        );
        service.attach_observers().await;
        for subscription in self.subscriptions {
            service.registry().add(subscription).await;
        }

        Ok(TestHarness {
            service,
            client,
            files,
            settings,
            bus,
        })
    }
}

/// A scheduler over mocks, driven by hand.
pub struct TestHarness {
    pub service: AutomationService,
    pub client: MockChatClient,
    pub files: MemoryFileStore,
    pub settings: MemorySettingStore,
    pub bus: EventBus,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Current state of a subscription.
    pub async fn subscription(&self, account: AccountId, chat: ChatId) -> Option<Subscription> {
        self.service.registry().get(account, chat).await
    }

    /// Run one history pass for a single subscription.
    pub async fn scan(&self, key: SubscriptionKey) -> Option<ScanStop> {
        let subscription = self
            .service
            .registry()
            .get(key.account_id, key.chat_id)
            .await?;
        Some(self.service.history().scan_subscription(&subscription).await)
    }

    /// Run one dispatch tick.
    pub async fn dispatch(&self) -> usize {
        self.service.dispatcher().dispatch_once().await
    }
}
