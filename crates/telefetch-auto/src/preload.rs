// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backward scan that registers file metadata without downloading.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use telefetch_core::{
    ChatClient, FileRecord, FileStore, MessageId, Milestone, SearchRequest, Subscription,
};
use telefetch_registry::SubscriptionRegistry;

const PAGE_SIZE: u32 = 100;

/// Why a preload pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreloadStop {
    /// The preload-history milestone was already set.
    AlreadyComplete,
    /// The oldest message was reached; the milestone is now set.
    Completed,
    Failed,
    BudgetSpent,
}

pub struct PreloadScanner {
    registry: Arc<SubscriptionRegistry>,
    client: Arc<dyn ChatClient>,
    files: Arc<dyn FileStore>,
    budget: Duration,
}

impl PreloadScanner {
    pub fn new(
        registry: Arc<SubscriptionRegistry>,
        client: Arc<dyn ChatClient>,
        files: Arc<dyn FileStore>,
        budget: Duration,
    ) -> Self {
        Self {
            registry,
            client,
            files,
            budget,
        }
    }

    pub async fn scan_once(&self) {
        for subscription in self.registry.list_preload_enabled().await {
            if subscription.state.is_complete(Milestone::PreloadHistory) {
                continue;
            }
            let stop = self.scan_subscription(&subscription).await;
            debug!(subscription = %subscription.key(), ?stop, "preload scan finished");
        }
    }

    pub async fn scan_subscription(&self, subscription: &Subscription) -> PreloadStop {
        if subscription.state.is_complete(Milestone::PreloadHistory) {
            return PreloadStop::AlreadyComplete;
        }
        let started = Instant::now();
        let key = subscription.key();
        let account = subscription.account_id;
        let mut from = subscription.next_from_message_id_for_preload;

        let stop = loop {
            if started.elapsed() > self.budget {
                break PreloadStop::BudgetSpent;
            }
            let request = SearchRequest {
                chat_id: subscription.chat_id,
                query: None,
                filter: None,
                from_message_id: from,
                limit: PAGE_SIZE,
            };
            let page = match self.client.search_messages(account, &request).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(subscription = %key, error = %e, "preload search failed");
                    break PreloadStop::Failed;
                }
            };
            if page.messages.is_empty() {
                break PreloadStop::Completed;
            }

            let mut created = 0;
            let mut write_failed = false;
            for message in &page.messages {
                let Some(file) = &message.file else { continue };
                let record = FileRecord::discovered(account, message.chat_id, message.id, file);
                match self.files.create_if_absent(&record).await {
                    Ok(true) => created += 1,
                    Ok(false) => {}
                    Err(e) => {
                        warn!(subscription = %key, unique_id = %file.unique_id, error = %e, "preload record not created");
                        write_failed = true;
                    }
                }
            }
            if created > 0 {
                debug!(subscription = %key, created, "history files registered");
            }
            // The page is read again next tick; records already written are skipped then.
            if write_failed {
                break PreloadStop::Failed;
            }

            from = page.next_from_message_id;
            if from == MessageId(0) {
                break PreloadStop::Completed;
            }
        };

        let completed = stop == PreloadStop::Completed;
        self.registry
            .update(key, |s| {
                s.next_from_message_id_for_preload = from;
                if completed {
                    s.state.complete(Milestone::PreloadHistory);
                }
            })
            .await;
        if completed {
            info!(subscription = %key, "preload history complete");
        }
        stop
    }

    pub async fn run(self: Arc<Self>, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.scan_once().await,
                _ = cancel.cancelled() => {
                    debug!("preload scanner stopped");
                    break;
                }
            }
        }
    }
}
