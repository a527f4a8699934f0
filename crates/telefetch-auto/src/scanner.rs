// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backward history scan feeding the waiting queues.
//!
//! Each subscription keeps a cursor (file type plus page token). A pass walks
//! pages backward from the cursor until a batch is queued, the queue or the
//! download ceiling pushes back, the history runs out, or the time budget is
//! spent. The cursor only moves past a page once its new files are queued.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use telefetch_core::{
    AccountId, ChatClient, ChatMessage, FileStore, MessageId, SearchRequest, Subscription,
    TelefetchError,
};
use telefetch_registry::SubscriptionRegistry;

use crate::admission::Admission;
use crate::waiting::{QueuedFile, WaitingQueues};

const MAX_PAGE_SIZE: usize = 100;

/// Why a subscription's pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStop {
    /// A batch of this many new files was queued.
    Queued(usize),
    /// No download slots or no queue room; try again next tick.
    Deferred,
    /// The queue refused the batch; the same page is retried next tick.
    Rejected,
    /// Every listed file type has been scanned to the end.
    Exhausted,
    /// A search or lookup failed; retried next tick.
    Failed,
    /// The time budget ran out.
    BudgetSpent,
}

pub struct HistoryScanner {
    registry: Arc<SubscriptionRegistry>,
    client: Arc<dyn ChatClient>,
    files: Arc<dyn FileStore>,
    queues: Arc<WaitingQueues>,
    admission: Arc<Admission>,
    budget: Duration,
}

impl HistoryScanner {
    pub fn new(
        registry: Arc<SubscriptionRegistry>,
        client: Arc<dyn ChatClient>,
        files: Arc<dyn FileStore>,
        queues: Arc<WaitingQueues>,
        admission: Arc<Admission>,
        budget: Duration,
    ) -> Self {
        Self {
            registry,
            client,
            files,
            queues,
            admission,
            budget,
        }
    }

    fn page_size(&self) -> u32 {
        u32::try_from(self.queues.capacity().min(MAX_PAGE_SIZE)).unwrap_or(100)
    }

    /// One pass over every download-enabled subscription.
    pub async fn scan_once(&self) {
        for subscription in self.registry.list_download_enabled().await {
            let stop = self.scan_subscription(&subscription).await;
            debug!(subscription = %subscription.key(), ?stop, "history scan finished");
        }
    }

    /// Scan one subscription and write its cursor back if it moved.
    pub async fn scan_subscription(&self, subscription: &Subscription) -> ScanStop {
        let mut cursor = subscription.clone();
        let stop = self.walk(&mut cursor).await;

        if cursor.next_file_type != subscription.next_file_type
            || cursor.next_from_message_id != subscription.next_from_message_id
        {
            let written = self
                .registry
                .update(subscription.key(), |s| {
                    s.next_file_type = cursor.next_file_type;
                    s.next_from_message_id = cursor.next_from_message_id;
                })
                .await;
            if written {
                debug!(
                    subscription = %subscription.key(),
                    file_type = %cursor.current_file_type(),
                    from = %cursor.next_from_message_id,
                    "history cursor advanced"
                );
            }
        }
        stop
    }

    async fn walk(&self, cursor: &mut Subscription) -> ScanStop {
        let started = Instant::now();
        let account = cursor.account_id;
        let key = cursor.key();

        loop {
            if started.elapsed() > self.budget {
                return ScanStop::BudgetSpent;
            }
            if self.queues.is_full(account) || self.admission.quota(account).await == 0 {
                return ScanStop::Deferred;
            }

            let file_type = cursor.current_file_type();
            let request = SearchRequest {
                chat_id: cursor.chat_id,
                query: cursor.query().map(str::to_owned),
                filter: Some(file_type),
                from_message_id: cursor.next_from_message_id,
                limit: self.page_size(),
            };
            let page = match self.client.search_messages(account, &request).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(subscription = %key, error = %e, "history search failed");
                    return ScanStop::Failed;
                }
            };

            if page.messages.is_empty() {
                if cursor.advance_file_type() {
                    debug!(
                        subscription = %key,
                        finished = %file_type,
                        next = %cursor.current_file_type(),
                        "no more files of this type"
                    );
                    continue;
                }
                info!(subscription = %key, "history scan reached the oldest message");
                return ScanStop::Exhausted;
            }

            let fresh = match self.unseen(account, &page.messages).await {
                Ok(fresh) => fresh,
                Err(e) => {
                    warn!(subscription = %key, error = %e, "file lookup failed");
                    return ScanStop::Failed;
                }
            };

            if fresh.is_empty() {
                if page.next_from_message_id == MessageId(0) {
                    // Last page of this type held nothing new.
                    if cursor.advance_file_type() {
                        continue;
                    }
                    return ScanStop::Exhausted;
                }
                cursor.next_from_message_id = page.next_from_message_id;
                continue;
            }

            return match self.queues.offer(account, fresh, false) {
                Some(added) => {
                    cursor.next_from_message_id = page.next_from_message_id;
                    ScanStop::Queued(added)
                }
                None => ScanStop::Rejected,
            };
        }
    }

    /// Files in `messages` that have no record yet.
    async fn unseen(
        &self,
        account: AccountId,
        messages: &[ChatMessage],
    ) -> Result<Vec<QueuedFile>, TelefetchError> {
        let candidates: Vec<QueuedFile> = messages
            .iter()
            .filter_map(|m| QueuedFile::from_message(account, m))
            .collect();
        if candidates.is_empty() {
            return Ok(candidates);
        }
        let unique_ids: Vec<String> = candidates.iter().map(|q| q.file.unique_id.clone()).collect();
        let known = self.files.find_by_unique_ids(&unique_ids).await?;
        Ok(candidates
            .into_iter()
            .filter(|q| !known.contains_key(&q.file.unique_id))
            .collect())
    }

    pub async fn run(self: Arc<Self>, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.scan_once().await,
                _ = cancel.cancelled() => {
                    debug!("history scanner stopped");
                    break;
                }
            }
        }
    }
}
