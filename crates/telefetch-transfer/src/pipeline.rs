// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-worker transfer pipeline.
//!
//! Jobs come from download completions and from the periodic backfill of
//! already-downloaded history. One worker drains a deduplicating FIFO, so at
//! most one file is being moved at any time.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use telefetch_bus::{Envelope, Event, EventBus};
use telefetch_core::{
    AccountId, ChatId, DownloadStatus, FileRecord, FileStore, Milestone, Subscription,
    SubscriptionKey, TelefetchError, TransferRule, TransferStatus,
};
use telefetch_registry::{RemovalObserver, SubscriptionRegistry};

use crate::layout::destination_path;
use crate::policy::{TransferOutcome, transfer_file};
use crate::recording;

/// A file waiting to be moved into its destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferJob {
    pub account_id: AccountId,
    pub chat_id: ChatId,
    pub unique_id: String,
}

impl TransferJob {
    pub fn for_record(record: &FileRecord) -> Self {
        Self {
            account_id: record.account_id,
            chat_id: record.chat_id,
            unique_id: record.unique_id.clone(),
        }
    }

    fn key(&self) -> SubscriptionKey {
        SubscriptionKey::new(self.account_id, self.chat_id)
    }
}

pub struct TransferPipeline {
    queue: Mutex<VecDeque<TransferJob>>,
    notify: Notify,
    busy: AtomicBool,
    accepting: AtomicBool,
    files: Arc<dyn FileStore>,
    registry: Arc<SubscriptionRegistry>,
    bus: EventBus,
}

impl TransferPipeline {
    pub fn new(
        files: Arc<dyn FileStore>,
        registry: Arc<SubscriptionRegistry>,
        bus: EventBus,
    ) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            busy: AtomicBool::new(false),
            accepting: AtomicBool::new(true),
            files,
            registry,
            bus,
        }
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, VecDeque<TransferJob>> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a job unless one for the same file is already pending.
    /// Returns `true` if the job was added.
    pub fn enqueue(&self, job: TransferJob) -> bool {
        if !self.accepting.load(Ordering::SeqCst) {
            debug!(unique_id = %job.unique_id, "transfer refused, pipeline shutting down");
            return false;
        }
        let len = {
            let mut queue = self.lock_queue();
            if queue.iter().any(|j| j.unique_id == job.unique_id) {
                return false;
            }
            debug!(unique_id = %job.unique_id, subscription = %job.key(), "transfer queued");
            queue.push_back(job);
            queue.len()
        };
        recording::set_queue_length(len);
        self.notify.notify_one();
        true
    }

    /// Queue several jobs, returning how many were new.
    pub fn enqueue_many(&self, jobs: impl IntoIterator<Item = TransferJob>) -> usize {
        jobs.into_iter().filter(|job| self.enqueue(job.clone())).count()
    }

    pub fn pending(&self) -> Vec<TransferJob> {
        self.lock_queue().iter().cloned().collect()
    }

    /// Whether a job is being processed right now.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Drop pending jobs belonging to any of `keys`. Returns how many were dropped.
    pub fn purge(&self, keys: &[SubscriptionKey]) -> usize {
        let mut queue = self.lock_queue();
        let before = queue.len();
        queue.retain(|job| !keys.contains(&job.key()));
        let purged = before - queue.len();
        recording::set_queue_length(queue.len());
        purged
    }

    /// Pop the next job and mark the worker busy in one step, so a shutdown
    /// poll never sees an idle worker holding a job.
    fn take_next(&self) -> Option<TransferJob> {
        let mut queue = self.lock_queue();
        let job = queue.pop_front();
        if job.is_some() {
            self.busy.store(true, Ordering::SeqCst);
        }
        recording::set_queue_length(queue.len());
        job
    }

    /// Drain the queue until cancelled. A job in progress when the token
    /// fires is finished first.
    pub async fn run_worker(self: Arc<Self>, cancel: CancellationToken) {
        info!("transfer worker started");
        loop {
            while !cancel.is_cancelled() {
                let Some(job) = self.take_next() else { break };
                self.process(&job).await;
                self.busy.store(false, Ordering::SeqCst);
            }
            tokio::select! {
                _ = self.notify.notified() => {}
                _ = cancel.cancelled() => {
                    info!("transfer worker shutting down");
                    break;
                }
            }
        }
    }

    /// Run one job to its final state. Returns the status it ended in, or
    /// `None` when the job was dropped without touching the record.
    pub async fn process(&self, job: &TransferJob) -> Option<TransferStatus> {
        let record = match self.files.get_by_unique_id(&job.unique_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!(unique_id = %job.unique_id, "transfer dropped, file record missing");
                return None;
            }
            Err(e) => {
                warn!(unique_id = %job.unique_id, error = %e, "transfer dropped, file record unreadable");
                return None;
            }
        };
        if record.transfer_status != TransferStatus::Idle {
            debug!(
                unique_id = %record.unique_id,
                status = %record.transfer_status,
                "transfer dropped, already handled"
            );
            return None;
        }
        let Some(rule) = self.transfer_rule(job.key()).await else {
            debug!(unique_id = %record.unique_id, "transfer dropped, no transfer rule");
            return None;
        };

        let Some((source, target)) = record
            .local_path
            .clone()
            .and_then(|source| destination_path(&rule, &record, &source).map(|t| (source, t)))
        else {
            warn!(unique_id = %record.unique_id, "transfer failed, file has no local path");
            recording::record_transfer("error");
            self.set_status(&record, TransferStatus::Error, None).await;
            return Some(TransferStatus::Error);
        };

        self.set_status(&record, TransferStatus::Transferring, None)
            .await;

        let policy = rule.duplication_policy;
        let moved_from = source.clone();
        let result = tokio::task::spawn_blocking(move || transfer_file(&source, &target, policy))
            .await
            .unwrap_or_else(|e| Err(TelefetchError::Internal(format!("transfer task failed: {e}"))));

        let (status, path) = match result {
            Ok(outcome) => {
                recording::record_transfer(outcome.label());
                match outcome {
                    TransferOutcome::Skipped => (TransferStatus::Idle, None),
                    TransferOutcome::Moved(path) | TransferOutcome::Deduplicated(path) => {
                        info!(
                            unique_id = %record.unique_id,
                            from = %moved_from.display(),
                            to = %path.display(),
                            "file transferred"
                        );
                        (TransferStatus::Completed, Some(path))
                    }
                }
            }
            Err(e) => {
                error!(unique_id = %record.unique_id, error = %e, "transfer failed");
                recording::record_transfer("error");
                (TransferStatus::Error, None)
            }
        };
        self.set_status(&record, status, path.as_deref()).await;
        Some(status)
    }

    async fn transfer_rule(&self, key: SubscriptionKey) -> Option<TransferRule> {
        self.registry
            .get(key.account_id, key.chat_id)
            .await
            .and_then(|s| s.transfer_rule().cloned())
    }

    /// Store a transfer status and publish it.
    async fn set_status(&self, record: &FileRecord, status: TransferStatus, path: Option<&Path>) {
        let local_path: Option<PathBuf> = match self
            .files
            .update_transfer_status(&record.unique_id, status, path)
            .await
        {
            Ok(updated) => updated.and_then(|r| r.local_path),
            Err(e) => {
                warn!(unique_id = %record.unique_id, error = %e, "failed to store transfer status");
                path.map(Path::to_path_buf)
            }
        };
        self.bus.publish(Event::TransferStatusChanged {
            account_id: record.account_id,
            unique_id: record.unique_id.clone(),
            transfer_status: status,
            local_path,
        });
    }

    /// Queue a transfer for a finished download if its chat has a transfer rule.
    pub async fn on_download_completed(&self, unique_id: &str) -> bool {
        let record = match self.files.get_by_unique_id(unique_id).await {
            Ok(Some(record)) => record,
            Ok(None) => return false,
            Err(e) => {
                warn!(unique_id, error = %e, "completed file lookup failed");
                return false;
            }
        };
        let key = SubscriptionKey::new(record.account_id, record.chat_id);
        if self.transfer_rule(key).await.is_none() {
            return false;
        }
        self.enqueue(TransferJob::for_record(&record))
    }

    /// Feed completed downloads from the bus into the queue.
    pub async fn run_completion_listener(
        self: Arc<Self>,
        mut events: broadcast::Receiver<Envelope>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(envelope) => {
                        if let Event::DownloadStatusChanged {
                            unique_id,
                            download_status: DownloadStatus::Completed,
                            ..
                        } = envelope.event
                        {
                            self.on_download_completed(&unique_id).await;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "completion listener lagged, backfill will catch up");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = cancel.cancelled() => break,
            }
        }
        debug!("completion listener stopped");
    }

    /// One backfill pass. Stops at the first subscription that contributed
    /// new jobs so every chat gets its turn. Returns the number of new jobs.
    pub async fn backfill_once(&self) -> usize {
        for subscription in self.registry.list().await {
            if !wants_backfill(&subscription) {
                continue;
            }
            let key = subscription.key();
            let candidates = match self
                .files
                .list_transfer_candidates(subscription.account_id, subscription.chat_id)
                .await
            {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!(subscription = %key, error = %e, "transfer candidates unavailable");
                    continue;
                }
            };

            if candidates.is_empty() {
                self.registry
                    .update(key, |s| s.state.complete(Milestone::TransferHistory))
                    .await;
                info!(subscription = %key, "transfer history complete");
                continue;
            }

            let added = self.enqueue_many(candidates.iter().map(TransferJob::for_record));
            if added > 0 {
                debug!(subscription = %key, added, "history transfers queued");
                return added;
            }
        }
        0
    }

    pub async fn run_backfill(self: Arc<Self>, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.backfill_once().await;
                }
                _ = cancel.cancelled() => {
                    debug!("transfer backfill stopped");
                    break;
                }
            }
        }
    }

    /// Stop taking jobs and wait, polling, for the in-flight one to finish.
    /// Returns `false` if it was still running after `timeout`.
    pub async fn shutdown(&self, timeout: Duration, poll: Duration) -> bool {
        self.accepting.store(false, Ordering::SeqCst);
        let deadline = tokio::time::Instant::now() + timeout;
        while self.is_busy() {
            if tokio::time::Instant::now() >= deadline {
                warn!(timeout_secs = timeout.as_secs(), "transfer still running at shutdown");
                return false;
            }
            tokio::time::sleep(poll).await;
        }
        info!(pending = self.lock_queue().len(), "transfer pipeline stopped");
        true
    }
}

/// History transfers apply once the chat's backward scan is exhausted and
/// until every historical file has been handed over.
fn wants_backfill(subscription: &Subscription) -> bool {
    let Some(rule) = subscription.transfer_rule() else {
        return false;
    };
    let state = subscription.state;
    rule.transfer_history
        && !state.is_complete(Milestone::TransferHistory)
        && (state.is_complete(Milestone::DownloadHistory)
            || state.is_complete(Milestone::PreloadHistory))
}

#[async_trait]
impl RemovalObserver for TransferPipeline {
    fn name(&self) -> &str {
        "transfer-pipeline"
    }

    async fn on_removed(&self, removed: &[Subscription]) {
        let keys: Vec<SubscriptionKey> = removed.iter().map(Subscription::key).collect();
        let purged = self.purge(&keys);
        if purged > 0 {
            info!(purged, "pending transfers purged for removed subscriptions");
        }
    }
}
