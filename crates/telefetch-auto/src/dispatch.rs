// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admission and dispatch loop.
//!
//! Every tick, each account with queued files gets as many downloads started
//! as it has free slots, oldest queued first. A file whose download cannot
//! start is dropped rather than requeued.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use telefetch_core::{AccountId, ChatClient};

use crate::admission::Admission;
use crate::download::DownloadStarter;
use crate::recording;
use crate::waiting::WaitingQueues;

pub struct Dispatcher {
    queues: Arc<WaitingQueues>,
    admission: Arc<Admission>,
    client: Arc<dyn ChatClient>,
    starter: DownloadStarter,
}

impl Dispatcher {
    pub fn new(
        queues: Arc<WaitingQueues>,
        admission: Arc<Admission>,
        client: Arc<dyn ChatClient>,
        starter: DownloadStarter,
    ) -> Self {
        Self {
            queues,
            admission,
            client,
            starter,
        }
    }

    /// One tick over every account with queued files. Returns how many
    /// downloads were started.
    pub async fn dispatch_once(&self) -> usize {
        let mut started = 0;
        for account in self.queues.pending_accounts() {
            started += self.dispatch_account(account).await;
        }
        started
    }

    pub async fn dispatch_account(&self, account: AccountId) -> usize {
        if !self.client.is_authorized(account).await {
            warn!(account = %account, queued = self.queues.len(account), "dispatch skipped, account not authorized");
            return 0;
        }
        let quota = self.admission.quota(account).await;
        if quota == 0 {
            debug!(account = %account, "no free download slots");
            return 0;
        }

        let batch = self.queues.take(account, quota as usize);
        let mut started = 0;
        for queued in &batch {
            match self.starter.start(queued).await {
                Ok(()) => {
                    started += 1;
                    recording::record_download_started();
                }
                Err(e) => {
                    warn!(
                        account = %account,
                        chat = %queued.chat_id,
                        message = %queued.message_id,
                        file = %queued.file_id(),
                        error = %e,
                        "download not started, file dropped from queue"
                    );
                    recording::record_dispatch_failure();
                }
            }
        }
        debug!(
            account = %account,
            started,
            remaining = self.queues.len(account),
            "dispatch finished"
        );
        started
    }

    pub async fn run(self: Arc<Self>, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.dispatch_once().await;
                }
                _ = cancel.cancelled() => {
                    debug!("dispatch loop stopped");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use telefetch_bus::EventBus;
    use telefetch_core::{
        ChatId, DownloadStatus, FileHandle, FileId, FileRecord, FileType, MessageId,
    };
    use telefetch_test_utils::{MemoryFileStore, MockChatClient, file_message};

    use crate::waiting::QueuedFile;

    struct Setup {
        dispatcher: Dispatcher,
        client: MockChatClient,
        queues: Arc<WaitingQueues>,
    }

    async fn setup(limit: u32, downloading: i64) -> Setup {
        let client = MockChatClient::new();
        client.authorize(AccountId(1)).await;
        let store = MemoryFileStore::new();
        for id in 0..downloading {
            let handle = FileHandle {
                id: FileId(1000 + id),
                unique_id: format!("busy-{id}"),
                file_type: FileType::Video,
                file_name: None,
                mime_type: None,
                size: 1,
            };
            let mut record = FileRecord::discovered(AccountId(1), ChatId(9), MessageId(id), &handle);
            record.download_status = DownloadStatus::Downloading;
            store.insert(record).await;
        }
        let queues = Arc::new(WaitingQueues::new(100));
        let admission = Arc::new(Admission::new(limit, Arc::new(store.clone())));
        let starter = DownloadStarter::new(
            Arc::new(client.clone()),
            Arc::new(store.clone()),
            EventBus::default(),
        );
        Setup {
            dispatcher: Dispatcher::new(queues.clone(), admission, Arc::new(client.clone()), starter),
            client,
            queues,
        }
    }

    fn fill(queues: &WaitingQueues, count: i64) {
        let files = (1..=count)
            .filter_map(|id| {
                QueuedFile::from_message(AccountId(1), &file_message(ChatId(42), id, FileType::Photo))
            })
            .collect();
        queues.offer(AccountId(1), files, true);
    }

    #[tokio::test]
    async fn starts_up_to_free_slots_in_order() {
        let s = setup(5, 3).await;
        fill(&s.queues, 4);

        assert_eq!(s.dispatcher.dispatch_once().await, 2);
        let started: Vec<i64> = s
            .client
            .started_downloads()
            .await
            .iter()
            .map(|d| d.file.0)
            .collect();
        assert_eq!(started, vec![1, 2]);
        assert_eq!(s.queues.len(AccountId(1)), 2);
    }

    #[tokio::test]
    async fn failed_start_drops_the_file() {
        let s = setup(5, 0).await;
        fill(&s.queues, 2);
        s.client.fail_download(FileId(1)).await;

        assert_eq!(s.dispatcher.dispatch_once().await, 1);
        assert_eq!(s.queues.len(AccountId(1)), 0);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn unauthorized_account_keeps_its_queue() {
        let s = setup(5, 0).await;
        fill(&s.queues, 2);
        s.client.deauthorize(AccountId(1)).await;

        assert_eq!(s.dispatcher.dispatch_once().await, 0);
        assert_eq!(s.queues.len(AccountId(1)), 2);
        assert!(logs_contain("account not authorized"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]
        #[test]
        fn never_exceeds_free_slots(limit in 0u32..8, downloading in 0i64..10, queued in 0i64..12) {
            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            runtime.block_on(async {
                let s = setup(limit, downloading).await;
                fill(&s.queues, queued);
                let started = s.dispatcher.dispatch_once().await;
                let free = i64::from(limit).saturating_sub(downloading).max(0);
                assert!(started as i64 <= free);
                assert_eq!(started as i64, free.min(queued));
            });
        }
    }
}
