// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-account waiting queues of files discovered but not yet downloading.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{debug, info};

use telefetch_core::{
    AccountId, ChatId, ChatMessage, FileHandle, FileId, MessageId, Subscription, SubscriptionKey,
};
use telefetch_registry::RemovalObserver;

use crate::recording;

/// A file waiting for a download slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedFile {
    pub account_id: AccountId,
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub file: FileHandle,
}

impl QueuedFile {
    /// `None` for messages without a downloadable file.
    pub fn from_message(account_id: AccountId, message: &ChatMessage) -> Option<Self> {
        message.file.as_ref().map(|file| Self {
            account_id,
            chat_id: message.chat_id,
            message_id: message.id,
            file: file.clone(),
        })
    }

    pub fn file_id(&self) -> FileId {
        self.file.id
    }

    fn key(&self) -> SubscriptionKey {
        SubscriptionKey::new(self.account_id, self.chat_id)
    }
}

/// Bounded FIFO per account. A file id appears at most once per account.
///
/// The bound applies to scanner offers only; forced offers from the live
/// listener always go in.
pub struct WaitingQueues {
    queues: Mutex<HashMap<AccountId, VecDeque<QueuedFile>>>,
    capacity: usize,
}

impl WaitingQueues {
    pub fn new(capacity: usize) -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<AccountId, VecDeque<QueuedFile>>> {
        self.queues.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self, account: AccountId) -> usize {
        self.lock().get(&account).map_or(0, VecDeque::len)
    }

    /// No room for further scanner offers.
    pub fn is_full(&self, account: AccountId) -> bool {
        self.len(account) >= self.capacity
    }

    /// Offer a batch. Files already queued and repeats within the batch are
    /// dropped first; an unforced batch is then rejected whole when its new
    /// files would push the queue past capacity. Returns the number of files
    /// added, or `None` if the batch was refused.
    pub fn offer(&self, account: AccountId, files: Vec<QueuedFile>, force: bool) -> Option<usize> {
        if files.is_empty() {
            return None;
        }
        let (added, len) = {
            let mut queues = self.lock();
            let queue = queues.entry(account).or_default();
            let mut seen: HashSet<FileId> = queue.iter().map(QueuedFile::file_id).collect();
            let fresh: Vec<QueuedFile> = files
                .into_iter()
                .filter(|f| seen.insert(f.file_id()))
                .collect();
            if !force && queue.len() + fresh.len() > self.capacity {
                debug!(
                    account = %account,
                    queued = queue.len(),
                    offered = fresh.len(),
                    capacity = self.capacity,
                    "waiting queue full, batch rejected"
                );
                return None;
            }
            let added = fresh.len();
            queue.extend(fresh);
            (added, queue.len())
        };
        debug!(account = %account, added, len, force, "files queued");
        recording::record_queued(added);
        recording::set_waiting_length(account, len);
        Some(added)
    }

    /// Remove up to `n` files from the front of an account's queue.
    pub fn take(&self, account: AccountId, n: usize) -> Vec<QueuedFile> {
        let mut queues = self.lock();
        let Some(queue) = queues.get_mut(&account) else {
            return Vec::new();
        };
        let n = n.min(queue.len());
        let taken: Vec<QueuedFile> = queue.drain(..n).collect();
        recording::set_waiting_length(account, queue.len());
        taken
    }

    /// Copy of an account's queue, front first.
    pub fn snapshot(&self, account: AccountId) -> Vec<QueuedFile> {
        self.lock()
            .get(&account)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Accounts with at least one queued file, in id order.
    pub fn pending_accounts(&self) -> Vec<AccountId> {
        let mut accounts: Vec<AccountId> = self
            .lock()
            .iter()
            .filter(|(_, q)| !q.is_empty())
            .map(|(account, _)| *account)
            .collect();
        accounts.sort();
        accounts
    }

    /// Drop queued files belonging to any of `keys`.
    pub fn purge(&self, keys: &[SubscriptionKey]) -> usize {
        let mut queues = self.lock();
        let mut purged = 0;
        for (account, queue) in queues.iter_mut() {
            let before = queue.len();
            queue.retain(|f| !keys.contains(&f.key()));
            if queue.len() != before {
                purged += before - queue.len();
                recording::set_waiting_length(*account, queue.len());
            }
        }
        purged
    }
}

#[async_trait]
impl RemovalObserver for WaitingQueues {
    fn name(&self) -> &str {
        "waiting-queues"
    }

    async fn on_removed(&self, removed: &[Subscription]) {
        let keys: Vec<SubscriptionKey> = removed.iter().map(Subscription::key).collect();
        let purged = self.purge(&keys);
        if purged > 0 {
            info!(purged, "queued files purged for removed subscriptions");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use telefetch_core::FileType;

    fn queued(account: i64, chat: i64, id: i64) -> QueuedFile {
        QueuedFile {
            account_id: AccountId(account),
            chat_id: ChatId(chat),
            message_id: MessageId(id),
            file: FileHandle {
                id: FileId(id),
                unique_id: format!("unique-{id}"),
                file_type: FileType::Photo,
                file_name: None,
                mime_type: None,
                size: 1,
            },
        }
    }

    #[test]
    fn message_without_file_is_not_queueable() {
        let message = ChatMessage {
            id: MessageId(1),
            chat_id: ChatId(1),
            file: None,
        };
        assert!(QueuedFile::from_message(AccountId(1), &message).is_none());
    }

    #[test]
    fn unforced_batch_respects_capacity() {
        let queues = WaitingQueues::new(3);
        let account = AccountId(1);
        assert_eq!(queues.offer(account, vec![queued(1, 1, 1), queued(1, 1, 2)], false), Some(2));
        assert_eq!(queues.offer(account, vec![queued(1, 1, 3), queued(1, 1, 4)], false), None);
        assert_eq!(queues.len(account), 2);
        assert_eq!(queues.offer(account, vec![queued(1, 1, 3)], false), Some(1));
        assert!(queues.is_full(account));
    }

    #[test]
    fn repeated_file_ids_do_not_count_against_capacity() {
        let queues = WaitingQueues::new(3);
        let account = AccountId(1);
        assert_eq!(queues.offer(account, vec![queued(1, 1, 1), queued(1, 1, 2)], false), Some(2));
        let batch = vec![queued(1, 1, 2), queued(1, 1, 3), queued(1, 1, 3)];
        assert_eq!(queues.offer(account, batch, false), Some(1));
        assert_eq!(queues.len(account), 3);
    }

    #[test]
    fn forced_batch_ignores_capacity() {
        let queues = WaitingQueues::new(1);
        let account = AccountId(1);
        assert_eq!(queues.offer(account, vec![queued(1, 1, 1)], false), Some(1));
        assert_eq!(queues.offer(account, vec![queued(1, 1, 2), queued(1, 1, 3)], true), Some(2));
        assert_eq!(queues.len(account), 3);
    }

    #[test]
    fn empty_batch_is_not_accepted() {
        let queues = WaitingQueues::new(30);
        assert!(queues.offer(AccountId(1), Vec::new(), true).is_none());
    }

    #[test]
    fn take_is_fifo() {
        let queues = WaitingQueues::new(30);
        let account = AccountId(1);
        queues.offer(account, (1..=4).map(|i| queued(1, 1, i)).collect(), false);
        let taken: Vec<i64> = queues.take(account, 3).iter().map(|f| f.file_id().0).collect();
        assert_eq!(taken, vec![1, 2, 3]);
        assert_eq!(queues.take(account, 10).len(), 1);
        assert!(queues.pending_accounts().is_empty());
    }

    #[test]
    fn purge_only_touches_removed_chats() {
        let queues = WaitingQueues::new(30);
        queues.offer(AccountId(1), vec![queued(1, 10, 1), queued(1, 11, 2)], false);
        queues.offer(AccountId(2), vec![queued(2, 10, 3)], false);

        let purged = queues.purge(&[SubscriptionKey::new(AccountId(1), ChatId(10))]);
        assert_eq!(purged, 1);
        assert_eq!(queues.snapshot(AccountId(1)), vec![queued(1, 11, 2)]);
        assert_eq!(queues.len(AccountId(2)), 1);
    }

    proptest! {
        #[test]
        fn file_ids_stay_unique_per_account(
            batches in prop::collection::vec(
                (prop::collection::vec(0i64..20, 0..8), any::<bool>()),
                0..20,
            )
        ) {
            let queues = WaitingQueues::new(10);
            let account = AccountId(1);
            for (ids, force) in batches {
                let files = ids.into_iter().map(|id| queued(1, 1, id)).collect();
                queues.offer(account, files, force);
            }
            let snapshot = queues.snapshot(account);
            let unique: HashSet<FileId> = snapshot.iter().map(QueuedFile::file_id).collect();
            prop_assert_eq!(unique.len(), snapshot.len());
        }
    }
}
