// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Follows client file updates into the file store and the speed tracker.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use telefetch_bus::{Envelope, Event, EventBus};
use telefetch_core::{
    AccountId, DownloadStatus, DownloadStatusUpdate, FileDescriptor, FileStore,
};
use telefetch_speed::SpeedTracker;

/// Download status implied by a client file descriptor.
pub fn status_of(file: &FileDescriptor) -> DownloadStatus {
    if file.is_downloading_active {
        DownloadStatus::Downloading
    } else if file.is_downloading_completed {
        DownloadStatus::Completed
    } else if file.downloaded_size > 0 {
        DownloadStatus::Paused
    } else {
        DownloadStatus::Idle
    }
}

pub struct DownloadMonitor {
    files: Arc<dyn FileStore>,
    bus: EventBus,
    speed: Arc<SpeedTracker>,
}

impl DownloadMonitor {
    pub fn new(files: Arc<dyn FileStore>, bus: EventBus, speed: Arc<SpeedTracker>) -> Self {
        Self { files, bus, speed }
    }

    pub fn speed(&self) -> &SpeedTracker {
        &self.speed
    }

    /// Store the status a file update implies and publish it when it changed.
    /// Files without a record are not ours and are ignored.
    pub async fn on_file_updated(&self, account: AccountId, file: &FileDescriptor) -> bool {
        let record = match self.files.get_by_unique_id(&file.unique_id).await {
            Ok(Some(record)) => record,
            Ok(None) => return false,
            Err(e) => {
                warn!(unique_id = %file.unique_id, error = %e, "file record unreadable");
                return false;
            }
        };

        let status = status_of(file);
        let local_path = if status == DownloadStatus::Completed {
            file.local_path.clone()
        } else {
            None
        };
        if record.download_status == status
            && (local_path.is_none() || record.local_path == local_path)
        {
            return false;
        }

        let update = DownloadStatusUpdate {
            account_id: account,
            file_id: file.id,
            unique_id: file.unique_id.clone(),
            status,
            local_path: local_path.clone(),
            completion_date: (status == DownloadStatus::Completed).then(Utc::now),
        };
        if let Err(e) = self.files.update_download_status(&update).await {
            warn!(unique_id = %file.unique_id, error = %e, "download status not stored");
            return false;
        }
        debug!(account = %account, unique_id = %file.unique_id, %status, "download status changed");
        self.bus.publish(Event::DownloadStatusChanged {
            account_id: account,
            file_id: file.id,
            unique_id: file.unique_id.clone(),
            download_status: status,
            local_path,
        });
        true
    }

    pub async fn run(
        self: Arc<Self>,
        mut events: broadcast::Receiver<Envelope>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(envelope) => match envelope.event {
                        Event::FileUpdated { account_id, file } => {
                            self.on_file_updated(account_id, &file).await;
                        }
                        Event::DownloadProgress { account_id, downloaded_bytes } => {
                            trace!(account = %account_id, downloaded_bytes, "download progress");
                            self.speed.record_now(account_id, downloaded_bytes);
                        }
                        _ => {}
                    },
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "download monitor lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = cancel.cancelled() => break,
            }
        }
        debug!("download monitor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telefetch_core::{ChatId, FileHandle, FileId, FileRecord, FileType, MessageId};
    use telefetch_test_utils::MemoryFileStore;

    fn descriptor(active: bool, completed: bool, downloaded: u64) -> FileDescriptor {
        FileDescriptor {
            id: FileId(5),
            unique_id: "unique-5".into(),
            local_path: completed.then(|| "/dl/a.jpg".into()),
            is_downloading_active: active,
            is_downloading_completed: completed,
            downloaded_size: downloaded,
            size: 100,
        }
    }

    async fn monitor_with_record() -> (DownloadMonitor, MemoryFileStore, EventBus) {
        let store = MemoryFileStore::new();
        let handle = FileHandle {
            id: FileId(5),
            unique_id: "unique-5".into(),
            file_type: FileType::Photo,
            file_name: Some("a.jpg".into()),
            mime_type: None,
            size: 100,
        };
        let mut record = FileRecord::discovered(AccountId(1), ChatId(42), MessageId(5), &handle);
        record.download_status = DownloadStatus::Downloading;
        store.insert(record).await;
        let bus = EventBus::default();
        let monitor = DownloadMonitor::new(
            Arc::new(store.clone()),
            bus.clone(),
            Arc::new(SpeedTracker::new(300, 6)),
        );
        (monitor, store, bus)
    }

    #[test]
    fn status_from_descriptor() {
        assert_eq!(status_of(&descriptor(true, false, 10)), DownloadStatus::Downloading);
        assert_eq!(status_of(&descriptor(false, true, 100)), DownloadStatus::Completed);
        assert_eq!(status_of(&descriptor(false, false, 10)), DownloadStatus::Paused);
        assert_eq!(status_of(&descriptor(false, false, 0)), DownloadStatus::Idle);
    }

    #[tokio::test]
    async fn completion_is_stored_and_published_once() {
        let (monitor, store, bus) = monitor_with_record().await;
        let mut events = bus.subscribe();

        assert!(monitor.on_file_updated(AccountId(1), &descriptor(false, true, 100)).await);
        assert!(!monitor.on_file_updated(AccountId(1), &descriptor(false, true, 100)).await);

        let record = store.get("unique-5").await.unwrap();
        assert_eq!(record.download_status, DownloadStatus::Completed);
        assert!(record.completion_date.is_some());
        assert!(matches!(
            events.try_recv().unwrap().event,
            Event::DownloadStatusChanged {
                download_status: DownloadStatus::Completed,
                ..
            }
        ));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn progress_without_status_change_is_quiet() {
        let (monitor, _store, bus) = monitor_with_record().await;
        let mut events = bus.subscribe();
        assert!(!monitor.on_file_updated(AccountId(1), &descriptor(true, false, 50)).await);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn unknown_files_are_ignored() {
        let monitor = DownloadMonitor::new(
            Arc::new(MemoryFileStore::new()),
            EventBus::default(),
            Arc::new(SpeedTracker::new(300, 6)),
        );
        assert!(!monitor.on_file_updated(AccountId(1), &descriptor(false, true, 100)).await);
    }

    #[tokio::test]
    async fn progress_events_feed_the_speed_tracker() {
        let (monitor, _store, bus) = monitor_with_record().await;
        let monitor = Arc::new(monitor);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(monitor.clone().run(bus.subscribe(), cancel.clone()));

        bus.publish(Event::DownloadProgress {
            account_id: AccountId(1),
            downloaded_bytes: 4096,
        });
        for _ in 0..100 {
            if monitor.speed().stats(AccountId(1)).is_some() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(monitor.speed().stats(AccountId(1)).is_some());

        cancel.cancel();
        task.await.unwrap();
    }
}
