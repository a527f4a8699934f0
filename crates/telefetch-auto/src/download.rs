// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Starting a single download.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use telefetch_bus::{Event, EventBus};
use telefetch_core::{
    ChatClient, DownloadStatus, DownloadStatusUpdate, FileRecord, FileStore, TelefetchError,
};

use crate::waiting::QueuedFile;

pub struct DownloadStarter {
    client: Arc<dyn ChatClient>,
    files: Arc<dyn FileStore>,
    bus: EventBus,
}

impl DownloadStarter {
    pub fn new(client: Arc<dyn ChatClient>, files: Arc<dyn FileStore>, bus: EventBus) -> Self {
        Self { client, files, bus }
    }

    /// Ask the client to download a queued file and mark its record downloading.
    ///
    /// A file the client already has is recorded as completed and rejected,
    /// as is one it is already fetching.
    pub async fn start(&self, queued: &QueuedFile) -> Result<(), TelefetchError> {
        let account = queued.account_id;
        let file_id = queued.file_id();
        let record = FileRecord::discovered(account, queued.chat_id, queued.message_id, &queued.file);

        let descriptor = self.client.get_file(account, file_id).await?;
        if descriptor.is_downloading_completed {
            self.files.create_if_absent(&record).await?;
            self.set_status(&record, DownloadStatus::Completed, descriptor.local_path)
                .await?;
            return Err(TelefetchError::DownloadRejected(format!(
                "file {file_id} is already downloaded"
            )));
        }
        if descriptor.is_downloading_active {
            return Err(TelefetchError::DownloadRejected(format!(
                "file {file_id} is already downloading"
            )));
        }

        let created = self.files.create_if_absent(&record).await?;
        self.client
            .start_download(account, queued.chat_id, queued.message_id, file_id)
            .await?;
        self.set_status(&record, DownloadStatus::Downloading, None)
            .await?;
        info!(
            account = %account,
            chat = %queued.chat_id,
            message = %queued.message_id,
            file = %file_id,
            created,
            "download started"
        );
        Ok(())
    }

    async fn set_status(
        &self,
        record: &FileRecord,
        status: DownloadStatus,
        local_path: Option<PathBuf>,
    ) -> Result<(), TelefetchError> {
        let completion_date = (status == DownloadStatus::Completed).then(Utc::now);
        self.files
            .update_download_status(&DownloadStatusUpdate {
                account_id: record.account_id,
                file_id: record.id,
                unique_id: record.unique_id.clone(),
                status,
                local_path: local_path.clone(),
                completion_date,
            })
            .await?;
        debug!(unique_id = %record.unique_id, %status, "download status stored");
        self.bus.publish(Event::DownloadStatusChanged {
            account_id: record.account_id,
            file_id: record.id,
            unique_id: record.unique_id.clone(),
            download_status: status,
            local_path,
        });
        Ok(())
    }
}
