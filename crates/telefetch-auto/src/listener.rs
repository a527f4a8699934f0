// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reacts to newly received messages in subscribed chats.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use telefetch_bus::{Envelope, Event};
use telefetch_core::{AccountId, ChatClient, ChatId, FileRecord, FileStore, MessageId};
use telefetch_registry::SubscriptionRegistry;

use crate::waiting::{QueuedFile, WaitingQueues};

/// What the listener did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Handled {
    pub queued: bool,
    pub preloaded: bool,
}

pub struct LiveListener {
    registry: Arc<SubscriptionRegistry>,
    client: Arc<dyn ChatClient>,
    files: Arc<dyn FileStore>,
    queues: Arc<WaitingQueues>,
}

impl LiveListener {
    pub fn new(
        registry: Arc<SubscriptionRegistry>,
        client: Arc<dyn ChatClient>,
        files: Arc<dyn FileStore>,
        queues: Arc<WaitingQueues>,
    ) -> Self {
        Self {
            registry,
            client,
            files,
            queues,
        }
    }

    pub async fn on_message(
        &self,
        account: AccountId,
        chat: ChatId,
        message_id: MessageId,
    ) -> Handled {
        let mut handled = Handled::default();
        let Some(subscription) = self.registry.get(account, chat).await else {
            return handled;
        };
        if !subscription.download_enabled && !subscription.preload_enabled {
            return handled;
        }
        if !self.client.is_authorized(account).await {
            debug!(account = %account, "message ignored, account not authorized");
            return handled;
        }

        let message = match self.client.get_message(account, chat, message_id).await {
            Ok(message) => message,
            Err(e) => {
                warn!(account = %account, chat = %chat, message = %message_id, error = %e, "new message unavailable");
                return handled;
            }
        };
        let Some(queued) = QueuedFile::from_message(account, &message) else {
            return handled;
        };

        if subscription.download_enabled {
            handled.queued = self.queues.offer(account, vec![queued.clone()], true).is_some();
        }
        if subscription.preload_enabled {
            let record = FileRecord::discovered(account, chat, message.id, &queued.file);
            match self.files.create_if_absent(&record).await {
                Ok(created) => handled.preloaded = created,
                Err(e) => {
                    warn!(account = %account, unique_id = %record.unique_id, error = %e, "preload record not created");
                }
            }
        }
        handled
    }

    pub async fn run(
        self: Arc<Self>,
        mut events: broadcast::Receiver<Envelope>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(envelope) => {
                        if let Event::MessageReceived { account_id, chat_id, message_id } = envelope.event {
                            self.on_message(account_id, chat_id, message_id).await;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "live listener lagged, messages left to the history scan");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = cancel.cancelled() => break,
            }
        }
        debug!("live listener stopped");
    }
}
