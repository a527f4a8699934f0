// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Internal typed event bus for the Telefetch download scheduler.
//!
//! A thin wrapper over a tokio broadcast channel. Every subscriber sees every
//! event; slow subscribers lose the oldest events and are told how many.

pub mod events;

pub use events::{Envelope, Event};

use tokio::sync::broadcast;
use tracing::trace;

/// Default number of buffered events per subscriber.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Cloneable handle to the shared bus.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Envelope>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event. Returns how many subscribers received it; zero
    /// subscribers is not an error.
    pub fn publish(&self, event: Event) -> usize {
        let kind = event.kind();
        let delivered = self.tx.send(Envelope::new(event)).unwrap_or(0);
        trace!(kind, delivered, "event published");
        delivered
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telefetch_core::{AccountId, ChatId, MessageId, TransferStatus};

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::default();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        let delivered = bus.publish(Event::MessageReceived {
            account_id: AccountId(1),
            chat_id: ChatId(2),
            message_id: MessageId(3),
        });
        assert_eq!(delivered, 2);

        for rx in [&mut a, &mut b] {
            let env = rx.recv().await.unwrap();
            assert_eq!(env.event.kind(), "message_received");
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_not_an_error() {
        let bus = EventBus::new(4);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(
            bus.publish(Event::DownloadProgress {
                account_id: AccountId(1),
                downloaded_bytes: 10,
            }),
            0
        );
    }

    #[tokio::test]
    async fn slow_subscriber_sees_lag() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        for i in 0..5 {
            bus.publish(Event::DownloadProgress {
                account_id: AccountId(1),
                downloaded_bytes: i,
            });
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(3))
        ));
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = Event::TransferStatusChanged {
            account_id: AccountId(1),
            unique_id: "AQAD".into(),
            transfer_status: TransferStatus::Completed,
            local_path: Some("/out/a.jpg".into()),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "transfer_status_changed");
        assert_eq!(json["transfer_status"], "completed");
        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
