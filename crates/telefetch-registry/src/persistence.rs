// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Loading and saving subscriptions through the setting store.
//!
//! All subscriptions live in one JSON blob under
//! [`SettingKey::AutoDownload`], shaped `{"items": [...]}`.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use telefetch_core::{ChatClient, SettingKey, SettingStore, Subscription, TelefetchError};

use crate::registry::SubscriptionRegistry;

/// The persisted subscriptions blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSubscriptions {
    #[serde(default)]
    pub items: Vec<Subscription>,
}

impl StoredSubscriptions {
    /// Replace the entry with the same key, or append.
    pub fn upsert(&mut self, subscription: Subscription) {
        let key = subscription.key();
        self.items.retain(|s| s.key() != key);
        self.items.push(subscription);
    }

    pub async fn read(settings: &dyn SettingStore) -> Result<Self, TelefetchError> {
        match settings.get_setting(SettingKey::AutoDownload).await? {
            Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(&raw)?),
            _ => Ok(Self::default()),
        }
    }
}

impl SubscriptionRegistry {
    /// Populate the registry from the stored blob, admitting only entries
    /// whose account is authorized. Returns how many were admitted.
    pub async fn load(
        &self,
        settings: &dyn SettingStore,
        client: &dyn ChatClient,
    ) -> Result<usize, TelefetchError> {
        let stored = StoredSubscriptions::read(settings).await?;
        let mut admitted = 0;
        for subscription in stored.items {
            if client.is_authorized(subscription.account_id).await {
                self.add(subscription).await;
                admitted += 1;
            } else {
                warn!(
                    subscription = %subscription.key(),
                    "stored subscription not loaded, account not authorized"
                );
            }
        }
        info!(admitted, "subscriptions loaded");
        Ok(admitted)
    }

    /// Merge the in-memory subscriptions (with their cursors and milestones)
    /// into the stored blob. Stored entries for accounts that were not
    /// loaded are kept.
    pub async fn persist(&self, settings: &dyn SettingStore) -> Result<(), TelefetchError> {
        let mut stored = StoredSubscriptions::read(settings).await?;
        let current = self.list().await;
        let count = current.len();
        for subscription in current {
            stored.upsert(subscription);
        }
        let raw = serde_json::to_string(&stored)?;
        settings.put_setting(SettingKey::AutoDownload, &raw).await?;
        info!(count, "subscriptions saved");
        Ok(())
    }
}
