// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Removal notification seam.

use async_trait::async_trait;

use telefetch_core::Subscription;

/// Component holding per-subscription state that must be dropped when a
/// subscription goes away.
///
/// Observers are awaited in registration order before the removing call
/// returns, so no stale work survives a removal.
#[async_trait]
pub trait RemovalObserver: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str;

    async fn on_removed(&self, removed: &[Subscription]);
}
