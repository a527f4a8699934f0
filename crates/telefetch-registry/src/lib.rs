// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subscription registry for the Telefetch download scheduler.
//!
//! Holds the (account, chat) subscriptions with their rules, scan cursors
//! and completion milestones, reconciles them against a desired set, and
//! tells [`RemovalObserver`]s about removals.

pub mod observer;
pub mod persistence;
pub mod registry;

pub use observer::RemovalObserver;
pub use persistence::StoredSubscriptions;
pub use registry::{ReconcileReport, SubscriptionRegistry};
