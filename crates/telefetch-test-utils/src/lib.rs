// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Telefetch integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic tests without a chat platform or database.
//!
//! # Components
//!
//! - [`MockChatClient`] - scripted search pages, captured downloads
//! - [`MemoryFileStore`] / [`MemorySettingStore`] - in-memory stores
//! - [`TestHarness`] - a fully wired automation service over the mocks

pub mod harness;
pub mod memory_store;
pub mod mock_client;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use memory_store::{MemoryFileStore, MemorySettingStore};
pub use mock_client::{MockChatClient, StartedDownload, file_message};
