// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Automatic download scheduling for the Telefetch download scheduler.
//!
//! Scans subscribed chats backward for files, queues them per account, and
//! starts downloads within each account's concurrency limit. New messages in
//! subscribed chats jump the queue capacity. Completed downloads flow on to
//! the transfer pipeline.

pub mod admission;
pub mod dispatch;
pub mod download;
pub mod listener;
pub mod monitor;
pub mod preload;
pub mod recording;
pub mod scanner;
pub mod service;
pub mod shutdown;
pub mod waiting;

pub use admission::Admission;
pub use dispatch::Dispatcher;
pub use download::DownloadStarter;
pub use listener::LiveListener;
pub use monitor::DownloadMonitor;
pub use preload::{PreloadScanner, PreloadStop};
pub use scanner::{HistoryScanner, ScanStop};
pub use service::AutomationService;
pub use shutdown::install_signal_handler;
pub use waiting::{QueuedFile, WaitingQueues};
