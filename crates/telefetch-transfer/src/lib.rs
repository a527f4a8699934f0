// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-download transfer for the Telefetch download scheduler.
//!
//! Completed downloads of chats that carry a transfer rule are moved into a
//! destination tree grouped by chat or by file type. Name collisions are
//! resolved by the rule's duplication policy.

pub mod digest;
pub mod layout;
pub mod pipeline;
pub mod policy;
pub mod recording;

pub use layout::destination_path;
pub use pipeline::{TransferJob, TransferPipeline};
pub use policy::{TransferOutcome, transfer_file};
