// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Download speed estimation for the Telefetch download scheduler.

pub mod estimator;
pub mod tracker;

pub use estimator::{SpeedEstimator, SpeedStats};
pub use tracker::SpeedTracker;
