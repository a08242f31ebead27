// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Readiness tracking for applied workloads.

pub mod poller;
pub mod state;

pub use poller::{poll_until_ready, PollOutcome, PollResult};
pub use state::{ReadinessPhase, ReadinessState, ReadinessTracker};
