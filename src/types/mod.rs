// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster-side status types.

pub mod workload;

pub use workload::{Condition, Verdict, WorkloadStatus};
