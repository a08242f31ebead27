// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod apply;
pub mod config;
pub mod constants;
pub mod error;
pub mod kubernetes;
pub mod manifest;
pub mod pipeline;
pub mod readiness;
pub mod report;
pub mod types;
pub mod workload;

#[cfg(test)]
pub mod test_utils;
