// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::{overlay, wait, FIELD_MANAGER};
use crate::error::{ApplyWaitError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// How manifests are submitted to the cluster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyMode {
    /// Server-side dry run only, nothing is persisted
    pub dry_run: bool,
    /// Use server-side apply instead of client-side merge
    pub server_side: bool,
    /// Ask the API server for strict field validation
    pub validate: bool,
}

/// Invocation configuration, built once and passed to every component
#[derive(Debug, Clone)]
pub struct Config {
    /// Overlay or manifest directory to resolve
    pub overlay_dir: PathBuf,
    /// Target namespace for the apply
    pub namespace: String,
    pub mode: ApplyMode,
    /// Wait for tracked workloads to become ready
    pub wait: bool,
    /// Global readiness wait budget
    pub wait_timeout: Duration,
    pub poll_interval: Duration,
    /// Deadline for each individual apply request
    pub request_timeout: Duration,
    pub field_manager: String,
    /// Command (program + leading args) that builds an overlay directory
    pub build_command: Vec<String>,
}

impl Config {
    /// Create a configuration with default timeouts and flags
    pub fn new(overlay_dir: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        Config {
            overlay_dir: overlay_dir.into(),
            namespace: namespace.into(),
            mode: ApplyMode::default(),
            wait: true,
            wait_timeout: Duration::from_secs(wait::DEFAULT_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(wait::POLL_INTERVAL_SECS),
            request_timeout: Duration::from_secs(wait::REQUEST_TIMEOUT_SECS),
            field_manager: FIELD_MANAGER.to_string(),
            build_command: overlay::DEFAULT_BUILD_COMMAND
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Readiness polling only happens for real applies that asked to wait
    pub fn should_wait(&self) -> bool {
        self.wait && !self.mode.dry_run
    }

    pub fn validate(&self) -> Result<()> {
        if self.namespace.trim().is_empty() {
            return Err(ApplyWaitError::ConfigError(
                "target namespace must not be empty".to_string(),
            ));
        }
        if self.wait_timeout.is_zero() {
            return Err(ApplyWaitError::ConfigError(
                "wait timeout must be positive".to_string(),
            ));
        }
        if self.poll_interval.is_zero() || self.request_timeout.is_zero() {
            return Err(ApplyWaitError::ConfigError(
                "poll interval and request timeout must be positive".to_string(),
            ));
        }
        if self.build_command.is_empty() {
            return Err(ApplyWaitError::ConfigError(
                "overlay build command must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
