// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApplyWaitError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Manifest build failed: {0}")]
    BuildError(String),

    #[error("Tracked workload not found in manifests: {0}")]
    UnknownWorkloadError(String),

    #[error("Invalid tracking entry: {0}")]
    InvalidTrackingEntry(String),

    #[error("Namespace creation failed: {0}")]
    NamespaceError(String),

    #[error("Apply failed: {0}")]
    ApplyError(String),

    #[error("Status read failed: {0}")]
    StatusError(String),

    #[error("Timed out after {0:?}")]
    TimeoutError(std::time::Duration),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ApplyWaitError {
    /// Stable name of the error category, used in reports
    pub fn code(&self) -> &'static str {
        match self {
            ApplyWaitError::KubeError(_) => "KubeError",
            ApplyWaitError::BuildError(_) => "BuildError",
            ApplyWaitError::UnknownWorkloadError(_) => "UnknownWorkloadError",
            ApplyWaitError::InvalidTrackingEntry(_) => "InvalidTrackingEntry",
            ApplyWaitError::NamespaceError(_) => "NamespaceError",
            ApplyWaitError::ApplyError(_) => "ApplyError",
            ApplyWaitError::StatusError(_) => "StatusError",
            ApplyWaitError::TimeoutError(_) => "TimeoutError",
            ApplyWaitError::ConfigError(_) => "ConfigError",
            ApplyWaitError::YamlError(_) => "YamlError",
            ApplyWaitError::JsonError(_) => "JsonError",
            ApplyWaitError::IoError(_) => "IoError",
        }
    }
}

pub type Result<T> = std::result::Result<T, ApplyWaitError>;
