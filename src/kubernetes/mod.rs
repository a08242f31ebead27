// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster access: the capabilities the apply workflow consumes and their kube-rs implementation.

pub mod client;
pub mod namespaces;

pub use client::KubeCluster;
pub use namespaces::{ensure_namespace_exists, namespace_exists};

use crate::apply::AppliedObject;
use crate::config::Config;
use crate::error::Result;
use crate::manifest::ManifestDocument;
use crate::types::WorkloadStatus;
use crate::workload::WorkloadRef;
use async_trait::async_trait;

/// Cluster capabilities used by the apply workflow
#[async_trait]
pub trait ClusterOps: Send + Sync {
    /// Create the namespace if it does not exist yet
    async fn ensure_namespace(&self, namespace: &str) -> Result<()>;

    /// Check for the namespace without creating it
    async fn namespace_exists(&self, namespace: &str) -> Result<bool>;

    /// Whether the document's kind is namespaced, if its scope is already known
    async fn is_namespaced(&self, _doc: &ManifestDocument) -> Option<bool> {
        None
    }

    /// Submit one object using the configured apply mode
    async fn apply_object(&self, doc: &ManifestDocument, config: &Config) -> Result<AppliedObject>;

    /// Read the current status of a workload, `None` when it does not exist
    async fn read_status(&self, workload: &WorkloadRef) -> Result<Option<WorkloadStatus>>;
}
