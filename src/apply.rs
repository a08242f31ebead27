// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster Apply Executor: submits every manifest document and records one outcome per object.

use crate::config::Config;
use crate::error::ApplyWaitError;
use crate::kubernetes::ClusterOps;
use crate::manifest::ManifestDocument;
use crate::workload::WorkloadKind;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::fmt;
use tokio::time::timeout;
use tracing::{info, instrument, warn};

/// What the cluster did with a submitted object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplyAction {
    Created,
    Configured,
    Unchanged,
    /// Dry run reported a difference from the live object
    WouldChange,
    Error,
}

impl fmt::Display for ApplyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ApplyAction::Created => "created",
            ApplyAction::Configured => "configured",
            ApplyAction::Unchanged => "unchanged",
            ApplyAction::WouldChange => "would-change",
            ApplyAction::Error => "error",
        })
    }
}

/// Result of applying one object, as reported by the cluster
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedObject {
    /// Namespace the object landed in, `None` for cluster-scoped objects
    pub namespace: Option<String>,
    pub action: ApplyAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyOutcome {
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub name: String,
    pub action: ApplyAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApplyOutcome {
    pub fn is_error(&self) -> bool {
        self.action == ApplyAction::Error
    }
}

impl fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{} {}: {}", self.kind, ns, self.name, self.action)?,
            None => write!(f, "{} {}: {}", self.kind, self.name, self.action)?,
        }
        if let Some(error) = &self.error {
            write!(f, " ({})", error)?;
        }
        Ok(())
    }
}

/// Apply every document in order. Each write is bounded by the request timeout
/// and is attempted exactly once; a failing object does not stop the rest.
#[instrument(skip_all, fields(objects = documents.len(), dry_run = config.mode.dry_run, server_side = config.mode.server_side))]
pub async fn execute(
    cluster: &dyn ClusterOps,
    documents: &[ManifestDocument],
    config: &Config,
) -> Vec<ApplyOutcome> {
    let mut outcomes = Vec::with_capacity(documents.len());

    for doc in documents {
        let result = timeout(config.request_timeout, cluster.apply_object(doc, config))
            .await
            .unwrap_or(Err(ApplyWaitError::TimeoutError(config.request_timeout)));

        let outcome = match result {
            Ok(applied) => ApplyOutcome {
                kind: doc.kind.clone(),
                namespace: applied.namespace,
                name: doc.name.clone(),
                action: applied.action,
                error: None,
            },
            Err(e) => {
                warn!("Failed to apply {} {}: {}", doc.kind, doc.name, e);
                ApplyOutcome {
                    kind: doc.kind.clone(),
                    namespace: failed_namespace(cluster, doc, config).await,
                    name: doc.name.clone(),
                    action: ApplyAction::Error,
                    error: Some(e.to_string()),
                }
            }
        };
        info!("{}", outcome);
        outcomes.push(outcome);
    }

    outcomes
}

/// Namespace to report for an object whose apply failed. Documents without a
/// namespace only get the default when their kind is known to be namespaced.
async fn failed_namespace(cluster: &dyn ClusterOps, doc: &ManifestDocument, config: &Config) -> Option<String> {
    let namespaced = match cluster.is_namespaced(doc).await {
        Some(namespaced) => namespaced,
        None => {
            let (group, _) = doc.group_version();
            doc.namespace.is_some() || WorkloadKind::from_manifest(group, &doc.kind).is_some()
        }
    };
    namespaced.then(|| doc.namespace_or(&config.namespace).to_string())
}

/// Remove server-managed fields that do not reflect a change in intent
pub(crate) fn strip_noisy(mut v: Json) -> Json {
    if let Some(meta) = v.get_mut("metadata").and_then(|m| m.as_object_mut()) {
        meta.remove("managedFields");
        meta.remove("resourceVersion");
        meta.remove("generation");
        meta.remove("creationTimestamp");
        meta.remove("uid");
    }
    if let Some(obj) = v.as_object_mut() {
        obj.remove("status");
    }
    v
}

/// Decide the action from the live object before the write and the object the server returned
pub(crate) fn classify(live: Option<&Json>, returned: &Json, dry_run: bool) -> ApplyAction {
    let Some(live) = live else {
        return if dry_run {
            ApplyAction::WouldChange
        } else {
            ApplyAction::Created
        };
    };

    if dry_run {
        return if strip_noisy(live.clone()) == strip_noisy(returned.clone()) {
            ApplyAction::Unchanged
        } else {
            ApplyAction::WouldChange
        };
    }

    let resource_version = |v: &Json| {
        v.get("metadata")
            .and_then(|m| m.get("resourceVersion"))
            .and_then(|r| r.as_str())
            .map(|s| s.to_string())
    };
    if resource_version(live) == resource_version(returned) {
        ApplyAction::Unchanged
    } else {
        ApplyAction::Configured
    }
}
