// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Workload identities and the caller-supplied tracking list.

pub mod extractor;

pub use extractor::extract_workloads;

use crate::error::{ApplyWaitError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Object kinds whose readiness can be tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
    DaemonSet,
    ReplicaSet,
    Job,
}

impl WorkloadKind {
    pub const ALL: [WorkloadKind; 5] = [
        WorkloadKind::Deployment,
        WorkloadKind::StatefulSet,
        WorkloadKind::DaemonSet,
        WorkloadKind::ReplicaSet,
        WorkloadKind::Job,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "Deployment",
            WorkloadKind::StatefulSet => "StatefulSet",
            WorkloadKind::DaemonSet => "DaemonSet",
            WorkloadKind::ReplicaSet => "ReplicaSet",
            WorkloadKind::Job => "Job",
        }
    }

    /// API group serving this kind
    pub fn group(&self) -> &'static str {
        match self {
            WorkloadKind::Job => "batch",
            _ => "apps",
        }
    }

    /// Match a kind as written in a manifest, together with its API group
    pub fn from_manifest(group: &str, kind: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == kind && k.group() == group)
    }

    /// Lenient match used for caller-supplied entries
    pub fn from_name(kind: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(kind))
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A trackable workload, unique by its kind/namespace/name triple
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkloadRef {
    pub kind: WorkloadKind,
    pub namespace: String,
    pub name: String,
}

impl WorkloadRef {
    pub fn new(kind: WorkloadKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for WorkloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
    }
}

/// A caller-supplied workload identity, as emitted by the inspect step
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TrackingEntry {
    pub kind: String,
    #[serde(default)]
    pub namespace: Option<String>,
    pub name: String,
}

impl FromStr for TrackingEntry {
    type Err = ApplyWaitError;

    /// Parse `Kind/namespace/name` or `Kind/name`
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('/').collect();
        let entry = match parts.as_slice() {
            [kind, name] => TrackingEntry {
                kind: kind.to_string(),
                namespace: None,
                name: name.to_string(),
            },
            [kind, namespace, name] => TrackingEntry {
                kind: kind.to_string(),
                namespace: Some(namespace.to_string()).filter(|n| !n.is_empty()),
                name: name.to_string(),
            },
            _ => {
                return Err(ApplyWaitError::InvalidTrackingEntry(format!(
                    "expected Kind/namespace/name or Kind/name, got '{}'",
                    s
                )))
            }
        };

        if entry.kind.is_empty() || entry.name.is_empty() {
            return Err(ApplyWaitError::InvalidTrackingEntry(format!(
                "kind and name must not be empty in '{}'",
                s
            )));
        }
        Ok(entry)
    }
}

impl fmt::Display for TrackingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}/{}", self.kind, ns, self.name),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

/// Parse a YAML or JSON sequence of tracking entries
pub fn parse_tracking_list(text: &str) -> Result<Vec<TrackingEntry>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let entries: Option<Vec<TrackingEntry>> = serde_yaml::from_str(text)
        .map_err(|e| ApplyWaitError::InvalidTrackingEntry(e.to_string()))?;
    Ok(entries.unwrap_or_default())
}
