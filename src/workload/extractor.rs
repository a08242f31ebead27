// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Workload Extractor: derive or validate the set of workloads to track

use crate::error::{ApplyWaitError, Result};
use crate::manifest::ManifestDocument;
use crate::workload::{TrackingEntry, WorkloadKind, WorkloadRef};
use std::collections::HashSet;
use tracing::{debug, info};

/// Produce the workloads to track for a manifest set.
///
/// With an empty tracking list every workload-kind document is tracked, in
/// manifest order. Otherwise each entry must name a workload present in the
/// manifests. The result never contains duplicates.
pub fn extract_workloads(
    documents: &[ManifestDocument],
    tracking: &[TrackingEntry],
    default_namespace: &str,
) -> Result<Vec<WorkloadRef>> {
    let refs = if tracking.is_empty() {
        derive_workloads(documents, default_namespace)
    } else {
        match_tracking_list(documents, tracking, default_namespace)?
    };

    info!("Tracking {} workloads", refs.len());
    Ok(refs)
}

fn workload_ref(doc: &ManifestDocument, default_namespace: &str) -> Option<WorkloadRef> {
    let (group, _) = doc.group_version();
    WorkloadKind::from_manifest(group, &doc.kind)
        .map(|kind| WorkloadRef::new(kind, doc.namespace_or(default_namespace), doc.name.clone()))
}

fn derive_workloads(documents: &[ManifestDocument], default_namespace: &str) -> Vec<WorkloadRef> {
    let mut seen = HashSet::new();
    documents
        .iter()
        .filter_map(|doc| workload_ref(doc, default_namespace))
        .filter(|r| seen.insert(r.clone()))
        .collect()
}

fn match_tracking_list(
    documents: &[ManifestDocument],
    tracking: &[TrackingEntry],
    default_namespace: &str,
) -> Result<Vec<WorkloadRef>> {
    let available: Vec<WorkloadRef> = derive_workloads(documents, default_namespace);
    let mut seen = HashSet::new();
    let mut refs = Vec::new();
    let mut unknown = Vec::new();

    for entry in tracking {
        let namespace = entry.namespace.as_deref().unwrap_or(default_namespace);

        let Some(kind) = WorkloadKind::from_name(&entry.kind) else {
            unknown.push(format!("{} (not a trackable workload kind)", entry));
            continue;
        };

        let candidate = WorkloadRef::new(kind, namespace, entry.name.clone());
        if !available.contains(&candidate) {
            debug!("Tracking entry {} has no matching manifest", candidate);
            unknown.push(candidate.to_string());
            continue;
        }

        if seen.insert(candidate.clone()) {
            refs.push(candidate);
        }
    }

    if !unknown.is_empty() {
        return Err(ApplyWaitError::UnknownWorkloadError(unknown.join(", ")));
    }
    Ok(refs)
}
