// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! End-to-end workflow: resolve, extract, apply, wait, report.

use crate::apply::{self, ApplyOutcome};
use crate::config::Config;
use crate::error::{ApplyWaitError, Result};
use crate::kubernetes::ClusterOps;
use crate::manifest::ManifestResolver;
use crate::readiness::poll_until_ready;
use crate::report::Report;
use crate::workload::{extract_workloads, TrackingEntry, WorkloadRef};
use std::future::Future;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Run one apply invocation.
///
/// Precondition failures (build, unknown workload, namespace) are returned as
/// errors before anything is applied. Apply and wait failures end up in the report.
#[instrument(skip_all, fields(overlay = %config.overlay_dir.display(), namespace = %config.namespace))]
pub async fn run(
    config: &Config,
    resolver: &ManifestResolver,
    cluster: &dyn ClusterOps,
    tracking: &[TrackingEntry],
    cancel: &CancellationToken,
) -> Result<Report> {
    config.validate()?;

    let documents = resolver.resolve(&config.overlay_dir).await?;
    let workloads = extract_workloads(&documents, tracking, &config.namespace)?;

    // A dry run must not persist anything, including the namespace
    if config.mode.dry_run {
        let exists = bounded(config, cluster.namespace_exists(&config.namespace)).await?;
        if !exists {
            return Err(ApplyWaitError::NamespaceError(format!(
                "namespace {} does not exist and a dry run cannot create it",
                config.namespace
            )));
        }
    } else {
        bounded(config, cluster.ensure_namespace(&config.namespace)).await?;
    }

    let outcomes = apply::execute(cluster, &documents, config).await;

    let readiness = if config.should_wait() {
        let trackable = without_failed_applies(&workloads, &outcomes);
        info!("Waiting up to {:?} for {} workloads", config.wait_timeout, trackable.len());
        Some(poll_until_ready(cluster, &trackable, config, cancel).await)
    } else {
        None
    };

    let report = Report::build(outcomes, readiness, config.mode.dry_run);
    info!("Run finished: {:?}", report.status);
    Ok(report)
}

/// Bound a namespace call by the request timeout; every failure is a `NamespaceError`
async fn bounded<T>(config: &Config, call: impl Future<Output = Result<T>>) -> Result<T> {
    timeout(config.request_timeout, call)
        .await
        .unwrap_or(Err(ApplyWaitError::TimeoutError(config.request_timeout)))
        .map_err(|e| match e {
            ApplyWaitError::NamespaceError(_) => e,
            other => ApplyWaitError::NamespaceError(other.to_string()),
        })
}

/// Workloads whose apply failed are already reported and never become ready
fn without_failed_applies(workloads: &[WorkloadRef], outcomes: &[ApplyOutcome]) -> Vec<WorkloadRef> {
    workloads
        .iter()
        .filter(|w| {
            let failed = outcomes.iter().any(|o| {
                o.is_error()
                    && o.kind == w.kind.as_str()
                    && o.name == w.name
                    && o.namespace.as_deref() == Some(w.namespace.as_str())
            });
            if failed {
                warn!("Not waiting for {}, its apply failed", w);
            }
            !failed
        })
        .cloned()
        .collect()
}
