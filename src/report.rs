// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Result Reporter: one structured report and exit code per run

use crate::apply::ApplyOutcome;
use crate::error::{ApplyWaitError, Result};
use crate::readiness::{PollOutcome, PollResult, ReadinessPhase, ReadinessState};
use serde::Serialize;
use std::fmt::Write;

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RunStatus {
    Success,
    Failure,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    ApplyError,
    ReadinessFailure,
    TimeoutError,
    Cancelled,
    Fatal,
}

/// One thing that went wrong, addressed to the object or workload involved
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Failure {
    pub kind: FailureKind,
    pub subject: String,
    pub detail: String,
}

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessReport {
    pub outcome: PollOutcome,
    pub elapsed_seconds: u64,
    pub workloads: Vec<ReadinessState>,
}

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub status: RunStatus,
    pub dry_run: bool,
    pub apply: Vec<ApplyOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readiness: Option<ReadinessReport>,
    pub failures: Vec<Failure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatal: Option<String>,
}

impl Report {
    /// Aggregate the apply outcomes and, when waited, the readiness result
    pub fn build(apply: Vec<ApplyOutcome>, readiness: Option<PollResult>, dry_run: bool) -> Self {
        let mut failures: Vec<Failure> = apply
            .iter()
            .filter(|o| o.is_error())
            .map(|o| Failure {
                kind: FailureKind::ApplyError,
                subject: subject_of(o),
                detail: o.error.clone().unwrap_or_default(),
            })
            .collect();

        if let Some(result) = &readiness {
            failures.extend(result.states.iter().filter_map(readiness_failure));
            if result.outcome == PollOutcome::Cancelled {
                failures.push(Failure {
                    kind: FailureKind::Cancelled,
                    subject: "wait".to_string(),
                    detail: format!(
                        "cancelled with {} workloads not ready",
                        result
                            .states
                            .iter()
                            .filter(|s| s.phase != ReadinessPhase::Ready)
                            .count()
                    ),
                });
            }
        }

        let waited_ok = readiness.as_ref().map_or(true, |r| {
            r.outcome == PollOutcome::AllReady
                && r.states.iter().all(|s| s.phase == ReadinessPhase::Ready)
        });
        let status = if failures.is_empty() && waited_ok {
            RunStatus::Success
        } else {
            RunStatus::Failure
        };

        Report {
            status,
            dry_run,
            apply,
            readiness: readiness.map(|r| ReadinessReport {
                outcome: r.outcome,
                elapsed_seconds: r.elapsed.as_secs(),
                workloads: r.states,
            }),
            failures,
            fatal: None,
        }
    }

    /// Report for a run aborted by a precondition failure; nothing was applied
    pub fn fatal(error: &ApplyWaitError, dry_run: bool) -> Self {
        Report {
            status: RunStatus::Failure,
            dry_run,
            apply: Vec::new(),
            readiness: None,
            failures: vec![Failure {
                kind: FailureKind::Fatal,
                subject: error.code().to_string(),
                detail: error.to_string(),
            }],
            fatal: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    /// 0 on success, 2 for aborted runs, 1 for any other failure
    pub fn exit_code(&self) -> u8 {
        match (self.status, &self.fatal) {
            (RunStatus::Success, _) => 0,
            (RunStatus::Failure, Some(_)) => 2,
            (RunStatus::Failure, None) => 1,
        }
    }

    pub fn render_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn render_human(&self) -> String {
        let mut out = String::new();

        if let Some(fatal) = &self.fatal {
            let _ = writeln!(out, "error: {}", fatal);
        }

        for outcome in &self.apply {
            let _ = writeln!(out, "{}", outcome);
        }

        if let Some(readiness) = &self.readiness {
            let _ = writeln!(
                out,
                "\nreadiness ({:?} after {}s):",
                readiness.outcome, readiness.elapsed_seconds
            );
            for state in &readiness.workloads {
                let _ = writeln!(out, "  {}", describe_state(state));
            }
        }

        if !self.failures.is_empty() {
            let _ = writeln!(out, "\nfailures:");
            for failure in &self.failures {
                let _ = writeln!(
                    out,
                    "  {:?} {}: {}",
                    failure.kind, failure.subject, failure.detail
                );
            }
        }

        let status = match self.status {
            RunStatus::Success => "success",
            RunStatus::Failure => "failure",
        };
        let _ = writeln!(out, "\nresult: {}", status);
        out
    }
}

fn subject_of(outcome: &ApplyOutcome) -> String {
    match &outcome.namespace {
        Some(ns) => format!("{}/{}/{}", outcome.kind, ns, outcome.name),
        None => format!("{}/{}", outcome.kind, outcome.name),
    }
}

fn readiness_failure(state: &ReadinessState) -> Option<Failure> {
    let (kind, detail) = match &state.phase {
        ReadinessPhase::Failed { reason } => (FailureKind::ReadinessFailure, reason.clone()),
        ReadinessPhase::TimedOut => (
            FailureKind::TimeoutError,
            state
                .last_error
                .clone()
                .unwrap_or_else(|| "not ready before the wait timeout".to_string()),
        ),
        _ => return None,
    };
    Some(Failure {
        kind,
        subject: state.workload.to_string(),
        detail,
    })
}

fn describe_state(state: &ReadinessState) -> String {
    let phase = match &state.phase {
        ReadinessPhase::Pending => "pending".to_string(),
        ReadinessPhase::Observing => "observing".to_string(),
        ReadinessPhase::Ready => "ready".to_string(),
        ReadinessPhase::Failed { reason } => format!("failed ({})", reason),
        ReadinessPhase::TimedOut => "timed out".to_string(),
    };
    match (state.observed_replicas, state.desired_replicas) {
        (Some(observed), Some(desired)) => {
            format!("{}: {} ({}/{})", state.workload, phase, observed, desired)
        }
        _ => format!("{}: {}", state.workload, phase),
    }
}
