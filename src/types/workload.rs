// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::workload::WorkloadKind;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use serde::{Deserialize, Serialize};

/// Snapshot of the status fields that decide workload readiness
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    /// Replicas (or scheduled pods, or completions) the workload should have
    pub desired: i32,
    /// Replicas currently present, old and new
    pub current: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<i32>,
    /// Replicas that must run the latest revision before the rollout is done.
    /// `None` when the controller leaves updates to someone else (`OnDelete`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_target: Option<i32>,
    /// Replicas reporting ready, or succeeded pods for jobs
    pub ready: i32,
    pub conditions: Vec<Condition>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Outcome of evaluating a status snapshot
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Ready,
    Progressing,
    Failed(String),
}

impl WorkloadStatus {
    /// Find a condition of the given type with the given status
    pub fn condition(&self, condition_type: &str, status: &str) -> Option<&Condition> {
        self.conditions
            .iter()
            .find(|c| c.condition_type == condition_type && c.status == status)
    }

    /// The controller has seen the latest spec
    pub fn generation_observed(&self) -> bool {
        match (self.generation, self.observed_generation) {
            (Some(generation), Some(observed)) => observed >= generation,
            (Some(_), None) => false,
            (None, _) => true,
        }
    }

    /// Compact `Type=Status` summary of all conditions
    pub fn condition_summary(&self) -> Option<String> {
        if self.conditions.is_empty() {
            return None;
        }
        Some(
            self.conditions
                .iter()
                .map(|c| format!("{}={}", c.condition_type, c.status))
                .collect::<Vec<_>>()
                .join(","),
        )
    }

    /// Evaluate readiness for a workload of the given kind
    pub fn verdict(&self, kind: WorkloadKind) -> Verdict {
        match kind {
            WorkloadKind::Deployment => {
                if let Some(c) = self
                    .condition("Progressing", "False")
                    .filter(|c| c.reason.as_deref() == Some("ProgressDeadlineExceeded"))
                {
                    return Verdict::Failed(failure_reason(c));
                }
                self.replicas_verdict()
            }
            WorkloadKind::StatefulSet | WorkloadKind::ReplicaSet => self.replicas_verdict(),
            WorkloadKind::DaemonSet => {
                if self.generation_observed() && self.ready == self.desired {
                    Verdict::Ready
                } else {
                    Verdict::Progressing
                }
            }
            WorkloadKind::Job => {
                if let Some(c) = self.condition("Failed", "True") {
                    Verdict::Failed(failure_reason(c))
                } else if self.condition("Complete", "True").is_some() {
                    Verdict::Ready
                } else {
                    Verdict::Progressing
                }
            }
        }
    }

    fn replicas_verdict(&self) -> Verdict {
        let updated = self.updated.unwrap_or(self.ready);
        let rolled_out = self.update_target.map_or(true, |target| updated >= target);
        if self.generation_observed()
            && self.current == self.desired
            && self.ready == self.desired
            && rolled_out
        {
            Verdict::Ready
        } else {
            Verdict::Progressing
        }
    }
}

fn failure_reason(c: &Condition) -> String {
    match (&c.reason, &c.message) {
        (Some(reason), Some(message)) => format!("{}: {}", reason, message),
        (Some(reason), None) => reason.clone(),
        (None, Some(message)) => message.clone(),
        (None, None) => format!("{} condition is {}", c.condition_type, c.status),
    }
}

macro_rules! conditions {
    ($status:expr) => {
        $status
            .and_then(|s| s.conditions.as_ref())
            .map(|conditions| {
                conditions
                    .iter()
                    .map(|c| Condition {
                        condition_type: c.type_.clone(),
                        status: c.status.clone(),
                        reason: c.reason.clone(),
                        message: c.message.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    };
}

impl From<&Deployment> for WorkloadStatus {
    fn from(d: &Deployment) -> Self {
        let status = d.status.as_ref();
        let desired = d.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
        WorkloadStatus {
            generation: d.metadata.generation,
            observed_generation: status.and_then(|s| s.observed_generation),
            desired,
            current: status.and_then(|s| s.replicas).unwrap_or(0),
            updated: Some(status.and_then(|s| s.updated_replicas).unwrap_or(0)),
            update_target: Some(desired),
            ready: status.and_then(|s| s.ready_replicas).unwrap_or(0),
            conditions: conditions!(status),
        }
    }
}

impl From<&StatefulSet> for WorkloadStatus {
    fn from(s: &StatefulSet) -> Self {
        let status = s.status.as_ref();
        let desired = s.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
        let strategy = s.spec.as_ref().and_then(|s| s.update_strategy.as_ref());

        // Ordinals below the partition stay on the old revision
        let update_target = match strategy.and_then(|st| st.type_.as_deref()) {
            Some("OnDelete") => None,
            _ => {
                let partition = strategy
                    .and_then(|st| st.rolling_update.as_ref())
                    .and_then(|ru| ru.partition)
                    .unwrap_or(0);
                Some((desired - partition).max(0))
            }
        };

        WorkloadStatus {
            generation: s.metadata.generation,
            observed_generation: status.and_then(|s| s.observed_generation),
            desired,
            current: status.map(|s| s.replicas).unwrap_or(0),
            updated: Some(status.and_then(|s| s.updated_replicas).unwrap_or(0)),
            update_target,
            ready: status.and_then(|s| s.ready_replicas).unwrap_or(0),
            conditions: conditions!(status),
        }
    }
}

impl From<&ReplicaSet> for WorkloadStatus {
    fn from(r: &ReplicaSet) -> Self {
        let status = r.status.as_ref();
        WorkloadStatus {
            generation: r.metadata.generation,
            observed_generation: status.and_then(|s| s.observed_generation),
            desired: r.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1),
            current: status.map(|s| s.replicas).unwrap_or(0),
            updated: None,
            update_target: None,
            ready: status.and_then(|s| s.ready_replicas).unwrap_or(0),
            conditions: conditions!(status),
        }
    }
}

impl From<&DaemonSet> for WorkloadStatus {
    fn from(d: &DaemonSet) -> Self {
        let status = d.status.as_ref();
        WorkloadStatus {
            generation: d.metadata.generation,
            observed_generation: status.and_then(|s| s.observed_generation),
            desired: status.map(|s| s.desired_number_scheduled).unwrap_or(0),
            current: status.map(|s| s.current_number_scheduled).unwrap_or(0),
            updated: Some(status.and_then(|s| s.updated_number_scheduled).unwrap_or(0)),
            update_target: None,
            ready: status.map(|s| s.number_ready).unwrap_or(0),
            conditions: conditions!(status),
        }
    }
}

impl From<&Job> for WorkloadStatus {
    fn from(j: &Job) -> Self {
        let status = j.status.as_ref();
        WorkloadStatus {
            generation: j.metadata.generation,
            observed_generation: None,
            desired: j.spec.as_ref().and_then(|s| s.completions).unwrap_or(1),
            current: status.and_then(|s| s.active).unwrap_or(0),
            updated: None,
            update_target: None,
            ready: status.and_then(|s| s.succeeded).unwrap_or(0),
            conditions: conditions!(status),
        }
    }
}
