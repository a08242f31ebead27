// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Per-workload readiness state machine.

use crate::error::Result;
use crate::types::{Verdict, WorkloadStatus};
use crate::workload::WorkloadRef;
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

/// `Pending -> Observing -> {Ready | Failed | TimedOut}`
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "phase", rename_all = "camelCase")]
pub enum ReadinessPhase {
    Pending,
    Observing,
    Ready,
    Failed { reason: String },
    TimedOut,
}

impl ReadinessPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReadinessPhase::Ready | ReadinessPhase::Failed { .. } | ReadinessPhase::TimedOut
        )
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessState {
    pub workload: WorkloadRef,
    #[serde(flatten)]
    pub phase: ReadinessPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_replicas: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_replicas: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl ReadinessState {
    pub fn new(workload: WorkloadRef) -> Self {
        Self {
            workload,
            phase: ReadinessPhase::Pending,
            observed_replicas: None,
            desired_replicas: None,
            condition_status: None,
            last_error: None,
        }
    }

    /// Fold one status read into the state. Terminal states are final.
    pub fn observe(&mut self, read: Result<Option<WorkloadStatus>>) {
        if self.phase.is_terminal() {
            return;
        }

        match read {
            Ok(Some(status)) => {
                self.observed_replicas = Some(status.ready);
                self.desired_replicas = Some(status.desired);
                self.condition_status = status.condition_summary();
                self.last_error = None;
                self.phase = match status.verdict(self.workload.kind) {
                    Verdict::Ready => ReadinessPhase::Ready,
                    Verdict::Failed(reason) => ReadinessPhase::Failed { reason },
                    Verdict::Progressing => ReadinessPhase::Observing,
                };
            }
            Ok(None) => {
                self.phase = ReadinessPhase::Observing;
                self.last_error = Some("not found".to_string());
            }
            Err(e) => {
                self.phase = ReadinessPhase::Observing;
                self.last_error = Some(e.to_string());
            }
        }
    }

    /// Mark a still-running workload as timed out
    pub fn time_out(&mut self) {
        if !self.phase.is_terminal() {
            self.phase = ReadinessPhase::TimedOut;
        }
    }
}

/// Readiness states keyed by workload, reported in tracking order
#[derive(Debug, Clone)]
pub struct ReadinessTracker {
    order: Vec<WorkloadRef>,
    states: HashMap<WorkloadRef, ReadinessState>,
}

impl ReadinessTracker {
    pub fn new(workloads: &[WorkloadRef]) -> Self {
        Self {
            order: workloads.to_vec(),
            states: workloads
                .iter()
                .map(|w| (w.clone(), ReadinessState::new(w.clone())))
                .collect(),
        }
    }

    /// Workloads that still need polling, in tracking order
    pub fn pending(&self) -> Vec<WorkloadRef> {
        self.order
            .iter()
            .filter(|w| self.states.get(*w).is_some_and(|s| !s.phase.is_terminal()))
            .cloned()
            .collect()
    }

    pub fn record(&mut self, workload: &WorkloadRef, read: Result<Option<WorkloadStatus>>) {
        if let Some(state) = self.states.get_mut(workload) {
            let before = state.phase.clone();
            state.observe(read);
            if state.phase != before && state.phase.is_terminal() {
                info!("{} is {:?}", workload, state.phase);
            }
        }
    }

    pub fn all_terminal(&self) -> bool {
        self.states.values().all(|s| s.phase.is_terminal())
    }

    pub fn count(&self, pred: impl Fn(&ReadinessPhase) -> bool) -> usize {
        self.states.values().filter(|s| pred(&s.phase)).count()
    }

    pub fn time_out_remaining(&mut self) {
        for state in self.states.values_mut() {
            state.time_out();
        }
    }

    pub fn into_states(mut self) -> Vec<ReadinessState> {
        self.order
            .iter()
            .filter_map(|w| self.states.remove(w))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApplyWaitError;
    use crate::types::Condition;
    use crate::workload::WorkloadKind;

    fn make_ref(kind: WorkloadKind, name: &str) -> WorkloadRef {
        WorkloadRef::new(kind, "staging", name)
    }

    fn make_status(desired: i32, ready: i32) -> WorkloadStatus {
        WorkloadStatus {
            generation: Some(1),
            observed_generation: Some(1),
            desired,
            current: desired,
            updated: Some(desired),
            update_target: Some(desired),
            ready,
            conditions: vec![],
        }
    }

    fn make_job_status(condition: &str) -> WorkloadStatus {
        WorkloadStatus {
            desired: 1,
            conditions: vec![Condition {
                condition_type: condition.to_string(),
                status: "True".to_string(),
                reason: None,
                message: None,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_new_state_is_pending() {
        let state = ReadinessState::new(make_ref(WorkloadKind::Deployment, "api"));
        assert_eq!(state.phase, ReadinessPhase::Pending);
    }

    #[test]
    fn test_observe_progressing_then_ready() {
        let mut state = ReadinessState::new(make_ref(WorkloadKind::Deployment, "api"));

        state.observe(Ok(Some(make_status(2, 1))));
        assert_eq!(state.phase, ReadinessPhase::Observing);
        assert_eq!(state.observed_replicas, Some(1));

        state.observe(Ok(Some(make_status(2, 2))));
        assert_eq!(state.phase, ReadinessPhase::Ready);
    }

    #[test]
    fn test_ready_never_regresses() {
        let mut state = ReadinessState::new(make_ref(WorkloadKind::Deployment, "api"));
        state.observe(Ok(Some(make_status(2, 2))));

        state.observe(Ok(Some(make_status(2, 0))));
        state.observe(Err(ApplyWaitError::StatusError("boom".to_string())));
        state.time_out();

        assert_eq!(state.phase, ReadinessPhase::Ready);
        assert_eq!(state.observed_replicas, Some(2));
    }

    #[test]
    fn test_job_failure_is_terminal() {
        let mut state = ReadinessState::new(make_ref(WorkloadKind::Job, "migrate"));

        state.observe(Ok(Some(make_job_status("Failed"))));
        state.observe(Ok(Some(make_job_status("Complete"))));

        assert!(matches!(state.phase, ReadinessPhase::Failed { .. }));
    }

    #[test]
    fn test_read_errors_are_recorded_without_terminating() {
        let mut state = ReadinessState::new(make_ref(WorkloadKind::DaemonSet, "agent"));

        state.observe(Err(ApplyWaitError::StatusError("connection reset".to_string())));
        assert_eq!(state.phase, ReadinessPhase::Observing);
        assert!(state.last_error.as_deref().unwrap().contains("connection reset"));

        state.observe(Ok(None));
        assert_eq!(state.last_error.as_deref(), Some("not found"));
    }

    #[test]
    fn test_tracker_pending_and_timeout() {
        let api = make_ref(WorkloadKind::Deployment, "api");
        let worker = make_ref(WorkloadKind::Deployment, "worker");
        let mut tracker = ReadinessTracker::new(&[api.clone(), worker.clone()]);

        tracker.record(&api, Ok(Some(make_status(1, 1))));
        assert_eq!(tracker.pending(), vec![worker.clone()]);
        assert!(!tracker.all_terminal());

        tracker.time_out_remaining();
        let states = tracker.into_states();

        assert_eq!(states[0].phase, ReadinessPhase::Ready);
        assert_eq!(states[1].phase, ReadinessPhase::TimedOut);
    }

    #[test]
    fn test_state_serializes_phase_inline() {
        let mut state = ReadinessState::new(make_ref(WorkloadKind::Job, "migrate"));
        state.phase = ReadinessPhase::Failed {
            reason: "BackoffLimitExceeded".to_string(),
        };

        let json = serde_json::to_value(&state).unwrap();

        assert_eq!(json["phase"], "failed");
        assert_eq!(json["reason"], "BackoffLimitExceeded");
        assert_eq!(json["workload"]["name"], "migrate");
    }
}
