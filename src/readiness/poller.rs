// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Readiness Poller: polls tracked workloads until all are terminal or the budget runs out

use crate::config::Config;
use crate::error::ApplyWaitError;
use crate::kubernetes::ClusterOps;
use crate::readiness::state::{ReadinessPhase, ReadinessState, ReadinessTracker};
use crate::workload::WorkloadRef;
use futures::future::join_all;
use serde::Serialize;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// How the polling loop ended
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PollOutcome {
    AllReady,
    PartialFailure,
    TimedOut,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct PollResult {
    pub outcome: PollOutcome,
    pub states: Vec<ReadinessState>,
    pub elapsed: Duration,
}

/// Poll every tracked workload at a fixed interval.
///
/// Each cycle reads all non-terminal workloads concurrently and waits for every
/// read before evaluating the cycle. Reads are bounded by the remaining budget.
/// On expiry the remaining workloads become `TimedOut`; on cancellation they are
/// left in their last observed phase.
#[instrument(skip_all, fields(workloads = workloads.len(), timeout = ?config.wait_timeout))]
pub async fn poll_until_ready(
    cluster: &dyn ClusterOps,
    workloads: &[WorkloadRef],
    config: &Config,
    cancel: &CancellationToken,
) -> PollResult {
    let started = Instant::now();
    let deadline = started + config.wait_timeout;
    let mut tracker = ReadinessTracker::new(workloads);
    let mut cancelled = false;
    let mut cycle = 0u32;

    loop {
        let pending = tracker.pending();
        if pending.is_empty() {
            break;
        }
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }

        let now = Instant::now();
        if now >= deadline {
            warn!("Wait timeout of {:?} elapsed", config.wait_timeout);
            tracker.time_out_remaining();
            break;
        }

        cycle += 1;
        let budget = (deadline - now).min(config.request_timeout);
        debug!("Poll cycle {}: reading {} workloads", cycle, pending.len());

        let reads = pending.iter().map(|workload| async move {
            let read = timeout(budget, cluster.read_status(workload))
                .await
                .unwrap_or(Err(ApplyWaitError::TimeoutError(budget)));
            (workload, read)
        });
        for (workload, read) in join_all(reads).await {
            tracker.record(workload, read);
        }

        info!(
            "Poll cycle {}: {}/{} workloads ready",
            cycle,
            tracker.count(|p| *p == ReadinessPhase::Ready),
            workloads.len()
        );

        if tracker.all_terminal() {
            break;
        }

        let pause = config
            .poll_interval
            .min(deadline.saturating_duration_since(Instant::now()));
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Wait cancelled");
                cancelled = true;
                break;
            }
            _ = sleep(pause) => {}
        }
    }

    let states = tracker.into_states();
    let outcome = if cancelled {
        PollOutcome::Cancelled
    } else if states.iter().any(|s| s.phase == ReadinessPhase::TimedOut) {
        PollOutcome::TimedOut
    } else if states
        .iter()
        .any(|s| matches!(s.phase, ReadinessPhase::Failed { .. }))
    {
        PollOutcome::PartialFailure
    } else {
        PollOutcome::AllReady
    };

    PollResult {
        outcome,
        states,
        elapsed: started.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeCluster, StatusStep};
    use crate::types::{Condition, WorkloadStatus};
    use crate::workload::WorkloadKind;

    fn make_config(timeout_secs: u64) -> Config {
        let mut config = Config::new("overlay", "staging");
        config.wait_timeout = Duration::from_secs(timeout_secs);
        config.poll_interval = Duration::from_secs(2);
        config
    }

    fn make_status(desired: i32, ready: i32) -> StatusStep {
        StatusStep::Status(WorkloadStatus {
            desired,
            current: desired,
            updated: Some(desired),
            ready,
            ..Default::default()
        })
    }

    fn make_job(condition: &str) -> StatusStep {
        StatusStep::Status(WorkloadStatus {
            desired: 1,
            conditions: vec![Condition {
                condition_type: condition.to_string(),
                status: "True".to_string(),
                reason: Some("BackoffLimitExceeded".to_string()),
                message: None,
            }],
            ..Default::default()
        })
    }

    fn deployment(name: &str) -> WorkloadRef {
        WorkloadRef::new(WorkloadKind::Deployment, "staging", name)
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_ready_stops_without_waiting_interval() {
        let api = deployment("api");
        let cluster = FakeCluster::new().statuses(api.clone(), vec![make_status(2, 2)]);

        let result = poll_until_ready(
            &cluster,
            &[api],
            &make_config(300),
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(result.outcome, PollOutcome::AllReady);
        assert_eq!(result.elapsed, Duration::ZERO);
        assert_eq!(cluster.recorded().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_becomes_ready_after_several_cycles() {
        let api = deployment("api");
        let cluster = FakeCluster::new().statuses(
            api.clone(),
            vec![
                StatusStep::Missing,
                make_status(2, 0),
                make_status(2, 1),
                make_status(2, 2),
            ],
        );

        let result = poll_until_ready(
            &cluster,
            &[api],
            &make_config(300),
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(result.outcome, PollOutcome::AllReady);
        assert_eq!(result.elapsed, Duration::from_secs(6));
        assert_eq!(result.states[0].observed_replicas, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_job_does_not_stop_other_workloads() {
        let migrate = WorkloadRef::new(WorkloadKind::Job, "staging", "migrate");
        let api = deployment("api");
        let cluster = FakeCluster::new()
            .statuses(migrate.clone(), vec![make_job("Failed")])
            .statuses(api.clone(), vec![make_status(1, 0), make_status(1, 1)]);

        let result = poll_until_ready(
            &cluster,
            &[migrate.clone(), api],
            &make_config(300),
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(result.outcome, PollOutcome::PartialFailure);
        assert!(matches!(result.states[0].phase, ReadinessPhase::Failed { .. }));
        assert_eq!(result.states[1].phase, ReadinessPhase::Ready);
        let job_reads = cluster
            .recorded()
            .iter()
            .filter(|c| c.contains("Job/staging/migrate"))
            .count();
        assert_eq!(job_reads, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_marks_pending_workloads() {
        let api = deployment("api");
        let worker = deployment("worker");
        let cluster = FakeCluster::new()
            .statuses(api.clone(), vec![make_status(1, 1)])
            .statuses(worker.clone(), vec![make_status(3, 1)]);

        let result = poll_until_ready(
            &cluster,
            &[api, worker],
            &make_config(10),
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(result.outcome, PollOutcome::TimedOut);
        assert_eq!(result.elapsed, Duration::from_secs(10));
        assert_eq!(result.states[0].phase, ReadinessPhase::Ready);
        assert_eq!(result.states[1].phase, ReadinessPhase::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn test_longer_timeout_keeps_timed_out_set() {
        let worker = deployment("worker");
        let mut timed_out = Vec::new();
        let mut elapsed = Vec::new();

        for secs in [5, 20] {
            let cluster = FakeCluster::new().statuses(worker.clone(), vec![make_status(3, 0)]);
            let result = poll_until_ready(
                &cluster,
                &[worker.clone()],
                &make_config(secs),
                &CancellationToken::new(),
            )
            .await;
            timed_out.push(
                result
                    .states
                    .iter()
                    .filter(|s| s.phase == ReadinessPhase::TimedOut)
                    .map(|s| s.workload.clone())
                    .collect::<Vec<_>>(),
            );
            elapsed.push(result.elapsed);
        }

        assert_eq!(timed_out[0], timed_out[1]);
        assert!(elapsed[0] <= elapsed[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_errors_keep_polling() {
        let api = deployment("api");
        let cluster = FakeCluster::new().statuses(
            api.clone(),
            vec![
                StatusStep::Error("etcd leader changed".to_string()),
                make_status(1, 1),
            ],
        );

        let result = poll_until_ready(
            &cluster,
            &[api],
            &make_config(60),
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(result.outcome, PollOutcome::AllReady);
        assert_eq!(result.states[0].last_error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_before_next_cycle() {
        let api = deployment("api");
        let cluster = FakeCluster::new().statuses(api.clone(), vec![make_status(2, 1)]);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(3)).await;
            trigger.cancel();
        });

        let result = poll_until_ready(&cluster, &[api], &make_config(300), &cancel).await;

        assert_eq!(result.outcome, PollOutcome::Cancelled);
        assert_eq!(result.states[0].phase, ReadinessPhase::Observing);
        assert!(result.elapsed < Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_no_workloads_is_all_ready() {
        let cluster = FakeCluster::new();

        let result =
            poll_until_ready(&cluster, &[], &make_config(5), &CancellationToken::new()).await;

        assert_eq!(result.outcome, PollOutcome::AllReady);
        assert!(result.states.is_empty());
        assert!(cluster.recorded().is_empty());
    }
}
