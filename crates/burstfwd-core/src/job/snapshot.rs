//! Point-in-time progress reports handed to the reporter and to `query`.
//!
//! Consumers can derive the average rate as `items_transferred / elapsed_secs`
//! and the overall completion fraction from the counters.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

use super::types::{JobId, JobSpec, JobState, JobStatus, OwnerId, Phase};
use crate::pacer::Pacer;

/// Snapshot of one job's progress (CLI- and socket-friendly).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub owner: OwnerId,
    pub job_id: JobId,
    pub items_transferred: u64,
    pub total_items: u64,
    pub status: JobStatus,
    pub phase: Phase,
    /// Seconds since the job started.
    pub elapsed_secs: f64,
    /// Estimated seconds left in the current burst or rest phase.
    pub phase_remaining_secs: f64,
    /// Pacing time until the last item, including any rest still ahead.
    #[serde(default)]
    pub total_remaining_secs: f64,
    /// Items that may still go out before the next rest.
    pub burst_items_left: u64,
    /// Failure description for `Failed` jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressSnapshot {
    pub(crate) fn capture(
        job_id: JobId,
        spec: &JobSpec,
        pacer: &Pacer,
        state: &JobState,
        now: Instant,
    ) -> Self {
        let remaining = spec.total_items.saturating_sub(state.items_transferred);
        let burst_items_left = pacer.burst_items_left(state.cursor, remaining);
        let phase_remaining = match (state.paused_remaining, state.phase) {
            (Some(frozen), Phase::Rest) => frozen,
            (None, Phase::Rest) => state
                .phase_deadline
                .map(|d| d.saturating_duration_since(now))
                .unwrap_or_default(),
            (_, Phase::Burst) => pacer
                .per_item_interval()
                .saturating_mul(u32::try_from(burst_items_left).unwrap_or(u32::MAX)),
        };
        let total_remaining = match state.phase {
            Phase::Rest => phase_remaining
                .saturating_add(pacer.time_to_finish(pacer.after_rest(state.cursor), remaining)),
            Phase::Burst => pacer.time_to_finish(state.cursor, remaining),
        };
        let (phase_remaining, total_remaining) = if state.status.is_terminal() || remaining == 0 {
            (Duration::ZERO, Duration::ZERO)
        } else {
            (phase_remaining, total_remaining)
        };
        Self {
            owner: spec.owner,
            job_id,
            items_transferred: state.items_transferred,
            total_items: spec.total_items,
            status: state.status,
            phase: state.phase,
            elapsed_secs: now.saturating_duration_since(state.started_at).as_secs_f64(),
            phase_remaining_secs: phase_remaining.as_secs_f64(),
            total_remaining_secs: total_remaining.as_secs_f64(),
            burst_items_left,
            error: state.last_error.clone(),
        }
    }

    /// Average transfer rate since start (0 if no time has passed).
    pub fn items_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.items_transferred as f64 / self.elapsed_secs
    }

    /// Fraction complete in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total_items == 0 {
            return 1.0;
        }
        (self.items_transferred as f64 / self.total_items as f64).min(1.0)
    }

    /// Estimated seconds until the job finishes; 0 once it has ended.
    pub fn eta_secs(&self) -> f64 {
        if self.is_terminal() {
            return 0.0;
        }
        self.total_remaining_secs
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
