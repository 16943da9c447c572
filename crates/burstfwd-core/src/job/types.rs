//! Types describing one transfer job and its mutable run record.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

use crate::config::RateConfig;
use crate::pacer::BurstCursor;

/// Identity of the end user a job runs for.
pub type OwnerId = i64;

/// Process-unique job identifier, assigned at submit.
pub type JobId = u64;

/// A source or destination channel, as captured by the setup flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRef {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl ChannelRef {
    pub fn new(id: i64, title: Option<String>) -> Self {
        Self { id, title }
    }

    /// Title if known, else the numeric id.
    pub fn label(&self) -> String {
        self.title.clone().unwrap_or_else(|| self.id.to_string())
    }
}

/// Immutable description of one requested transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec {
    pub owner: OwnerId,
    pub source: ChannelRef,
    pub dest: ChannelRef,
    pub total_items: u64,
    pub rate: RateConfig,
}

impl JobSpec {
    pub fn new(
        owner: OwnerId,
        source: ChannelRef,
        dest: ChannelRef,
        total_items: u64,
        rate: RateConfig,
    ) -> Self {
        Self {
            owner,
            source,
            dest,
            total_items,
            rate,
        }
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Paused,
    Stopped,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Paused => "paused",
            JobStatus::Stopped => "stopped",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Stopped | JobStatus::Completed | JobStatus::Failed
        )
    }

    /// Allowed transitions. Terminal states never leave.
    /// `Paused -> Failed` covers an in-flight item that fails after the pause was accepted.
    pub fn can_become(self, next: JobStatus) -> bool {
        use JobStatus::*;
        match (self, next) {
            (Running, Paused | Stopped | Completed | Failed) => true,
            (Paused, Running | Stopped | Failed) => true,
            _ => false,
        }
    }
}

/// Which half of the duty cycle a job is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Burst,
    Rest,
}

/// Mutable run record. Lives inside the job's watch channel; every write goes
/// through that channel's lock, from the loop or from a control call.
#[derive(Debug, Clone)]
pub struct JobState {
    pub status: JobStatus,
    pub items_transferred: u64,
    pub phase: Phase,
    pub cursor: BurstCursor,
    /// End of the current wait while running.
    pub phase_deadline: Option<Instant>,
    /// Wait left over when the job was paused.
    pub paused_remaining: Option<Duration>,
    pub started_at: Instant,
    pub last_activity: Instant,
    pub last_error: Option<String>,
    /// The control loop has returned; no further writes follow.
    pub exited: bool,
}

impl JobState {
    pub(crate) fn new(now: Instant) -> Self {
        Self {
            status: JobStatus::Running,
            items_transferred: 0,
            phase: Phase::Burst,
            cursor: BurstCursor::default(),
            phase_deadline: None,
            paused_remaining: None,
            started_at: now,
            last_activity: now,
            last_error: None,
            exited: false,
        }
    }

    /// Applies `next` if the transition is allowed; returns whether it was.
    pub(crate) fn transition(&mut self, next: JobStatus) -> bool {
        if self.status.can_become(next) {
            self.status = next;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_never_leave() {
        for from in [JobStatus::Stopped, JobStatus::Completed, JobStatus::Failed] {
            for to in [
                JobStatus::Running,
                JobStatus::Paused,
                JobStatus::Stopped,
                JobStatus::Completed,
                JobStatus::Failed,
            ] {
                assert!(!from.can_become(to), "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn paused_resumes_stops_or_fails() {
        assert!(JobStatus::Paused.can_become(JobStatus::Running));
        assert!(JobStatus::Paused.can_become(JobStatus::Stopped));
        assert!(JobStatus::Paused.can_become(JobStatus::Failed));
        assert!(!JobStatus::Paused.can_become(JobStatus::Completed));
        assert!(!JobStatus::Paused.can_become(JobStatus::Paused));
        assert!(!JobStatus::Running.can_become(JobStatus::Running));
    }

    #[test]
    fn transition_reports_rejection() {
        let mut st = JobState::new(Instant::now());
        assert!(st.transition(JobStatus::Paused));
        assert!(!st.transition(JobStatus::Completed));
        assert_eq!(st.status, JobStatus::Paused);
        assert!(st.transition(JobStatus::Stopped));
        assert!(!st.transition(JobStatus::Running));
        assert_eq!(st.status, JobStatus::Stopped);
    }

    #[test]
    fn channel_label_prefers_title() {
        assert_eq!(ChannelRef::new(-1001, None).label(), "-1001");
        assert_eq!(
            ChannelRef::new(-1001, Some("news".into())).label(),
            "news"
        );
    }
}
