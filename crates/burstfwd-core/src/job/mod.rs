//! One transfer job: its run record, control entry points, and burst/rest loop.
//!
//! All job state sits in a single `tokio::sync::watch` channel. The control
//! loop and the pause/resume/stop entry points both write through that
//! channel's lock (`send_modify` / `send_if_modified`), so a status change and
//! a counter update can never interleave. The loop also holds a receiver,
//! which is how a control request wakes it out of a pacing or rest wait.

mod run;
mod snapshot;
mod types;
mod wait;

use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::RegistryError;
use crate::pacer::Pacer;

pub(crate) use self::run::{run_job, JobContext};
pub use self::snapshot::ProgressSnapshot;
pub use self::types::{ChannelRef, JobId, JobSpec, JobState, JobStatus, OwnerId, Phase};

/// State shared between a job's control loop, its handles, and the registry.
pub(crate) struct JobShared {
    pub(crate) id: JobId,
    pub(crate) spec: JobSpec,
    pub(crate) pacer: Pacer,
    state: watch::Sender<JobState>,
    cancel: CancellationToken,
}

impl JobShared {
    pub(crate) fn new(id: JobId, spec: JobSpec, pacer: Pacer, cancel: CancellationToken) -> Self {
        let (state, _) = watch::channel(JobState::new(Instant::now()));
        Self {
            id,
            spec,
            pacer,
            state,
            cancel,
        }
    }

    pub(crate) fn owner(&self) -> OwnerId {
        self.spec.owner
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<JobState> {
        self.state.subscribe()
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn status(&self) -> JobStatus {
        self.state.borrow().status
    }

    pub(crate) fn snapshot(&self) -> ProgressSnapshot {
        let st = self.state.borrow();
        ProgressSnapshot::capture(self.id, &self.spec, &self.pacer, &st, Instant::now())
    }

    /// Running -> Paused. Pausing a paused job is a no-op.
    pub(crate) fn pause(&self) -> Result<(), RegistryError> {
        let owner = self.owner();
        let mut outcome = Ok(());
        self.state.send_if_modified(|st| match st.status {
            JobStatus::Running => {
                st.status = JobStatus::Paused;
                st.last_activity = Instant::now();
                true
            }
            JobStatus::Paused => false,
            _ => {
                outcome = Err(RegistryError::NoActiveJob(owner));
                false
            }
        });
        outcome
    }

    /// Paused -> Running. The loop picks up at the same point of its burst or rest.
    pub(crate) fn resume(&self) -> Result<(), RegistryError> {
        let owner = self.owner();
        let mut outcome = Ok(());
        self.state.send_if_modified(|st| match st.status {
            JobStatus::Paused => {
                st.status = JobStatus::Running;
                st.last_activity = Instant::now();
                true
            }
            JobStatus::Running => {
                outcome = Err(RegistryError::NotPaused(owner));
                false
            }
            _ => {
                outcome = Err(RegistryError::NoActiveJob(owner));
                false
            }
        });
        outcome
    }

    /// Running/Paused -> Stopped and wake the loop. No-op on a finished job.
    pub(crate) fn stop(&self) {
        self.state.send_if_modified(|st| {
            let changed = st.transition(JobStatus::Stopped);
            if changed {
                st.last_activity = Instant::now();
            }
            changed
        });
        self.cancel.cancel();
    }

    pub(crate) fn update(&self, f: impl FnOnce(&mut JobState)) {
        self.state.send_modify(f);
    }

    /// Records one transferred item and returns the new count.
    pub(crate) fn record_item(&self) -> u64 {
        let total = self.spec.total_items;
        let pacer = self.pacer;
        let mut count = 0;
        self.state.send_modify(|st| {
            st.items_transferred = (st.items_transferred + 1).min(total);
            st.cursor = pacer.after_send(st.cursor);
            st.last_activity = Instant::now();
            count = st.items_transferred;
        });
        count
    }

    /// Final write of the control loop: move to `next` if still allowed and mark the loop gone.
    pub(crate) fn settle(&self, next: JobStatus, error: Option<String>) {
        self.state.send_modify(|st| {
            if st.transition(next) {
                st.last_error = error;
            }
            st.phase_deadline = None;
            st.paused_remaining = None;
            st.last_activity = Instant::now();
            st.exited = true;
        });
    }

    /// Converts a fault that escaped the loop (panic) into `Failed`.
    pub(crate) fn record_fault(&self, message: String) {
        self.state.send_modify(|st| {
            if !st.status.is_terminal() {
                st.status = JobStatus::Failed;
                st.last_error = Some(message);
            }
            st.exited = true;
        });
    }

    async fn wait_exited(&self) {
        let mut rx = self.subscribe();
        let _ = rx.wait_for(|st| st.exited).await;
    }
}

/// Caller-side handle to a submitted job.
#[derive(Clone)]
pub struct JobHandle {
    shared: Arc<JobShared>,
}

impl JobHandle {
    pub(crate) fn new(shared: Arc<JobShared>) -> Self {
        Self { shared }
    }

    pub fn id(&self) -> JobId {
        self.shared.id
    }

    pub fn owner(&self) -> OwnerId {
        self.shared.owner()
    }

    pub fn status(&self) -> JobStatus {
        self.shared.status()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.shared.snapshot()
    }

    pub fn pause(&self) -> Result<(), RegistryError> {
        self.shared.pause()
    }

    pub fn resume(&self) -> Result<(), RegistryError> {
        self.shared.resume()
    }

    /// Stops the job. Stopping a finished job is a no-op.
    pub fn stop(&self) {
        self.shared.stop()
    }

    /// Waits until the control loop has exited and returns the final snapshot.
    pub async fn wait(&self) -> ProgressSnapshot {
        self.shared.wait_exited().await;
        self.shared.snapshot()
    }
}

impl std::fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandle")
            .field("id", &self.shared.id)
            .field("owner", &self.shared.owner())
            .field("status", &self.shared.status())
            .finish()
    }
}
