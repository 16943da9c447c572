//! Interruptible waits for the control loop.
//!
//! Every suspension of a job (pacing delay, rest phase, retry backoff, and
//! the pause itself) goes through [`wait_until`], so pause and stop are
//! observed mid-wait instead of after it.

use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};

use super::run::JobContext;
use super::{JobShared, JobState, JobStatus};

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Wake {
    /// Deadline reached and the job is running.
    Proceed,
    /// The job was stopped (or the registry is shutting down).
    Halt,
}

/// Waits until `deadline` while the job is running.
///
/// A pause freezes the time left; after resume the wait continues for exactly
/// that remainder. Returns [`Wake::Proceed`] only with the status `Running`,
/// which makes this the loop's iteration-boundary check as well.
pub(super) async fn wait_until(
    shared: &JobShared,
    rx: &mut watch::Receiver<JobState>,
    ctx: &JobContext,
    mut deadline: Instant,
) -> Wake {
    let cancel = shared.cancel_token();
    loop {
        let status = rx.borrow_and_update().status;
        match status {
            JobStatus::Running => {
                if Instant::now() >= deadline {
                    return Wake::Proceed;
                }
                tokio::select! {
                    _ = sleep_until(deadline) => {}
                    changed = rx.changed() => {
                        if changed.is_err() {
                            return Wake::Halt;
                        }
                    }
                    _ = cancel.cancelled() => return Wake::Halt,
                }
            }
            JobStatus::Paused => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                shared.update(|st| {
                    st.paused_remaining = Some(remaining);
                    st.phase_deadline = None;
                });
                tracing::info!(
                    owner = shared.owner(),
                    job_id = shared.id,
                    items = shared.snapshot().items_transferred,
                    "job paused"
                );
                ctx.reporter.report(shared.snapshot());

                let next = loop {
                    tokio::select! {
                        changed = rx.changed() => {
                            if changed.is_err() {
                                break None;
                            }
                        }
                        _ = cancel.cancelled() => break None,
                    }
                    let status = rx.borrow_and_update().status;
                    if status != JobStatus::Paused {
                        break Some(status);
                    }
                };
                if next != Some(JobStatus::Running) {
                    return Wake::Halt;
                }

                deadline = Instant::now() + remaining;
                shared.update(|st| {
                    st.paused_remaining = None;
                    st.phase_deadline = Some(deadline);
                });
                tracing::info!(owner = shared.owner(), job_id = shared.id, "job resumed");
                ctx.reporter.report(shared.snapshot());
            }
            JobStatus::Stopped | JobStatus::Completed | JobStatus::Failed => return Wake::Halt,
        }
    }
}
