//! The burst/rest control loop of one job.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use super::wait::{wait_until, Wake};
use super::{JobShared, JobState, JobStatus, Phase};
use crate::config::MAX_DURATION_SECS;
use crate::pacer::PaceAction;
use crate::report::ProgressReporter;
use crate::retry::{RetryDecision, RetryPolicy};
use crate::transfer::{Transfer, TransferError};

/// Fallback when a retry delay overflows the clock.
const MAX_BACKOFF: Duration = Duration::from_secs(MAX_DURATION_SECS as u64);

/// Collaborators a job needs while running.
#[derive(Clone)]
pub(crate) struct JobContext {
    pub(crate) transfer: Arc<dyn Transfer>,
    pub(crate) reporter: Arc<dyn ProgressReporter>,
    pub(crate) retry: Option<RetryPolicy>,
}

/// Why a single item did not go through.
enum ItemError {
    /// Stop arrived during a retry backoff.
    Halted,
    Failed(TransferError),
}

/// Runs the job until it completes, is stopped, or fails. Always ends with
/// [`JobShared::settle`] and a final snapshot to the reporter.
pub(crate) async fn run_job(shared: Arc<JobShared>, ctx: JobContext) {
    let mut rx = shared.subscribe();
    let pacer = shared.pacer;
    let total = shared.spec.total_items;
    let every = shared.spec.rate.progress_every_n_items.max(1);
    let owner = shared.owner();
    let job_id = shared.id;

    tracing::info!(
        owner,
        job_id,
        source = %shared.spec.source.label(),
        dest = %shared.spec.dest.label(),
        total,
        burst_capacity = pacer.burst_capacity(),
        "job started"
    );
    ctx.reporter.report(shared.snapshot());

    // Start of the previous send; every pacing wait is measured from here.
    let mut anchor = Instant::now();

    let (status, error) = loop {
        let (cursor, done) = {
            let st = rx.borrow();
            (st.cursor, st.items_transferred)
        };
        match pacer.decide(cursor, total.saturating_sub(done)) {
            PaceAction::Done => {
                // A pause that landed during the last send still holds the job here.
                match wait_until(&shared, &mut rx, &ctx, Instant::now()).await {
                    Wake::Proceed => break (JobStatus::Completed, None),
                    Wake::Halt => break (JobStatus::Stopped, None),
                }
            }
            PaceAction::Rest { duration } => {
                let deadline = anchor + duration;
                shared.update(|st| {
                    st.phase = Phase::Rest;
                    st.phase_deadline = Some(deadline);
                });
                tracing::debug!(owner, job_id, items = done, rest_secs = duration.as_secs_f64(), "entering rest phase");
                ctx.reporter.report(shared.snapshot());

                if wait_until(&shared, &mut rx, &ctx, deadline).await == Wake::Halt {
                    break (JobStatus::Stopped, None);
                }
                shared.update(|st| {
                    st.cursor = pacer.after_rest(st.cursor);
                    st.phase = Phase::Burst;
                    st.phase_deadline = None;
                });
                tracing::debug!(owner, job_id, "rest over, starting next burst");
                ctx.reporter.report(shared.snapshot());
            }
            PaceAction::Send { wait } => {
                let deadline = anchor + wait;
                shared.update(|st| st.phase_deadline = Some(deadline));
                if wait_until(&shared, &mut rx, &ctx, deadline).await == Wake::Halt {
                    break (JobStatus::Stopped, None);
                }

                anchor = Instant::now();
                match transfer_item(&shared, &mut rx, &ctx, done).await {
                    Ok(()) => {
                        let count = shared.record_item();
                        if count % every == 0 && count < total {
                            tracing::debug!(owner, job_id, items = count, total, "progress");
                            ctx.reporter.report(shared.snapshot());
                        }
                    }
                    Err(ItemError::Halted) => break (JobStatus::Stopped, None),
                    Err(ItemError::Failed(e)) => {
                        tracing::error!(owner, job_id, index = done, "transfer failed: {}", e);
                        break (JobStatus::Failed, Some(e.to_string()));
                    }
                }
            }
        }
    };

    shared.settle(status, error);
    let last = shared.snapshot();
    tracing::info!(
        owner,
        job_id,
        items = last.items_transferred,
        total,
        elapsed_secs = last.elapsed_secs,
        "job {}",
        last.status.as_str()
    );
    ctx.reporter.report(last);
}

/// Transfers one item, retrying per policy. Backoff waits honour pause and stop.
async fn transfer_item(
    shared: &JobShared,
    rx: &mut watch::Receiver<JobState>,
    ctx: &JobContext,
    index: u64,
) -> Result<(), ItemError> {
    let spec = &shared.spec;
    let mut attempt = 1u32;
    loop {
        let err = match ctx
            .transfer
            .transfer_one(&spec.source, &spec.dest, index)
            .await
        {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        let decision = ctx
            .retry
            .map(|p| p.decide(attempt, err.kind))
            .unwrap_or(RetryDecision::NoRetry);
        match decision {
            RetryDecision::NoRetry => return Err(ItemError::Failed(err)),
            RetryDecision::RetryAfter(delay) => {
                tracing::warn!(
                    owner = spec.owner,
                    job_id = shared.id,
                    index,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "transfer failed, retrying: {}",
                    err
                );
                // A throttle hint comes from the destination and is not bounded by config.
                let now = Instant::now();
                let deadline = now.checked_add(delay).unwrap_or(now + MAX_BACKOFF);
                if wait_until(shared, rx, ctx, deadline).await == Wake::Halt {
                    return Err(ItemError::Halted);
                }
                attempt += 1;
            }
        }
    }
}
