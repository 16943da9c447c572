//! Process-wide table of active jobs, at most one per owner.
//!
//! The owner table sits behind one mutex; submit and eviction both take it,
//! so an owner can never hold two slots and a finished job always frees its
//! slot. Control calls only look the job up under the lock and then signal
//! the job through its own state channel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::{FwdConfig, RateConfig};
use crate::error::RegistryError;
use crate::job::{
    run_job, ChannelRef, JobContext, JobHandle, JobId, JobShared, JobSpec, OwnerId,
    ProgressSnapshot,
};
use crate::report::ProgressReporter;
use crate::retry::RetryPolicy;
use crate::transfer::Transfer;

#[derive(Default)]
struct Slots {
    active: HashMap<OwnerId, Arc<JobShared>>,
    /// Final snapshot of each owner's last evicted job.
    finished: HashMap<OwnerId, ProgressSnapshot>,
    closed: bool,
}

struct Inner {
    slots: Mutex<Slots>,
    ctx: JobContext,
    default_rate: RateConfig,
    next_id: AtomicU64,
    root: CancellationToken,
    tracker: TaskTracker,
}

/// Shared registry of owner -> running job. Cheap to clone.
#[derive(Clone)]
pub struct JobRegistry {
    inner: Arc<Inner>,
}

impl JobRegistry {
    pub fn new(
        transfer: Arc<dyn Transfer>,
        reporter: Arc<dyn ProgressReporter>,
        default_rate: RateConfig,
        retry: Option<RetryPolicy>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                slots: Mutex::new(Slots::default()),
                ctx: JobContext {
                    transfer,
                    reporter,
                    retry,
                },
                default_rate,
                next_id: AtomicU64::new(1),
                root: CancellationToken::new(),
                tracker: TaskTracker::new(),
            }),
        }
    }

    /// Registry using the pacing and retry settings from `cfg`.
    pub fn from_config(
        cfg: &FwdConfig,
        transfer: Arc<dyn Transfer>,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self::new(transfer, reporter, cfg.rate.clone(), cfg.retry_policy())
    }

    pub fn default_rate(&self) -> &RateConfig {
        &self.inner.default_rate
    }

    /// Builds a spec with the registry's default pacing.
    pub fn spec_for(
        &self,
        owner: OwnerId,
        source: ChannelRef,
        dest: ChannelRef,
        total_items: u64,
    ) -> JobSpec {
        JobSpec::new(owner, source, dest, total_items, self.inner.default_rate.clone())
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.inner
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Validates `spec`, starts its job, and claims the owner's slot.
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, spec: JobSpec) -> Result<JobHandle, RegistryError> {
        let pacer = spec.rate.pacer()?;
        spec.rate.check_item_count(spec.total_items)?;
        let owner = spec.owner;

        let mut slots = self.slots();
        if slots.closed {
            return Err(RegistryError::ShuttingDown);
        }
        if let Some(existing) = slots.active.get(&owner) {
            if !existing.status().is_terminal() {
                return Err(RegistryError::AlreadyRunning(owner));
            }
        }

        let id: JobId = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::new(JobShared::new(
            id,
            spec,
            pacer,
            self.inner.root.child_token(),
        ));
        slots.active.insert(owner, Arc::clone(&shared));
        slots.finished.remove(&owner);

        let registry = self.clone();
        let ctx = self.inner.ctx.clone();
        let job = Arc::clone(&shared);
        self.inner.tracker.spawn(async move {
            // Inner task so a panic in the loop or the transfer primitive
            // ends only this job.
            let outcome = tokio::spawn(run_job(Arc::clone(&job), ctx.clone())).await;
            if let Err(join_err) = outcome {
                tracing::error!(owner, job_id = id, "job aborted: {}", join_err);
                job.record_fault(format!("internal error: {join_err}"));
                ctx.reporter.report(job.snapshot());
            }
            registry.evict(owner, id, job.snapshot());
        });
        drop(slots);

        Ok(JobHandle::new(shared))
    }

    /// Frees the owner's slot if it still belongs to `job_id`.
    fn evict(&self, owner: OwnerId, job_id: JobId, last: ProgressSnapshot) {
        let mut slots = self.slots();
        let ours = slots
            .active
            .get(&owner)
            .is_some_and(|job| job.id == job_id);
        if ours {
            slots.active.remove(&owner);
            slots.finished.insert(owner, last);
            tracing::debug!(owner, job_id, "job evicted from registry");
        }
    }

    fn active_job(&self, owner: OwnerId) -> Result<Arc<JobShared>, RegistryError> {
        let slots = self.slots();
        match slots.active.get(&owner) {
            Some(job) if !job.status().is_terminal() => Ok(Arc::clone(job)),
            _ => Err(RegistryError::NoActiveJob(owner)),
        }
    }

    /// Pauses the owner's job. Pausing a paused job succeeds.
    pub fn pause(&self, owner: OwnerId) -> Result<(), RegistryError> {
        self.active_job(owner)?.pause()
    }

    /// Resumes the owner's paused job.
    pub fn resume(&self, owner: OwnerId) -> Result<(), RegistryError> {
        self.active_job(owner)?.resume()
    }

    /// Stops the owner's job. Stopping an already finished job succeeds.
    pub fn stop(&self, owner: OwnerId) -> Result<(), RegistryError> {
        let slots = self.slots();
        if let Some(job) = slots.active.get(&owner) {
            let job = Arc::clone(job);
            drop(slots);
            job.stop();
            return Ok(());
        }
        if slots.finished.contains_key(&owner) {
            return Ok(());
        }
        Err(RegistryError::NoActiveJob(owner))
    }

    /// Latest snapshot of the owner's job, or the final one of its last finished job.
    pub fn query(&self, owner: OwnerId) -> Result<ProgressSnapshot, RegistryError> {
        let slots = self.slots();
        if let Some(job) = slots.active.get(&owner) {
            return Ok(job.snapshot());
        }
        slots
            .finished
            .get(&owner)
            .cloned()
            .ok_or(RegistryError::NotFound(owner))
    }

    /// Snapshots of all jobs currently holding a slot, ordered by owner.
    pub fn list(&self) -> Vec<ProgressSnapshot> {
        let mut out: Vec<ProgressSnapshot> = self
            .slots()
            .active
            .values()
            .map(|job| job.snapshot())
            .collect();
        out.sort_by_key(|s| s.owner);
        out
    }

    /// Number of owners currently holding a slot.
    pub fn active_count(&self) -> usize {
        self.slots().active.len()
    }

    /// Stops every job, rejects further submits, and waits for all loops to exit.
    pub async fn shutdown(&self) {
        {
            let mut slots = self.slots();
            slots.closed = true;
            for job in slots.active.values() {
                job.stop();
            }
        }
        self.inner.root.cancel();
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        tracing::info!("job registry shut down");
    }
}
