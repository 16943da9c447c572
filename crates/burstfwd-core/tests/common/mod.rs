#![allow(dead_code)]

pub mod fakes;

use std::sync::Arc;
use std::time::Duration;

use burstfwd_core::config::RateConfig;
use burstfwd_core::retry::RetryPolicy;
use burstfwd_core::transfer::Transfer;
use burstfwd_core::{ChannelRef, JobRegistry, JobSpec, OwnerId, Phase, ProgressSnapshot};

use fakes::CollectingReporter;

/// 25 items/s (40ms apart), 5 items per burst, 1s rest.
pub fn small_rate() -> RateConfig {
    RateConfig {
        rate_items_per_sec: 25.0,
        burst_duration_secs: 0.2,
        rest_duration_secs: 1.0,
        progress_every_n_items: 2,
        max_items_per_job: 1000,
        max_jobs_per_owner: 1,
    }
}

pub fn registry(
    transfer: Arc<dyn Transfer>,
    rate: RateConfig,
    retry: Option<RetryPolicy>,
) -> (JobRegistry, Arc<CollectingReporter>) {
    let reporter = CollectingReporter::new();
    let registry = JobRegistry::new(transfer, reporter.clone(), rate, retry);
    (registry, reporter)
}

pub fn spec(registry: &JobRegistry, owner: OwnerId, count: u64) -> JobSpec {
    registry.spec_for(
        owner,
        ChannelRef::new(-1000 - owner, Some("source".into())),
        ChannelRef::new(-2000 - owner, Some("dest".into())),
        count,
    )
}

/// Polls (in 1ms steps of the paused clock) until `pred` holds for the owner's snapshot.
pub async fn wait_until_snapshot(
    registry: &JobRegistry,
    owner: OwnerId,
    pred: impl Fn(&ProgressSnapshot) -> bool,
) -> ProgressSnapshot {
    for _ in 0..600_000 {
        if let Ok(snap) = registry.query(owner) {
            if pred(&snap) {
                return snap;
            }
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("condition never reached for owner {owner}");
}

pub async fn wait_for_phase(registry: &JobRegistry, owner: OwnerId, phase: Phase) -> ProgressSnapshot {
    wait_until_snapshot(registry, owner, |s| s.phase == phase).await
}

/// Lets the supervisor task evict the owner's finished job from the registry.
pub async fn wait_evicted(registry: &JobRegistry, owner: OwnerId) {
    for _ in 0..1000 {
        if registry.list().iter().all(|s| s.owner != owner) {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("owner {owner} was never evicted");
}

pub fn assert_close(actual: Duration, expected: Duration, what: &str) {
    let diff = if actual > expected {
        actual - expected
    } else {
        expected - actual
    };
    assert!(
        diff <= Duration::from_millis(1),
        "{what}: expected {expected:?}, got {actual:?}"
    );
}
