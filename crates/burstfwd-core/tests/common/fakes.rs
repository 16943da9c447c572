//! Scriptable transfer primitive and collecting reporter for job tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use burstfwd_core::job::ChannelRef;
use burstfwd_core::report::ProgressReporter;
use burstfwd_core::transfer::{Transfer, TransferError};
use burstfwd_core::ProgressSnapshot;

#[derive(Clone)]
enum Fault {
    /// Fail the first `times` attempts of this index.
    Fail { err: TransferError, times: u32 },
    Panic,
}

/// Records every call (index and start time). Optional latency and per-index faults.
#[derive(Default)]
pub struct RecordingTransfer {
    latency: Duration,
    faults: Mutex<HashMap<u64, Fault>>,
    calls: Mutex<Vec<(u64, Instant)>>,
}

impl RecordingTransfer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_latency(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            latency,
            ..Self::default()
        })
    }

    /// Every attempt at `index` fails with `err`.
    pub fn fail_at(&self, index: u64, err: TransferError) {
        self.fail_times(index, u32::MAX, err);
    }

    /// The first `times` attempts at `index` fail with `err`.
    pub fn fail_times(&self, index: u64, times: u32, err: TransferError) {
        self.faults
            .lock()
            .unwrap()
            .insert(index, Fault::Fail { err, times });
    }

    pub fn panic_at(&self, index: u64) {
        self.faults.lock().unwrap().insert(index, Fault::Panic);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn indices(&self) -> Vec<u64> {
        self.calls.lock().unwrap().iter().map(|(i, _)| *i).collect()
    }

    pub fn start_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

#[async_trait]
impl Transfer for RecordingTransfer {
    async fn transfer_one(
        &self,
        _source: &ChannelRef,
        _dest: &ChannelRef,
        index: u64,
    ) -> Result<(), TransferError> {
        self.calls.lock().unwrap().push((index, Instant::now()));
        let fault = {
            let mut faults = self.faults.lock().unwrap();
            match faults.get_mut(&index) {
                Some(Fault::Fail { err, times }) if *times > 0 => {
                    *times -= 1;
                    Some(Fault::Fail {
                        err: err.clone(),
                        times: *times,
                    })
                }
                Some(Fault::Panic) => Some(Fault::Panic),
                _ => None,
            }
        };
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match fault {
            Some(Fault::Fail { err, .. }) => Err(err),
            Some(Fault::Panic) => panic!("transfer primitive blew up at {index}"),
            None => Ok(()),
        }
    }
}

/// Keeps every snapshot it receives.
#[derive(Default)]
pub struct CollectingReporter {
    snapshots: Mutex<Vec<ProgressSnapshot>>,
}

impl CollectingReporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshots(&self) -> Vec<ProgressSnapshot> {
        self.snapshots.lock().unwrap().clone()
    }

    pub fn for_owner(&self, owner: i64) -> Vec<ProgressSnapshot> {
        self.snapshots()
            .into_iter()
            .filter(|s| s.owner == owner)
            .collect()
    }
}

impl ProgressReporter for CollectingReporter {
    fn report(&self, snapshot: ProgressSnapshot) {
        self.snapshots.lock().unwrap().push(snapshot);
    }
}
