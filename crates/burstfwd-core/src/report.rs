//! Progress sink interface.
//!
//! Jobs push [`ProgressSnapshot`]s here and never wait on the consumer: a
//! slow or gone sink loses snapshots, it never stalls or fails a job.

use tokio::sync::mpsc;

use crate::job::ProgressSnapshot;

/// Receives progress snapshots. Must return promptly.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, snapshot: ProgressSnapshot);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _snapshot: ProgressSnapshot) {}
}

/// Forwards snapshots into a bounded channel with `try_send`.
/// Terminal snapshots are logged when dropped so the outcome is never lost silently.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: mpsc::Sender<ProgressSnapshot>,
}

impl ChannelReporter {
    pub fn new(tx: mpsc::Sender<ProgressSnapshot>) -> Self {
        Self { tx }
    }

    /// Creates a reporter and the receiving end of its channel.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<ProgressSnapshot>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self::new(tx), rx)
    }
}

impl ProgressReporter for ChannelReporter {
    fn report(&self, snapshot: ProgressSnapshot) {
        if let Err(e) = self.tx.try_send(snapshot) {
            let snap = match e {
                mpsc::error::TrySendError::Full(s) | mpsc::error::TrySendError::Closed(s) => s,
            };
            if snap.is_terminal() {
                tracing::warn!(
                    owner = snap.owner,
                    job_id = snap.job_id,
                    items = snap.items_transferred,
                    "final progress snapshot dropped: job {}",
                    snap.status.as_str()
                );
            } else {
                tracing::debug!(owner = snap.owner, "progress snapshot dropped (sink busy)");
            }
        }
    }
}
