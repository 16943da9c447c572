//! The single-item transfer primitive, as seen by the job loop.
//!
//! The real implementation (a chat-platform "forward message" call) lives
//! outside this crate; jobs only hold an `Arc<dyn Transfer>`.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

use crate::job::ChannelRef;

/// High-level classification of a transfer failure, used by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The call timed out.
    Timeout,
    /// The destination asked us to slow down, optionally with a wait hint.
    Throttled { retry_after: Option<Duration> },
    /// Network-level failure (connection reset, DNS, etc.).
    Connection,
    /// The item was refused (missing permission, deleted source item, ...). Never retried.
    Rejected,
}

impl ErrorKind {
    /// Everything but a refusal may go through on a later attempt.
    pub fn is_retryable(self) -> bool {
        !matches!(self, ErrorKind::Rejected)
    }
}

/// Error returned by [`Transfer::transfer_one`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferError {
    pub kind: ErrorKind,
    pub message: String,
}

impl TransferError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Rejected, message)
    }

    pub fn throttled(retry_after: Option<Duration>) -> Self {
        Self::new(ErrorKind::Throttled { retry_after }, "throttled by destination")
    }
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::Timeout => write!(f, "timeout: {}", self.message),
            ErrorKind::Throttled { retry_after: Some(d) } => {
                write!(f, "{} (retry after {:.1}s)", self.message, d.as_secs_f64())
            }
            ErrorKind::Throttled { retry_after: None } => write!(f, "{}", self.message),
            ErrorKind::Connection => write!(f, "connection: {}", self.message),
            ErrorKind::Rejected => write!(f, "rejected: {}", self.message),
        }
    }
}

impl std::error::Error for TransferError {}

/// Moves exactly one item from `source` to `dest`.
///
/// `index` is the 0-based position of the item in the source's natural order.
/// Implementations must tolerate being called again for an index whose
/// previous result was lost.
#[async_trait]
pub trait Transfer: Send + Sync {
    async fn transfer_one(
        &self,
        source: &ChannelRef,
        dest: &ChannelRef,
        index: u64,
    ) -> Result<(), TransferError>;
}

/// Transfer that only waits and logs. Used by `burstfwd serve` and demos
/// when no platform client is wired in.
#[derive(Debug, Clone, Default)]
pub struct SimulatedTransfer {
    latency: Duration,
}

impl SimulatedTransfer {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl Transfer for SimulatedTransfer {
    async fn transfer_one(
        &self,
        source: &ChannelRef,
        dest: &ChannelRef,
        index: u64,
    ) -> Result<(), TransferError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        tracing::trace!(source = source.id, dest = dest.id, index, "simulated transfer");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_hint() {
        let e = TransferError::throttled(Some(Duration::from_secs(3)));
        assert_eq!(e.to_string(), "throttled by destination (retry after 3.0s)");
        let e = TransferError::rejected("chat not found");
        assert_eq!(e.to_string(), "rejected: chat not found");
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_transfer_takes_its_latency() {
        let t = SimulatedTransfer::new(Duration::from_millis(30));
        let src = ChannelRef::new(-100, None);
        let dst = ChannelRef::new(-200, None);
        let start = tokio::time::Instant::now();
        t.transfer_one(&src, &dst, 0).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(30));
    }
}
