//! Typed errors for configuration and registry policy.
//!
//! Transfer failures have their own type in [`crate::transfer`]; internal
//! faults inside a job never surface here, they end the job as `Failed`.

use thiserror::Error;

/// Rejected rate/limit configuration. Raised synchronously at load or `submit`;
/// a job built from an invalid config never starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("rate must be a positive number of items per second, got {0}")]
    InvalidRate(f64),
    #[error("rate {rate} items/s exceeds the ceiling of {max} items/s")]
    RateAboveCeiling { rate: f64, max: f64 },
    #[error("{field} must be a positive duration of at most one year, got {value}s")]
    InvalidDuration { field: &'static str, value: f64 },
    #[error("burst of {burst_secs}s at {rate} items/s holds no items")]
    EmptyBurst { burst_secs: f64, rate: f64 },
    #[error("progress_every_n_items must be at least 1")]
    ZeroProgressCadence,
    #[error("max_items_per_job must be at least 1")]
    ZeroItemCap,
    #[error("max_jobs_per_owner must be 1, got {0}")]
    JobsPerOwner(u32),
    #[error("item count must be at least 1")]
    EmptyJob,
    #[error("item count {count} exceeds the per-job cap of {max}")]
    TooManyItems { count: u64, max: u64 },
}

/// Errors returned by [`crate::registry::JobRegistry`] operations.
/// None of these mutate registry or job state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("owner {0} already has an active job")]
    AlreadyRunning(i64),
    #[error("owner {0} has no active job")]
    NoActiveJob(i64),
    #[error("job for owner {0} is not paused")]
    NotPaused(i64),
    #[error("no job found for owner {0}")]
    NotFound(i64),
    #[error("invalid job config: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("registry is shutting down")]
    ShuttingDown,
}
