//! burstfwd core: moves a bulk sequence of items from a source to a
//! destination under a strict rate limit, using burst/rest duty cycles,
//! with one pausable, stoppable job per owner.

pub mod config;
pub mod control;
pub mod error;
pub mod job;
pub mod logging;
pub mod pacer;
pub mod registry;
pub mod report;
pub mod retry;
pub mod transfer;

pub use error::{ConfigError, RegistryError};
pub use job::{ChannelRef, JobHandle, JobSpec, JobStatus, OwnerId, Phase, ProgressSnapshot};
pub use registry::JobRegistry;
