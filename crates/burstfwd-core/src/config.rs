use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::pacer::Pacer;
use crate::retry::RetryPolicy;

/// Hard ceiling on the sending rate; the destination platform throttles above this.
pub const MAX_RATE_ITEMS_PER_SEC: f64 = 30.0;

/// Longest accepted phase, per-item interval or retry delay (one year).
pub const MAX_DURATION_SECS: f64 = 365.0 * 24.0 * 3600.0;

/// Converts a configured number of seconds, rejecting NaN, negatives and
/// anything past [`MAX_DURATION_SECS`].
fn checked_duration(field: &'static str, value: f64) -> Result<Duration, ConfigError> {
    if !(0.0..=MAX_DURATION_SECS).contains(&value) {
        return Err(ConfigError::InvalidDuration { field, value });
    }
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::InvalidDuration { field, value })
}

/// Burst/rest pacing and per-job limits (`[rate]` section in config.toml).
/// Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    /// Steady sending rate inside a burst.
    pub rate_items_per_sec: f64,
    /// Length of the on-phase in seconds.
    pub burst_duration_secs: f64,
    /// Length of the off-phase in seconds.
    pub rest_duration_secs: f64,
    /// Emit a progress snapshot every N transferred items.
    pub progress_every_n_items: u64,
    /// Hard cap on the item count of a single job.
    pub max_items_per_job: u64,
    /// Concurrent jobs per owner. Only 1 is supported.
    pub max_jobs_per_owner: u32,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            rate_items_per_sec: 25.0,
            burst_duration_secs: 300.0,
            rest_duration_secs: 30.0,
            progress_every_n_items: 100,
            max_items_per_job: 100_000,
            max_jobs_per_owner: 1,
        }
    }
}

impl RateConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timing()?;
        if self.burst_capacity() == 0 {
            return Err(ConfigError::EmptyBurst {
                burst_secs: self.burst_duration_secs,
                rate: self.rate_items_per_sec,
            });
        }
        if self.progress_every_n_items == 0 {
            return Err(ConfigError::ZeroProgressCadence);
        }
        if self.max_items_per_job == 0 {
            return Err(ConfigError::ZeroItemCap);
        }
        if self.max_jobs_per_owner != 1 {
            return Err(ConfigError::JobsPerOwner(self.max_jobs_per_owner));
        }
        Ok(())
    }

    /// Checks an item count against the per-job cap.
    pub fn check_item_count(&self, count: u64) -> Result<(), ConfigError> {
        if count == 0 {
            return Err(ConfigError::EmptyJob);
        }
        if count > self.max_items_per_job {
            return Err(ConfigError::TooManyItems {
                count,
                max: self.max_items_per_job,
            });
        }
        Ok(())
    }

    /// Items per burst: `floor(burst_duration * rate)`.
    pub fn burst_capacity(&self) -> u64 {
        // Small epsilon so 300s * 25/s lands on 7500, not 7499.
        let raw = self.burst_duration_secs * self.rate_items_per_sec + 1e-9;
        if raw.is_finite() && raw > 0.0 {
            raw.floor() as u64
        } else {
            0
        }
    }

    /// Validates and derives the pacing parameters for one job.
    pub fn pacer(&self) -> Result<Pacer, ConfigError> {
        self.validate()?;
        let (interval, rest) = self.timing()?;
        Ok(Pacer::new(self.burst_capacity(), interval, rest))
    }

    /// Checks the rate and both phase lengths; returns the per-item
    /// interval and the rest duration.
    fn timing(&self) -> Result<(Duration, Duration), ConfigError> {
        let rate = self.rate_items_per_sec;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ConfigError::InvalidRate(rate));
        }
        if rate > MAX_RATE_ITEMS_PER_SEC {
            return Err(ConfigError::RateAboveCeiling {
                rate,
                max: MAX_RATE_ITEMS_PER_SEC,
            });
        }
        for (field, value) in [
            ("burst_duration_secs", self.burst_duration_secs),
            ("rest_duration_secs", self.rest_duration_secs),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::InvalidDuration { field, value });
            }
            checked_duration(field, value)?;
        }
        let interval = checked_duration("rate_items_per_sec", 1.0 / rate)
            .map_err(|_| ConfigError::InvalidRate(rate))?;
        let rest = checked_duration("rest_duration_secs", self.rest_duration_secs)?;
        Ok((interval, rest))
    }
}

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per item (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.5 = 500ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 0.5,
            max_delay_secs: 30,
        }
    }
}

impl RetryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        checked_duration("retry.base_delay_secs", self.base_delay_secs)?;
        checked_duration("retry.max_delay_secs", self.max_delay_secs as f64)?;
        Ok(())
    }

    /// Out-of-range delays are clamped to `max_delay_secs`; `validate` is
    /// what rejects them.
    pub fn policy(&self) -> RetryPolicy {
        let max_delay = Duration::from_secs(self.max_delay_secs.min(MAX_DURATION_SECS as u64));
        let base_delay = checked_duration("retry.base_delay_secs", self.base_delay_secs.max(0.0))
            .unwrap_or(max_delay)
            .min(max_delay);
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }
}

/// Global configuration loaded from `~/.config/burstfwd/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FwdConfig {
    /// Capacity of the progress channel between jobs and the printer.
    #[serde(default = "default_report_buffer")]
    pub report_buffer: usize,
    /// Control socket path; defaults to the XDG state dir.
    #[serde(default)]
    pub control_socket: Option<PathBuf>,
    /// Latency of the simulated transfer used by `burstfwd serve`.
    #[serde(default = "default_simulated_latency_ms")]
    pub simulated_latency_ms: u64,
    /// Default pacing for submitted jobs.
    #[serde(default)]
    pub rate: RateConfig,
    /// Optional per-item retry; if missing, the first transfer failure fails the job.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

fn default_report_buffer() -> usize {
    64
}

fn default_simulated_latency_ms() -> u64 {
    5
}

impl Default for FwdConfig {
    fn default() -> Self {
        Self {
            report_buffer: default_report_buffer(),
            control_socket: None,
            simulated_latency_ms: default_simulated_latency_ms(),
            rate: RateConfig::default(),
            retry: None,
        }
    }
}

impl FwdConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rate.validate()?;
        if let Some(retry) = &self.retry {
            retry.validate()?;
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> Option<RetryPolicy> {
        self.retry.as_ref().map(RetryConfig::policy)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("burstfwd")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FwdConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FwdConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load and validate configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<FwdConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: FwdConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}
