//! Human-readable rendering of snapshots and config.

use burstfwd_core::config::RateConfig;
use burstfwd_core::{Phase, ProgressSnapshot};

/// "25 items/s, 300s on / 30s off, 7500 per burst".
pub fn describe_cycle(rate: &RateConfig) -> String {
    format!(
        "{} items/s, {}s on / {}s off, {} per burst",
        rate.rate_items_per_sec,
        rate.burst_duration_secs,
        rate.rest_duration_secs,
        rate.burst_capacity()
    )
}

/// One progress line for a job.
pub fn format_snapshot(s: &ProgressSnapshot) -> String {
    let mut line = format!(
        "owner {} job {}: {}/{} ({:.1}%) {}",
        s.owner,
        s.job_id,
        s.items_transferred,
        s.total_items,
        s.fraction() * 100.0,
        s.status.as_str()
    );
    if !s.is_terminal() {
        match s.phase {
            Phase::Burst => line.push_str(&format!(
                ", {} left in burst, {:.1} items/s",
                s.burst_items_left,
                s.items_per_sec()
            )),
            Phase::Rest => line.push_str(&format!(
                ", resting {:.0}s more",
                s.phase_remaining_secs
            )),
        }
        line.push_str(&format!(", ETA {:.0}s", s.eta_secs()));
    } else {
        line.push_str(&format!(" after {:.0}s", s.elapsed_secs));
    }
    if let Some(err) = &s.error {
        line.push_str(&format!(": {err}"));
    }
    line
}

pub fn format_list(jobs: &[ProgressSnapshot]) -> String {
    if jobs.is_empty() {
        return "No active jobs.".to_string();
    }
    let mut out = format!(
        "{:<12} {:<6} {:<10} {:<6} {}",
        "OWNER", "JOB", "STATUS", "PHASE", "PROGRESS"
    );
    for j in jobs {
        out.push('\n');
        out.push_str(&format!(
            "{:<12} {:<6} {:<10} {:<6} {}/{}",
            j.owner,
            j.job_id,
            j.status.as_str(),
            format!("{:?}", j.phase).to_lowercase(),
            j.items_transferred,
            j.total_items
        ));
    }
    out
}
