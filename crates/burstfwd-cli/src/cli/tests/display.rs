use crate::cli::display::{describe_cycle, format_list, format_snapshot};
use burstfwd_core::config::RateConfig;
use burstfwd_core::{JobStatus, Phase, ProgressSnapshot};

fn snap(status: JobStatus, phase: Phase) -> ProgressSnapshot {
    ProgressSnapshot {
        owner: 42,
        job_id: 3,
        items_transferred: 2000,
        total_items: 8000,
        status,
        phase,
        elapsed_secs: 80.0,
        phase_remaining_secs: 12.4,
        total_remaining_secs: 291.6,
        burst_items_left: 5500,
        error: None,
    }
}

#[test]
fn default_cycle_description() {
    assert_eq!(
        describe_cycle(&RateConfig::default()),
        "25 items/s, 300s on / 30s off, 7500 per burst"
    );
}

#[test]
fn running_burst_line() {
    assert_eq!(
        format_snapshot(&snap(JobStatus::Running, Phase::Burst)),
        "owner 42 job 3: 2000/8000 (25.0%) running, 5500 left in burst, 25.0 items/s, ETA 292s"
    );
}

#[test]
fn resting_line() {
    assert_eq!(
        format_snapshot(&snap(JobStatus::Paused, Phase::Rest)),
        "owner 42 job 3: 2000/8000 (25.0%) paused, resting 12s more, ETA 292s"
    );
}

#[test]
fn failed_line_carries_the_error() {
    let mut s = snap(JobStatus::Failed, Phase::Burst);
    s.error = Some("rejected: no permission".into());
    assert_eq!(
        format_snapshot(&s),
        "owner 42 job 3: 2000/8000 (25.0%) failed after 80s: rejected: no permission"
    );
}

#[test]
fn list_table() {
    assert_eq!(format_list(&[]), "No active jobs.");
    let table = format_list(&[snap(JobStatus::Running, Phase::Rest)]);
    let lines: Vec<&str> = table.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("OWNER"));
    assert!(lines[1].starts_with("42"));
    assert!(lines[1].contains("rest"));
    assert!(lines[1].ends_with("2000/8000"));
}
