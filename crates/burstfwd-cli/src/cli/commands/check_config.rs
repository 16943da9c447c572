//! `burstfwd check-config`: validate the config and print the effective cycle.

use anyhow::Result;
use burstfwd_core::config;
use std::path::Path;

use crate::cli::display::describe_cycle;

pub fn run_check_config(path: Option<&Path>) -> Result<()> {
    let (cfg, shown) = match path {
        Some(p) => (config::load_from_path(p)?, p.to_path_buf()),
        None => (config::load_or_init()?, config::config_path()?),
    };

    println!("config OK: {}", shown.display());
    println!("  cycle: {}", describe_cycle(&cfg.rate));
    println!("  max items per job: {}", cfg.rate.max_items_per_job);
    match cfg.retry_policy() {
        Some(p) => println!(
            "  retry: up to {} attempts, backoff {:.1}s..{:.1}s",
            p.max_attempts,
            p.base_delay.as_secs_f64(),
            p.max_delay.as_secs_f64()
        ),
        None => println!("  retry: off (first failure fails the job)"),
    }
    Ok(())
}
