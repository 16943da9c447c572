//! `burstfwd serve`: run the job registry behind the control socket until Ctrl-C.

use anyhow::{Context, Result};
use burstfwd_core::config::FwdConfig;
use burstfwd_core::report::ChannelReporter;
use burstfwd_core::transfer::SimulatedTransfer;
use burstfwd_core::JobRegistry;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::control_socket;
use crate::cli::display::{describe_cycle, format_snapshot};

/// How long to keep printing queued snapshots after shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

pub async fn run_serve(cfg: &FwdConfig, socket: &Path) -> Result<()> {
    let transfer = Arc::new(SimulatedTransfer::new(Duration::from_millis(
        cfg.simulated_latency_ms,
    )));
    let (reporter, mut progress_rx) = ChannelReporter::channel(cfg.report_buffer);
    let registry = JobRegistry::from_config(cfg, transfer, Arc::new(reporter));

    let printer = tokio::spawn(async move {
        while let Some(snap) = progress_rx.recv().await {
            println!("{}", format_snapshot(&snap));
        }
    });

    let listener = control_socket::spawn_control_listener(registry.clone(), socket)?;
    println!(
        "burstfwd serving on {} ({})",
        socket.display(),
        describe_cycle(registry.default_rate())
    );
    tracing::info!(socket = %socket.display(), "serve started");

    tokio::signal::ctrl_c()
        .await
        .context("wait for Ctrl-C")?;
    tracing::info!("interrupt received, shutting down");

    listener.abort();
    let _ = listener.await;
    let active = registry.active_count();
    registry.shutdown().await;
    drop(registry);
    if active > 0 {
        println!("Stopped {active} active job(s).");
    }

    // Open client connections still hold the reporter; don't wait on them forever.
    if tokio::time::timeout(DRAIN_TIMEOUT, printer).await.is_err() {
        tracing::debug!("progress printer still busy at exit");
    }
    if let Err(e) = std::fs::remove_file(socket) {
        tracing::debug!(socket = %socket.display(), "remove control socket: {}", e);
    }
    Ok(())
}
