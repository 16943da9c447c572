//! Control socket: server (during `burstfwd serve`) and client (every other command).
//! One request line in, one reply line out; see `burstfwd_core::control`.

use anyhow::{Context, Result};
use burstfwd_core::control::{handle_line, ControlCommand, ControlReply};
use burstfwd_core::JobRegistry;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

/// Binds `path` (replacing a stale socket file) and answers requests against
/// `registry` until the returned task is aborted.
pub fn spawn_control_listener(
    registry: JobRegistry,
    path: impl AsRef<Path>,
) -> Result<tokio::task::JoinHandle<()>> {
    let path = path.as_ref().to_path_buf();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create socket dir {}", parent.display()))?;
    }
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path)
        .with_context(|| format!("bind control socket {}", path.display()))?;
    tracing::debug!(path = %path.display(), "control socket listening");

    let handle = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let registry = registry.clone();
                    tokio::spawn(serve_connection(registry, stream));
                }
                Err(e) => tracing::debug!("control socket accept: {}", e),
            }
        }
    });
    Ok(handle)
}

async fn serve_connection(registry: JobRegistry, stream: UnixStream) {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        let reply = handle_line(&registry, &line);
        if let Err(e) = write.write_all(format!("{reply}\n").as_bytes()).await {
            tracing::debug!("control socket write: {}", e);
            return;
        }
    }
}

/// Sends one request and waits for its reply line.
pub async fn send_request(socket_path: &Path, cmd: &ControlCommand) -> Result<ControlReply> {
    let stream = UnixStream::connect(socket_path).await.with_context(|| {
        format!(
            "connect to {} (is `burstfwd serve` running?)",
            socket_path.display()
        )
    })?;
    let (read, mut write) = stream.into_split();
    write.write_all(format!("{cmd}\n").as_bytes()).await?;
    write.shutdown().await?;

    let mut lines = BufReader::new(read).lines();
    let line = lines
        .next_line()
        .await?
        .context("control socket closed without a reply")?;
    Ok(ControlReply::parse(&line))
}
