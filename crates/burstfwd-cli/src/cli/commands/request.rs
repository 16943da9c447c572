//! Socket client commands: submit, pause, resume, stop, status, list, ping.

use anyhow::{bail, Context, Result};
use burstfwd_core::control::{ControlCommand, ControlReply};
use burstfwd_core::ProgressSnapshot;
use std::path::Path;

use crate::cli::control_socket;
use crate::cli::display::{format_list, format_snapshot};

pub async fn run_request(socket: &Path, cmd: ControlCommand) -> Result<()> {
    let reply = control_socket::send_request(socket, &cmd).await?;
    match reply {
        ControlReply::Ok(None) => println!("ok: {cmd}"),
        ControlReply::Ok(Some(payload)) => print_payload(&cmd, &payload)?,
        ControlReply::Pong => println!("pong"),
        ControlReply::Error(msg) => bail!("{cmd}: {msg}"),
    }
    Ok(())
}

fn print_payload(cmd: &ControlCommand, payload: &str) -> Result<()> {
    match cmd {
        ControlCommand::Submit { owner, count, .. } => {
            println!("Submitted job {payload} for owner {owner} ({count} items)");
        }
        ControlCommand::Status(_) => {
            let snap: ProgressSnapshot =
                serde_json::from_str(payload).context("decode status reply")?;
            println!("{}", format_snapshot(&snap));
        }
        ControlCommand::List => {
            let jobs: Vec<ProgressSnapshot> =
                serde_json::from_str(payload).context("decode list reply")?;
            println!("{}", format_list(&jobs));
        }
        _ => println!("{payload}"),
    }
    Ok(())
}
