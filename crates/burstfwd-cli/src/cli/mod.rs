//! CLI for the burstfwd transfer scheduler.

mod commands;
mod control_socket;
mod display;

use anyhow::Result;
use burstfwd_core::config::{self, FwdConfig};
use burstfwd_core::control::{default_control_socket_path, ControlCommand};
use burstfwd_core::OwnerId;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use commands::{run_check_config, run_completions, run_request, run_serve};

/// Top-level CLI for burstfwd.
#[derive(Debug, Parser)]
#[command(name = "burstfwd")]
#[command(about = "burstfwd: paced, pausable bulk transfers between channels", long_about = None)]
pub struct Cli {
    /// Control socket path (overrides `control_socket` in the config).
    #[arg(long, global = true, value_name = "PATH")]
    pub socket: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run the job registry and serve the control socket until Ctrl-C.
    Serve,

    /// Start a transfer job for an owner.
    Submit {
        /// Owner (requesting user) id.
        #[arg(long)]
        owner: OwnerId,
        /// Source channel id.
        #[arg(long, allow_negative_numbers = true)]
        source: i64,
        /// Destination channel id.
        #[arg(long, allow_negative_numbers = true)]
        dest: i64,
        /// Number of items to transfer.
        #[arg(long)]
        count: u64,
    },

    /// Pause the owner's running job.
    Pause {
        /// Owner id.
        owner: OwnerId,
    },

    /// Resume the owner's paused job.
    Resume {
        /// Owner id.
        owner: OwnerId,
    },

    /// Stop the owner's job for good.
    Stop {
        /// Owner id.
        owner: OwnerId,
    },

    /// Show progress of the owner's job.
    Status {
        /// Owner id.
        owner: OwnerId,
    },

    /// List all active jobs.
    List,

    /// Check that `burstfwd serve` is answering.
    Ping,

    /// Validate the config file and print the effective cycle.
    CheckConfig {
        /// Config file to check instead of `~/.config/burstfwd/config.toml`.
        #[arg(long, value_name = "PATH")]
        path: Option<PathBuf>,
    },

    /// Print shell completions to stdout.
    Completions {
        /// Target shell.
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl CliCommand {
    /// The control request this command sends, if it is a socket client command.
    pub fn to_request(&self) -> Option<ControlCommand> {
        let cmd = match *self {
            CliCommand::Submit {
                owner,
                source,
                dest,
                count,
            } => ControlCommand::Submit {
                owner,
                source,
                dest,
                count,
            },
            CliCommand::Pause { owner } => ControlCommand::Pause(owner),
            CliCommand::Resume { owner } => ControlCommand::Resume(owner),
            CliCommand::Stop { owner } => ControlCommand::Stop(owner),
            CliCommand::Status { owner } => ControlCommand::Status(owner),
            CliCommand::List => ControlCommand::List,
            CliCommand::Ping => ControlCommand::Ping,
            CliCommand::Serve | CliCommand::CheckConfig { .. } | CliCommand::Completions { .. } => {
                return None
            }
        };
        Some(cmd)
    }

    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match &cli.command {
            CliCommand::Completions { shell } => run_completions(*shell),
            CliCommand::CheckConfig { path } => run_check_config(path.as_deref())?,
            CliCommand::Serve => {
                let cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                let socket = socket_path(cli.socket.clone(), &cfg)?;
                run_serve(&cfg, &socket).await?;
            }
            client => {
                let cfg = config::load_or_init()?;
                let socket = socket_path(cli.socket.clone(), &cfg)?;
                if let Some(request) = client.to_request() {
                    run_request(&socket, request).await?;
                }
            }
        }

        Ok(())
    }
}

/// `--socket`, then the config file, then the XDG state dir.
fn socket_path(flag: Option<PathBuf>, cfg: &FwdConfig) -> Result<PathBuf> {
    if let Some(path) = flag.or_else(|| cfg.control_socket.clone()) {
        return Ok(path);
    }
    Ok(default_control_socket_path()?)
}

#[cfg(test)]
mod tests;
