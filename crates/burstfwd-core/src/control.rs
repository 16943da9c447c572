//! Line protocol for controlling a running registry over the control socket.
//!
//! One request per line, one reply line per request:
//! `submit <owner> <source_id> <dest_id> <count>`, `pause <owner>`,
//! `resume <owner>`, `stop <owner>`, `status <owner>`, `list`, `ping`.
//! Replies are `ok`, `ok <payload>`, `pong` or `error <message>`.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::job::{ChannelRef, OwnerId};
use crate::registry::JobRegistry;

/// A parsed control request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    Submit {
        owner: OwnerId,
        source: i64,
        dest: i64,
        count: u64,
    },
    Pause(OwnerId),
    Resume(OwnerId),
    Stop(OwnerId),
    Status(OwnerId),
    List,
    Ping,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlParseError {
    #[error("empty request")]
    Empty,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("invalid number: {0}")]
    InvalidNumber(String),
}

fn number<T: std::str::FromStr>(s: &str) -> Result<T, ControlParseError> {
    s.parse()
        .map_err(|_| ControlParseError::InvalidNumber(s.to_string()))
}

impl ControlCommand {
    pub fn parse(line: &str) -> Result<Self, ControlParseError> {
        let mut parts = line.split_whitespace();
        let Some(verb) = parts.next() else {
            return Err(ControlParseError::Empty);
        };
        let args: Vec<&str> = parts.collect();
        let owner_only = |usage: &'static str| -> Result<OwnerId, ControlParseError> {
            match args.as_slice() {
                [owner] => number(owner),
                _ => Err(ControlParseError::Usage(usage)),
            }
        };
        match verb {
            "submit" => match args.as_slice() {
                [owner, source, dest, count] => Ok(ControlCommand::Submit {
                    owner: number(owner)?,
                    source: number(source)?,
                    dest: number(dest)?,
                    count: number(count)?,
                }),
                _ => Err(ControlParseError::Usage(
                    "submit <owner> <source_id> <dest_id> <count>",
                )),
            },
            "pause" => owner_only("pause <owner>").map(ControlCommand::Pause),
            "resume" => owner_only("resume <owner>").map(ControlCommand::Resume),
            "stop" => owner_only("stop <owner>").map(ControlCommand::Stop),
            "status" => owner_only("status <owner>").map(ControlCommand::Status),
            "list" if args.is_empty() => Ok(ControlCommand::List),
            "list" => Err(ControlParseError::Usage("list")),
            "ping" => Ok(ControlCommand::Ping),
            other => Err(ControlParseError::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlCommand::Submit {
                owner,
                source,
                dest,
                count,
            } => write!(f, "submit {owner} {source} {dest} {count}"),
            ControlCommand::Pause(owner) => write!(f, "pause {owner}"),
            ControlCommand::Resume(owner) => write!(f, "resume {owner}"),
            ControlCommand::Stop(owner) => write!(f, "stop {owner}"),
            ControlCommand::Status(owner) => write!(f, "status {owner}"),
            ControlCommand::List => write!(f, "list"),
            ControlCommand::Ping => write!(f, "ping"),
        }
    }
}

/// Reply to one control request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlReply {
    Ok(Option<String>),
    Pong,
    Error(String),
}

impl ControlReply {
    /// Parses a reply line (client side).
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end();
        if line == "pong" {
            ControlReply::Pong
        } else if line == "ok" {
            ControlReply::Ok(None)
        } else if let Some(payload) = line.strip_prefix("ok ") {
            ControlReply::Ok(Some(payload.to_string()))
        } else if let Some(msg) = line.strip_prefix("error ") {
            ControlReply::Error(msg.to_string())
        } else {
            ControlReply::Error(format!("malformed reply: {line}"))
        }
    }
}

impl fmt::Display for ControlReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlReply::Ok(None) => write!(f, "ok"),
            ControlReply::Ok(Some(payload)) => write!(f, "ok {payload}"),
            ControlReply::Pong => write!(f, "pong"),
            ControlReply::Error(msg) => write!(f, "error {msg}"),
        }
    }
}

fn ack<E: fmt::Display>(result: Result<(), E>) -> ControlReply {
    match result {
        Ok(()) => ControlReply::Ok(None),
        Err(e) => ControlReply::Error(e.to_string()),
    }
}

fn json<T: serde::Serialize>(value: &T) -> ControlReply {
    match serde_json::to_string(value) {
        Ok(s) => ControlReply::Ok(Some(s)),
        Err(e) => ControlReply::Error(format!("encode reply: {e}")),
    }
}

/// Applies one command to the registry. Must run inside a tokio runtime (submit spawns).
pub fn dispatch(registry: &JobRegistry, cmd: ControlCommand) -> ControlReply {
    match cmd {
        ControlCommand::Submit {
            owner,
            source,
            dest,
            count,
        } => {
            let spec = registry.spec_for(
                owner,
                ChannelRef::new(source, None),
                ChannelRef::new(dest, None),
                count,
            );
            match registry.submit(spec) {
                Ok(handle) => ControlReply::Ok(Some(handle.id().to_string())),
                Err(e) => ControlReply::Error(e.to_string()),
            }
        }
        ControlCommand::Pause(owner) => ack(registry.pause(owner)),
        ControlCommand::Resume(owner) => ack(registry.resume(owner)),
        ControlCommand::Stop(owner) => ack(registry.stop(owner)),
        ControlCommand::Status(owner) => match registry.query(owner) {
            Ok(snapshot) => json(&snapshot),
            Err(e) => ControlReply::Error(e.to_string()),
        },
        ControlCommand::List => json(&registry.list()),
        ControlCommand::Ping => ControlReply::Pong,
    }
}

/// Parses and dispatches one request line.
pub fn handle_line(registry: &JobRegistry, line: &str) -> ControlReply {
    match ControlCommand::parse(line) {
        Ok(cmd) => {
            tracing::debug!(%cmd, "control request");
            dispatch(registry, cmd)
        }
        Err(e) => ControlReply::Error(e.to_string()),
    }
}

/// Default path for the control socket (XDG state dir).
pub fn default_control_socket_path() -> std::io::Result<PathBuf> {
    let dir = xdg::BaseDirectories::with_prefix("burstfwd")?.get_state_home();
    Ok(dir.join("control.sock"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_command() {
        assert_eq!(
            ControlCommand::parse("submit 42 -1001 -1002 8000").unwrap(),
            ControlCommand::Submit {
                owner: 42,
                source: -1001,
                dest: -1002,
                count: 8000
            }
        );
        assert_eq!(
            ControlCommand::parse("pause 42").unwrap(),
            ControlCommand::Pause(42)
        );
        assert_eq!(
            ControlCommand::parse("  resume   7 ").unwrap(),
            ControlCommand::Resume(7)
        );
        assert_eq!(
            ControlCommand::parse("stop 1").unwrap(),
            ControlCommand::Stop(1)
        );
        assert_eq!(
            ControlCommand::parse("status 1").unwrap(),
            ControlCommand::Status(1)
        );
        assert_eq!(ControlCommand::parse("list").unwrap(), ControlCommand::List);
        assert_eq!(ControlCommand::parse("ping").unwrap(), ControlCommand::Ping);
    }

    #[test]
    fn rejects_malformed_requests() {
        assert_eq!(ControlCommand::parse("   "), Err(ControlParseError::Empty));
        assert_eq!(
            ControlCommand::parse("forward 1"),
            Err(ControlParseError::UnknownCommand("forward".into()))
        );
        assert!(matches!(
            ControlCommand::parse("pause"),
            Err(ControlParseError::Usage(_))
        ));
        assert_eq!(
            ControlCommand::parse("stop abc"),
            Err(ControlParseError::InvalidNumber("abc".into()))
        );
        assert!(matches!(
            ControlCommand::parse("submit 1 2 3"),
            Err(ControlParseError::Usage(_))
        ));
    }

    #[test]
    fn command_display_parses_back() {
        let cmd = ControlCommand::Submit {
            owner: 5,
            source: -10,
            dest: -20,
            count: 100,
        };
        assert_eq!(ControlCommand::parse(&cmd.to_string()).unwrap(), cmd);
    }

    #[test]
    fn reply_wire_format() {
        assert_eq!(ControlReply::Ok(None).to_string(), "ok");
        assert_eq!(ControlReply::Ok(Some("3".into())).to_string(), "ok 3");
        assert_eq!(ControlReply::Error("nope".into()).to_string(), "error nope");
        assert_eq!(ControlReply::parse("pong\n"), ControlReply::Pong);
        assert_eq!(
            ControlReply::parse("ok {\"a\":1}"),
            ControlReply::Ok(Some("{\"a\":1}".into()))
        );
        assert_eq!(
            ControlReply::parse("error owner 1 has no active job"),
            ControlReply::Error("owner 1 has no active job".into())
        );
        assert!(matches!(ControlReply::parse("???"), ControlReply::Error(_)));
    }
}
