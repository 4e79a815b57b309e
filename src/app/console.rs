//! Line-based input console for the headless client
//!
//! Each line is one command:
//! `down <key>`, `up <key>`, `mouse <x> <y>`, `resize <width> <height>`.

use std::io::{self, BufRead};
use std::thread::{self, JoinHandle};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::game::input::{Action, InputEvent};

/// Parse one console line into an input event
pub fn parse_command(line: &str) -> Result<InputEvent, CommandError> {
    let mut parts = line.split_whitespace();
    let verb = parts.next().ok_or(CommandError::Empty)?;

    let event = match verb.to_ascii_lowercase().as_str() {
        "down" => InputEvent::Pressed(key_arg(parts.next())?),
        "up" => InputEvent::Released(key_arg(parts.next())?),
        "mouse" => InputEvent::PointerMoved {
            x: number_arg(parts.next())?,
            y: number_arg(parts.next())?,
        },
        "resize" => InputEvent::Resized {
            width: number_arg(parts.next())?,
            height: number_arg(parts.next())?,
        },
        other => return Err(CommandError::UnknownCommand(other.to_string())),
    };

    if parts.next().is_some() {
        return Err(CommandError::TrailingInput);
    }
    Ok(event)
}

fn key_arg(arg: Option<&str>) -> Result<Action, CommandError> {
    let key = arg.ok_or(CommandError::MissingArgument)?;
    Action::from_key(key).ok_or_else(|| CommandError::UnknownKey(key.to_string()))
}

fn number_arg<T: std::str::FromStr>(arg: Option<&str>) -> Result<T, CommandError> {
    let raw = arg.ok_or(CommandError::MissingArgument)?;
    raw.parse()
        .map_err(|_| CommandError::InvalidNumber(raw.to_string()))
}

/// Read commands from `reader` on a dedicated thread and forward them.
///
/// Reads block the thread, not the runtime, so tearing the session down never
/// waits on input. The thread stops at EOF, on a read error, or at the first
/// line after the session dropped its receiver.
pub fn spawn_listener<R>(reader: R, events: mpsc::Sender<InputEvent>) -> io::Result<JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    thread::Builder::new()
        .name("console-input".to_string())
        .spawn(move || {
            for line in reader.lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(error = %e, "Console read failed");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Ok(event) => {
                        if events.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, line = %line, "Ignoring console command"),
                }
            }
            debug!("Console input closed");
        })
}

/// Listen on the process's standard input
pub fn spawn_stdin_listener(events: mpsc::Sender<InputEvent>) -> io::Result<JoinHandle<()>> {
    spawn_listener(io::BufReader::new(io::stdin()), events)
}

/// Console command errors
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Unknown key: {0}")]
    UnknownKey(String),

    #[error("Missing argument")]
    MissingArgument,

    #[error("Not a number: {0}")]
    InvalidNumber(String),

    #[error("Unexpected trailing input")]
    TrailingInput,
}
