//! Line-oriented console commands
//!
//! A reader thread parses stdin and forwards commands to the control loop.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread;

use crossbeam_channel::Sender;
use tracing::{debug, warn};

/// A parsed console line
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    /// Set a parameter by id; the value is parsed against the parameter kind
    Set { id: String, value: String },
    Get(String),
    List,
    Meters,
    Bypass(bool),
    /// Pointer gesture, both normalized to 0..1
    Touch { y: f32, radius: f32 },
    Release,
    Save(Option<PathBuf>),
    Load(Option<PathBuf>),
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  set <id> <value>    set a parameter (numbers, on/off, or a choice label)
  get <id>            show a parameter
  list                show every parameter
  meters              show levels, LFOs and ripple bands
  bypass on|off       dry passthrough
  touch <y> <radius>  start or move a gesture
  release             end the gesture
  save [path]         write the state file
  load [path]         read the state file
  help                this text
  quit                save and exit";

/// Remove one pair of matching surrounding quotes
fn unquote(s: &str) -> &str {
    let s = s.trim();
    if s.len() >= 2
        && ((s.starts_with('\'') && s.ends_with('\'')) || (s.starts_with('"') && s.ends_with('"')))
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn optional_path(rest: &str) -> Option<PathBuf> {
    let path = unquote(rest);
    if path.is_empty() {
        None
    } else {
        Some(PathBuf::from(path))
    }
}

/// Parse one console line; `None` for blank or unrecognised input
pub fn parse_command(line: &str) -> Option<ConsoleCommand> {
    let input = line.trim();
    if input.is_empty() {
        return None;
    }

    match input {
        "list" | "ls" => return Some(ConsoleCommand::List),
        "meters" | "m" => return Some(ConsoleCommand::Meters),
        "release" => return Some(ConsoleCommand::Release),
        "save" => return Some(ConsoleCommand::Save(None)),
        "load" => return Some(ConsoleCommand::Load(None)),
        "help" | "?" => return Some(ConsoleCommand::Help),
        "quit" | "q" | "exit" => return Some(ConsoleCommand::Quit),
        _ => {}
    }

    if let Some(rest) = input.strip_prefix("set ") {
        let (id, value) = rest.trim().split_once(char::is_whitespace)?;
        let value = unquote(value);
        if value.is_empty() {
            return None;
        }
        return Some(ConsoleCommand::Set {
            id: id.to_string(),
            value: value.to_string(),
        });
    }

    if let Some(id) = input.strip_prefix("get ") {
        let id = id.trim();
        if !id.is_empty() {
            return Some(ConsoleCommand::Get(id.to_string()));
        }
    }

    if let Some(state) = input.strip_prefix("bypass ") {
        match state.trim() {
            "on" => return Some(ConsoleCommand::Bypass(true)),
            "off" => return Some(ConsoleCommand::Bypass(false)),
            _ => return None,
        }
    }

    if let Some(rest) = input.strip_prefix("touch ") {
        let mut parts = rest.split_whitespace();
        let y = parts.next()?.parse::<f32>().ok()?;
        let radius = match parts.next() {
            Some(r) => r.parse::<f32>().ok()?,
            None => 0.2,
        };
        return Some(ConsoleCommand::Touch { y, radius });
    }

    if let Some(path) = input.strip_prefix("save ") {
        return Some(ConsoleCommand::Save(optional_path(path)));
    }

    if let Some(path) = input.strip_prefix("load ") {
        return Some(ConsoleCommand::Load(optional_path(path)));
    }

    None
}

/// Spawn the stdin reader; sends `Quit` when stdin closes
pub fn spawn_reader(tx: Sender<ConsoleCommand>) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("ripple-console".into())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(l) => l,
                    Err(e) => {
                        warn!("Console read failed: {}", e);
                        break;
                    }
                };
                match parse_command(&line) {
                    Some(cmd) => {
                        debug!(?cmd, "Console command");
                        if tx.send(cmd).is_err() {
                            return;
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => println!("Unknown command: {} (try 'help')", line.trim()),
                }
            }
            let _ = tx.send(ConsoleCommand::Quit);
        })
}
