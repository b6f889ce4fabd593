//! Line-oriented command menu.
//!
//! Each input line is one command. Bad input prints a hint and the loop
//! carries on; only I/O failures on the console itself end the session.

use crate::config::AppConfig;
use crate::session::{Dispatch, Session};
use anyhow::Result;
use procman_registry::{Priority, ProcessId};
use std::io::{BufRead, Write};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

const HELP: &str = "\
commands:
  insert <id> <name> <priority>   register a process
  remove <id>                     remove a process
  find <id>                       show a process
  priority <id> <priority>        change a process priority
  list                            show all processes
  enqueue <id>                    queue a process for dispatch
  dispatch                        dispatch the highest-priority process
  queue                           show the dispatch queue
  purge                           drop queued processes that no longer exist
  alloc                           allocate a memory block
  free                            release the most recent memory block
  stack                           show allocated memory blocks
  save                            write processes to the data file
  load                            reload processes from the data file
  dump                            print the whole session as JSON
  help                            show this text
  exit                            leave";

/// A parsed menu command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Insert {
        id: ProcessId,
        name: String,
        priority: Priority,
    },
    Remove { id: ProcessId },
    Find { id: ProcessId },
    Priority { id: ProcessId, priority: Priority },
    List,
    Enqueue { id: ProcessId },
    Dispatch,
    Queue,
    Purge,
    Alloc,
    Free,
    Stack,
    Save,
    Load,
    Dump,
    Help,
    Exit,
}

/// Why a line could not be turned into a [`Command`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty command")]
    Empty,

    #[error("unknown command {0:?}, type 'help' for a list")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("not an integer: {0:?}")]
    InvalidNumber(String),

    #[error("process names may not contain ';'")]
    InvalidName,
}

fn number(word: &str) -> Result<i64, ParseError> {
    word.parse()
        .map_err(|_| ParseError::InvalidNumber(word.to_string()))
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&keyword, args)) = words.split_first() else {
            return Err(ParseError::Empty);
        };

        let command = match (keyword.to_lowercase().as_str(), args) {
            ("insert", [id, name @ .., priority]) if !name.is_empty() => {
                let name = name.join(" ");
                if name.contains(';') {
                    return Err(ParseError::InvalidName);
                }
                Command::Insert {
                    id: number(id)?,
                    name,
                    priority: number(priority)?,
                }
            }
            ("insert", _) => return Err(ParseError::Usage("insert <id> <name> <priority>")),
            ("remove", [id]) => Command::Remove { id: number(id)? },
            ("remove", _) => return Err(ParseError::Usage("remove <id>")),
            ("find", [id]) => Command::Find { id: number(id)? },
            ("find", _) => return Err(ParseError::Usage("find <id>")),
            ("priority", [id, priority]) => Command::Priority {
                id: number(id)?,
                priority: number(priority)?,
            },
            ("priority", _) => return Err(ParseError::Usage("priority <id> <priority>")),
            ("enqueue", [id]) => Command::Enqueue { id: number(id)? },
            ("enqueue", _) => return Err(ParseError::Usage("enqueue <id>")),
            ("list", []) => Command::List,
            ("dispatch", []) => Command::Dispatch,
            ("queue", []) => Command::Queue,
            ("purge", []) => Command::Purge,
            ("alloc", []) => Command::Alloc,
            ("free", []) => Command::Free,
            ("stack", []) => Command::Stack,
            ("save", []) => Command::Save,
            ("load", []) => Command::Load,
            ("dump", []) => Command::Dump,
            ("help", _) => Command::Help,
            ("exit" | "quit", []) => Command::Exit,
            _ => return Err(ParseError::Unknown(line.trim().to_string())),
        };
        Ok(command)
    }
}

/// Whether the menu loop should keep reading commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Apply one command to the session, writing its output to `out`.
pub fn execute<W: Write>(
    session: &mut Session,
    config: &AppConfig,
    command: Command,
    out: &mut W,
) -> Result<Flow> {
    debug!(?command, "Executing command");

    match command {
        Command::Insert { id, name, priority } => {
            session.registry.insert(id, name, priority);
            writeln!(out, "inserted process {id}")?;
        }
        Command::Remove { id } => match session.registry.remove(id) {
            Some(process) => writeln!(out, "removed {process}")?,
            None => writeln!(out, "process {id} not found")?,
        },
        Command::Find { id } => match session.registry.find(id) {
            Some(process) => writeln!(out, "{process}")?,
            None => writeln!(out, "process {id} not found")?,
        },
        Command::Priority { id, priority } => {
            if session.registry.update_priority(id, priority) {
                writeln!(out, "process {id} now has priority {priority}")?;
            } else {
                writeln!(out, "process {id} not found")?;
            }
        }
        Command::List => {
            if session.registry.is_empty() {
                writeln!(out, "no processes")?;
            }
            for process in session.registry.enumerate() {
                writeln!(out, "{process}")?;
            }
        }
        Command::Enqueue { id } => match session.enqueue_id(id) {
            Ok(_) => writeln!(out, "queued process {id}")?,
            Err(err) => writeln!(out, "cannot queue: {err}")?,
        },
        Command::Dispatch => match session.dispatch_next() {
            Dispatch::Process(process) => writeln!(out, "dispatched {process}")?,
            Dispatch::Stale(handle) => {
                writeln!(out, "{handle} was removed before it could be dispatched")?
            }
            Dispatch::Empty => writeln!(out, "dispatch queue is empty")?,
        },
        Command::Queue => {
            if session.queue.is_empty() {
                writeln!(out, "dispatch queue is empty")?;
            }
            for entry in session.queue.iter() {
                match session.registry.get(entry.handle) {
                    Some(process) => writeln!(out, "{process}")?,
                    None => writeln!(
                        out,
                        "{} (removed), priority: {}",
                        entry.handle, entry.priority
                    )?,
                }
            }
        }
        Command::Purge => {
            let purged = session.queue.purge_stale(&session.registry);
            writeln!(out, "purged {purged} stale entries")?;
        }
        Command::Alloc => {
            let block = session.stack.push();
            writeln!(out, "allocated {block}")?;
        }
        Command::Free => match session.stack.pop() {
            Some(block) => writeln!(out, "released {block}")?,
            None => writeln!(out, "memory stack is empty")?,
        },
        Command::Stack => {
            if session.stack.is_empty() {
                writeln!(out, "memory stack is empty")?;
            }
            for block in session.stack.peek_all() {
                writeln!(out, "{block}")?;
            }
            let stats = session.stack.stats();
            writeln!(
                out,
                "pushes: {}, pops: {}, peak depth: {}",
                stats.total_pushes, stats.total_pops, stats.peak_depth
            )?;
        }
        Command::Save => match session.registry.save(&config.data_file) {
            Ok(written) => writeln!(
                out,
                "saved {written} processes to {}",
                config.data_file.display()
            )?,
            Err(err) => writeln!(out, "save failed: {err}")?,
        },
        Command::Load => match session.registry.load(&config.data_file) {
            Ok(report) if !report.file_found => {
                writeln!(out, "{} does not exist", config.data_file.display())?
            }
            Ok(report) => {
                writeln!(
                    out,
                    "loaded {} processes ({} malformed lines skipped)",
                    report.loaded,
                    report.skipped()
                )?;
                let purged = session.queue.purge_stale(&session.registry);
                if purged > 0 {
                    writeln!(out, "dropped {purged} queued entries from before the load")?;
                }
            }
            Err(err) => writeln!(out, "load failed: {err}")?,
        },
        Command::Dump => {
            let json = serde_json::to_string_pretty(&session.snapshot())?;
            writeln!(out, "{json}")?;
        }
        Command::Help => writeln!(out, "{HELP}")?,
        Command::Exit => return Ok(Flow::Exit),
    }

    Ok(Flow::Continue)
}

/// Read commands from `input` until `exit` or end of input.
pub fn run<R: BufRead, W: Write>(
    session: &mut Session,
    config: &AppConfig,
    input: R,
    mut out: W,
) -> Result<()> {
    writeln!(out, "{HELP}")?;

    let mut lines = input.lines();
    loop {
        write!(out, "> ")?;
        out.flush()?;

        let Some(line) = lines.next() else {
            writeln!(out)?;
            break;
        };
        let line = line?;

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(ParseError::Empty) => continue,
            Err(err) => {
                writeln!(out, "error: {err}")?;
                continue;
            }
        };

        if execute(session, config, command, &mut out)? == Flow::Exit {
            break;
        }
    }

    Ok(())
}
