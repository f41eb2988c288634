//! Management console commands.
//!
//! Each command runs against a `Session`, which owns the cached list. The
//! interactive shell parses one command per input line and keeps going after
//! errors; one-shot CLI subcommands go through the same `execute`.

use std::io::Write;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::api::types::{self, NewRecord, Record, UpdateOutcome};
use crate::display;
use crate::state::Session;

pub const SHELL_HELP: &str = "\
Commands:
  list [--refresh]                                   show records (cached until a change)
  refresh                                            re-fetch the list
  get <id>                                           show one record
  create <email> <password> <display name...> [via=<tag>]
  update <id> <field>=<value>...                     change only the given fields
  delete <id>                                        delete a record
  help                                               this text
  quit                                               leave the console";

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    List { refresh: bool },
    Get { id: String },
    Create(NewRecord),
    Update { id: String, fields: Record },
    Delete { id: String },
    Help,
    Quit,
}

/// Parse one shell line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&verb, args)) = words.split_first() else {
        return Ok(None);
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "list" | "ls" => match args {
            [] => ConsoleCommand::List { refresh: false },
            ["--refresh"] | ["-r"] => ConsoleCommand::List { refresh: true },
            _ => return Err("usage: list [--refresh]".into()),
        },
        "refresh" => ConsoleCommand::List { refresh: true },
        "get" | "show" => ConsoleCommand::Get {
            id: single_id(args, "get <id>")?,
        },
        "create" | "add" => ConsoleCommand::Create(parse_create(args)?),
        "update" | "edit" => {
            let (id, assignments) = args
                .split_first()
                .ok_or_else(|| "usage: update <id> <field>=<value>...".to_string())?;
            ConsoleCommand::Update {
                id: id.to_string(),
                fields: parse_assignments(assignments)?,
            }
        }
        "delete" | "rm" => ConsoleCommand::Delete {
            id: single_id(args, "delete <id>")?,
        },
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(format!("unknown command '{}' (try 'help')", other)),
    };
    Ok(Some(command))
}

fn single_id(args: &[&str], usage: &str) -> Result<String, String> {
    match args {
        [id] => Ok(id.to_string()),
        _ => Err(format!("usage: {}", usage)),
    }
}

fn parse_create(args: &[&str]) -> Result<NewRecord, String> {
    const USAGE: &str = "usage: create <email> <password> <display name...> [via=<tag>]";

    let (via, rest) = match args.split_last() {
        Some((last, rest)) if last.starts_with("via=") => (Some(&last["via=".len()..]), rest),
        _ => (None, args),
    };
    let [email, password, name @ ..] = rest else {
        return Err(USAGE.into());
    };
    if name.is_empty() {
        return Err(USAGE.into());
    }

    let record = NewRecord::new(email, password, &name.join(" "));
    Ok(match via {
        Some(tag) => record.with_create_via(tag),
        None => record,
    })
}

/// Parse `field=value` pairs into a partial record.
///
/// Values that parse as JSON (`42`, `true`, `null`, `"quoted"`, `[..]`) keep
/// their JSON type; anything else is taken as a plain string.
pub fn parse_assignments(pairs: &[&str]) -> Result<Record, String> {
    let mut fields = Record::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected <field>=<value>, got '{}'", pair))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("missing field name in '{}'", pair));
        }
        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        fields.insert(key.to_string(), value);
    }
    Ok(fields)
}

/// Run one command and return the text to show the user.
pub async fn execute(session: &mut Session, command: &ConsoleCommand) -> Result<String, String> {
    match command {
        ConsoleCommand::List { refresh } => {
            let collection = session.resources().collection().to_string();
            let from_cache = !*refresh && session.is_cached();
            let cached = session.list(*refresh).await.map_err(|e| e.to_string())?;
            let Some(records) = types::record_list(&cached.value, &collection) else {
                return Ok(display::pretty(&cached.value));
            };
            let table = display::records_table(&records);
            if from_cache {
                return Ok(format!(
                    "{}\n(cached {}s ago; 'refresh' to re-fetch)",
                    table,
                    cached.age_secs()
                ));
            }
            Ok(table)
        }
        ConsoleCommand::Get { id } => {
            let record = session.get(id).await.map_err(|e| e.to_string())?;
            Ok(display::value_table(&record))
        }
        ConsoleCommand::Create(record) => {
            let created = session.create(record).await.map_err(|e| e.to_string())?;
            log::info!("Created record for {}", record.email);
            Ok(format!("Created:\n{}", display::value_table(&created)))
        }
        ConsoleCommand::Update { id, fields } => {
            match session.update(id, fields).await.map_err(|e| e.to_string())? {
                UpdateOutcome::Updated(updated) => {
                    log::info!("Updated record {}", id);
                    Ok(format!("Updated:\n{}", display::value_table(&updated)))
                }
                UpdateOutcome::Unchanged => Ok("No changes to save.".to_string()),
            }
        }
        ConsoleCommand::Delete { id } => {
            let ack = session.delete(id).await.map_err(|e| e.to_string())?;
            log::info!("Deleted record {}", id);
            Ok(match ack {
                Value::Null => format!("Deleted {}.", id),
                other => format!("Deleted {}:\n{}", id, display::pretty(&other)),
            })
        }
        ConsoleCommand::Help => Ok(SHELL_HELP.to_string()),
        ConsoleCommand::Quit => Ok(String::new()),
    }
}

/// Interactive loop: read commands from `input` until `quit` or EOF.
///
/// Command failures are printed and the loop continues; only I/O errors on
/// `input`/`out` end it early.
pub async fn run_shell<R, W>(session: &mut Session, input: R, out: &mut W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(
        out,
        "Managing /{} at {} (type 'help' for commands)",
        session.resources().collection(),
        session.resources().api().base_url()
    )?;

    let mut lines = input.lines();
    loop {
        write!(out, "msp> ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            break;
        };

        match parse_line(&line) {
            Ok(None) => {}
            Ok(Some(ConsoleCommand::Quit)) => break,
            Ok(Some(command)) => match execute(session, &command).await {
                Ok(text) => writeln!(out, "{}", text)?,
                Err(e) => writeln!(out, "Error: {}", e)?,
            },
            Err(e) => writeln!(out, "{}", e)?,
        }
    }
    Ok(())
}
