//! Interactive batch prompt.
//!
//! # Responsibility
//! - Read command lines, split them into arguments, dispatch to the session.
//! - Keep the prompt open until the batch closes or the user leaves.
//! - Leaving with pending changes keeps the snapshot on disk.
//!
//! # Invariants
//! - A failed restore ends the prompt with an error; the snapshot stays on disk.

use crate::commands::{run_command, CliSession, RosterCommand};
use clap::{Parser, Subcommand};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use roster_core::{BatchError, CommitOutcome, SessionError};
use std::io::{self, BufRead, Write};

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""([^"]*)"|'([^']*)'|(\S+)"#).expect("token pattern must compile")
});

#[derive(Debug, Parser)]
#[command(no_binary_name = true, name = "batch", disable_version_flag = true)]
struct BatchLine {
    #[command(subcommand)]
    command: BatchCommand,
}

#[derive(Debug, Subcommand)]
enum BatchCommand {
    #[command(flatten)]
    Roster(RosterCommand),
    /// Publish every pending change as one commit
    Commit,
    /// Restore all files to their state at batch start
    Rollback,
    /// End the batch keeping changes on disk, unpublished
    Discard,
    /// Show pending change descriptions
    Pending,
    /// Leave the prompt
    #[command(alias = "quit")]
    Exit,
}

/// Splits a prompt line into arguments; quotes group words.
pub fn tokenize(line: &str) -> Vec<String> {
    TOKEN_RE
        .captures_iter(line)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
        .map(|token| token.as_str().to_string())
        .collect()
}

enum Flow {
    Continue,
    Done,
}

/// Opens (or resumes) a batch and runs the prompt until it closes or input ends.
pub fn run_batch(
    session: &mut CliSession,
    input: impl BufRead,
    resume: bool,
) -> Result<(), SessionError> {
    let batch_id = if resume {
        let Some(batch_id) = session.resume_batch()? else {
            println!("No unfinished batch to resume.");
            return Ok(());
        };
        println!(
            "Batch {batch_id} resumed with {} pending change(s). Type `help` for commands.",
            session.pending().len()
        );
        batch_id
    } else {
        let batch_id = session.begin_batch()?;
        println!("Batch {batch_id} started. Type `help` for commands.");
        batch_id
    };

    let mut lines = input.lines();
    loop {
        print!("batch> ");
        let _ = io::stdout().flush();
        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(err)) => {
                warn!("event=batch_read module=cli status=error error={err}");
                break;
            }
            None => break,
        };
        let tokens = tokenize(&line);
        if tokens.is_empty() {
            continue;
        }
        let parsed = match BatchLine::try_parse_from(tokens) {
            Ok(parsed) => parsed,
            Err(err) => {
                let _ = err.print();
                continue;
            }
        };
        if let Flow::Done = dispatch(session, parsed.command)? {
            break;
        }
    }

    if session.is_batch_active() {
        warn!("event=batch_abandon module=cli status=warn batch_id={batch_id}");
        println!(
            "Leaving with the batch still open; the snapshot is kept. \
             Run `roster batch --resume` to commit, roll back or discard it."
        );
    }
    Ok(())
}

fn dispatch(session: &mut CliSession, command: BatchCommand) -> Result<Flow, SessionError> {
    match command {
        BatchCommand::Roster(command) => {
            if let Err(err) = run_command(session, command) {
                eprintln!("Error: {err}");
            }
        }
        BatchCommand::Pending => {
            let pending = session.pending();
            if pending.is_empty() {
                println!("No pending changes.");
            }
            for (index, description) in pending.iter().enumerate() {
                println!("{:>3}. {description}", index + 1);
            }
        }
        BatchCommand::Commit => match session.commit_batch() {
            Ok(CommitOutcome::Published { changes }) => {
                println!("Committed {changes} change(s).");
                return Ok(Flow::Done);
            }
            Ok(CommitOutcome::NothingToPublish) => {
                println!("Nothing to publish; batch closed.");
                return Ok(Flow::Done);
            }
            Err(err) => {
                eprintln!("Error: {err}");
                println!("Batch is still open. Retry `commit` or `rollback`.");
            }
        },
        BatchCommand::Rollback => match session.rollback_batch() {
            Ok(changes) => {
                println!("Rolled back {changes} change(s).");
                return Ok(Flow::Done);
            }
            Err(err @ SessionError::Batch(BatchError::RestoreFailed { .. })) => return Err(err),
            Err(err) => eprintln!("Error: {err}"),
        },
        BatchCommand::Discard => match session.discard_batch() {
            Ok(changes) => {
                println!("Discarded batch; {changes} change(s) stay on disk unpublished.");
                return Ok(Flow::Done);
            }
            Err(err) => eprintln!("Error: {err}"),
        },
        BatchCommand::Exit => {
            if session.pending().is_empty() {
                session.discard_batch()?;
            }
            return Ok(Flow::Done);
        }
    }
    Ok(Flow::Continue)
}
