//! `roster` command-line front end.
//!
//! # Responsibility
//! - Load configuration, start logging, wire the session collaborators.
//! - Dispatch one-shot commands or open the interactive batch prompt.

mod commands;
mod repl;

use clap::Parser;
use commands::{run_command, CliSession, RosterCommand};
use log::{info, warn};
use roster_core::{
    init_logging, is_git_work_tree, publisher_from_config, BatchError, JsonTierRepository,
    MarkdownChangeLog, RosterConfig, RosterService, Session, SessionError, TransactionManager,
    DEFAULT_CONFIG_FILE,
};
use std::io;
use std::path::PathBuf;

pub fn bail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {msg}");
    std::process::exit(1);
}

#[derive(Parser)]
#[command(name = "roster", version, about = "Maintain a three-tier ranked roster")]
struct Cli {
    /// Settings file (missing file means defaults)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    #[command(flatten)]
    Roster(RosterCommand),
    /// Group several changes into one published commit
    Batch {
        /// Reopen a batch left open by an earlier run instead of starting one
        #[arg(long)]
        resume: bool,
    },
    /// Publish all roster files again after a failed publish
    Publish {
        #[arg(long, default_value = "Update roster")]
        message: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let mut config = RosterConfig::load(&cli.config).unwrap_or_else(|err| bail(err));
    if let Err(err) = config.apply_env() {
        bail(err);
    }

    let log_dir = if config.log_dir.is_absolute() {
        config.log_dir.clone()
    } else {
        let cwd = std::env::current_dir().unwrap_or_else(|err| bail(err));
        cwd.join(&config.log_dir)
    };
    if let Err(err) = init_logging(&config.log_level, &log_dir) {
        eprintln!("Warning: logging disabled: {err}");
    }

    let mut session = open_session(&config);
    info!(
        "event=cli_start module=cli status=ok simulate={}",
        config.simulate_publish
    );

    let result = match cli.command {
        Commands::Roster(command) => run_command(&mut session, command),
        Commands::Batch { resume } => repl::run_batch(&mut session, io::stdin().lock(), resume),
        Commands::Publish { message } => session.republish(&message).map(|()| println!("Published.")),
    };

    match result {
        Ok(()) => {}
        Err(err @ SessionError::Batch(BatchError::SnapshotExists(_))) => {
            bail(format!("{err}\nRun `roster batch --resume` to commit, roll back or discard it."))
        }
        Err(err) => bail(err),
    }
}

fn open_session(config: &RosterConfig) -> CliSession {
    let publisher = publisher_from_config(config);
    if !config.simulate_publish {
        let repo_dir = &config.repo_dir;
        if !is_git_work_tree(repo_dir) {
            warn!("event=publish_check module=cli status=warn reason=not_a_work_tree");
            eprintln!(
                "Warning: {} is not a git work tree; publishing will fail. \
                 Set simulate_publish = true to publish locally only.",
                repo_dir.display()
            );
        }
    }

    Session::new(
        RosterService::new(JsonTierRepository::new(&config.data_dir)),
        MarkdownChangeLog::new(&config.changelog_path),
        publisher,
        TransactionManager::new(&config.snapshot_dir),
    )
}
