mod commands;
mod config;
mod error;
mod fuzzy;
mod persist;
mod providers;
mod reconcile;
mod sync;
mod translate;
mod tree;
mod types;
mod watch;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "linemark", about = "Durable line bookmarks that follow your code")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bookmark a line: capture file, line number, and line text
    Add {
        /// Slash-joined tree path for the bookmark, e.g. bugs/login/retry
        path: String,
        /// Source file to bookmark
        file: String,
        /// One-based line number
        line: u32,
    },
    /// Reconcile all bookmarks against the current code and report drift
    Check,
    /// Print the bookmark tree with checked marks
    List,
    /// Remove a bookmark or folder (subtree included)
    Remove {
        /// Slash-joined tree path to remove
        path: String,
    },
    /// Move a bookmark or folder to a new path
    Rename {
        /// Existing tree path
        old: String,
        /// New tree path
        new: String,
    },
    /// Recompute checked states from the breakpoint set
    Sync,
    /// Flip a node's checked state through the breakpoint set
    Toggle {
        /// Slash-joined tree path to toggle
        path: String,
    },
    /// Re-sync whenever the breakpoint file changes
    Watch,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Add { path, file, line } => commands::add(&path, &file, line).map(|()| return ExitCode::SUCCESS),
        Commands::Check => commands::check(),
        Commands::List => commands::list().map(|()| return ExitCode::SUCCESS),
        Commands::Remove { path } => commands::remove(&path).map(|()| return ExitCode::SUCCESS),
        Commands::Rename { old, new } => {
            commands::rename(&old, &new).map(|()| return ExitCode::SUCCESS)
        },
        Commands::Sync => commands::sync().map(|()| return ExitCode::SUCCESS),
        Commands::Toggle { path } => commands::toggle(&path).map(|()| return ExitCode::SUCCESS),
        Commands::Watch => watch::run().map(|()| return ExitCode::SUCCESS),
    };

    return match result {
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        },
        Ok(code) => code,
    };
}
