//! Subcommands of the CLI.

use std::path::PathBuf;

use clap::Subcommand;

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Check that the daemon answers, optionally starting it
    Check {
        /// Start `<daemon> serve` if the daemon does not answer
        #[arg(long)]
        start: bool,
        /// Seconds to wait for a started daemon
        #[arg(long, default_value = "15")]
        wait: u64,
    },

    /// List the models in the daemon's catalog
    List,

    /// Print the definition of a model
    Show {
        name: String,
        /// Print the daemon's extra attributes as JSON too
        #[arg(long)]
        details: bool,
    },

    /// Create a new model from a definition file
    Create {
        name: String,
        /// Definition file, or "-" for stdin
        #[arg(short = 'f', long = "file")]
        file: PathBuf,
    },

    /// Create a new model from an existing model's definition
    Clone {
        source: String,
        name: String,
        /// Edited definition to use instead of the source's own
        #[arg(short = 'f', long = "file")]
        file: Option<PathBuf>,
    },

    /// Replace an existing model's definition (previous one is backed up)
    Save {
        name: String,
        /// Definition file, or "-" for stdin
        #[arg(short = 'f', long = "file")]
        file: PathBuf,
    },

    /// Rebuild a model from its last backup
    Restore { name: String },

    /// List models that have a backup
    Backups,

    /// Remove a model from the catalog
    Delete {
        name: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Ask the daemon to download a model
    Pull { name: String },

    /// Write a model's definition to a file
    Export { name: String, path: PathBuf },

    /// Print a starter definition
    Template {
        /// Base model reference
        #[arg(long, default_value = "llama2")]
        base: String,
        /// System prompt
        #[arg(long, default_value = "You are a helpful assistant.")]
        system: String,
    },

    /// Block or allow the daemon's network access
    #[command(subcommand)]
    Isolation(IsolationCommand),
}

/// Network isolation subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationCommand {
    /// Show whether isolation is on
    Status,
    /// Add the blocking firewall rules
    On,
    /// Remove the blocking firewall rules
    Off,
}
