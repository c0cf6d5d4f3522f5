//! Main CLI parser and global options.
//!
//! Global flags override the environment, which overrides the defaults.

use std::path::PathBuf;

use clap::Parser;
use modelkeep_core::{BuildBackend, Settings};

use crate::commands::Commands;

/// Command-line interface for managing models of the local daemon.
#[derive(Parser)]
#[command(name = "modelkeep")]
#[command(about = "Create, edit, back up and isolate models of the local inference daemon")]
#[command(version)]
pub struct Cli {
    /// Daemon API base URL
    #[arg(long = "url", global = true)]
    pub daemon_url: Option<String>,

    /// Timeout in seconds for catalog requests
    #[arg(long = "timeout", global = true)]
    pub timeout_secs: Option<u64>,

    /// How definitions are built: "cli" (daemon executable) or "http"
    #[arg(long = "backend", global = true)]
    pub build_backend: Option<BuildBackend>,

    /// Path of the daemon executable
    #[arg(long = "daemon-exe", global = true)]
    pub daemon_executable: Option<PathBuf>,

    /// Directory for definition backups
    #[arg(long = "backup-dir", global = true)]
    pub backup_dir: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Hide progress messages
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Settings given on the command line; unset flags stay `None`.
    pub fn settings_overrides(&self) -> Settings {
        Settings {
            daemon_url: self.daemon_url.clone(),
            request_timeout_secs: self.timeout_secs,
            daemon_executable: self.daemon_executable.clone(),
            build_backend: self.build_backend,
            backup_dir: self.backup_dir.clone(),
        }
    }
}
