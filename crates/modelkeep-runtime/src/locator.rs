//! Locating the daemon executable.
//!
//! Resolution order: configured override, `PATH` lookup, then the known
//! install locations for the platform.

use std::path::PathBuf;

use modelkeep_core::ExecutableLocatorPort;
use tracing::{debug, warn};

/// Program name looked up on `PATH`.
pub const DAEMON_PROGRAM: &str = "ollama";

/// Executable locator for the daemon.
#[derive(Debug, Clone)]
pub struct DaemonExecutableLocator {
    override_path: Option<PathBuf>,
    program: String,
    candidates: Vec<PathBuf>,
}

impl DaemonExecutableLocator {
    pub fn new(override_path: Option<PathBuf>) -> Self {
        Self {
            override_path,
            program: DAEMON_PROGRAM.to_string(),
            candidates: known_locations(),
        }
    }

    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    #[must_use]
    pub fn with_candidates(mut self, candidates: Vec<PathBuf>) -> Self {
        self.candidates = candidates;
        self
    }

    fn from_override(&self) -> Option<PathBuf> {
        let path = self.override_path.as_deref()?;
        if path.as_os_str().is_empty() {
            warn!("Configured daemon executable is empty, searching instead");
            return None;
        }
        if path.is_file() {
            debug!(path = %path.display(), "Using configured daemon executable");
            return Some(path.to_path_buf());
        }
        warn!(
            path = %path.display(),
            "Configured daemon executable does not exist, searching instead"
        );
        None
    }
}

impl Default for DaemonExecutableLocator {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ExecutableLocatorPort for DaemonExecutableLocator {
    fn locate(&self) -> Option<PathBuf> {
        if let Some(path) = self.from_override() {
            return Some(path);
        }
        if let Ok(path) = which::which(&self.program) {
            debug!(path = %path.display(), "Found daemon executable on PATH");
            return Some(path);
        }
        let found = self.candidates.iter().find(|p| p.is_file()).cloned();
        match &found {
            Some(path) => debug!(path = %path.display(), "Found daemon executable"),
            None => debug!(program = %self.program, "Daemon executable not found"),
        }
        found
    }
}

/// Default install locations of the daemon on this platform.
pub fn known_locations() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if cfg!(windows) {
        if let Some(local) = dirs::data_local_dir() {
            paths.push(local.join("Programs").join("Ollama").join("ollama.exe"));
        }
        paths.push(PathBuf::from(r"C:\Program Files\Ollama\ollama.exe"));
        paths.push(PathBuf::from(r"C:\Ollama\ollama.exe"));
    } else if cfg!(target_os = "macos") {
        paths.push(PathBuf::from("/Applications/Ollama.app/Contents/Resources/ollama"));
        paths.push(PathBuf::from("/usr/local/bin/ollama"));
        paths.push(PathBuf::from("/opt/homebrew/bin/ollama"));
    } else {
        paths.push(PathBuf::from("/usr/local/bin/ollama"));
        paths.push(PathBuf::from("/usr/bin/ollama"));
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".local").join("bin").join("ollama"));
        }
    }
    paths
}
