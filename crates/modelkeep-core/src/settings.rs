//! Settings domain types and validation.
//!
//! Pure data with an environment overlay. Front ends layer their own flags
//! on top.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Address the daemon listens on by default.
pub const DEFAULT_DAEMON_URL: &str = "http://localhost:11434";

/// Default timeout for catalog calls, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 3;

pub const ENV_DAEMON_URL: &str = "MODELKEEP_DAEMON_URL";
pub const ENV_DAEMON_HOST_FALLBACK: &str = "OLLAMA_HOST";
pub const ENV_TIMEOUT_SECS: &str = "MODELKEEP_TIMEOUT_SECS";
pub const ENV_DAEMON_EXE: &str = "MODELKEEP_DAEMON_EXE";
pub const ENV_BUILD_BACKEND: &str = "MODELKEEP_BUILD_BACKEND";
pub const ENV_BACKUP_DIR: &str = "MODELKEEP_BACKUP_DIR";

/// How model definitions are submitted for building.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildBackend {
    /// The daemon executable's `create` and `cp` subcommands.
    #[default]
    Cli,
    /// The daemon's HTTP create and copy endpoints.
    Http,
}

impl FromStr for BuildBackend {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cli" => Ok(Self::Cli),
            "http" => Ok(Self::Http),
            other => Err(SettingsError::InvalidBuildBackend(other.to_string())),
        }
    }
}

impl fmt::Display for BuildBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cli => "cli",
            Self::Http => "http",
        })
    }
}

/// Application settings.
///
/// All fields are optional; `effective_*` accessors supply defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the daemon's HTTP API.
    pub daemon_url: Option<String>,

    /// Timeout for catalog calls.
    pub request_timeout_secs: Option<u64>,

    /// Explicit daemon executable, skipping lookup.
    pub daemon_executable: Option<PathBuf>,

    pub build_backend: Option<BuildBackend>,

    /// Directory for durable backups.
    pub backup_dir: Option<PathBuf>,
}

impl Settings {
    /// Settings from the process environment.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Settings from an arbitrary variable lookup. Empty values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let daemon_url = get(ENV_DAEMON_URL)
            .or_else(|| get(ENV_DAEMON_HOST_FALLBACK))
            .map(|url| normalize_url(&url));

        let request_timeout_secs = get(ENV_TIMEOUT_SECS)
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| SettingsError::InvalidTimeout(raw.clone()))
            })
            .transpose()?;

        let build_backend = get(ENV_BUILD_BACKEND)
            .map(|raw| raw.parse::<BuildBackend>())
            .transpose()?;

        let settings = Self {
            daemon_url,
            request_timeout_secs,
            daemon_executable: get(ENV_DAEMON_EXE).map(PathBuf::from),
            build_backend,
            backup_dir: get(ENV_BACKUP_DIR).map(PathBuf::from),
        };
        validate_settings(&settings)?;
        Ok(settings)
    }

    pub fn effective_daemon_url(&self) -> &str {
        self.daemon_url.as_deref().unwrap_or(DEFAULT_DAEMON_URL)
    }

    pub fn effective_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn effective_build_backend(&self) -> BuildBackend {
        self.build_backend.unwrap_or_default()
    }

    /// Overlay every field that `other` sets.
    pub fn merge(&mut self, other: Self) {
        if other.daemon_url.is_some() {
            self.daemon_url = other.daemon_url;
        }
        if other.request_timeout_secs.is_some() {
            self.request_timeout_secs = other.request_timeout_secs;
        }
        if other.daemon_executable.is_some() {
            self.daemon_executable = other.daemon_executable;
        }
        if other.build_backend.is_some() {
            self.build_backend = other.build_backend;
        }
        if other.backup_dir.is_some() {
            self.backup_dir = other.backup_dir;
        }
    }
}

/// `OLLAMA_HOST`-style values may omit the scheme.
fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

/// Settings validation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("Timeout must be a whole number of seconds between 1 and 600, got '{0}'")]
    InvalidTimeout(String),

    #[error("Unknown build backend '{0}' (expected 'cli' or 'http')")]
    InvalidBuildBackend(String),

    #[error("Daemon URL must start with http:// or https://, got '{0}'")]
    InvalidDaemonUrl(String),
}

/// Check value ranges.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    if let Some(secs) = settings.request_timeout_secs {
        if !(1..=600).contains(&secs) {
            return Err(SettingsError::InvalidTimeout(secs.to_string()));
        }
    }
    if let Some(url) = &settings.daemon_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(SettingsError::InvalidDaemonUrl(url.clone()));
        }
    }
    Ok(())
}
