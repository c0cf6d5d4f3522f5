//! Public configuration for the daemon client.

use std::time::Duration;

use modelkeep_core::Settings;
use modelkeep_core::settings::DEFAULT_DAEMON_URL;

/// Configuration for the daemon client.
///
/// # Example
///
/// ```
/// use modelkeep_daemon::DaemonClientConfig;
/// use std::time::Duration;
///
/// let config = DaemonClientConfig::new()
///     .with_base_url("http://127.0.0.1:11434")
///     .with_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct DaemonClientConfig {
    /// Base URL of the daemon
    pub(crate) base_url: String,
    /// User agent string for HTTP requests
    pub(crate) user_agent: String,
    /// Timeout for catalog calls (list, show, delete)
    pub(crate) timeout: Duration,
    /// Timeout for builds and copies, which can take minutes
    pub(crate) build_timeout: Duration,
    /// Retries for idempotent calls on transient errors
    pub(crate) max_retries: u8,
    /// Base delay for exponential backoff
    pub(crate) retry_base_delay: Duration,
}

impl Default for DaemonClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DAEMON_URL.to_string(),
            user_agent: concat!("modelkeep/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(3),
            build_timeout: Duration::from_secs(30 * 60),
            max_retries: 1,
            retry_base_delay: Duration::from_millis(200),
        }
    }
}

impl DaemonClientConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Daemon URL and catalog timeout taken from settings.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new()
            .with_base_url(settings.effective_daemon_url())
            .with_timeout(settings.effective_timeout())
    }

    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Timeout for catalog calls. Defaults to 3 seconds.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Timeout for builds and copies. Defaults to 30 minutes.
    #[must_use]
    pub const fn with_build_timeout(mut self, timeout: Duration) -> Self {
        self.build_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_max_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }

    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }
}
