//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core domain expects from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No `reqwest` or process types in any signature
//! - Expected failures (daemon down, model missing) are error values
//! - Firewall and executable lookup are synchronous; everything else is async

pub mod backup_repository;
pub mod base_model;
pub mod builder;
pub mod daemon;
pub mod event_emitter;
pub mod executable;
pub mod firewall;

pub use backup_repository::{BackupRepository, BackupStorageError};
pub use base_model::BaseModelProvider;
pub use builder::{BuildError, ModelBuilderPort};
pub use daemon::{DaemonClientPort, DaemonError};
pub use event_emitter::{AppEventEmitter, ChannelEmitter, NoopEmitter};
pub use executable::ExecutableLocatorPort;
pub use firewall::{FirewallError, FirewallPort};

#[cfg(test)]
pub use firewall::MockFirewallPort;
