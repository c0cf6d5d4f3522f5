#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

mod backup_repository;
mod cli_builder;
pub mod command;
mod firewall;
mod launcher;
mod locator;

pub use backup_repository::FsBackupRepository;
pub use cli_builder::CliModelBuilder;
pub use command::{CommandOutput, CommandRunner, SystemCommandRunner};
pub use firewall::{PowerShellFirewall, UnsupportedFirewall, platform_firewall};
pub use launcher::{DaemonLauncher, LaunchError};
pub use locator::{DAEMON_PROGRAM, DaemonExecutableLocator, known_locations};
