#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]
// The default aliases are used through the core ports, not through their
// generic backend parameter.
#![allow(private_interfaces, private_bounds)]

mod builder;
mod client;
mod config;
mod error;
mod http;
mod models;
mod url;

// ============================================================================
// Public API
// ============================================================================

// Adapters
pub use builder::DefaultHttpModelBuilder;
pub use client::DefaultDaemonClient;

// Configuration
pub use config::DaemonClientConfig;

// Errors
pub use error::{HttpError, HttpResult};
