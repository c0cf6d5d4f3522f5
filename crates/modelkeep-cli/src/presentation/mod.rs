//! Terminal output helpers.

mod events;
mod tables;

pub use events::ConsoleEmitter;
pub use tables::{format_modified, print_separator, truncate_string};
