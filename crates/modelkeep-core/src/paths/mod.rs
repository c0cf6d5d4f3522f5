//! Path utilities for modelkeep's local state.
//!
//! The only durable state is the backup directory. Resolution is pure apart
//! from reading the environment; directory creation is explicit.

mod backups;
mod error;

pub use backups::{
    DEFAULT_BACKUP_DIR_NAME, backup_dir, backup_file_name, ensure_backup_dir,
    model_name_from_backup_file, resolve_backup_dir,
};
pub use error::PathError;
