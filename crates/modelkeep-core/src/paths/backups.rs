//! Location and naming of durable backup files.

use std::fs;
use std::path::{Path, PathBuf};

use super::error::PathError;
use crate::settings::ENV_BACKUP_DIR;

/// Directory under the system temp dir used when no override is set.
pub const DEFAULT_BACKUP_DIR_NAME: &str = "modelkeep-backups";

const BACKUP_SUFFIX: &str = "_backup.modelfile";

/// Resolve the backup directory: `override_dir`, then `MODELKEEP_BACKUP_DIR`,
/// then `<temp>/modelkeep-backups`.
pub fn backup_dir(override_dir: Option<&Path>) -> Result<PathBuf, PathError> {
    let env_dir = std::env::var_os(ENV_BACKUP_DIR).map(PathBuf::from);
    resolve_backup_dir(override_dir, env_dir.as_deref())
}

/// Pure part of [`backup_dir`].
pub fn resolve_backup_dir(
    override_dir: Option<&Path>,
    env_dir: Option<&Path>,
) -> Result<PathBuf, PathError> {
    match override_dir.or(env_dir) {
        Some(dir) if dir.as_os_str().is_empty() => Err(PathError::EmptyPath),
        Some(dir) => Ok(dir.to_path_buf()),
        None => Ok(std::env::temp_dir().join(DEFAULT_BACKUP_DIR_NAME)),
    }
}

/// Create `dir` (and parents) if missing.
pub fn ensure_backup_dir(dir: &Path) -> Result<(), PathError> {
    if dir.exists() {
        if !dir.is_dir() {
            return Err(PathError::NotADirectory(dir.to_path_buf()));
        }
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|e| PathError::CreateFailed {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })
}

/// File name holding the backup of `model_name`.
///
/// Names are percent-encoded, so `llama2:latest` is stored as
/// `llama2%3Alatest_backup.modelfile`.
pub fn backup_file_name(model_name: &str) -> String {
    format!("{}{BACKUP_SUFFIX}", urlencoding::encode(model_name))
}

/// Inverse of [`backup_file_name`]. `None` for unrelated files.
pub fn model_name_from_backup_file(file_name: &str) -> Option<String> {
    let encoded = file_name.strip_suffix(BACKUP_SUFFIX)?;
    if encoded.is_empty() {
        return None;
    }
    urlencoding::decode(encoded).ok().map(|name| name.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_file_name_is_reversible() {
        let file = backup_file_name("llama2:latest");
        assert_eq!(file, "llama2%3Alatest_backup.modelfile");
        assert_eq!(
            model_name_from_backup_file(&file).as_deref(),
            Some("llama2:latest")
        );
    }

    #[test]
    fn test_unrelated_files_are_ignored() {
        assert_eq!(model_name_from_backup_file("notes.txt"), None);
        assert_eq!(model_name_from_backup_file("_backup.modelfile"), None);
    }

    #[test]
    fn test_resolution_order() {
        let explicit = Path::new("/explicit");
        let env = Path::new("/from-env");

        assert_eq!(
            resolve_backup_dir(Some(explicit), Some(env)).unwrap(),
            PathBuf::from("/explicit")
        );
        assert_eq!(
            resolve_backup_dir(None, Some(env)).unwrap(),
            PathBuf::from("/from-env")
        );
        assert!(
            resolve_backup_dir(None, None)
                .unwrap()
                .ends_with(DEFAULT_BACKUP_DIR_NAME)
        );
        assert!(matches!(
            resolve_backup_dir(Some(Path::new("")), None),
            Err(PathError::EmptyPath)
        ));
    }

    #[test]
    fn test_ensure_backup_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("a").join("b");
        ensure_backup_dir(&dir).unwrap();
        assert!(dir.is_dir());

        let file = tmp.path().join("file");
        fs::write(&file, "x").unwrap();
        assert!(matches!(
            ensure_backup_dir(&file),
            Err(PathError::NotADirectory(_))
        ));
    }
}
