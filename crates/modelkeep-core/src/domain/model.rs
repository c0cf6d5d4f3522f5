//! Catalog entries as reported by the daemon.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ModelDefinition;

/// Tag the daemon appends to untagged names.
pub const DEFAULT_TAG: &str = "latest";

/// Names accepted for newly created models.
static MODEL_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("model name pattern is valid"));

/// Names as they appear in the catalog (`name` or `name:tag`).
static CATALOG_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._-]+(:[A-Za-z0-9._-]+)?$").expect("catalog name pattern is valid")
});

/// Leftover of the replace protocol: `<name>_temp_<unix seconds>[:tag]`.
static TEMPORARY_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"_temp_[0-9]+(:[A-Za-z0-9._-]+)?$").expect("temporary name pattern is valid")
});

/// Returns true if `name` is acceptable for a brand-new model.
pub fn is_valid_model_name(name: &str) -> bool {
    MODEL_NAME.is_match(name)
}

/// Returns true if `name` has the shape of an existing catalog entry.
pub fn is_valid_catalog_name(name: &str) -> bool {
    CATALOG_NAME.is_match(name)
}

/// Name used to stage a replacement build for `name`.
///
/// A `:tag` suffix is folded into the stem, since the daemon only accepts
/// one tag per name.
pub fn temporary_name(name: &str, unix_seconds: i64) -> String {
    format!("{}_temp_{unix_seconds}", name.replace(':', "_"))
}

/// A model listed in the daemon's catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    /// Unique catalog key (e.g. `llama2:latest`).
    pub name: String,
    /// Size of the model blobs in bytes.
    pub size_bytes: u64,
    /// Last modification reported by the daemon.
    pub modified_at: Option<DateTime<Utc>>,
    /// Remaining attributes of the listing entry (digest, details, ...).
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl ModelSummary {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size_bytes: 0,
            modified_at: None,
            attributes: Map::new(),
        }
    }

    /// True if this entry is what the daemon calls `name`.
    ///
    /// An untagged `name` also matches `name:latest`.
    pub fn matches_name(&self, name: &str) -> bool {
        if self.name == name {
            return true;
        }
        !name.contains(':')
            && self
                .name
                .strip_prefix(name)
                .and_then(|rest| rest.strip_prefix(':'))
                .is_some_and(|tag| tag == DEFAULT_TAG)
    }

    /// True if this entry looks like a temporary model left behind by an
    /// interrupted replace.
    pub fn is_temporary(&self) -> bool {
        TEMPORARY_NAME.is_match(&self.name)
    }

    /// Size formatted for listings (e.g. `3.8 GB`).
    #[allow(clippy::cast_precision_loss)]
    pub fn display_size(&self) -> String {
        const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
        let mut size = self.size_bytes as f64;
        let mut unit = 0;
        while size >= 1024.0 && unit < UNITS.len() - 1 {
            size /= 1024.0;
            unit += 1;
        }
        if unit == 0 {
            format!("{} B", self.size_bytes)
        } else {
            format!("{size:.1} {}", UNITS[unit])
        }
    }
}

/// True if any entry of `models` is the model called `name`.
pub fn catalog_contains(models: &[ModelSummary], name: &str) -> bool {
    models.iter().any(|m| m.matches_name(name))
}

/// Full information about one model, fetched on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Name the information was requested for.
    pub name: String,
    /// Listing entry, when the catalog was consulted as well.
    pub summary: Option<ModelSummary>,
    /// The model's definition document.
    pub definition: ModelDefinition,
    /// Extended attributes (parameters, template, details, ...).
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_name_patterns() {
        assert!(is_valid_model_name("my-model_v1.2"));
        assert!(!is_valid_model_name("bad name!"));
        assert!(!is_valid_model_name("llama2:latest"));
        assert!(!is_valid_model_name(""));

        assert!(is_valid_catalog_name("llama2:latest"));
        assert!(is_valid_catalog_name("llama2"));
        assert!(!is_valid_catalog_name("user/llama2"));
    }

    #[test]
    fn test_matches_name_with_default_tag() {
        let entry = ModelSummary::new("llama2:latest");
        assert!(entry.matches_name("llama2"));
        assert!(entry.matches_name("llama2:latest"));
        assert!(!entry.matches_name("llama"));
        assert!(!entry.matches_name("llama2:7b"));

        let tagged = ModelSummary::new("llama2:7b");
        assert!(!tagged.matches_name("llama2"));
    }

    #[test]
    fn test_temporary_name_roundtrip() {
        let temp = temporary_name("foo", 1_700_000_000);
        assert_eq!(temp, "foo_temp_1700000000");
        assert!(ModelSummary::new(format!("{temp}:latest")).is_temporary());
        assert!(ModelSummary::new(temporary_name("foo:7b", 12)).is_temporary());
        assert!(!ModelSummary::new("foo:latest").is_temporary());
        assert!(!ModelSummary::new("temp_model").is_temporary());
    }

    #[test]
    fn test_display_size() {
        let mut entry = ModelSummary::new("x");
        entry.size_bytes = 512;
        assert_eq!(entry.display_size(), "512 B");
        entry.size_bytes = 3_825_819_519;
        assert_eq!(entry.display_size(), "3.6 GB");
    }

    #[test]
    fn test_catalog_contains() {
        let models = vec![ModelSummary::new("a:latest"), ModelSummary::new("b:7b")];
        assert!(catalog_contains(&models, "a"));
        assert!(catalog_contains(&models, "b:7b"));
        assert!(!catalog_contains(&models, "b"));
    }
}
