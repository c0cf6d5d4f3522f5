//! Wire types of the daemon API and their conversion to domain types.

use chrono::{DateTime, Utc};
use modelkeep_core::{ModelDefinition, ModelInfo, ModelSummary};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `GET /api/tags`
#[derive(Debug, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<TagEntry>,
}

/// One catalog entry of `/api/tags`.
#[derive(Debug, Deserialize)]
pub struct TagEntry {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<TagEntry> for ModelSummary {
    fn from(entry: TagEntry) -> Self {
        Self {
            name: entry.name,
            size_bytes: entry.size,
            modified_at: entry.modified_at.as_deref().and_then(parse_timestamp),
            attributes: entry.extra,
        }
    }
}

/// `POST /api/show`
#[derive(Debug, Deserialize)]
pub struct ShowResponse {
    #[serde(default)]
    pub modelfile: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ShowResponse {
    pub fn into_info(self, name: &str) -> ModelInfo {
        ModelInfo {
            name: name.to_string(),
            summary: None,
            definition: ModelDefinition::from_daemon_text(&self.modelfile),
            attributes: self.extra,
        }
    }
}

/// Body naming one model. Older daemons read `name`, newer ones `model`.
#[derive(Debug, Serialize)]
pub struct ModelRequest<'a> {
    pub model: &'a str,
    pub name: &'a str,
}

impl<'a> ModelRequest<'a> {
    pub const fn new(name: &'a str) -> Self {
        Self { model: name, name }
    }
}

/// `POST /api/create`
#[derive(Debug, Serialize)]
pub struct CreateRequest<'a> {
    pub model: &'a str,
    pub name: &'a str,
    pub modelfile: String,
    pub stream: bool,
}

/// `POST /api/copy`
#[derive(Debug, Serialize)]
pub struct CopyRequest<'a> {
    pub source: &'a str,
    pub destination: &'a str,
}

/// `POST /api/pull`
#[derive(Debug, Serialize)]
pub struct PullRequest<'a> {
    pub model: &'a str,
    pub name: &'a str,
    pub stream: bool,
}

/// One line of the `/api/pull` progress stream.
#[derive(Debug, Default, Deserialize)]
pub struct PullStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub completed: Option<u64>,
}

impl PullStatus {
    /// Status text with a percentage while a layer downloads, e.g.
    /// `pulling 8934d96d3f08: 42%`.
    pub fn message(&self) -> Option<String> {
        let status = self.status.as_deref()?;
        match (self.completed, self.total) {
            (Some(done), Some(total)) if total > 0 => {
                Some(format!("{status}: {}%", done.min(total) * 100 / total))
            }
            _ => Some(status.to_string()),
        }
    }
}

/// Timestamps are RFC 3339 with nanoseconds and a local offset.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tag_entry_conversion() {
        let raw = json!({
            "name": "llama2:latest",
            "model": "llama2:latest",
            "modified_at": "2024-05-01T10:00:00.123456789-07:00",
            "size": 3_825_819_519_u64,
            "digest": "sha256:abc",
            "details": {"family": "llama"}
        });
        let entry: TagEntry = serde_json::from_value(raw).unwrap();
        let summary = ModelSummary::from(entry);

        assert_eq!(summary.name, "llama2:latest");
        assert_eq!(summary.size_bytes, 3_825_819_519);
        assert_eq!(
            summary.modified_at.unwrap().to_rfc3339(),
            "2024-05-01T17:00:00.123456789+00:00"
        );
        assert_eq!(summary.attributes["digest"], "sha256:abc");
        assert!(!summary.attributes.contains_key("name"));
    }

    #[test]
    fn test_bad_timestamp_is_dropped() {
        let entry: TagEntry =
            serde_json::from_value(json!({"name": "x", "modified_at": "yesterday"})).unwrap();
        assert!(ModelSummary::from(entry).modified_at.is_none());
    }

    #[test]
    fn test_show_translates_base_keyword() {
        let raw = json!({
            "modelfile": "# generated\nFROM llama2:latest\nPARAMETER top_k 40\n",
            "parameters": "top_k 40",
            "template": "{{ .Prompt }}"
        });
        let show: ShowResponse = serde_json::from_value(raw).unwrap();
        let info = show.into_info("foo");

        assert_eq!(info.definition.base(), Some("llama2:latest"));
        assert_eq!(info.attributes["template"], "{{ .Prompt }}");
        assert!(!info.attributes.contains_key("modelfile"));
    }
}
