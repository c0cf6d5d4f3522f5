//! Definition validation and base-directive repair.
//!
//! A definition is valid iff its first non-blank, non-comment line is a
//! `BASE` directive whose argument is a catalog reference (`name[:tag]`).
//! Repair replaces the base directive with a user-chosen model and keeps
//! every other line where it was.

use std::fmt;

use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{
    BASE_KEYWORD, ModelDefinition, NameRule, base_argument, is_valid_base_reference,
    is_valid_catalog_name, is_valid_model_name, normalize_text,
};
use crate::ports::BaseModelProvider;

/// Why a definition failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    /// Nothing but whitespace.
    Empty,
    /// The first substantive line is some other directive.
    MissingBase { first_line: String },
    /// The base directive's argument is not a catalog reference.
    InvalidBaseReference { reference: String },
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "the definition is empty"),
            Self::MissingBase { first_line } => write!(
                f,
                "the first directive must be '{BASE_KEYWORD} <model>', found '{first_line}'"
            ),
            Self::InvalidBaseReference { reference } if reference.is_empty() => {
                write!(f, "the {BASE_KEYWORD} directive names no model")
            }
            Self::InvalidBaseReference { reference } => write!(
                f,
                "'{reference}' is not a model name (use name or name:tag, not a file path)"
            ),
        }
    }
}

/// Validation failures, including a declined repair.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The definition is malformed and was not repaired.
    #[error("Invalid definition: {0}")]
    InvalidDefinition(InvalidReason),

    /// The model name does not satisfy the naming rule for its operation.
    #[error(
        "Invalid model name '{0}': only letters, digits, '.', '_' and '-' are allowed"
    )]
    InvalidModelName(String),

    /// The user was offered base models and declined to choose.
    #[error("Base model selection was cancelled")]
    Cancelled,

    /// No base models could be listed to repair the definition.
    #[error("No base models are available to repair the definition")]
    BaseModelsUnavailable,
}

/// Outcome of `DefinitionValidator::validate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub valid: bool,
    /// The text with line endings normalized to `\n` and any BOM removed.
    pub normalized_text: String,
    pub error_reason: Option<InvalidReason>,
}

/// Checks and repairs model definitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefinitionValidator;

impl DefinitionValidator {
    /// Check whether `text` is a valid definition.
    pub fn validate(text: &str) -> ValidationReport {
        let normalized_text = normalize_text(text);
        let error_reason = check(&ModelDefinition::new(normalized_text.as_str()));
        ValidationReport {
            valid: error_reason.is_none(),
            normalized_text,
            error_reason,
        }
    }

    /// Validate, returning the reason as an error.
    pub fn require_valid(text: &str) -> Result<(), ValidationError> {
        match Self::validate(text).error_reason {
            None => Ok(()),
            Some(reason) => Err(ValidationError::InvalidDefinition(reason)),
        }
    }

    /// Check `name` against the naming rule of an operation.
    pub fn check_name(name: &str, rule: NameRule) -> Result<(), ValidationError> {
        let ok = match rule {
            NameRule::New => is_valid_model_name(name),
            NameRule::Catalog => is_valid_catalog_name(name),
            NameRule::Trusted => !name.trim().is_empty(),
        };
        if ok {
            Ok(())
        } else {
            Err(ValidationError::InvalidModelName(name.to_string()))
        }
    }

    /// Return `text` normalized as by [`Self::validate`] if valid, otherwise
    /// rebuild it around a base model chosen through `provider`.
    ///
    /// Empty definitions cannot be repaired. If no base models can be listed
    /// or the user declines, the enclosing operation must be aborted.
    pub async fn ensure_valid_base(
        text: &str,
        provider: &dyn BaseModelProvider,
    ) -> Result<String, ValidationError> {
        let definition = ModelDefinition::new(normalize_text(text));
        let reason = match check(&definition) {
            None => return Ok(definition.into_string()),
            Some(InvalidReason::Empty) => {
                return Err(ValidationError::InvalidDefinition(InvalidReason::Empty));
            }
            Some(reason) => reason,
        };
        debug!(%reason, "Definition needs a base model");

        let candidates: Vec<String> = provider
            .available_models()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|name| is_valid_base_reference(name))
            .collect();
        if candidates.is_empty() {
            return Err(ValidationError::BaseModelsUnavailable);
        }

        let chosen = provider
            .choose(&candidates)
            .await
            .ok_or(ValidationError::Cancelled)?;
        if !is_valid_base_reference(&chosen) {
            return Err(ValidationError::InvalidDefinition(
                InvalidReason::InvalidBaseReference { reference: chosen },
            ));
        }

        info!(base = %chosen, "Rebuilt definition around chosen base model");
        Ok(definition.with_base(&chosen).into_string())
    }
}

fn check(definition: &ModelDefinition) -> Option<InvalidReason> {
    let Some(first_line) = definition.first_substantive_line() else {
        return Some(InvalidReason::Empty);
    };
    match base_argument(first_line) {
        None => Some(InvalidReason::MissingBase {
            first_line: first_line.to_string(),
        }),
        Some(reference) if !is_valid_base_reference(reference) => {
            Some(InvalidReason::InvalidBaseReference {
                reference: reference.to_string(),
            })
        }
        Some(_) => None,
    }
}
