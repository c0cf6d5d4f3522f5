//! Model definition documents.
//!
//! A definition is a line-oriented text document the daemon builds a model
//! from. Each substantive line is a directive (`BASE`, `PARAMETER`, `SYSTEM`,
//! `TEMPLATE`, `ADAPTER`, ...); lines starting with `#` are comments.
//!
//! `ModelDefinition` keeps the original text verbatim. Directive parsing is
//! done on demand so that edits never reformat lines the user wrote.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Keyword of the mandatory base-model directive.
pub const BASE_KEYWORD: &str = "BASE";

/// Keyword the daemon uses for the base-model directive on the wire.
pub const DAEMON_BASE_KEYWORD: &str = "FROM";

/// Delimiter for arguments spanning several lines.
const MULTILINE_DELIMITER: &str = "\"\"\"";

/// Base-model reference: a catalog name with an optional `:tag`, no paths.
static BASE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._-]+(:[A-Za-z0-9._-]+)?$").expect("base reference pattern is valid")
});

/// Returns true if `reference` may appear as the argument of a `BASE` directive.
///
/// Local file paths (`./model.gguf`, `C:\models\x`) and namespaced references
/// are rejected.
pub fn is_valid_base_reference(reference: &str) -> bool {
    BASE_REFERENCE.is_match(reference)
}

/// Extract the argument of a `BASE` directive line.
///
/// Returns `None` if the line is not a `BASE` directive at all. A bare `BASE`
/// yields `Some("")`, which callers treat as an invalid reference.
pub fn base_argument(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix(BASE_KEYWORD)?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        // e.g. "BASEMODEL x" is some other keyword
        return None;
    }
    Some(rest.trim())
}

/// A single parsed directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Directive {
    /// `BASE <name[:tag]>`
    Base { reference: String },
    /// `PARAMETER <name> <value>`
    Parameter { name: String, value: String },
    /// `SYSTEM <text>`
    System { text: String },
    /// `TEMPLATE <text>`
    Template { text: String },
    /// `ADAPTER <path>`
    Adapter { path: String },
    /// Any other keyword (`LICENSE`, `MESSAGE`, ...), kept as-is.
    Other { keyword: String, argument: String },
}

impl Directive {
    fn from_parts(keyword: &str, argument: String) -> Self {
        match keyword.to_ascii_uppercase().as_str() {
            BASE_KEYWORD => Self::Base {
                reference: argument,
            },
            "PARAMETER" => {
                let (name, value) = argument
                    .split_once(char::is_whitespace)
                    .map_or((argument.as_str(), ""), |(n, v)| (n, v.trim()));
                Self::Parameter {
                    name: name.to_string(),
                    value: value.to_string(),
                }
            }
            "SYSTEM" => Self::System { text: argument },
            "TEMPLATE" => Self::Template { text: argument },
            "ADAPTER" => Self::Adapter { path: argument },
            _ => Self::Other {
                keyword: keyword.to_string(),
                argument,
            },
        }
    }
}

/// A textual model definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelDefinition {
    text: String,
}

impl ModelDefinition {
    /// Wrap definition text without altering it.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Starter document for a new model, with the directive cheat-sheet the
    /// editor shows.
    pub fn template(base: &str, system_prompt: &str) -> Self {
        Self::new(format!(
            "# Directives:\n\
             # BASE      - base model, e.g. llama2, mistral, gemma\n\
             # PARAMETER - model parameter, e.g. temperature, top_p\n\
             # SYSTEM    - system prompt defining the assistant's role\n\
             # TEMPLATE  - custom prompt template\n\
             # ADAPTER   - adapter file (LoRA fine-tunes)\n\
             \n\
             BASE {base}\n\
             \n\
             # Sampling randomness (0.0-1.0)\n\
             PARAMETER temperature 0.7\n\
             \n\
             # Nucleus sampling (0.0-1.0)\n\
             PARAMETER top_p 0.9\n\
             \n\
             # Stop sequence\n\
             # PARAMETER stop \"User:\"\n\
             \n\
             SYSTEM {system_prompt}\n"
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// True if the document has no characters other than whitespace.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// The first line that is neither blank nor a comment, trimmed.
    pub fn first_substantive_line(&self) -> Option<&str> {
        self.text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with('#'))
    }

    /// The base-model reference, if the first substantive line is a `BASE`
    /// directive. The reference is returned even if it is malformed.
    pub fn base(&self) -> Option<&str> {
        self.first_substantive_line().and_then(base_argument)
    }

    /// Rebuild the document around a new base model.
    ///
    /// The result starts with `BASE <reference>` followed by every original
    /// line except `BASE` directives, in their original order. Lines inside
    /// `"""` blocks are argument text and are always kept.
    #[must_use]
    pub fn with_base(&self, reference: &str) -> Self {
        let text = normalize_text(&self.text);
        let mut lines = vec![format!("{BASE_KEYWORD} {reference}")];
        lines.extend(
            tagged_lines(&text)
                .filter(|(line, in_block)| *in_block || base_argument(line).is_none())
                .map(|(line, _)| line.to_string()),
        );
        Self::new(lines.join("\n"))
    }

    /// Text as the daemon expects it, with `BASE` spelled `FROM`.
    pub fn to_daemon_text(&self) -> String {
        rewrite_keyword(&normalize_text(&self.text), |line| {
            base_argument(line).map(|arg| format!("{DAEMON_BASE_KEYWORD} {arg}"))
        })
    }

    /// Definition from daemon text, with `FROM` spelled `BASE`.
    pub fn from_daemon_text(text: &str) -> Self {
        Self::new(rewrite_keyword(text, |line| {
            let (keyword, rest) = line
                .trim()
                .split_once(char::is_whitespace)
                .unwrap_or((line.trim(), ""));
            keyword
                .eq_ignore_ascii_case(DAEMON_BASE_KEYWORD)
                .then(|| format!("{BASE_KEYWORD} {}", rest.trim()))
        }))
    }

    /// Parse the directives of this document, ignoring comments and blanks.
    ///
    /// Arguments opened with `"""` continue until the closing delimiter.
    pub fn directives(&self) -> Vec<Directive> {
        let mut directives = Vec::new();
        let mut lines = self.text.lines();

        while let Some(raw) = lines.next() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (keyword, rest) = line
                .split_once(char::is_whitespace)
                .map_or((line, ""), |(k, r)| (k, r.trim()));

            let argument = match rest.strip_prefix(MULTILINE_DELIMITER) {
                Some(opened) => match opened.find(MULTILINE_DELIMITER) {
                    Some(end) => opened[..end].to_string(),
                    None => {
                        let mut block = vec![opened.to_string()];
                        for next in lines.by_ref() {
                            if let Some(end) = next.find(MULTILINE_DELIMITER) {
                                block.push(next[..end].to_string());
                                break;
                            }
                            block.push(next.to_string());
                        }
                        block.join("\n")
                    }
                },
                None => rest.to_string(),
            };

            directives.push(Directive::from_parts(keyword, argument));
        }

        directives
    }
}

/// Text with a leading byte-order mark removed and CRLF line endings
/// turned into LF.
pub fn normalize_text(text: &str) -> String {
    text.strip_prefix('\u{feff}')
        .unwrap_or(text)
        .replace("\r\n", "\n")
}

/// Lines of `text`, each paired with whether it sits inside a `"""` block.
///
/// The line that opens a block is outside it; the closing line is inside.
fn tagged_lines(text: &str) -> impl Iterator<Item = (&str, bool)> {
    let mut in_block = false;
    text.split('\n').map(move |line| {
        let inside = in_block;
        if line.matches(MULTILINE_DELIMITER).count() % 2 == 1 {
            in_block = !in_block;
        }
        (line, inside)
    })
}

/// Apply `rewrite` to every line outside `"""` blocks, keeping the rest.
fn rewrite_keyword(text: &str, rewrite: impl Fn(&str) -> Option<String>) -> String {
    tagged_lines(text)
        .map(|(line, in_block)| {
            let rewritten = if in_block { None } else { rewrite(line) };
            rewritten.unwrap_or_else(|| line.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl fmt::Display for ModelDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<String> for ModelDefinition {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&str> for ModelDefinition {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}
