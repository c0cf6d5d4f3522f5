//! User input for interactive prompts and definition files.

use std::io::{self, BufRead, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use modelkeep_core::{BaseModelProvider, ModelManager};

/// Prompts the user for a string input, trimmed.
pub fn prompt_string(prompt: &str) -> Result<String> {
    print!("{prompt}: ");
    io::stdout().flush().context("Failed to flush prompt")?;

    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("Failed to read user input")?;
    Ok(input.trim().to_string())
}

/// Prompts the user for a yes/no confirmation. Empty input means no.
pub fn prompt_confirmation(prompt: &str) -> Result<bool> {
    loop {
        let input = prompt_string(&format!("{prompt} (y/N)"))?;
        match parse_confirmation(&input) {
            Some(answer) => return Ok(answer),
            None => eprintln!("Please enter 'y' for yes or 'n' for no."),
        }
    }
}

fn parse_confirmation(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" | "" => Some(false),
        _ => None,
    }
}

/// Definition text from `path`, or from stdin when `path` is `-`.
pub fn read_definition(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read definition from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read definition file {}", path.display()))
}

/// Selection by 1-based number or by exact name. `None` for empty or
/// unrecognised input.
pub fn parse_choice(input: &str, candidates: &[String]) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(index) = input.parse::<usize>() {
        return index
            .checked_sub(1)
            .and_then(|i| candidates.get(i))
            .cloned();
    }
    candidates.iter().find(|c| c.as_str() == input).cloned()
}

/// Offers the catalog's models as base candidates and asks on the terminal.
pub struct CatalogBaseProvider<'a> {
    manager: &'a ModelManager,
}

impl<'a> CatalogBaseProvider<'a> {
    pub const fn new(manager: &'a ModelManager) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl BaseModelProvider for CatalogBaseProvider<'_> {
    async fn available_models(&self) -> Option<Vec<String>> {
        let models = self.manager.list_models().await.ok()?;
        Some(
            models
                .into_iter()
                .filter(|m| !m.is_temporary())
                .map(|m| m.name)
                .collect(),
        )
    }

    async fn choose(&self, candidates: &[String]) -> Option<String> {
        eprintln!("The definition has no valid BASE line. Choose a base model:");
        for (i, name) in candidates.iter().enumerate() {
            eprintln!("  {}. {name}", i + 1);
        }
        choose_from(&mut io::stdin().lock(), candidates)
    }
}

/// Read selections from `reader` until one matches or input ends.
fn choose_from(reader: &mut impl BufRead, candidates: &[String]) -> Option<String> {
    loop {
        eprint!("Number or name (empty to cancel): ");
        let mut line = String::new();
        if reader.read_line(&mut line).ok()? == 0 || line.trim().is_empty() {
            return None;
        }
        if let Some(choice) = parse_choice(&line, candidates) {
            return Some(choice);
        }
        eprintln!("'{}' is not one of the listed models.", line.trim());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn candidates() -> Vec<String> {
        vec!["llama2:latest".into(), "mistral:7b".into()]
    }

    #[test]
    fn test_parse_choice_by_number_and_name() {
        assert_eq!(parse_choice("2", &candidates()).as_deref(), Some("mistral:7b"));
        assert_eq!(
            parse_choice(" llama2:latest ", &candidates()).as_deref(),
            Some("llama2:latest")
        );
        assert_eq!(parse_choice("0", &candidates()), None);
        assert_eq!(parse_choice("3", &candidates()), None);
        assert_eq!(parse_choice("", &candidates()), None);
    }

    #[test]
    fn test_choose_retries_until_valid() {
        let mut input = Cursor::new("gemma\n1\n");
        assert_eq!(
            choose_from(&mut input, &candidates()).as_deref(),
            Some("llama2:latest")
        );
    }

    #[test]
    fn test_choose_cancelled_by_empty_line_or_eof() {
        assert_eq!(choose_from(&mut Cursor::new("\n"), &candidates()), None);
        assert_eq!(choose_from(&mut Cursor::new(""), &candidates()), None);
    }

    #[test]
    fn test_confirmation_answers() {
        assert_eq!(parse_confirmation("YES"), Some(true));
        assert_eq!(parse_confirmation(""), Some(false));
        assert_eq!(parse_confirmation("maybe"), None);
    }

    #[test]
    fn test_read_definition_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("def.modelfile");
        std::fs::write(&path, "BASE llama2\n").unwrap();
        assert_eq!(read_definition(&path).unwrap(), "BASE llama2\n");
        assert!(read_definition(&dir.path().join("missing")).is_err());
    }
}
