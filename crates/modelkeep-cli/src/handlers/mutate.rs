//! Create, clone, save and restore handlers.
//!
//! All four end in the same create-or-replace operation; they differ in
//! where the definition comes from and which intent it is submitted with.

use std::path::Path;

use modelkeep_core::{MutationOutcome, OperationIntent};

use super::follow;
use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::utils::input::{CatalogBaseProvider, read_definition};

pub async fn create(ctx: &CliContext, name: &str, file: &Path) -> Result<(), CliError> {
    let definition = read_definition(file)?;
    submit(ctx, name, &definition, OperationIntent::Create).await
}

/// Clone `source` into `name`, using `file` as the edited definition when
/// given.
pub async fn clone(
    ctx: &CliContext,
    source: &str,
    name: &str,
    file: Option<&Path>,
) -> Result<(), CliError> {
    if source == name {
        return Err(CliError::Arguments(format!(
            "'{name}' already holds this definition; choose a new name for the clone"
        )));
    }
    let definition = match file {
        Some(path) => read_definition(path)?,
        None => ctx.manager().clone_definition(source).await?,
    };
    submit(ctx, name, &definition, OperationIntent::Clone).await
}

pub async fn save(ctx: &CliContext, name: &str, file: &Path) -> Result<(), CliError> {
    let definition = read_definition(file)?;
    submit(ctx, name, &definition, OperationIntent::Save).await
}

pub async fn restore(ctx: &CliContext, name: &str) -> Result<(), CliError> {
    let handle = ctx.manager().restore_model(name).await?;
    let outcome = follow(handle).await?;
    println!("✅ Restored '{}' from its backup", outcome.name);
    report_leftover(&outcome);
    Ok(())
}

async fn submit(
    ctx: &CliContext,
    name: &str,
    definition: &str,
    intent: OperationIntent,
) -> Result<(), CliError> {
    let provider = CatalogBaseProvider::new(ctx.manager());
    let handle = ctx
        .manager()
        .submit_definition(name, definition, intent, &provider)
        .await?;
    let outcome = follow(handle).await?;
    println!("{}", summary(intent, &outcome));
    if let Some(backup) = &outcome.backup {
        println!(
            "   Previous definition backed up to {}",
            backup.location.display()
        );
    }
    report_leftover(&outcome);
    Ok(())
}

fn summary(intent: OperationIntent, outcome: &MutationOutcome) -> String {
    let verb = match (intent, outcome.replaced) {
        (OperationIntent::Clone, false) => "Cloned",
        (OperationIntent::Save, _) | (_, true) => "Updated",
        _ => "Created",
    };
    format!("✅ {verb} '{}'", outcome.name)
}

fn report_leftover(outcome: &MutationOutcome) {
    if let Some(temp) = &outcome.leaked_temp {
        eprintln!("⚠ Temporary model '{temp}' could not be removed. Delete it with 'modelkeep delete {temp}'.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(replaced: bool) -> MutationOutcome {
        MutationOutcome {
            name: "foo".to_string(),
            replaced,
            backup: None,
            leaked_temp: None,
        }
    }

    #[test]
    fn test_summary_verbs() {
        assert_eq!(summary(OperationIntent::Create, &outcome(false)), "✅ Created 'foo'");
        assert_eq!(summary(OperationIntent::Clone, &outcome(false)), "✅ Cloned 'foo'");
        assert_eq!(summary(OperationIntent::Create, &outcome(true)), "✅ Updated 'foo'");
        assert_eq!(summary(OperationIntent::Save, &outcome(true)), "✅ Updated 'foo'");
    }
}
