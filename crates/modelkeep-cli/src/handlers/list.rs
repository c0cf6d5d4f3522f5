//! List command handler.

use modelkeep_core::ModelSummary;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::{format_modified, print_separator, truncate_string};

pub async fn execute(ctx: &CliContext) -> Result<(), CliError> {
    let models = ctx.manager().list_models().await?;

    if models.is_empty() {
        println!("The daemon has no models.");
        println!("Use 'modelkeep pull <name>' or 'modelkeep create <name> -f <file>' to add one.");
        return Ok(());
    }

    println!("{:<40} {:>10} {:<17}", "Name", "Size", "Modified");
    print_separator(69);
    for model in &models {
        println!("{}", format_row(model));
    }

    let leftovers = models.iter().filter(|m| m.is_temporary()).count();
    if leftovers > 0 {
        println!();
        println!(
            "⚠ {leftovers} leftover temporary model(s) marked with *. They were left by an \
             interrupted save and can be deleted."
        );
    }
    Ok(())
}

fn format_row(model: &ModelSummary) -> String {
    let marker = if model.is_temporary() { "*" } else { "" };
    format!(
        "{:<40} {:>10} {:<17}",
        truncate_string(&format!("{}{marker}", model.name), 40),
        model.display_size(),
        format_modified(model.modified_at)
    )
}
