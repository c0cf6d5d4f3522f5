//! Backups command handler.

use crate::bootstrap::CliContext;
use crate::error::CliError;

pub async fn execute(ctx: &CliContext) -> Result<(), CliError> {
    let names = ctx.manager().list_backups().await?;
    if names.is_empty() {
        println!("No backups yet. One is taken each time a model is replaced.");
        return Ok(());
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}
