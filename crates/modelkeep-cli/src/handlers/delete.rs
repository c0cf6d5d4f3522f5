//! Delete command handler.

use super::follow;
use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::utils::input::prompt_confirmation;

pub async fn execute(ctx: &CliContext, name: &str, force: bool) -> Result<(), CliError> {
    if !force && !prompt_confirmation(&format!("Delete model '{name}'?"))? {
        println!("Deletion cancelled.");
        return Ok(());
    }

    let handle = ctx.manager().delete_model(name)?;
    follow(handle).await?;
    println!("✅ Deleted '{name}'");
    Ok(())
}
