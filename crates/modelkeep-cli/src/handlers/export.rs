//! Export command handler.

use std::path::Path;

use crate::bootstrap::CliContext;
use crate::error::CliError;

pub async fn execute(ctx: &CliContext, name: &str, path: &Path) -> Result<(), CliError> {
    ctx.manager().export_definition(name, path).await?;
    println!("✅ Wrote the definition of '{name}' to {}", path.display());
    Ok(())
}
