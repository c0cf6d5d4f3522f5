//! Pull command handler.

use crate::bootstrap::CliContext;
use crate::error::CliError;

/// Download `name`; progress lines arrive through the console emitter.
pub async fn execute(ctx: &CliContext, name: &str) -> Result<(), CliError> {
    ctx.manager().pull_model(name).await?;
    println!("✅ Pulled '{name}'");
    Ok(())
}
