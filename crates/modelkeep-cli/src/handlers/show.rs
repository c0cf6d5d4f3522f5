//! Show command handler.

use crate::bootstrap::CliContext;
use crate::error::CliError;

/// Print the definition; with `details`, also the daemon's attributes.
pub async fn execute(ctx: &CliContext, name: &str, details: bool) -> Result<(), CliError> {
    let info = ctx.manager().show_model(name).await?;
    println!("{}", info.definition);

    if details && !info.attributes.is_empty() {
        let json = serde_json::to_string_pretty(&info.attributes)
            .map_err(|e| CliError::Io(e.to_string()))?;
        eprintln!();
        eprintln!("{json}");
    }
    Ok(())
}
