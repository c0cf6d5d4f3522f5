//! Network isolation handlers.

use modelkeep_core::IsolationState;

use crate::bootstrap::CliContext;
use crate::commands::IsolationCommand;
use crate::error::CliError;

pub fn execute(ctx: &CliContext, command: IsolationCommand) -> Result<(), CliError> {
    let manager = ctx.manager();
    let state = match command {
        IsolationCommand::Status => manager.isolation_state()?,
        IsolationCommand::On => manager.enable_isolation()?,
        IsolationCommand::Off => manager.disable_isolation()?,
    };
    println!("{}", describe(state));
    Ok(())
}

fn describe(state: IsolationState) -> String {
    match state {
        IsolationState::On => "🔒 Isolation is on: the daemon cannot reach the network.".to_string(),
        IsolationState::Off => "🔓 Isolation is off.".to_string(),
        IsolationState::Inconsistent => {
            "⚠ Only one isolation rule exists, so the daemon is not blocked. \
             Run 'modelkeep isolation on' or 'modelkeep isolation off' to repair."
                .to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inconsistent_state_suggests_repair() {
        assert!(describe(IsolationState::Inconsistent).contains("isolation off"));
        assert!(describe(IsolationState::On).contains("on"));
    }
}
