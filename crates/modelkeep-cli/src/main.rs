//! CLI entry point - the composition root.
//!
//! Settings are resolved and adapters wired through `bootstrap`; each command
//! is dispatched to its handler. Errors map to process exit codes.

use std::sync::Arc;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use modelkeep_cli::presentation::ConsoleEmitter;
use modelkeep_cli::{Cli, CliConfig, CliError, Commands, bootstrap, handlers};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err}");
        if err.is_urgent() {
            eprintln!();
            eprintln!("🚨 The model may be missing from the catalog.");
            eprintln!("   Run 'modelkeep restore <name>' to rebuild it from its backup.");
        }
        std::process::exit(err.exit_code());
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let Some(command) = cli.command.as_ref() else {
        // No command provided - show help
        Cli::command().print_help()?;
        return Ok(());
    };

    // Commands that need no daemon or settings
    if let Commands::Template { base, system } = command {
        handlers::template::execute(base, system);
        return Ok(());
    }

    let config = CliConfig::load(cli.settings_overrides())?;
    let ctx = bootstrap(config, Arc::new(ConsoleEmitter::new(cli.quiet)))?;

    match command {
        Commands::Check { start, wait } => handlers::check::execute(&ctx, *start, *wait).await,
        Commands::List => handlers::list::execute(&ctx).await,
        Commands::Show { name, details } => handlers::show::execute(&ctx, name, *details).await,
        Commands::Create { name, file } => handlers::mutate::create(&ctx, name, file).await,
        Commands::Clone { source, name, file } => {
            handlers::mutate::clone(&ctx, source, name, file.as_deref()).await
        }
        Commands::Save { name, file } => handlers::mutate::save(&ctx, name, file).await,
        Commands::Restore { name } => handlers::mutate::restore(&ctx, name).await,
        Commands::Backups => handlers::backups::execute(&ctx).await,
        Commands::Delete { name, force } => handlers::delete::execute(&ctx, name, *force).await,
        Commands::Pull { name } => handlers::pull::execute(&ctx, name).await,
        Commands::Export { name, path } => handlers::export::execute(&ctx, name, path).await,
        Commands::Isolation(sub) => handlers::isolation::execute(&ctx, *sub),
        Commands::Template { .. } => Ok(()),
    }
}
