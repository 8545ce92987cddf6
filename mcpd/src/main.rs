use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use mcpd::cli::{Cli, Commands};
use mcpd::handlers::{self, CommandContext};
use mcpd::logging::init_tracing;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // The daemon's log file should say something even without -v
    let verbose = match cli.command {
        Commands::Daemon { .. } => cli.verbose.max(1),
        _ => cli.verbose,
    };
    if let Err(e) = init_tracing(verbose) {
        eprintln!("Warning: failed to initialize logging: {:#}", e);
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let ctx = CommandContext::from_cli(&cli)?;

    match cli.command {
        Commands::Start { session } => handlers::run_start(&ctx, session).await,
        Commands::Stop { session } => handlers::run_stop(&ctx, session),
        Commands::Status { session, format } => handlers::run_status(&ctx, session, format).await,
        Commands::Tools { session, format } => handlers::run_tools(&ctx, session, format).await,
        Commands::Call {
            tool,
            args,
            session,
            output_dir,
            format,
        } => handlers::run_call(&ctx, &tool, &args, session, output_dir, format).await,
        Commands::Sessions { format } => handlers::run_sessions(&ctx, format),
        Commands::Logs { session, lines } => handlers::run_logs(&ctx, session, lines).await,
        Commands::Daemon { session, port } => handlers::run_daemon(&ctx, session, port).await,
    }
}
