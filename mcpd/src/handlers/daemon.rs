//! The hidden `daemon` command: the entry point of a spawned session daemon

use std::process::ExitCode;

use anyhow::Result;

use crate::daemon::{self, DaemonOptions};

use super::CommandContext;

/// Handle the `daemon` command. Runs in the foreground until SIGTERM.
pub async fn run_daemon(ctx: &CommandContext, session: String, port: u16) -> Result<ExitCode> {
    let (config_path, config) = ctx.load_config()?;
    let (server_name, entry) = config.select_server(ctx.server.as_deref())?;
    let transport = entry.transport(server_name)?;

    tracing::info!(
        "Using server '{}' from {} ({})",
        server_name,
        config_path.display(),
        transport
    );

    daemon::run(DaemonOptions {
        session,
        port,
        server_name: server_name.to_string(),
        transport,
    })
    .await?;

    Ok(ExitCode::SUCCESS)
}
