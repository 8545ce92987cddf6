//! Session lifecycle command handlers: start, stop, status, sessions, logs

use std::process::ExitCode;

use anyhow::{Context, Result};

use crate::cli::OutputFormat;
use crate::daemon::StatusResponse;
use crate::session::{SessionStatus, StartOutcome, StopOutcome};

use super::CommandContext;

/// Handle the `start` command
pub async fn run_start(ctx: &CommandContext, session: Option<String>) -> Result<ExitCode> {
    let name = ctx.session_name(session);
    let launch = ctx.launch()?;

    match ctx.supervisor().start(&name, &launch).await? {
        StartOutcome::AlreadyRunning(existing) => {
            println!(
                "Session '{}' is already running (pid {}, port {}).",
                name, existing.pid, existing.port
            );
        }
        StartOutcome::Started { session, status } => {
            println!("Started session '{}'.", name);
            println!("  PID: {}", session.pid);
            println!("  Port: {}", session.port);
            println!("  Log: {}", ctx.paths.log_file(&name).display());
            if !status.connected {
                eprintln!(
                    "Warning: daemon is up but not connected to '{}': {}",
                    status.server,
                    status.last_error.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Handle the `stop` command
pub fn run_stop(ctx: &CommandContext, session: Option<String>) -> Result<ExitCode> {
    let name = ctx.session_name(session);

    match ctx.supervisor().stop(&name)? {
        StopOutcome::NotRunning => println!("Session '{}' is not running.", name),
        StopOutcome::Stopped { session, .. } => {
            println!("Stopped session '{}' (pid {}).", name, session.pid)
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Handle the `status` command. Anything but a responsive daemon exits non-zero.
pub async fn run_status(
    ctx: &CommandContext,
    session: Option<String>,
    format: OutputFormat,
) -> Result<ExitCode> {
    let name = ctx.session_name(session);
    let status = ctx.supervisor().status(&name).await?;

    if format.is_json() {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        match &status {
            SessionStatus::NotRunning => println!("Session '{}': not running", name),
            SessionStatus::NotResponding { session, error } => {
                println!(
                    "Session '{}': not responding (pid {}, port {})",
                    name, session.pid, session.port
                );
                println!("  {}", error);
            }
            SessionStatus::Running { session, daemon } => {
                println!(
                    "Session '{}': running (pid {}, port {}, since {})",
                    name,
                    session.pid,
                    session.port,
                    session.started_at.format("%Y-%m-%d %H:%M:%S UTC")
                );
                println!("  {}", describe_connection(daemon));
            }
        }
    }

    Ok(match status {
        SessionStatus::Running { .. } => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

fn describe_connection(status: &StatusResponse) -> String {
    if status.connected {
        format!("Server: {} (connected)", status.server)
    } else {
        format!(
            "Server: {} (not connected: {})",
            status.server,
            status.last_error.as_deref().unwrap_or("unknown error")
        )
    }
}

/// Handle the `sessions` command
pub fn run_sessions(ctx: &CommandContext, format: OutputFormat) -> Result<ExitCode> {
    let entries = ctx.registry().list()?;

    if format.is_json() {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(ExitCode::SUCCESS);
    }

    if entries.is_empty() {
        println!("No sessions.");
        return Ok(ExitCode::SUCCESS);
    }

    println!("{:<20} {:>8} {:>6}  {:<8} STARTED", "NAME", "PID", "PORT", "STATE");
    for entry in &entries {
        println!(
            "{:<20} {:>8} {:>6}  {:<8} {}",
            entry.name,
            entry.session.pid,
            entry.session.port,
            if entry.alive { "alive" } else { "dead" },
            entry.session.started_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    Ok(ExitCode::SUCCESS)
}

/// Handle the `logs` command
pub async fn run_logs(
    ctx: &CommandContext,
    session: Option<String>,
    lines: usize,
) -> Result<ExitCode> {
    let name = ctx.session_name(session);
    let log_file = ctx.paths.log_file(&name);

    if !log_file.exists() {
        println!("No logs for session '{}'.", name);
        println!("Expected location: {}", log_file.display());
        return Ok(ExitCode::SUCCESS);
    }

    let content = tokio::fs::read_to_string(&log_file)
        .await
        .with_context(|| format!("Failed to read {}", log_file.display()))?;
    for line in tail(&content, lines) {
        println!("{}", line);
    }

    Ok(ExitCode::SUCCESS)
}

/// Last `lines` lines of `content` (0 = all)
fn tail(content: &str, lines: usize) -> Vec<&str> {
    let all: Vec<&str> = content.lines().collect();
    if lines == 0 {
        return all;
    }
    let start = all.len().saturating_sub(lines);
    all[start..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail() {
        let content = "a\nb\nc\n";
        assert_eq!(tail(content, 2), vec!["b", "c"]);
        assert_eq!(tail(content, 0), vec!["a", "b", "c"]);
        assert_eq!(tail(content, 10), vec!["a", "b", "c"]);
        assert!(tail("", 5).is_empty());
    }

    #[test]
    fn test_describe_connection() {
        let mut status = StatusResponse {
            connected: true,
            last_error: None,
            server: "echo-mcp".to_string(),
            session: "dev".to_string(),
        };
        assert_eq!(describe_connection(&status), "Server: echo-mcp (connected)");

        status.connected = false;
        status.last_error = Some("spawn failed".to_string());
        assert!(describe_connection(&status).contains("not connected: spawn failed"));
    }
}
