//! Tools command handlers
//!
//! List available tools and call tools through a running session.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};

use crate::cli::OutputFormat;
use crate::content::{self, ToolCallResult};
use crate::daemon::DaemonClient;

use super::CommandContext;

/// Client for a live session. Fails before any HTTP when none is registered.
fn live_client(ctx: &CommandContext, name: &str) -> Result<DaemonClient> {
    match ctx.registry().get_live(name)? {
        Some(session) => Ok(DaemonClient::new(session.port)),
        None => bail!(
            "Session '{}' is not running. Start it with `mcpd start {}`.",
            name,
            name
        ),
    }
}

/// Handle the `tools` command - list the tools of the session's server
pub async fn run_tools(
    ctx: &CommandContext,
    session: Option<String>,
    format: OutputFormat,
) -> Result<ExitCode> {
    let name = ctx.session_name(session);
    let client = live_client(ctx, &name)?;
    let response = client
        .tools()
        .await
        .with_context(|| format!("Failed to list tools of session '{}'", name))?;

    if format.is_json() {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(ExitCode::SUCCESS);
    }

    if response.tools.is_empty() {
        println!("No tools found.");
        return Ok(ExitCode::SUCCESS);
    }

    println!("=== {} ({} tools) ===", name, response.tools.len());
    for tool in &response.tools {
        let desc = tool
            .description
            .as_deref()
            .unwrap_or("No description")
            .lines()
            .next()
            .unwrap_or("");
        println!("  {} - {}", tool.name, desc);
    }

    Ok(ExitCode::SUCCESS)
}

/// Handle the `call` command - invoke a tool through the session's daemon
pub async fn run_call(
    ctx: &CommandContext,
    tool: &str,
    args: &[String],
    session: Option<String>,
    output_dir: Option<PathBuf>,
    format: OutputFormat,
) -> Result<ExitCode> {
    let arguments = parse_key_values(args)?;
    let name = ctx.session_name(session);
    let client = live_client(ctx, &name)?;

    tracing::debug!("Calling '{}' on session '{}' with {:?}", tool, name, arguments);
    let raw = client
        .call(tool, arguments)
        .await
        .with_context(|| format!("Failed to call '{}' on session '{}'", tool, name))?;

    if format.is_json() {
        println!("{}", serde_json::to_string_pretty(&raw)?);
        let is_error = raw.get("isError").and_then(Value::as_bool).unwrap_or(false);
        return Ok(if is_error {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        });
    }

    let result: ToolCallResult =
        serde_json::from_value(raw).context("Daemon returned a malformed tool result")?;
    let output_dir = ctx.output_dir(&name, output_dir);
    let rendered = content::format_result(&result, &output_dir)?;

    if result.is_error() {
        eprintln!("{}", rendered);
        Ok(ExitCode::FAILURE)
    } else {
        println!("{}", rendered);
        Ok(ExitCode::SUCCESS)
    }
}

/// Turn `key=value` tokens into tool arguments. Values are JSON when they parse as
/// JSON and plain strings otherwise.
pub fn parse_key_values(tokens: &[String]) -> Result<Map<String, Value>> {
    let mut arguments = Map::new();
    for token in tokens {
        let Some((key, value)) = token.split_once('=') else {
            bail!("Invalid argument '{}': expected key=value", token);
        };
        if key.is_empty() {
            bail!("Invalid argument '{}': empty key", token);
        }
        let value = serde_json::from_str::<Value>(value)
            .unwrap_or_else(|_| Value::String(value.to_string()));
        arguments.insert(key.to_string(), value);
    }
    Ok(arguments)
}
