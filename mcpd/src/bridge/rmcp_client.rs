//! [`ProtocolBridge`] backed by the rmcp client SDK

use anyhow::{Context, Result};
use async_trait::async_trait;
use rmcp::{
    model::CallToolRequestParam,
    service::RunningService,
    transport::{StreamableHttpClientTransport, TokioChildProcess},
    RoleClient, ServiceExt,
};
use serde_json::{Map, Value};
use tokio::process::Command;

use super::{ProtocolBridge, ToolInfo, TransportSpec};

/// One live connection to an MCP server.
///
/// For stdio transports the child process is owned by the running service and goes
/// away with it, which in practice means when the daemon process exits.
pub struct RmcpBridge {
    service: RunningService<RoleClient, ()>,
}

impl RmcpBridge {
    /// Spawn or dial the server and complete the protocol handshake
    pub async fn connect(transport: &TransportSpec) -> Result<Self> {
        tracing::info!("Connecting to MCP server ({})", transport);

        let service = match transport {
            TransportSpec::Stdio { command, args, env } => {
                let mut cmd = Command::new(command);
                if !args.is_empty() {
                    cmd.args(args);
                }
                for (key, value) in env {
                    match shellexpand::env(value) {
                        Ok(expanded) => {
                            cmd.env(key, expanded.as_ref());
                        }
                        Err(e) => {
                            tracing::warn!("Passing env {} unexpanded: {}", key, e);
                            cmd.env(key, value);
                        }
                    }
                }

                let child = TokioChildProcess::new(cmd)
                    .with_context(|| format!("Failed to spawn MCP server: {}", command))?;
                ()
                    .serve(child)
                    .await
                    .context("Failed to initialize MCP session over stdio")?
            }
            TransportSpec::Http { url } => {
                let http = StreamableHttpClientTransport::from_uri(url.as_str());
                ()
                    .serve(http)
                    .await
                    .with_context(|| format!("Failed to initialize MCP session at {}", url))?
            }
        };

        tracing::info!("MCP session initialized");
        Ok(Self { service })
    }
}

#[async_trait]
impl ProtocolBridge for RmcpBridge {
    async fn list_capabilities(&self) -> Result<Vec<ToolInfo>> {
        let response = self
            .service
            .list_tools(Default::default())
            .await
            .context("Failed to list tools")?;

        let tools: Vec<ToolInfo> = response
            .tools
            .into_iter()
            .map(|t| ToolInfo {
                name: t.name.to_string(),
                description: t.description.map(|d| d.to_string()),
                input_schema: serde_json::to_value(&t.input_schema).ok(),
            })
            .collect();

        tracing::debug!("{} tools discovered", tools.len());
        Ok(tools)
    }

    async fn invoke(&self, name: &str, arguments: Map<String, Value>) -> Result<Value> {
        let arguments = if arguments.is_empty() {
            None
        } else {
            Some(arguments)
        };

        let result = self
            .service
            .call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments,
                task: None,
            })
            .await
            .with_context(|| format!("Failed to call tool '{}'", name))?;

        serde_json::to_value(&result).context("Failed to encode tool result")
    }
}
