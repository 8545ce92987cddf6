//! Protocol bridge to the external MCP tool server
//!
//! The daemon connects one bridge at startup and reuses it for every request.
//! Handlers only see the [`ProtocolBridge`] trait, so the control plane can be
//! exercised against an in-process fake.

mod rmcp_client;

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use rmcp_client::RmcpBridge;

/// How to reach the tool server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSpec {
    /// Spawn a subprocess and speak the protocol over its stdin/stdout
    Stdio {
        command: String,
        args: Vec<String>,
        env: HashMap<String, String>,
    },
    /// Connect to a streamable HTTP endpoint
    Http { url: String },
}

impl std::fmt::Display for TransportSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportSpec::Stdio { command, args, .. } if args.is_empty() => {
                write!(f, "stdio: {}", command)
            }
            TransportSpec::Stdio { command, args, .. } => {
                write!(f, "stdio: {} {}", command, args.join(" "))
            }
            TransportSpec::Http { url } => write!(f, "http: {}", url),
        }
    }
}

/// A capability (tool) exposed by the tool server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

/// Connected tool-protocol client
#[async_trait]
pub trait ProtocolBridge: Send + Sync {
    /// List the capabilities the server exposes
    async fn list_capabilities(&self) -> Result<Vec<ToolInfo>>;

    /// Invoke a capability and return the raw result payload
    /// (`{content, structuredContent?, isError?}`)
    async fn invoke(&self, name: &str, arguments: Map<String, Value>) -> Result<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_info_wire_shape() {
        let tool = ToolInfo {
            name: "echo".to_string(),
            description: Some("Echo text back".to_string()),
            input_schema: Some(serde_json::json!({"type": "object"})),
        };
        let value = serde_json::to_value(&tool).unwrap();
        assert_eq!(value["name"], "echo");
        assert_eq!(value["inputSchema"]["type"], "object");

        let bare: ToolInfo = serde_json::from_value(serde_json::json!({"name": "ping"})).unwrap();
        assert!(bare.description.is_none());
        assert!(!serde_json::to_string(&bare).unwrap().contains("description"));
    }

    #[test]
    fn test_transport_display() {
        let stdio = TransportSpec::Stdio {
            command: "npx".to_string(),
            args: vec!["-y".to_string(), "echo-mcp".to_string()],
            env: HashMap::new(),
        };
        assert_eq!(stdio.to_string(), "stdio: npx -y echo-mcp");

        let http = TransportSpec::Http {
            url: "http://127.0.0.1:9000/mcp".to_string(),
        };
        assert_eq!(http.to_string(), "http: http://127.0.0.1:9000/mcp");
    }
}
