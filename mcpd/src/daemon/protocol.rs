//! Control-plane wire types
//!
//! JSON bodies exchanged between the CLI and the daemon over loopback HTTP.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::bridge::ToolInfo;

/// `GET /status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub connected: bool,
    pub last_error: Option<String>,
    pub server: String,
    pub session: String,
}

/// `GET /tools`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsResponse {
    pub tools: Vec<ToolInfo>,
}

/// `POST /call` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRequest {
    pub tool: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

/// Why a request failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The bridge never connected
    Unavailable,
    /// The bridge call itself failed
    Bridge,
}

/// Error body for any non-2xx response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: ErrorKind,
}

impl ErrorResponse {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            kind,
        }
    }
}
