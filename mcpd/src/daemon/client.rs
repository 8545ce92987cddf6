//! Client for the daemon's control plane

use std::net::Ipv4Addr;
use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::protocol::{CallRequest, ErrorResponse, StatusResponse, ToolsResponse};

/// Upper bound for a `/status` round trip. Tool calls have no timeout.
pub const STATUS_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Nothing answered on the session's port
    #[error("daemon at {url} is not responding: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The daemon answered with a non-2xx status
    #[error("daemon returned {status}: {message}")]
    Daemon { status: StatusCode, message: String },

    #[error("invalid response from daemon: {0}")]
    InvalidResponse(#[source] reqwest::Error),
}

impl ClientError {
    /// The daemon is up but has no tool-server connection
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ClientError::Daemon { status, .. } if *status == StatusCode::SERVICE_UNAVAILABLE)
    }
}

/// HTTP client bound to one session's port
#[derive(Debug, Clone)]
pub struct DaemonClient {
    base_url: String,
    http: reqwest::Client,
}

impl DaemonClient {
    pub fn new(port: u16) -> Self {
        Self {
            base_url: format!("http://{}:{}", Ipv4Addr::LOCALHOST, port),
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Connection state of the daemon
    pub async fn status(&self) -> Result<StatusResponse, ClientError> {
        let url = self.url("/status");
        let response = self
            .http
            .get(&url)
            .timeout(STATUS_TIMEOUT)
            .send()
            .await
            .map_err(|source| ClientError::Unreachable { url, source })?;
        Self::decode(response).await
    }

    /// Capabilities of the tool server, as the daemon reports them
    pub async fn tools(&self) -> Result<ToolsResponse, ClientError> {
        let url = self.url("/tools");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ClientError::Unreachable { url, source })?;
        Self::decode(response).await
    }

    /// Invoke a tool; the raw result JSON is returned untouched
    pub async fn call(&self, tool: &str, arguments: Map<String, Value>) -> Result<Value, ClientError> {
        let url = self.url("/call");
        let body = CallRequest {
            tool: tool.to_string(),
            arguments,
        };
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|source| ClientError::Unreachable { url, source })?;
        Self::decode(response).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return response.json().await.map_err(ClientError::InvalidResponse);
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(err) => err.error,
            Err(_) if body.trim().is_empty() => status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
            Err(_) => body.trim().to_string(),
        };
        Err(ClientError::Daemon { status, message })
    }
}
