//! Shared daemon state

use std::sync::Arc;

use crate::bridge::ProtocolBridge;

use super::protocol::StatusResponse;

/// Outcome of the startup connection attempt. Fixed for the life of the process.
#[derive(Debug, Clone)]
pub struct ConnectionState {
    pub connected: bool,
    pub last_error: Option<String>,
    pub server_name: String,
}

impl ConnectionState {
    pub fn connected(server_name: impl Into<String>) -> Self {
        Self {
            connected: true,
            last_error: None,
            server_name: server_name.into(),
        }
    }

    pub fn failed(server_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            connected: false,
            last_error: Some(error.into()),
            server_name: server_name.into(),
        }
    }
}

/// State handed to every request handler
#[derive(Clone)]
pub struct DaemonState {
    pub session: Arc<str>,
    pub connection: Arc<ConnectionState>,
    bridge: Option<Arc<dyn ProtocolBridge>>,
}

impl DaemonState {
    /// Build the state from a connection attempt
    pub fn new(
        session: &str,
        connection: ConnectionState,
        bridge: Option<Arc<dyn ProtocolBridge>>,
    ) -> Self {
        Self {
            session: session.into(),
            connection: Arc::new(connection),
            bridge,
        }
    }

    /// The bridge, if the startup connection succeeded
    pub fn bridge(&self) -> Option<&Arc<dyn ProtocolBridge>> {
        if self.connection.connected {
            self.bridge.as_ref()
        } else {
            None
        }
    }

    pub fn status(&self) -> StatusResponse {
        StatusResponse {
            connected: self.connection.connected,
            last_error: self.connection.last_error.clone(),
            server: self.connection.server_name.clone(),
            session: self.session.to_string(),
        }
    }
}
