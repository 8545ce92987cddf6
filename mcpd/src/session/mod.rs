//! Session lifecycle: registry, port allocation, process management and the supervisor
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   HTTP (127.0.0.1:<port>)  ┌──────────────────┐   stdio / http   ┌────────────┐
//! │  mcpd CLI   │ ─────────────────────────→ │   mcpd daemon    │ ───────────────→ │ MCP server │
//! └──────┬──────┘                            └──────────────────┘                  └────────────┘
//!        │ read / write
//!        ↓
//! .mcpd/sessions.json   {name → pid, port, startedAt}
//! ```
//!
//! The CLI and the daemon share no memory; the registry file is the only shared state.

mod paths;
mod port;
pub mod process;
mod registry;
mod supervisor;

use std::path::PathBuf;

pub use paths::{StatePaths, STATE_DIR_NAME};
pub use port::{allocate_port, is_port_free, PORT_SCAN_RANGE};
pub use registry::{Session, SessionEntry, SessionRegistry};
pub use supervisor::{
    DaemonLaunch, SessionStatus, StartOutcome, StopOutcome, Supervisor, READY_DELAY,
};

use crate::daemon::ClientError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no free port between {start} and {end}")]
    PortExhausted { start: u16, end: u32 },

    #[error("session registry I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("session registry {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to spawn daemon for session '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("daemon for session '{name}' did not become ready (see {log}): {source}")]
    NotReady {
        name: String,
        log: PathBuf,
        #[source]
        source: ClientError,
    },
}
