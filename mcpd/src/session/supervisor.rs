//! Daemon supervisor: start, stop and status of named sessions

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use super::paths::StatePaths;
use super::port::allocate_port;
use super::process;
use super::registry::{Session, SessionRegistry};
use super::SessionError;
use crate::daemon::{DaemonClient, StatusResponse};

/// Fixed wait between spawning a daemon and probing `/status` once
pub const READY_DELAY: Duration = Duration::from_secs(2);

/// Everything needed to re-execute ourselves as a daemon
#[derive(Debug, Clone)]
pub struct DaemonLaunch {
    pub exe: PathBuf,
    pub config_path: PathBuf,
    pub server: String,
    pub state_dir: PathBuf,
}

impl DaemonLaunch {
    fn args(&self, session: &str, port: u16) -> Vec<String> {
        vec![
            "--config".to_string(),
            self.config_path.display().to_string(),
            "--server".to_string(),
            self.server.clone(),
            "--state-dir".to_string(),
            self.state_dir.display().to_string(),
            "daemon".to_string(),
            "--session".to_string(),
            session.to_string(),
            "--port".to_string(),
            port.to_string(),
        ]
    }
}

#[derive(Debug)]
pub enum StartOutcome {
    AlreadyRunning(Session),
    Started {
        session: Session,
        status: StatusResponse,
    },
}

#[derive(Debug)]
pub enum StopOutcome {
    NotRunning,
    Stopped {
        session: Session,
        /// false when the process was already gone
        signalled: bool,
    },
}

/// The three disjoint states a session name can be in
#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionStatus {
    NotRunning,
    NotResponding {
        #[serde(flatten)]
        session: Session,
        error: String,
    },
    Running {
        #[serde(flatten)]
        session: Session,
        daemon: StatusResponse,
    },
}

/// Drives session lifecycles for one state folder
#[derive(Debug, Clone)]
pub struct Supervisor {
    registry: SessionRegistry,
    paths: StatePaths,
    base_port: u16,
    ready_delay: Duration,
}

impl Supervisor {
    pub fn new(paths: StatePaths, base_port: u16) -> Self {
        Self {
            registry: SessionRegistry::new(&paths),
            paths,
            base_port,
            ready_delay: READY_DELAY,
        }
    }

    pub fn with_ready_delay(mut self, delay: Duration) -> Self {
        self.ready_delay = delay;
        self
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn paths(&self) -> &StatePaths {
        &self.paths
    }

    /// Start the daemon for `name` unless a live one is already registered
    pub async fn start(
        &self,
        name: &str,
        launch: &DaemonLaunch,
    ) -> Result<StartOutcome, SessionError> {
        if let Some(existing) = self.registry.get(name)? {
            if existing.is_alive() {
                tracing::info!(
                    "Session '{}' already running (pid {}, port {})",
                    name,
                    existing.pid,
                    existing.port
                );
                return Ok(StartOutcome::AlreadyRunning(existing));
            }
            tracing::info!("Removing stale session '{}' (pid {})", name, existing.pid);
            self.registry.delete(name)?;
        }

        let sessions = self.registry.list()?;
        let port = allocate_port(&sessions, self.base_port)?;

        let log_path = self.paths.log_file(name);
        let pid = process::spawn_detached(&launch.exe, &launch.args(name, port), &log_path)
            .map_err(|source| SessionError::Spawn {
                name: name.to_string(),
                source,
            })?;
        tracing::info!("Spawned daemon for '{}' (pid {}, port {})", name, pid, port);

        let session = Session::new(pid, port);
        self.registry.set(name, session.clone())?;

        tokio::time::sleep(self.ready_delay).await;

        match DaemonClient::new(port).status().await {
            Ok(status) => Ok(StartOutcome::Started { session, status }),
            Err(source) => {
                tracing::warn!("Daemon for '{}' not ready: {}", name, source);
                self.registry.delete(name)?;
                // Nothing can reach an unregistered daemon, so don't leave it holding the port
                if process::terminate(pid) {
                    tracing::info!("Terminated unready daemon (pid {})", pid);
                }
                Err(SessionError::NotReady {
                    name: name.to_string(),
                    log: log_path,
                    source,
                })
            }
        }
    }

    /// Stop the daemon for `name`. Stopping something that is not running is fine.
    pub fn stop(&self, name: &str) -> Result<StopOutcome, SessionError> {
        let Some(session) = self.registry.get(name)? else {
            return Ok(StopOutcome::NotRunning);
        };

        let signalled = process::terminate(session.pid);
        if !signalled {
            tracing::debug!("pid {} was already gone", session.pid);
        }
        self.registry.delete(name)?;

        Ok(StopOutcome::Stopped { session, signalled })
    }

    /// Where the session stands: not running, registered but silent, or running
    pub async fn status(&self, name: &str) -> Result<SessionStatus, SessionError> {
        let Some(session) = self.registry.get_live(name)? else {
            return Ok(SessionStatus::NotRunning);
        };

        Ok(match DaemonClient::new(session.port).status().await {
            Ok(daemon) => SessionStatus::Running { session, daemon },
            Err(e) => SessionStatus::NotResponding {
                session,
                error: e.to_string(),
            },
        })
    }
}
