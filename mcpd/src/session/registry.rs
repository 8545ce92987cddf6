//! Durable session registry
//!
//! A single JSON file maps session names to the daemon that serves them. Every
//! mutation is a read-modify-write of the whole file under an advisory lock on a
//! sibling lock file; reads take no lock. Entries whose process has died are removed
//! by the first read path that notices.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use super::paths::StatePaths;
use super::process;
use super::SessionError;

/// A registered daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub pid: u32,
    pub port: u16,
    pub started_at: DateTime<Utc>,
}

impl Session {
    /// A session for a freshly spawned daemon
    pub fn new(pid: u32, port: u16) -> Self {
        Self {
            pid,
            port,
            started_at: Utc::now(),
        }
    }

    pub fn is_alive(&self) -> bool {
        process::is_alive(self.pid)
    }
}

/// Registry entry plus its liveness at the time of listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntry {
    pub name: String,
    #[serde(flatten)]
    pub session: Session,
    pub alive: bool,
}

type SessionMap = BTreeMap<String, Session>;

/// Handle to the registry file of one state folder
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    path: PathBuf,
    lock_path: PathBuf,
}

impl SessionRegistry {
    pub fn new(paths: &StatePaths) -> Self {
        Self {
            path: paths.registry_file(),
            lock_path: paths.lock_file(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a session without checking liveness
    pub fn get(&self, name: &str) -> Result<Option<Session>, SessionError> {
        Ok(self.load()?.remove(name))
    }

    /// Look up a session, deleting it if its process is gone
    pub fn get_live(&self, name: &str) -> Result<Option<Session>, SessionError> {
        match self.get(name)? {
            Some(session) if session.is_alive() => Ok(Some(session)),
            Some(session) => {
                tracing::info!(
                    "Reaping stale session '{}' (pid {} is gone)",
                    name,
                    session.pid
                );
                self.delete(name)?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Insert or replace a session
    pub fn set(&self, name: &str, session: Session) -> Result<(), SessionError> {
        self.update(|sessions| {
            sessions.insert(name.to_string(), session);
        })
    }

    /// Remove a session, returning what was there
    pub fn delete(&self, name: &str) -> Result<Option<Session>, SessionError> {
        let mut removed = None;
        self.update(|sessions| {
            removed = sessions.remove(name);
        })?;
        Ok(removed)
    }

    /// All sessions with a liveness flag. Dead entries are reported once, then reaped.
    pub fn list(&self) -> Result<Vec<SessionEntry>, SessionError> {
        let entries: Vec<SessionEntry> = self
            .load()?
            .into_iter()
            .map(|(name, session)| {
                let alive = session.is_alive();
                SessionEntry {
                    name,
                    session,
                    alive,
                }
            })
            .collect();

        let dead: Vec<&str> = entries
            .iter()
            .filter(|e| !e.alive)
            .map(|e| e.name.as_str())
            .collect();
        if !dead.is_empty() {
            tracing::info!("Reaping {} stale session(s): {}", dead.len(), dead.join(", "));
            self.update(|sessions| {
                // Only drop entries that still point at the dead pid
                sessions.retain(|name, session| {
                    session.is_alive() || !dead.contains(&name.as_str())
                });
            })?;
        }

        Ok(entries)
    }

    fn load(&self) -> Result<SessionMap, SessionError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(SessionMap::new()),
            Err(source) => {
                return Err(SessionError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(SessionMap::new());
        }

        serde_json::from_str(&content).map_err(|source| SessionError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn store(&self, sessions: &SessionMap) -> Result<(), SessionError> {
        let io_err = |source| SessionError::Io {
            path: self.path.clone(),
            source,
        };

        let json = serde_json::to_string_pretty(sessions).map_err(|source| {
            SessionError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;

        // Write-then-rename so readers never see a half-written file
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)
    }

    /// Read-modify-write under the advisory lock
    fn update(&self, mutate: impl FnOnce(&mut SessionMap)) -> Result<(), SessionError> {
        let lock = self.lock()?;

        let mut sessions = self.load()?;
        mutate(&mut sessions);
        let result = self.store(&sessions);

        let _ = lock.unlock();
        result
    }

    fn lock(&self) -> Result<File, SessionError> {
        let io_err = |source| SessionError::Io {
            path: self.lock_path.clone(),
            source,
        };

        if let Some(parent) = self.lock_path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)
            .map_err(io_err)?;
        file.lock_exclusive().map_err(io_err)?;
        Ok(file)
    }
}
