//! Layout of the per-directory state folder

use std::path::{Path, PathBuf};

/// Default state folder name, created in the working directory
pub const STATE_DIR_NAME: &str = ".mcpd";

/// Files owned by one state folder
#[derive(Debug, Clone)]
pub struct StatePaths {
    root: PathBuf,
}

impl StatePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<cwd>/.mcpd`
    pub fn for_working_dir(cwd: &Path) -> Self {
        Self::new(cwd.join(STATE_DIR_NAME))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry_file(&self) -> PathBuf {
        self.root.join("sessions.json")
    }

    pub fn lock_file(&self) -> PathBuf {
        self.root.join("sessions.lock")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn log_file(&self, session: &str) -> PathBuf {
        self.log_dir().join(format!("{}.log", session))
    }

    pub fn output_dir(&self, session: &str) -> PathBuf {
        self.root.join("output").join(session)
    }
}
