//! Command handlers module
//!
//! This module contains handler functions for CLI commands. Each handler returns the
//! process exit code; hard failures come back as errors and `main` prints them.
//! CommandContext resolves the settings every handler shares.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::cli::Cli;
use crate::config::{FileSettings, McpConfig, SessionSettings};
use crate::session::{DaemonLaunch, SessionRegistry, StatePaths, Supervisor};

pub mod daemon;
pub mod session;
pub mod tools;

pub use daemon::run_daemon;
pub use session::{run_logs, run_sessions, run_start, run_status, run_stop};
pub use tools::{parse_key_values, run_call, run_tools};

/// Settings resolved from flags/env, `.mcpd.toml` and built-in defaults, in that order
#[derive(Debug)]
pub struct CommandContext {
    pub cwd: PathBuf,
    pub config: Option<PathBuf>,
    pub server: Option<String>,
    pub settings: SessionSettings,
    pub paths: StatePaths,
}

impl CommandContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to read the working directory")?;
        let settings = FileSettings::load(&cwd)?.session;
        Ok(Self::resolve(cli, cwd, settings))
    }

    fn resolve(cli: &Cli, cwd: PathBuf, settings: SessionSettings) -> Self {
        let paths = match cli.state_dir.as_ref().or(settings.state_dir.as_ref()) {
            Some(dir) => StatePaths::new(absolute(&cwd, dir)),
            None => StatePaths::for_working_dir(&cwd),
        };

        Self {
            config: cli.config.as_ref().map(|p| absolute(&cwd, p)),
            server: cli.server.clone(),
            settings,
            paths,
            cwd,
        }
    }

    /// The given session name, or the configured default
    pub fn session_name(&self, explicit: Option<String>) -> String {
        explicit.unwrap_or_else(|| self.settings.default_session.clone())
    }

    pub fn registry(&self) -> SessionRegistry {
        SessionRegistry::new(&self.paths)
    }

    pub fn supervisor(&self) -> Supervisor {
        Supervisor::new(self.paths.clone(), self.settings.base_port)
    }

    /// `--output-dir`, then `[session] output_dir`, then `<state>/output/<session>`
    pub fn output_dir(&self, session: &str, explicit: Option<PathBuf>) -> PathBuf {
        match explicit.or_else(|| self.settings.output_dir.clone()) {
            Some(dir) => absolute(&self.cwd, &dir),
            None => self.paths.output_dir(session),
        }
    }

    /// Locate and load `.mcp.json`
    pub fn load_config(&self) -> Result<(PathBuf, McpConfig)> {
        let path = McpConfig::locate(self.config.as_deref(), &self.cwd)?;
        let config = McpConfig::load_from_path(&path)?;
        Ok((path, config))
    }

    /// How `start` re-executes this binary as a daemon. Fails early on a bad config.
    pub fn launch(&self) -> Result<DaemonLaunch> {
        let (config_path, config) = self.load_config()?;
        let (server, entry) = config.select_server(self.server.as_deref())?;
        entry.transport(server)?;

        Ok(DaemonLaunch {
            exe: std::env::current_exe().context("Failed to locate the mcpd executable")?,
            config_path,
            server: server.to_string(),
            state_dir: self.paths.root().to_path_buf(),
        })
    }
}

fn absolute(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn context(args: &[&str], settings: SessionSettings) -> CommandContext {
        let cli = Cli::try_parse_from(args).unwrap();
        CommandContext::resolve(&cli, PathBuf::from("/work"), settings)
    }

    #[test]
    fn test_defaults() {
        let ctx = context(&["mcpd", "sessions"], SessionSettings::default());
        assert_eq!(ctx.paths.root(), Path::new("/work/.mcpd"));
        assert_eq!(ctx.session_name(None), "default");
        assert_eq!(
            ctx.output_dir("dev", None),
            Path::new("/work/.mcpd/output/dev")
        );
    }

    #[test]
    fn test_flags_override_settings() {
        let settings = SessionSettings {
            state_dir: Some(PathBuf::from("from-file")),
            default_session: "team".to_string(),
            output_dir: Some(PathBuf::from("/out")),
            ..SessionSettings::default()
        };

        let ctx = context(&["mcpd", "--state-dir", "/state", "sessions"], settings);
        assert_eq!(ctx.paths.root(), Path::new("/state"));
        assert_eq!(ctx.session_name(None), "team");
        assert_eq!(ctx.session_name(Some("dev".into())), "dev");
        assert_eq!(ctx.output_dir("dev", None), Path::new("/out"));
        assert_eq!(
            ctx.output_dir("dev", Some(PathBuf::from("shots"))),
            Path::new("/work/shots")
        );
    }

    #[test]
    fn test_settings_state_dir_is_relative_to_cwd() {
        let settings = SessionSettings {
            state_dir: Some(PathBuf::from("var/mcpd")),
            ..SessionSettings::default()
        };
        let ctx = context(&["mcpd", "sessions"], settings);
        assert_eq!(ctx.paths.root(), Path::new("/work/var/mcpd"));
    }

    #[test]
    fn test_launch_requires_config() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let cli = Cli::try_parse_from([
            "mcpd",
            "--config",
            missing.to_str().unwrap(),
            "start",
        ])
        .unwrap();
        let ctx = CommandContext::resolve(&cli, dir.path().to_path_buf(), SessionSettings::default());
        assert!(ctx.launch().is_err());
    }

    #[test]
    fn test_launch_selects_server() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join(".mcp.json");
        std::fs::write(
            &config,
            r#"{"mcpServers": {"echo-mcp": {"command": "echo-mcp"}}}"#,
        )
        .unwrap();
        let cli = Cli::try_parse_from(["mcpd", "--config", config.to_str().unwrap(), "start"])
            .unwrap();
        let ctx = CommandContext::resolve(&cli, dir.path().to_path_buf(), SessionSettings::default());

        let launch = ctx.launch().unwrap();
        assert_eq!(launch.server, "echo-mcp");
        assert_eq!(launch.config_path, config);
        assert_eq!(launch.state_dir, dir.path().join(".mcpd"));
    }
}
