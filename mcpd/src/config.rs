//! Configuration loading
//!
//! Two files are involved:
//! - `.mcp.json` names the tool server(s) and how to reach them (required for `start`)
//! - `.mcpd.toml` holds optional session defaults (state dir, base port, ...)

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::bridge::TransportSpec;

/// Server config file name
pub const MCP_CONFIG_FILE: &str = ".mcp.json";

/// Optional settings file name
pub const SETTINGS_FILE: &str = ".mcpd.toml";

/// First port the allocator tries when nothing else is configured
pub const DEFAULT_BASE_PORT: u16 = 8940;

/// Session name used when the command line does not give one
pub const DEFAULT_SESSION: &str = "default";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no {} found in the current directory, its parents, or ~/.config/mcpd", MCP_CONFIG_FILE)]
    NotFound,

    #[error("config file {path} does not exist")]
    Missing { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("no servers defined in {path}")]
    NoServers { path: PathBuf },

    #[error("server '{name}' not found in config (available: {available})")]
    UnknownServer { name: String, available: String },

    #[error("config defines several servers ({available}); pick one with --server")]
    AmbiguousServer { available: String },

    #[error("server '{name}': {reason}")]
    InvalidServer { name: String, reason: String },
}

/// Find a config file by walking up the directory tree, then checking global config.
///
/// Search order:
/// 1. `start` and its parent directories (walking up to root)
/// 2. Global config at ~/.config/mcpd/
fn find_config_file(start: &Path, filename: &str) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let candidate = current.join(filename);
        if candidate.is_file() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_path = config_dir.join("mcpd").join(filename);
        if global_path.is_file() {
            return Some(global_path);
        }
    }

    None
}

// ============================================================================
// Server configuration (.mcp.json)
// ============================================================================

/// MCP server configuration (from .mcp.json)
#[derive(Debug, Clone, Deserialize)]
pub struct McpConfig {
    #[serde(rename = "mcpServers")]
    pub mcp_servers: BTreeMap<String, McpServerConfig>,
}

/// One server entry: either a `command` to spawn or a `url` to dial
#[derive(Debug, Clone, Deserialize)]
pub struct McpServerConfig {
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    pub url: Option<String>,
}

impl McpConfig {
    /// Resolve the config path: an explicit path must exist, otherwise search from `cwd`
    pub fn locate(explicit: Option<&Path>, cwd: &Path) -> Result<PathBuf, ConfigError> {
        match explicit {
            Some(path) if path.is_file() => Ok(path.to_path_buf()),
            Some(path) => Err(ConfigError::Missing {
                path: path.to_path_buf(),
            }),
            None => find_config_file(cwd, MCP_CONFIG_FILE).ok_or(ConfigError::NotFound),
        }
    }

    /// Load from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: McpConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        if config.mcp_servers.is_empty() {
            return Err(ConfigError::NoServers {
                path: path.to_path_buf(),
            });
        }
        tracing::debug!("Loaded MCP config from: {}", path.display());
        Ok(config)
    }

    /// Pick the server to run: the named one, or the only one defined
    pub fn select_server(&self, name: Option<&str>) -> Result<(&str, &McpServerConfig), ConfigError> {
        let available = || {
            self.mcp_servers
                .keys()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        };

        match name {
            Some(name) => self
                .mcp_servers
                .get_key_value(name)
                .map(|(k, v)| (k.as_str(), v))
                .ok_or_else(|| ConfigError::UnknownServer {
                    name: name.to_string(),
                    available: available(),
                }),
            None => {
                let mut servers = self.mcp_servers.iter();
                match (servers.next(), servers.next()) {
                    (Some((k, v)), None) => Ok((k.as_str(), v)),
                    _ => Err(ConfigError::AmbiguousServer {
                        available: available(),
                    }),
                }
            }
        }
    }
}

impl McpServerConfig {
    /// Turn the entry into a transport description for the bridge
    pub fn transport(&self, name: &str) -> Result<TransportSpec, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidServer {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        match (&self.command, &self.url) {
            (Some(command), None) => {
                if command.trim().is_empty() {
                    return Err(invalid("`command` is empty"));
                }
                Ok(TransportSpec::Stdio {
                    command: command.clone(),
                    args: self.args.clone(),
                    env: self.env.clone(),
                })
            }
            (None, Some(raw)) => {
                let parsed = url::Url::parse(raw).map_err(|e| ConfigError::InvalidServer {
                    name: name.to_string(),
                    reason: format!("invalid url '{}': {}", raw, e),
                })?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(invalid("`url` must be http or https"));
                }
                Ok(TransportSpec::Http { url: raw.clone() })
            }
            (Some(_), Some(_)) => Err(invalid("set either `command` or `url`, not both")),
            (None, None) => Err(invalid("needs a `command` or a `url`")),
        }
    }
}

// ============================================================================
// Session settings (.mcpd.toml)
// ============================================================================

/// Top-level settings file
#[derive(Debug, Default, Deserialize)]
pub struct FileSettings {
    #[serde(default)]
    pub session: SessionSettings,
}

/// `[session]` section
#[derive(Debug, Deserialize)]
pub struct SessionSettings {
    /// Where the registry, logs and output live (default: `<cwd>/.mcpd`)
    pub state_dir: Option<PathBuf>,
    #[serde(default = "default_base_port")]
    pub base_port: u16,
    #[serde(default = "default_session")]
    pub default_session: String,
    /// Where binary tool output goes (default: `<state>/output/<session>`)
    pub output_dir: Option<PathBuf>,
}

fn default_base_port() -> u16 {
    DEFAULT_BASE_PORT
}

fn default_session() -> String {
    DEFAULT_SESSION.to_string()
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            state_dir: None,
            base_port: default_base_port(),
            default_session: default_session(),
            output_dir: None,
        }
    }
}

impl FileSettings {
    /// Load settings from .mcpd.toml
    ///
    /// Search order:
    /// 1. Walk up directory tree from `cwd` looking for .mcpd.toml
    /// 2. Check ~/.config/mcpd/.mcpd.toml (global fallback)
    /// 3. Fall back to defaults
    pub fn load(cwd: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = find_config_file(cwd, SETTINGS_FILE) {
            tracing::debug!("Loading settings from: {}", path.display());
            return Self::load_from_path(&path);
        }

        tracing::debug!("No {} found, using defaults", SETTINGS_FILE);
        Ok(Self::default())
    }

    /// Load from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}
