//! CLI argument definitions
//!
//! Contains the main CLI struct and Commands enum for clap parsing.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "mcpd")]
#[command(about = "Keep one MCP server connection alive and share it across commands")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to .mcp.json (default: search upward from the working directory)
    #[arg(long, env = "MCPD_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Server entry in .mcp.json to connect to (default: the only one defined)
    #[arg(long, env = "MCPD_SERVER", global = true)]
    pub server: Option<String>,

    /// State folder for the registry, logs and output (default: ./.mcpd)
    #[arg(long, env = "MCPD_STATE_DIR", global = true)]
    pub state_dir: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace). Default is warn.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a session daemon (no-op if it is already running)
    Start {
        /// Session name
        session: Option<String>,
    },
    /// Stop a session daemon
    Stop {
        /// Session name
        session: Option<String>,
    },
    /// Show whether a session is running and connected
    Status {
        /// Session name
        session: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Auto)]
        format: OutputFormat,
    },
    /// List the tools offered by the session's server
    Tools {
        #[arg(long, short)]
        session: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Auto)]
        format: OutputFormat,
    },
    /// Call a tool through a running session
    Call {
        /// Tool name
        tool: String,
        /// Arguments as key=value (values are parsed as JSON when possible)
        args: Vec<String>,
        #[arg(long, short)]
        session: Option<String>,
        /// Where images, audio and binary resources are written
        #[arg(long)]
        output_dir: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Auto)]
        format: OutputFormat,
    },
    /// List registered sessions
    Sessions {
        #[arg(long, value_enum, default_value_t = OutputFormat::Auto)]
        format: OutputFormat,
    },
    /// View a session's daemon log
    Logs {
        /// Session name
        session: Option<String>,
        /// Number of lines to show (0 = all)
        #[arg(long, short, default_value = "50")]
        lines: usize,
    },
    /// Run the daemon in the foreground (spawned by `start`)
    #[command(hide = true)]
    Daemon {
        #[arg(long)]
        session: String,
        #[arg(long)]
        port: u16,
    },
}

/// How results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Auto,
    /// Raw JSON
    Json,
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        self == OutputFormat::Json
    }
}
