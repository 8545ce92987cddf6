//! mcpd: share one MCP tool-server connection across short-lived CLI invocations
//!
//! A named session is a detached daemon process that connects to the tool server once
//! and serves a small loopback HTTP control plane. The CLI finds the daemon through a
//! per-directory session registry and talks to it over that control plane.

pub mod bridge;
pub mod cli;
pub mod config;
pub mod content;
pub mod daemon;
pub mod handlers;
pub mod logging;
pub mod session;
