//! CLI module
//!
//! Argument definitions only; the work happens in `crate::handlers`.

pub mod args;

pub use args::{Cli, Commands, OutputFormat};
