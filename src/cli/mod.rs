//! CLI module: argument parsing, command dispatch and table output.

pub mod args;
pub mod commands;
pub mod output;

pub use args::{Cli, Commands};
