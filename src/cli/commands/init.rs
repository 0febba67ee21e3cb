//! Init command.

use crate::config::{CONFIG_DIR, Settings};
use crate::io::ExitCode;
use std::path::PathBuf;

/// Create `.iacindex/settings.toml` with default settings.
pub fn run(force: bool) -> ExitCode {
    let config_path = PathBuf::from(CONFIG_DIR).join("settings.toml");

    if config_path.exists() && !force {
        eprintln!(
            "Configuration file already exists at: {}",
            config_path.display()
        );
        eprintln!("Use --force to overwrite");
        return ExitCode::ConfigError;
    }

    match Settings::init_config_file(force) {
        Ok(path) => {
            println!("Created configuration file at: {}", path.display());
            println!("Edit this file to customize scan roots, patterns and rules.");
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::ConfigError
        }
    }
}
