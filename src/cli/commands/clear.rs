//! Clear command.

use crate::Settings;
use crate::io::ExitCode;
use crate::storage::IndexStorage;
use std::io::{self, BufRead, Write};

pub fn run(settings: &Settings, yes: bool) -> ExitCode {
    let storage = IndexStorage::from_settings(settings);
    if !storage.exists() {
        println!("No index at {}", storage.path().display());
        return ExitCode::Success;
    }

    if !yes && !confirm(&format!("Delete {}? [y/N] ", storage.path().display())) {
        println!("Aborted");
        return ExitCode::Success;
    }

    match storage.clear() {
        Ok(()) => {
            crate::log_event!("storage", "cleared", "{}", storage.path().display());
            println!("Removed {}", storage.path().display());
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::GeneralError
        }
    }
}

fn confirm(prompt: &str) -> bool {
    print!("{prompt}");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}
