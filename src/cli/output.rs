//! Table and envelope output shared by the commands.

use crate::io::{Envelope, ExitCode, ResultCode};
use crate::types::IndexedResource;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use serde::Serialize;

/// Print a table with headers and rows
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header_cells: Vec<Cell> = headers
        .iter()
        .map(|h| Cell::new(h).fg(Color::Cyan))
        .collect();
    table.set_header(header_cells);

    for row in rows {
        table.add_row(row);
    }

    println!("{table}");
}

/// Two-column key/value table.
pub fn print_pairs(pairs: Vec<(&str, String)>) {
    print_table(
        &["Field", "Value"],
        pairs
            .into_iter()
            .map(|(key, value)| vec![key.to_string(), value])
            .collect(),
    );
}

pub fn resource_rows<'a>(resources: impl IntoIterator<Item = &'a IndexedResource>) -> Vec<Vec<String>> {
    resources
        .into_iter()
        .map(|r| {
            vec![
                r.id.clone(),
                r.location(),
                r.environment.clone().unwrap_or_else(|| "-".to_string()),
                r.risk_level.to_string(),
                join(&r.security_attributes),
                join(&r.control_ids),
            ]
        })
        .collect()
}

pub const RESOURCE_HEADERS: [&str; 6] =
    ["Resource", "Location", "Env", "Risk", "Attributes", "Controls"];

pub fn join<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    let joined = items
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() { "-".to_string() } else { joined }
}

/// Print an envelope as JSON and return its exit code.
pub fn emit<T: Serialize>(envelope: Envelope<T>) -> ExitCode {
    let exit_code = envelope.code.exit_code();
    match envelope.to_json() {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error: failed to serialize output: {e}");
            return ExitCode::GeneralError;
        }
    }
    exit_code
}

/// Report a failure as an error envelope or on stderr.
pub fn fail(json: bool, code: ResultCode, message: impl Into<String>) -> ExitCode {
    let message = message.into();
    if json {
        return emit(Envelope::<()>::error(code, message));
    }
    eprintln!("Error: {message}");
    code.exit_code()
}

pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_join_empty_is_dash() {
        assert_eq!(join(&BTreeSet::<String>::new()), "-");
        let tags: BTreeSet<String> = ["encryption", "key_rotation"].map(String::from).into();
        assert_eq!(join(&tags), "encryption, key_rotation");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(10 * 1024 * 1024), "10.0 MB");
    }
}
