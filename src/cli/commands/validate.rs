//! Validate command.

use crate::Settings;
use crate::cli::output::{emit, fail, print_table};
use crate::io::{EntityType, Envelope, ExitCode, ResultCode};
use crate::storage::{
    AbsentReason, IndexStorage, LoadOutcome, PersistedIndex, ValidationIssue, ValidationReport,
    validate,
};

pub fn run(settings: &Settings, json: bool) -> ExitCode {
    let storage = IndexStorage::from_settings(settings);

    let report = match storage.load() {
        Ok(LoadOutcome::Loaded(index)) => validate(&index),
        Ok(LoadOutcome::Absent(AbsentReason::Missing)) => {
            return fail(
                json,
                ResultCode::IndexMissing,
                format!("No index at {}", storage.path().display()),
            );
        }
        Ok(LoadOutcome::Absent(AbsentReason::Corrupt(reason))) => {
            // Parseable but inconsistent files get the full issue list
            match reparse(&storage) {
                Some(index) => validate(&index),
                None => return fail(json, ResultCode::InvalidIndex, format!("corrupt index: {reason}")),
            }
        }
        Ok(LoadOutcome::Absent(reason)) => {
            return fail(json, ResultCode::InvalidIndex, reason.to_string());
        }
        Err(e) => return fail(json, ResultCode::InternalError, e.to_string()),
    };

    let code = if report.is_valid() {
        ResultCode::Ok
    } else {
        ResultCode::InvalidIndex
    };

    if json {
        let count = report.issues.len();
        return emit(
            Envelope::success(&report)
                .with_result_code(code)
                .with_entity_type(EntityType::Validation)
                .with_count(count)
                .with_message(describe(&report)),
        );
    }

    if !report.issues.is_empty() {
        print_table(&["Severity", "Problem"], rows(&report.issues));
    }
    println!("{}", describe(&report));
    code.exit_code()
}

fn reparse(storage: &IndexStorage) -> Option<PersistedIndex> {
    let bytes = std::fs::read(storage.path()).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn describe(report: &ValidationReport) -> String {
    let errors = report.errors().count();
    let warnings = report.issues.len() - errors;
    if report.is_valid() {
        format!("Index is valid ({warnings} warnings)")
    } else {
        format!("Index is invalid: {errors} errors, {warnings} warnings")
    }
}

fn rows(issues: &[ValidationIssue]) -> Vec<Vec<String>> {
    issues
        .iter()
        .map(|issue| {
            let text = issue.to_string();
            let (severity, message) = text.split_once(": ").unwrap_or(("", text.as_str()));
            vec![severity.to_string(), message.to_string()]
        })
        .collect()
}
