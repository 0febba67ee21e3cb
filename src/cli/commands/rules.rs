//! Rules command.

use crate::Settings;
use crate::classify::RuleTable;
use crate::cli::output::{emit, fail, print_table};
use crate::io::{EntityType, Envelope, ExitCode, ResultCode};

pub fn run(settings: &Settings, json: bool) -> ExitCode {
    let table = match RuleTable::from_config(&settings.classifier) {
        Ok(table) => table,
        Err(e) => return fail(json, ResultCode::ConfigError, e.to_string()),
    };

    if json {
        let count = table.len();
        let fingerprint = table.fingerprint();
        return emit(
            Envelope::success(table)
                .with_entity_type(EntityType::RuleTable)
                .with_count(count)
                .with_message(format!("{count} rules, fingerprint {fingerprint}")),
        );
    }

    let rows = table
        .rules()
        .iter()
        .map(|rule| {
            let condition = serde_json::to_string(&rule.when).unwrap_or_default();
            vec![
                rule.name.clone(),
                rule.resource_type.to_string(),
                condition,
                rule.tags.join(", "),
                rule.controls.join(", "),
            ]
        })
        .collect();
    print_table(&["Rule", "Type", "When", "Tags", "Controls"], rows);
    println!("{} rules, fingerprint {}", table.len(), table.fingerprint());
    ExitCode::Success
}
