//! Query command.

use crate::Settings;
use crate::cli::commands::load_index;
use crate::cli::output::{RESOURCE_HEADERS, emit, fail, print_table, resource_rows};
use crate::io::{EntityType, Envelope, ExitCode, ResultCode};
use crate::query::{QueryEngine, QueryResult};
use crate::storage::IndexStorage;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct QueryArgs {
    pub control: Option<String>,
    pub attribute: Option<String>,
    pub resource_type: Option<String>,
    pub environment: Option<String>,
    pub risk_level: Option<String>,
    pub compliance_status: Option<String>,
    pub limit: Option<usize>,
    pub json: bool,
}

impl QueryArgs {
    /// Run every given filter and intersect the results.
    fn evaluate<'e>(&self, engine: &'e QueryEngine) -> Option<QueryResult<'e>> {
        let mut results = Vec::new();
        if let Some(control) = &self.control {
            results.push(engine.by_control(control));
        }
        if let Some(tag) = &self.attribute {
            results.push(engine.by_attribute(tag));
        }
        if let Some(resource_type) = &self.resource_type {
            results.push(engine.by_resource_type(resource_type));
        }
        if let Some(environment) = &self.environment {
            results.push(engine.by_environment(environment));
        }
        if let Some(level) = &self.risk_level {
            results.push(engine.by_risk_level(level));
        }
        if let Some(status) = &self.compliance_status {
            results.push(engine.by_compliance_status(status));
        }

        let mut results = results.into_iter();
        let first = results.next()?;
        Some(results.fold(first, |acc, next| acc.intersect(&next)))
    }
}

pub fn run(settings: &Settings, args: QueryArgs) -> ExitCode {
    let storage = IndexStorage::from_settings(settings);
    let index = match load_index(&storage) {
        Ok(index) => index,
        Err(unavailable) => return fail(args.json, unavailable.code, unavailable.message),
    };
    let engine = QueryEngine::new(Arc::new(index));

    let Some(result) = args.evaluate(&engine) else {
        return fail(args.json, ResultCode::InternalError, "no query filter given");
    };
    let total = result.count;
    let result = match args.limit {
        Some(limit) => result.limit(limit),
        None => result,
    };
    let truncated = result.resources.len() < total;

    if args.json {
        let key = result.key.clone();
        let envelope = if total == 0 {
            Envelope::not_found(result, format!("No resources match {key}"))
        } else {
            Envelope::success(result).with_message(format!("Found {total} resources"))
        };
        return emit(
            envelope
                .with_entity_type(EntityType::QueryResult)
                .with_query(key)
                .with_count(total)
                .with_truncated(truncated),
        );
    }

    if total == 0 {
        println!("No resources match {}", result.key);
        return ExitCode::NotFound;
    }

    print_table(&RESOURCE_HEADERS, resource_rows(result.resources.iter().copied()));
    if truncated {
        println!("Showing {} of {total} resources", result.resources.len());
    } else {
        println!("{total} resources");
    }
    ExitCode::Success
}
