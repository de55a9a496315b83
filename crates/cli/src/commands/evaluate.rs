use std::fs;
use std::path::{Path, PathBuf};

use repairdesk_core::audit::{AuditContext, InMemoryAuditSink};
use repairdesk_core::config::{AppConfig, LoadOptions};
use repairdesk_core::domain::case::ServiceCaseInput;
use repairdesk_core::pipeline::{ServiceWorkflow, WorkflowOptions};
use repairdesk_core::rules::RulesEngine;
use serde_json::json;

use crate::commands::CommandResult;

const COMMAND: &str = "evaluate";

/// Runs one case file through the workflow offline; nothing is persisted.
pub fn run(file: &Path, rules_path: Option<PathBuf>) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let input = match read_case(file) {
        Ok(input) => input,
        Err(message) => return CommandResult::failure(COMMAND, "invalid_input", message, 7),
    };

    let rules_path = rules_path.unwrap_or(config.rules.path);
    let rules = match RulesEngine::load_or_default(&rules_path) {
        Ok(rules) => rules,
        Err(error) => return CommandResult::failure(COMMAND, "rules_load", error.to_string(), 8),
    };

    let workflow = ServiceWorkflow::builtin().with_options(WorkflowOptions {
        enforce_rule_overrides: config.rules.enforce_overrides,
    });
    let case = input.into_case();
    let sink = InMemoryAuditSink::default();
    let audit = AuditContext::new(Some(case.id.clone()), "cli", "cli");

    let outcome = match workflow.process(&case, &rules, &sink, &audit) {
        Ok(outcome) => outcome,
        Err(error) => {
            return CommandResult::failure(COMMAND, "workflow", error.to_string(), 6);
        }
    };

    let message = format!(
        "{} ({:.0}% confidence): {}",
        outcome.recommendation.as_str(),
        outcome.confidence_score * 100.0,
        outcome.justification
    );
    let audit_trail: Vec<String> = sink.events().into_iter().map(|event| event.event_type).collect();

    match serde_json::to_value(&outcome) {
        Ok(outcome) => CommandResult::success_with_data(
            COMMAND,
            message,
            json!({ "outcome": outcome, "audit_trail": audit_trail }),
        ),
        Err(error) => CommandResult::failure(COMMAND, "serialization", error.to_string(), 9),
    }
}

fn read_case(file: &Path) -> Result<ServiceCaseInput, String> {
    let raw = fs::read_to_string(file)
        .map_err(|error| format!("could not read case file `{}`: {error}", file.display()))?;
    serde_json::from_str(&raw)
        .map_err(|error| format!("case file `{}` is not a valid case: {error}", file.display()))
}
