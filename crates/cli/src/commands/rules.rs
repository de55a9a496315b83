use std::path::PathBuf;

use repairdesk_core::config::{AppConfig, LoadOptions};
use repairdesk_core::rules::RulesEngine;

use crate::commands::CommandResult;

/// Summarizes the rule book at `path`, or at the configured path when none is given.
/// A missing file reports the built-in defaults without writing them.
pub fn run(path: Option<PathBuf>) -> CommandResult {
    let path = match path {
        Some(path) => path,
        None => match AppConfig::load(LoadOptions::default()) {
            Ok(config) => config.rules.path,
            Err(error) => {
                return CommandResult::failure(
                    "rules",
                    "config_validation",
                    format!("configuration issue: {error}"),
                    2,
                );
            }
        },
    };

    let engine = match RulesEngine::load_or_default(&path) {
        Ok(engine) => engine,
        Err(error) => {
            return CommandResult::failure("rules", "rules_load", error.to_string(), 8);
        }
    };

    let summary = engine.summary();
    let message = format!(
        "{} rules in {} sets (version {}, source {})",
        summary.total_rules,
        summary.rule_sets.len(),
        summary.version,
        if path.exists() { path.display().to_string() } else { "built-in defaults".to_string() }
    );

    match serde_json::to_value(&summary) {
        Ok(data) => CommandResult::success_with_data("rules", message, data),
        Err(error) => CommandResult::failure("rules", "serialization", error.to_string(), 9),
    }
}
