use repairdesk_core::audit::{AuditContext, InMemoryAuditSink};
use repairdesk_core::pipeline::{demo_scenarios, ServiceWorkflow};
use repairdesk_core::rules::RulesEngine;
use serde::Serialize;

use crate::commands::CommandResult;

const COMMAND: &str = "scenarios";

#[derive(Debug, Serialize)]
struct ScenarioCheck {
    name: String,
    expected: String,
    actual: Option<String>,
    confidence_score: Option<f64>,
    passed: bool,
}

/// Replays the demo scenarios against the built-in catalog and default rules.
pub fn run() -> CommandResult {
    let workflow = ServiceWorkflow::builtin();
    let rules = RulesEngine::default();

    let checks: Vec<ScenarioCheck> = demo_scenarios()
        .into_iter()
        .map(|scenario| {
            let case = scenario.input.into_case();
            let sink = InMemoryAuditSink::default();
            let audit = AuditContext::new(Some(case.id.clone()), "cli-scenarios", "cli");
            let outcome = workflow.process(&case, &rules, &sink, &audit).ok();
            let actual = outcome.as_ref().map(|outcome| outcome.recommendation);

            ScenarioCheck {
                name: scenario.name,
                expected: scenario.expected_outcome.as_str().to_string(),
                actual: actual.map(|recommendation| recommendation.as_str().to_string()),
                confidence_score: outcome.as_ref().map(|outcome| outcome.confidence_score),
                passed: actual == Some(scenario.expected_outcome),
            }
        })
        .collect();

    let passed = checks.iter().filter(|check| check.passed).count();
    let message = format!("{passed}/{} demo scenarios reached their expected outcome", checks.len());
    let data = match serde_json::to_value(&checks) {
        Ok(data) => data,
        Err(error) => return CommandResult::failure(COMMAND, "serialization", error.to_string(), 9),
    };

    if passed == checks.len() {
        CommandResult::success_with_data(COMMAND, message, data)
    } else {
        CommandResult::failure_with_data(COMMAND, "scenario_mismatch", message, data, 6)
    }
}
