use serde::{Deserialize, Serialize};

use crate::domain::case::ServiceCaseInput;
use crate::domain::recommendation::Recommendation;

/// A canned case with the outcome the pipeline is expected to reach.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoScenario {
    pub name: String,
    pub description: String,
    pub input: ServiceCaseInput,
    pub expected_outcome: Recommendation,
}

pub fn demo_scenarios() -> Vec<DemoScenario> {
    vec![
        scenario(
            "Repair Success - V-Zug Cooktop",
            "Young device with known error pattern - high repair probability",
            "cooktop",
            "V-Zug",
            3,
            "F7 and E3 error codes, heating element not working",
            Recommendation::Repair,
        ),
        scenario(
            "Replacement Recommended - Old Siemens Oven",
            "Aged device with high repair costs - replacement more economical",
            "oven",
            "Siemens",
            15,
            "Complete control board failure",
            Recommendation::Replace,
        ),
        scenario(
            "Manufacturer Referral - Safety Issue",
            "Safety concern detected - immediate manufacturer attention required",
            "cooktop",
            "Miele",
            1,
            "Smoke coming from unit, burning smell",
            Recommendation::ManufacturerReferral,
        ),
        scenario(
            "Premium Customer - High-End Repair",
            "Gold tier customer with expensive device - repair prioritized",
            "dishwasher",
            "V-Zug",
            5,
            "Water leak from door seal",
            Recommendation::Repair,
        ),
    ]
}

fn scenario(
    name: &str,
    description: &str,
    device_type: &str,
    brand: &str,
    age: u32,
    error_description: &str,
    expected_outcome: Recommendation,
) -> DemoScenario {
    DemoScenario {
        name: name.to_owned(),
        description: description.to_owned(),
        input: ServiceCaseInput {
            device_type: device_type.to_owned(),
            brand: brand.to_owned(),
            age: Some(age),
            error_description: error_description.to_owned(),
            ..ServiceCaseInput::default()
        },
        expected_outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::demo_scenarios;
    use crate::audit::{AuditContext, InMemoryAuditSink};
    use crate::pipeline::workflow::ServiceWorkflow;
    use crate::rules::RulesEngine;

    #[test]
    fn every_scenario_reaches_its_expected_outcome() {
        let workflow = ServiceWorkflow::builtin();
        let rules = RulesEngine::default();

        for scenario in demo_scenarios() {
            let case = scenario.input.clone().into_case();
            let outcome = workflow
                .process(
                    &case,
                    &rules,
                    &InMemoryAuditSink::default(),
                    &AuditContext::new(None, "req-demo", "test"),
                )
                .expect("process");
            assert_eq!(outcome.recommendation, scenario.expected_outcome, "{}", scenario.name);
        }
    }

    #[test]
    fn cooktop_repair_is_high_confidence() {
        let scenario = &demo_scenarios()[0];
        let outcome = ServiceWorkflow::builtin()
            .process(
                &scenario.input.clone().into_case(),
                &RulesEngine::default(),
                &InMemoryAuditSink::default(),
                &AuditContext::new(None, "req-demo", "test"),
            )
            .expect("process");

        assert!((outcome.confidence_score - 0.95).abs() < 1e-9);
        let order = outcome.repair_order.expect("repair order");
        assert_eq!(order.cost_breakdown.total_cost.to_string(), "220");
    }

    #[test]
    fn oven_replacement_offers_ranked_options() {
        let scenario = &demo_scenarios()[1];
        let outcome = ServiceWorkflow::builtin()
            .process(
                &scenario.input.clone().into_case(),
                &RulesEngine::default(),
                &InMemoryAuditSink::default(),
                &AuditContext::new(None, "req-demo", "test"),
            )
            .expect("process");

        assert_eq!(outcome.replacement_options.len(), 2);
        assert_eq!(outcome.replacement_options[0].ranking_position, 1);
        assert!(outcome.business_rules.is_some());
    }
}
