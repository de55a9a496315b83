use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::{json, Value};

use crate::rules::model::{Condition, Operator, Rule, RuleAction, RuleBook, RuleSet};

/// Rule book written to disk when no rules file exists yet.
pub fn default_rule_book() -> RuleBook {
    let mut rule_sets = BTreeMap::new();

    rule_sets.insert(
        "safety_rules".to_owned(),
        RuleSet {
            priority: 1,
            rules: vec![
                override_rule(
                    "smoke_fire_emergency",
                    vec![any_of("error_description", json!(["smoke", "fire", "burning", "gas leak"]))],
                    RuleAction::ReferManufacturer,
                    "Safety concern detected - immediate manufacturer attention required",
                ),
                override_rule(
                    "electrical_hazard",
                    vec![any_of(
                        "error_description",
                        json!(["electric shock", "sparks", "burning smell from electrical"]),
                    )],
                    RuleAction::ReferManufacturer,
                    "Electrical safety hazard - requires immediate professional attention",
                ),
            ],
        },
    );

    rule_sets.insert(
        "warranty_rules".to_owned(),
        RuleSet {
            priority: 2,
            rules: vec![weighted(
                "under_warranty_new",
                vec![
                    check("age", Operator::LessEqual, json!(1)),
                    check("device_type", Operator::InList, json!(["oven", "refrigerator", "dishwasher"])),
                ],
                RuleAction::ReferManufacturer,
                0.0,
                "Device under warranty - manufacturer responsibility",
            )],
        },
    );

    rule_sets.insert(
        "economic_rules".to_owned(),
        RuleSet {
            priority: 3,
            rules: vec![
                weighted(
                    "high_value_customer_repair_preference",
                    vec![
                        check("customer_tier", Operator::InList, json!(["Gold", "Platinum"])),
                        check("repair_cost", Operator::LessEqual, json!(800)),
                        check("repair_probability", Operator::GreaterEqual, json!(0.7)),
                    ],
                    RuleAction::RecommendRepair,
                    20.0,
                    "Premium customer - prioritize repair when feasible",
                ),
                weighted(
                    "cost_ceiling_exceeded",
                    vec![Condition {
                        field: "repair_cost".to_owned(),
                        operator: Operator::GreaterThan,
                        value: None,
                        value_field: Some("cost_ceiling".to_owned()),
                        match_any: false,
                    }],
                    RuleAction::RecommendReplace,
                    30.0,
                    "Repair cost exceeds economic threshold",
                ),
                weighted(
                    "high_margin_replacement",
                    vec![
                        check("replacement_margin", Operator::GreaterThan, json!(500)),
                        check("repair_probability", Operator::LessThan, json!(0.8)),
                    ],
                    RuleAction::RecommendReplace,
                    25.0,
                    "High margin replacement opportunity with repair uncertainty",
                ),
            ],
        },
    );

    rule_sets.insert(
        "technical_rules".to_owned(),
        RuleSet {
            priority: 4,
            rules: vec![
                weighted(
                    "very_old_device",
                    vec![check("age", Operator::GreaterEqual, json!(15))],
                    RuleAction::RecommendReplace,
                    25.0,
                    "Device exceeds typical lifespan",
                ),
                weighted(
                    "low_repair_probability",
                    vec![check("repair_probability", Operator::LessThan, json!(0.6))],
                    RuleAction::RecommendReplace,
                    20.0,
                    "Low technical success probability",
                ),
                weighted(
                    "high_success_repair",
                    vec![
                        check("repair_probability", Operator::GreaterEqual, json!(0.9)),
                        check("repair_cost", Operator::LessEqual, json!(500)),
                    ],
                    RuleAction::RecommendRepair,
                    25.0,
                    "High success probability with reasonable cost",
                ),
            ],
        },
    );

    rule_sets.insert(
        "sustainability_rules".to_owned(),
        RuleSet {
            priority: 5,
            rules: vec![weighted(
                "young_device_sustainability",
                vec![
                    check("age", Operator::LessThan, json!(8)),
                    check("repair_probability", Operator::GreaterEqual, json!(0.7)),
                ],
                RuleAction::RecommendRepair,
                15.0,
                "Environmental benefit from extending device lifespan",
            )],
        },
    );

    RuleBook { version: "1.0".to_owned(), last_updated: Utc::now().to_rfc3339(), rule_sets }
}

fn check(field: &str, operator: Operator, value: Value) -> Condition {
    Condition { field: field.to_owned(), operator, value: Some(value), value_field: None, match_any: false }
}

fn any_of(field: &str, needles: Value) -> Condition {
    Condition { match_any: true, ..check(field, Operator::Contains, needles) }
}

fn weighted(
    name: &str,
    conditions: Vec<Condition>,
    action: RuleAction,
    weight: f64,
    reasoning: &str,
) -> Rule {
    Rule {
        name: name.to_owned(),
        conditions,
        action,
        weight,
        is_override: false,
        reasoning: reasoning.to_owned(),
    }
}

fn override_rule(name: &str, conditions: Vec<Condition>, action: RuleAction, reasoning: &str) -> Rule {
    Rule { is_override: true, ..weighted(name, conditions, action, 0.0, reasoning) }
}
