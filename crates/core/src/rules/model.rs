use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::recommendation::Recommendation;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleBook {
    pub version: String,
    pub last_updated: String,
    pub rule_sets: BTreeMap<String, RuleSet>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default = "default_priority")]
    pub priority: u32,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

fn default_priority() -> u32 {
    999
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub conditions: Vec<Condition>,
    pub action: RuleAction,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub weight: f64,
    #[serde(rename = "override", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_override: bool,
    pub reasoning: String,
}

fn is_zero(weight: &f64) -> bool {
    *weight == 0.0
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_field: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub match_any: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "equals")]
    Equals,
    #[serde(rename = "gt")]
    GreaterThan,
    #[serde(rename = "lt")]
    LessThan,
    #[serde(rename = "gte")]
    GreaterEqual,
    #[serde(rename = "lte")]
    LessEqual,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "in_list")]
    InList,
    #[serde(rename = "not_in_list")]
    NotInList,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    RecommendRepair,
    RecommendReplace,
    ReferManufacturer,
    ManualReview,
    Escalate,
    SetPriority,
    ApplyDiscount,
}

impl RuleAction {
    /// Recommendation bucket this action votes for; bookkeeping actions vote
    /// for nothing.
    pub fn recommendation(self) -> Option<Recommendation> {
        match self {
            Self::RecommendRepair => Some(Recommendation::Repair),
            Self::RecommendReplace => Some(Recommendation::Replace),
            Self::ReferManufacturer => Some(Recommendation::ManufacturerReferral),
            Self::ManualReview | Self::Escalate => Some(Recommendation::ManualReview),
            Self::SetPriority | Self::ApplyDiscount => None,
        }
    }
}
