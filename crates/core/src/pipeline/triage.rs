use serde::{Deserialize, Serialize};

use crate::domain::case::ServiceCase;

pub const SAFETY_KEYWORDS: &[&str] =
    &["smoke", "fire", "burning", "electric shock", "gas leak", "sparks"];
const WARRANTY_DEVICES: &[&str] = &["oven", "refrigerator"];
const END_OF_LIFE_AGE: u32 = 15;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageStatus {
    Complete,
    Incomplete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageRoute {
    Normal,
    ReplacementFocus,
    Manufacturer,
    UrgentManufacturer,
    ManualReview,
}

impl TriageRoute {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::ReplacementFocus => "replacement_focus",
            Self::Manufacturer => "manufacturer",
            Self::UrgentManufacturer => "urgent_manufacturer",
            Self::ManualReview => "manual_review",
        }
    }

    /// Routes that end the pipeline without analysis.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Manufacturer | Self::UrgentManufacturer | Self::ManualReview)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageDecision {
    pub status: TriageStatus,
    pub route: TriageRoute,
    pub reasoning: String,
}

impl TriageDecision {
    fn complete(route: TriageRoute, reasoning: impl Into<String>) -> Self {
        Self { status: TriageStatus::Complete, route, reasoning: reasoning.into() }
    }
}

pub fn triage(case: &ServiceCase) -> TriageDecision {
    let missing = case.missing_fields();
    if !missing.is_empty() {
        return TriageDecision {
            status: TriageStatus::Incomplete,
            route: TriageRoute::ManualReview,
            reasoning: format!("Missing mandatory field information: {}", missing.join(", ")),
        };
    }

    let description = case.normalized_description();
    if SAFETY_KEYWORDS.iter().any(|keyword| description.contains(keyword)) {
        return TriageDecision::complete(
            TriageRoute::UrgentManufacturer,
            "Safety concern detected - requires immediate manufacturer attention",
        );
    }

    let age = case.age_years();
    let device_type = case.normalized_device_type();
    if age <= 1 && WARRANTY_DEVICES.contains(&device_type.as_str()) {
        return TriageDecision::complete(
            TriageRoute::Manufacturer,
            format!("Device age {age} year(s) - likely under manufacturer warranty"),
        );
    }

    if age >= END_OF_LIFE_AGE {
        return TriageDecision::complete(
            TriageRoute::ReplacementFocus,
            format!("Device age {age} years exceeds typical lifespan"),
        );
    }

    TriageDecision::complete(
        TriageRoute::Normal,
        "Standard service case - proceeding with full analysis",
    )
}
