use serde::{Deserialize, Serialize};

use crate::catalog::ReferenceCatalog;
use crate::domain::case::ServiceCase;
use crate::pipeline::enrichment::EnrichedCase;

const ELECTRICAL_KEYWORDS: &[&str] = &["power", "display", "electric", "electronic", "circuit", "control"];
const MECHANICAL_KEYWORDS: &[&str] = &["leak", "pump", "door", "seal", "heating", "noise", "vibration"];
const DEFAULT_SUCCESS_RATE: f64 = 0.75;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarrantyStatus {
    UnderWarranty,
    OutOfWarranty,
}

impl WarrantyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnderWarranty => "under_warranty",
            Self::OutOfWarranty => "out_of_warranty",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageClass {
    Electrical,
    Mechanical,
    Unknown,
}

impl DamageClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Electrical => "electrical",
            Self::Mechanical => "mechanical",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TechnicalAssessment {
    pub warranty_status: WarrantyStatus,
    pub damage_classification: DamageClass,
    pub matched_error_pattern: Option<String>,
    pub base_probability: f64,
    pub age_impact_factor: f64,
    pub repair_probability: f64,
    pub repair_complexity: Complexity,
    pub estimated_timeline: String,
    pub required_expertise: String,
    pub parts_complexity: String,
    pub risk_assessment: String,
}

pub fn assess_technical(
    case: &ServiceCase,
    enriched: &EnrichedCase,
    catalog: &ReferenceCatalog,
) -> TechnicalAssessment {
    let age = case.age_years();
    let description = case.normalized_description();

    let warranty_status = if age <= catalog.warranty_years(&case.device_type, &case.brand) {
        WarrantyStatus::UnderWarranty
    } else {
        WarrantyStatus::OutOfWarranty
    };

    let damage_classification = if ELECTRICAL_KEYWORDS.iter().any(|word| description.contains(word)) {
        DamageClass::Electrical
    } else if MECHANICAL_KEYWORDS.iter().any(|word| description.contains(word)) {
        DamageClass::Mechanical
    } else {
        DamageClass::Unknown
    };

    let matched = enriched.repair.matched_pattern.as_ref();
    let base_probability = matched.map_or(DEFAULT_SUCCESS_RATE, |pattern| pattern.success_rate);
    let age_impact_factor = age_factor(age);
    let repair_probability = base_probability * age_impact_factor;

    let (repair_complexity, timeline) = if repair_probability > 0.9 {
        (Complexity::Low, "1-2 days")
    } else if repair_probability > 0.7 {
        (Complexity::Medium, "3-5 days")
    } else {
        (Complexity::High, "1-2 weeks")
    };

    TechnicalAssessment {
        warranty_status,
        damage_classification,
        matched_error_pattern: matched.map(|pattern| pattern.code.clone()),
        base_probability,
        age_impact_factor,
        repair_probability,
        repair_complexity,
        estimated_timeline: timeline.to_owned(),
        required_expertise: if repair_complexity == Complexity::High { "specialist" } else { "standard" }
            .to_owned(),
        parts_complexity: if damage_classification == DamageClass::Mechanical {
            "standard"
        } else {
            "electronic"
        }
        .to_owned(),
        risk_assessment: if repair_probability > 0.8 { "low" } else { "medium" }.to_owned(),
    }
}

/// Success probability decays 5 % per year past year five, bottoming out at half.
pub fn age_factor(age: u32) -> f64 {
    if age > 5 {
        (1.0 - f64::from(age - 5) * 0.05).max(0.5)
    } else {
        1.0
    }
}
