use serde::{Deserialize, Serialize};

use crate::catalog::ReferenceCatalog;
use crate::domain::case::ServiceCase;
use crate::domain::recommendation::Recommendation;
use crate::pipeline::economic::EconomicAssessment;
use crate::pipeline::enrichment::EnrichedCase;
use crate::pipeline::repair_order::RepairOrder;
use crate::pipeline::replacement::{rank_replacements, ReplacementOption};
use crate::pipeline::technical::{Complexity, TechnicalAssessment};
use crate::pipeline::triage::TriageDecision;

const ECONOMIC_WEIGHT: f64 = 0.6;
const TECHNICAL_WEIGHT: f64 = 0.4;
const MAX_CONFIDENCE: f64 = 0.95;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TechnicalTrace {
    pub probability: f64,
    pub complexity: Complexity,
    pub risk: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EconomicTrace {
    pub viability: Recommendation,
    pub score: u32,
    pub reasoning: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinalTrace {
    pub confidence: f64,
    pub override_applied: bool,
    pub override_reason: Option<String>,
}

/// How each stage contributed to the decision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionTrace {
    pub triage: TriageDecision,
    pub technical: TechnicalTrace,
    pub economic: EconomicTrace,
    #[serde(rename = "final")]
    pub final_decision: FinalTrace,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationOutcome {
    pub recommendation: Recommendation,
    pub justification: String,
    pub confidence_score: f64,
    pub repair_order: Option<RepairOrder>,
    pub replacement_options: Vec<ReplacementOption>,
    pub decision_trace: DecisionTrace,
}

pub fn synthesize(
    case: &ServiceCase,
    triage: &TriageDecision,
    enriched: &EnrichedCase,
    technical: &TechnicalAssessment,
    economic: &EconomicAssessment,
    catalog: &ReferenceCatalog,
) -> RecommendationOutcome {
    let probability = technical.repair_probability;
    let technical_confidence = probability * 100.0;
    let final_score =
        f64::from(economic.economic_score) * ECONOMIC_WEIGHT + technical_confidence * TECHNICAL_WEIGHT;
    let confidence_score = (final_score / 100.0).min(MAX_CONFIDENCE);
    let tier = enriched.customer.tier;

    let (recommendation, override_reason) = if probability < 0.6 {
        (Recommendation::Replace, Some("Low technical success probability"))
    } else if probability > 0.9 && tier.is_premium() {
        (Recommendation::Repair, Some("High success probability with premium customer"))
    } else {
        (economic.economic_viability, None)
    };

    let mut justification = Vec::new();
    let (repair_order, replacement_options) = if recommendation == Recommendation::Repair {
        justification.push(format!("Technical Analysis: {technical_confidence:.0}% success probability"));
        justification.push(format!("Economic Analysis: Score {}/100", economic.economic_score));
        justification.push(format!("Customer: {} tier", tier.as_str()));
        if let Some(reason) = override_reason {
            justification.push(format!("Override: {reason}"));
        }
        (Some(RepairOrder::generate(case, enriched, technical)), Vec::new())
    } else {
        justification.push("Replacement offers better value proposition".to_owned());
        justification.push(format!("Potential margin: {} CHF", economic.best_replacement_margin));
        justification.push(format!("Technical risk: {:.0}%", 100.0 - technical_confidence));
        (None, rank_replacements(case, enriched, catalog))
    };

    RecommendationOutcome {
        recommendation,
        justification: justification.join(" | "),
        confidence_score,
        repair_order,
        replacement_options,
        decision_trace: DecisionTrace {
            triage: triage.clone(),
            technical: TechnicalTrace {
                probability,
                complexity: technical.repair_complexity,
                risk: technical.risk_assessment.clone(),
            },
            economic: EconomicTrace {
                viability: economic.economic_viability,
                score: economic.economic_score,
                reasoning: economic.economic_reasoning.clone(),
            },
            final_decision: FinalTrace {
                confidence: confidence_score,
                override_applied: override_reason.is_some(),
                override_reason: override_reason.map(str::to_owned),
            },
        },
    }
}
