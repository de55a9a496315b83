use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::ReferenceCatalog;
use crate::domain::case::ServiceCase;
use crate::domain::customer::CustomerTier;
use crate::domain::product::ReplacementProduct;
use crate::domain::recommendation::Recommendation;
use crate::pipeline::enrichment::EnrichedCase;

const REPAIR_THRESHOLD: u32 = 60;
const TYPICAL_LIFESPAN_YEARS: f64 = 15.0;
const FALLBACK_REPLACEMENT_VALUE: i64 = 2000;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EconomicFactors {
    pub repair_within_ceiling: bool,
    pub repair_cost_ratio: f64,
    pub customer_tier: CustomerTier,
    pub device_age_factor: f64,
    pub sustainability_impact: bool,
    pub replacement_margin_opportunity: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EconomicAssessment {
    pub economic_viability: Recommendation,
    pub economic_reasoning: String,
    pub economic_score: u32,
    pub repair_roi: f64,
    pub best_replacement_margin: Decimal,
    pub replacement_value: Decimal,
    pub cost_effectiveness_ratio: f64,
    pub detailed_reasoning: Vec<String>,
    pub factors: EconomicFactors,
}

pub fn assess_economic(
    case: &ServiceCase,
    enriched: &EnrichedCase,
    catalog: &ReferenceCatalog,
) -> EconomicAssessment {
    let repair_cost = enriched.repair.estimated_repair_cost;
    let ceiling = enriched.cost_ceiling;
    let current_value = enriched.market.current_market_value;
    let age = case.age_years();

    let repair_roi = if repair_cost > Decimal::ZERO {
        ((current_value - repair_cost) / repair_cost).to_f64().unwrap_or(0.0)
    } else {
        0.0
    };
    let cost_ratio = if current_value > Decimal::ZERO {
        (repair_cost / current_value).to_f64().unwrap_or(1.0)
    } else {
        1.0
    };

    let best = best_margin_product(catalog.replacements(&case.device_type));
    let best_replacement_margin = best.map_or(Decimal::ZERO, |product| product.margin);
    let replacement_value =
        best.map_or(Decimal::from(FALLBACK_REPLACEMENT_VALUE), |product| product.price);

    let factors = EconomicFactors {
        repair_within_ceiling: repair_cost <= ceiling,
        repair_cost_ratio: cost_ratio,
        customer_tier: enriched.customer.tier,
        device_age_factor: f64::from(age) / TYPICAL_LIFESPAN_YEARS,
        sustainability_impact: age < 8,
        replacement_margin_opportunity: best_replacement_margin,
    };

    let mut score = 0;
    let mut reasoning = Vec::new();

    if factors.repair_within_ceiling {
        score += 40;
        reasoning.push(format!("Repair cost ({repair_cost} CHF) within ceiling ({ceiling} CHF)"));
    } else {
        reasoning.push(format!("Repair cost ({repair_cost} CHF) exceeds ceiling ({ceiling} CHF)"));
    }

    if cost_ratio < 0.5 {
        score += 25;
        reasoning.push("Repair cost is reasonable relative to device value".to_owned());
    } else if cost_ratio < 0.8 {
        score += 10;
        reasoning.push("Repair cost is acceptable relative to device value".to_owned());
    } else {
        reasoning.push("Repair cost is high relative to device value".to_owned());
    }

    match factors.customer_tier {
        CustomerTier::Gold | CustomerTier::Platinum => {
            score += 15;
            reasoning.push("Premium customer - prioritize satisfaction".to_owned());
        }
        CustomerTier::Silver => score += 10,
        CustomerTier::Standard => {}
    }

    if factors.sustainability_impact {
        score += 10;
        reasoning.push("Environmental benefit from repair".to_owned());
    }

    if factors.device_age_factor < 0.5 {
        score += 10;
        reasoning.push("Device is relatively new".to_owned());
    }

    let (economic_viability, economic_reasoning) = if score >= REPAIR_THRESHOLD {
        (Recommendation::Repair, "Economic analysis favors repair".to_owned())
    } else {
        (
            Recommendation::Replace,
            format!(
                "Economic analysis favors replacement (margin opportunity: {best_replacement_margin} CHF)"
            ),
        )
    };

    EconomicAssessment {
        economic_viability,
        economic_reasoning,
        economic_score: score,
        repair_roi,
        best_replacement_margin,
        replacement_value,
        cost_effectiveness_ratio: cost_ratio,
        detailed_reasoning: reasoning,
        factors,
    }
}

/// Product with the highest margin share; ties keep catalog order.
pub fn best_margin_product(products: &[ReplacementProduct]) -> Option<&ReplacementProduct> {
    products.iter().fold(None, |best: Option<&ReplacementProduct>, product| match best {
        Some(current) if current.margin_percentage() >= product.margin_percentage() => Some(current),
        _ => Some(product),
    })
}
