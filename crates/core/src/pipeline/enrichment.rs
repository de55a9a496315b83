use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{FailurePattern, ReferenceCatalog};
use crate::domain::case::ServiceCase;
use crate::domain::customer::CustomerProfile;
use crate::domain::product::EnergyRating;
use crate::pipeline::triage::TriageDecision;
use crate::pipeline::workflow::WorkflowError;

const DEFAULT_REPAIR_COST: i64 = 300;
const DEFAULT_REPLACEMENT_COST: i64 = 2000;
const STANDARD_WARRANTY_YEARS: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartsAvailability {
    High,
    Medium,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RepairEstimate {
    pub estimated_repair_cost: Decimal,
    pub parts_cost: Decimal,
    pub labor_cost: Decimal,
    pub parts_availability: PartsAvailability,
    pub estimated_repair_time: String,
    pub technician_availability: String,
    pub matched_pattern: Option<FailurePattern>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    pub original_purchase_price: Decimal,
    pub current_market_value: Decimal,
    pub energy_rating: EnergyRating,
    pub installation_dimensions: String,
    pub warranty_remaining_years: u32,
    pub replacement_models_available: usize,
    pub average_replacement_cost: Decimal,
    pub sustainability_score: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnrichedCase {
    pub repair: RepairEstimate,
    pub customer: CustomerProfile,
    pub market: MarketData,
    pub cost_ceiling: Decimal,
}

/// Source of the cost, customer and market data a case is analysed with.
pub trait EnrichmentSource: Send + Sync {
    fn enrich(
        &self,
        case: &ServiceCase,
        triage: &TriageDecision,
    ) -> Result<EnrichedCase, WorkflowError>;
}

#[derive(Clone, Debug)]
pub struct CatalogEnrichment {
    catalog: Arc<ReferenceCatalog>,
    customer: CustomerProfile,
}

impl CatalogEnrichment {
    pub fn new(catalog: Arc<ReferenceCatalog>) -> Self {
        Self { catalog, customer: CustomerProfile::premium_default() }
    }

    pub fn with_customer(mut self, customer: CustomerProfile) -> Self {
        self.customer = customer;
        self
    }

    fn repair_estimate(&self, case: &ServiceCase) -> RepairEstimate {
        let matched = self
            .catalog
            .match_failure(&case.device_type, &case.brand, &case.error_description)
            .cloned();
        let (cost, availability) = match &matched {
            Some(pattern) if pattern.success_rate > 0.9 => {
                (pattern.repair_cost, PartsAvailability::High)
            }
            Some(pattern) => (pattern.repair_cost, PartsAvailability::Medium),
            None => (Decimal::from(DEFAULT_REPAIR_COST), PartsAvailability::Medium),
        };

        RepairEstimate {
            estimated_repair_cost: cost,
            parts_cost: (cost * Decimal::new(6, 1)).round_dp(2),
            labor_cost: (cost * Decimal::new(4, 1)).round_dp(2),
            parts_availability: availability,
            estimated_repair_time: "2-5 business days".to_owned(),
            technician_availability: "next week".to_owned(),
            matched_pattern: matched,
        }
    }

    fn market_data(&self, case: &ServiceCase, age: u32) -> MarketData {
        let original = self.catalog.original_value(&case.device_type);
        let replacements = self.catalog.replacements(&case.device_type);
        let average_replacement_cost = if replacements.is_empty() {
            Decimal::from(DEFAULT_REPLACEMENT_COST)
        } else {
            let total: Decimal = replacements.iter().map(|product| product.price).sum();
            (total / Decimal::from(replacements.len())).round_dp(2)
        };

        MarketData {
            original_purchase_price: original,
            current_market_value: depreciated_value(original, age),
            energy_rating: if age < 5 { EnergyRating::APlus } else { EnergyRating::A },
            installation_dimensions: "60x60x85 cm".to_owned(),
            warranty_remaining_years: STANDARD_WARRANTY_YEARS.saturating_sub(age),
            replacement_models_available: replacements.len(),
            average_replacement_cost,
            sustainability_score: 10u32.saturating_sub(age).max(1),
        }
    }
}

impl EnrichmentSource for CatalogEnrichment {
    fn enrich(
        &self,
        case: &ServiceCase,
        triage: &TriageDecision,
    ) -> Result<EnrichedCase, WorkflowError> {
        if triage.route.is_terminal() {
            return Err(WorkflowError::Enrichment {
                case_id: case.id.to_string(),
                reason: format!("route `{}` does not take enrichment", triage.route.as_str()),
            });
        }
        let age = case.age.ok_or_else(|| WorkflowError::Enrichment {
            case_id: case.id.to_string(),
            reason: "device age is required".to_owned(),
        })?;

        let market = self.market_data(case, age);
        let cost_ceiling = cost_ceiling(market.current_market_value, age);
        Ok(EnrichedCase {
            repair: self.repair_estimate(case),
            customer: self.customer.clone(),
            market,
            cost_ceiling,
        })
    }
}

/// 8 % straight depreciation per year, never below 10 % of the original.
pub fn depreciated_value(original: Decimal, age: u32) -> Decimal {
    let floor = original * Decimal::new(1, 1);
    let mut value = original;
    for _ in 0..age.min(100) {
        value *= Decimal::new(92, 2);
    }
    value.max(floor).round_dp(2)
}

/// Most the business will spend on a repair before preferring replacement.
pub fn cost_ceiling(current_value: Decimal, age: u32) -> Decimal {
    let share = current_value * Decimal::new(6, 1);
    let ceiling = if age > 10 {
        share.max(Decimal::from(1800)).min(Decimal::from(2500))
    } else {
        share.min(Decimal::from(800))
    };
    ceiling.round_dp(2)
}
