use std::cmp::Ordering;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::ReferenceCatalog;
use crate::domain::case::ServiceCase;
use crate::domain::product::{EnergyRating, ReplacementProduct, StockLevel};
use crate::pipeline::enrichment::EnrichedCase;

const MAX_OPTIONS: usize = 3;
const PREMIUM_BRANDS: &[&str] = &["V-Zug", "Miele"];
const TYPICAL_LIFESPAN_YEARS: u32 = 12;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringBreakdown {
    pub brand_loyalty: String,
    pub margin_optimization: String,
    pub inventory_availability: String,
    pub energy_efficiency: String,
    pub technology_upgrade: String,
    pub price_value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalCostOfOwnership {
    pub initial_cost: Decimal,
    pub annual_operating_cost: Decimal,
    pub tco_10_years: Decimal,
    pub monthly_cost: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SustainabilityImpact {
    pub energy_savings_percent: u32,
    pub co2_reduction_kg_year: f64,
    pub device_lifespan_extension: u32,
    pub recyclability_score: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplacementOption {
    pub product: ReplacementProduct,
    pub recommendation_score: f64,
    pub scoring_breakdown: ScoringBreakdown,
    pub estimated_delivery: String,
    pub installation_included: bool,
    pub warranty_years: u32,
    pub trade_in_value: u32,
    pub financing_available: bool,
    pub recommended_reason: String,
    pub total_cost_of_ownership: TotalCostOfOwnership,
    pub sustainability_impact: SustainabilityImpact,
    pub ranking_position: usize,
    pub recommendation_confidence: String,
}

/// Scores every affordable replacement for the case's device type and
/// returns the best three, highest score first.
pub fn rank_replacements(
    case: &ServiceCase,
    enriched: &EnrichedCase,
    catalog: &ReferenceCatalog,
) -> Vec<ReplacementOption> {
    let age = case.age_years();
    let device_type = case.normalized_device_type();
    let multiplier = if age > 10 { Decimal::from(2) } else { Decimal::new(15, 1) };
    let max_price = enriched.cost_ceiling * multiplier;

    let affordable: Vec<&ReplacementProduct> = catalog
        .replacements(&device_type)
        .iter()
        .filter(|product| product.price <= max_price)
        .collect();
    if affordable.is_empty() {
        return Vec::new();
    }

    let preferred_brands = if case.customer_preferences.preferred_brands.is_empty() {
        &enriched.customer.brand_loyalty
    } else {
        &case.customer_preferences.preferred_brands
    };
    let max_margin = affordable.iter().map(|product| product.margin).max().unwrap_or(Decimal::ZERO);
    let average_price = affordable.iter().map(|product| product.price).sum::<Decimal>()
        / Decimal::from(affordable.len());

    let mut options: Vec<ReplacementOption> = affordable
        .into_iter()
        .map(|product| {
            let is_preferred = preferred_brands.iter().any(|brand| brand.eq_ignore_ascii_case(&product.brand));
            let (brand_score, brand_note) = if is_preferred {
                (25.0, "Preferred brand match: +25".to_owned())
            } else {
                (10.0, "Alternative brand: +10".to_owned())
            };

            let margin_score = if max_margin > Decimal::ZERO {
                (product.margin / max_margin).to_f64().unwrap_or(0.0) * 25.0
            } else {
                0.0
            };

            let stock_score = stock_score(product.stock);
            let energy_score = energy_score(product.energy_rating);

            let (upgrade_score, upgrade_note) = if age > 8 {
                (10.0, "Significant technology upgrade: +10")
            } else if age > 4 {
                (6.0, "Moderate technology upgrade: +6")
            } else {
                (2.0, "Minimal upgrade benefit: +2")
            };

            let (price_score, price_note) = if product.price <= average_price * Decimal::new(9, 1) {
                (5.0, "Excellent value (below avg price): +5")
            } else if product.price <= average_price * Decimal::new(11, 1) {
                (3.0, "Good value (avg price): +3")
            } else {
                (1.0, "Premium pricing: +1")
            };

            let raw_score =
                brand_score + margin_score + stock_score + energy_score + upgrade_score + price_score;
            let score = (raw_score * 10.0).round() / 10.0;

            ReplacementOption {
                recommendation_score: score,
                scoring_breakdown: ScoringBreakdown {
                    brand_loyalty: brand_note,
                    margin_optimization: format!("Margin score: +{margin_score:.1}"),
                    inventory_availability: format!(
                        "Stock level ({}): +{stock_score}",
                        product.stock.as_str()
                    ),
                    energy_efficiency: format!(
                        "Energy rating ({}): +{energy_score}",
                        product.energy_rating.as_str()
                    ),
                    technology_upgrade: upgrade_note.to_owned(),
                    price_value: price_note.to_owned(),
                },
                estimated_delivery: delivery_estimate(product.stock).to_owned(),
                installation_included: true,
                warranty_years: warranty_years(&product.brand),
                trade_in_value: trade_in_value(age, &device_type),
                financing_available: product.price > Decimal::from(1500),
                recommended_reason: recommendation_reason(product, raw_score, is_preferred),
                total_cost_of_ownership: total_cost_of_ownership(product),
                sustainability_impact: sustainability_impact(product, age),
                ranking_position: 0,
                recommendation_confidence: String::new(),
                product: product.clone(),
            }
        })
        .collect();

    options.sort_by(|left, right| {
        right
            .recommendation_score
            .partial_cmp(&left.recommendation_score)
            .unwrap_or(Ordering::Equal)
    });
    options.truncate(MAX_OPTIONS);
    for (index, option) in options.iter_mut().enumerate() {
        option.ranking_position = index + 1;
        option.recommendation_confidence = confidence_label(option.recommendation_score).to_owned();
    }
    options
}

fn stock_score(stock: StockLevel) -> f64 {
    match stock {
        StockLevel::High => 20.0,
        StockLevel::Medium => 12.0,
        StockLevel::Low => 5.0,
        StockLevel::OutOfStock => 0.0,
    }
}

fn energy_score(rating: EnergyRating) -> f64 {
    match rating {
        EnergyRating::APlusPlusPlus => 15.0,
        EnergyRating::APlusPlus => 12.0,
        EnergyRating::APlus => 9.0,
        EnergyRating::A => 6.0,
        EnergyRating::B => 3.0,
    }
}

fn confidence_label(score: f64) -> &'static str {
    if score > 70.0 {
        "High"
    } else if score > 50.0 {
        "Medium"
    } else {
        "Standard"
    }
}

pub fn delivery_estimate(stock: StockLevel) -> &'static str {
    match stock {
        StockLevel::High => "1-2 weeks",
        StockLevel::Medium => "2-3 weeks",
        StockLevel::Low => "3-4 weeks",
        StockLevel::OutOfStock => "4-6 weeks",
    }
}

pub fn warranty_years(brand: &str) -> u32 {
    if is_premium_brand(brand) {
        3
    } else {
        2
    }
}

/// Trade-in credit for the old device: 15 % depreciation per year, never
/// below a tenth of the base value.
pub fn trade_in_value(age: u32, device_type: &str) -> u32 {
    let base = match device_type {
        "oven" => 300.0,
        "dishwasher" => 250.0,
        _ => 200.0,
    };
    let exponent = i32::try_from(age.min(100)).unwrap_or(100);
    let factor = 0.85_f64.powi(exponent).max(0.1);
    (base * factor) as u32
}

pub fn total_cost_of_ownership(product: &ReplacementProduct) -> TotalCostOfOwnership {
    let energy = if product.energy_rating.is_top_tier() { 120 } else { 150 };
    let annual_operating_cost = Decimal::from(energy + 50);
    let tco_10_years = product.price + annual_operating_cost * Decimal::from(10);
    TotalCostOfOwnership {
        initial_cost: product.price,
        annual_operating_cost,
        tco_10_years,
        monthly_cost: (tco_10_years / Decimal::from(120)).round_dp(2),
    }
}

pub fn sustainability_impact(product: &ReplacementProduct, age: u32) -> SustainabilityImpact {
    let energy_savings_percent = if product.energy_rating.is_top_tier() { 30 } else { 15 };
    SustainabilityImpact {
        energy_savings_percent,
        co2_reduction_kg_year: f64::from(energy_savings_percent) * 2.5,
        device_lifespan_extension: TYPICAL_LIFESPAN_YEARS.saturating_sub(age),
        recyclability_score: if is_premium_brand(&product.brand) { "High" } else { "Medium" }
            .to_owned(),
    }
}

fn recommendation_reason(product: &ReplacementProduct, score: f64, is_preferred: bool) -> String {
    let mut reasons = Vec::new();
    if is_preferred {
        reasons.push("Matches your brand preference");
    }
    if product.stock == StockLevel::High {
        reasons.push("Available for quick delivery");
    }
    if product.energy_rating.is_top_tier() {
        reasons.push("Excellent energy efficiency");
    }
    if score > 80.0 {
        reasons.push("Outstanding overall value");
    } else if score > 60.0 {
        reasons.push("Great value proposition");
    }
    if product.margin > Decimal::from(400) {
        reasons.push("Competitive pricing");
    }
    if reasons.is_empty() {
        reasons.push("Good fit for your requirements");
    }
    reasons.truncate(3);
    reasons.join(" • ")
}

fn is_premium_brand(brand: &str) -> bool {
    PREMIUM_BRANDS.iter().any(|premium| premium.eq_ignore_ascii_case(brand))
}
