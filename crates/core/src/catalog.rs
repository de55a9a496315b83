//! Static reference data: appliance failure patterns, replacement offers and
//! purchase values used by enrichment and analysis.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::{EnergyRating, ReplacementProduct, StockLevel};

pub const DEFAULT_WARRANTY_YEARS: u32 = 2;

const STOP_WORDS: &[&str] = &[
    "after", "also", "been", "does", "from", "have", "into", "only", "some", "that", "than",
    "then", "there", "this", "unit", "very", "when", "will", "with",
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FailurePattern {
    pub code: String,
    pub description: String,
    pub repair_cost: Decimal,
    pub success_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApplianceProfile {
    pub device_type: String,
    pub brand: String,
    pub warranty_years: u32,
    pub avg_lifespan: u32,
    pub failure_patterns: Vec<FailurePattern>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceCatalog {
    pub appliances: Vec<ApplianceProfile>,
    pub replacements: BTreeMap<String, Vec<ReplacementProduct>>,
    pub original_values: BTreeMap<String, Decimal>,
    pub default_original_value: Decimal,
}

impl Default for ReferenceCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ReferenceCatalog {
    pub fn builtin() -> Self {
        let appliances = vec![
            appliance(
                "cooktop",
                "V-Zug",
                2,
                12,
                vec![
                    pattern("E26", "Water in machine, pump not draining", 180, 0.95),
                    pattern("F7_E3", "Heating element failure", 220, 0.90),
                    pattern("power_issue", "No power/not turning on", 150, 0.85),
                ],
            ),
            appliance(
                "cooktop",
                "Miele",
                2,
                15,
                vec![
                    pattern("heating_failure", "Uneven heating", 280, 0.88),
                    pattern("display_error", "Display not working", 320, 0.75),
                    pattern("sensor_fault", "Temperature sensor malfunction", 200, 0.92),
                ],
            ),
            appliance(
                "dishwasher",
                "V-Zug",
                2,
                10,
                vec![
                    pattern("water_leak", "Water leaking from door", 160, 0.94),
                    pattern("not_cleaning", "Poor cleaning performance", 120, 0.90),
                    pattern("pump_noise", "Unusual pump noise", 240, 0.85),
                ],
            ),
            appliance(
                "oven",
                "Siemens",
                2,
                12,
                vec![
                    pattern("door_seal", "Door seal damaged", 200, 0.95),
                    pattern("heating_element", "Heating element burned out", 300, 0.88),
                    pattern("temperature_control", "Temperature not accurate", 250, 0.90),
                ],
            ),
        ];

        let mut replacements = BTreeMap::new();
        replacements.insert(
            "cooktop".to_owned(),
            vec![
                product(
                    "V-Zug",
                    "AdoraID V6000 Supreme",
                    2400,
                    480,
                    StockLevel::High,
                    EnergyRating::APlusPlus,
                    &["Induction", "Touch Control", "Bridge Function"],
                ),
                product(
                    "V-Zug",
                    "AdoraID V4000",
                    1800,
                    360,
                    StockLevel::Medium,
                    EnergyRating::APlus,
                    &["Induction", "Touch Control"],
                ),
                product(
                    "Miele",
                    "KM 7897 FL",
                    2800,
                    560,
                    StockLevel::Low,
                    EnergyRating::APlusPlus,
                    &["Induction", "Con@ct 2.0", "PowerFlex"],
                ),
                product(
                    "Siemens",
                    "EX875LYC1E",
                    1200,
                    240,
                    StockLevel::High,
                    EnergyRating::A,
                    &["Induction", "Touch Control"],
                ),
            ],
        );
        replacements.insert(
            "dishwasher".to_owned(),
            vec![
                product(
                    "V-Zug",
                    "Adora SL V4000",
                    1600,
                    320,
                    StockLevel::High,
                    EnergyRating::APlusPlusPlus,
                    &["OptiDos", "EcoManagement", "Silence Program"],
                ),
                product(
                    "Miele",
                    "G 7960 SCVi",
                    2200,
                    440,
                    StockLevel::Medium,
                    EnergyRating::APlusPlusPlus,
                    &["AutoDos", "Perfect GlassCare", "3D+ Cutlery Tray"],
                ),
            ],
        );
        replacements.insert(
            "oven".to_owned(),
            vec![
                product(
                    "V-Zug",
                    "Combair V6000 Supreme",
                    3200,
                    640,
                    StockLevel::Medium,
                    EnergyRating::APlusPlus,
                    &["Steam Cooking", "Automatic Programs", "Moisture Plus"],
                ),
                product(
                    "Siemens",
                    "HB678GBS6",
                    1800,
                    360,
                    StockLevel::High,
                    EnergyRating::APlus,
                    &["PerfectBake", "coolStart", "ecoClean Direct"],
                ),
            ],
        );

        let original_values = [("cooktop", 2000), ("dishwasher", 1500), ("oven", 2500)]
            .into_iter()
            .map(|(device, value)| (device.to_owned(), Decimal::from(value)))
            .collect();

        Self {
            appliances,
            replacements,
            original_values,
            default_original_value: Decimal::from(1800),
        }
    }

    pub fn appliance(&self, device_type: &str, brand: &str) -> Option<&ApplianceProfile> {
        let device_type = device_type.trim();
        let brand = brand.trim();
        self.appliances.iter().find(|profile| {
            profile.device_type.eq_ignore_ascii_case(device_type)
                && profile.brand.eq_ignore_ascii_case(brand)
        })
    }

    pub fn warranty_years(&self, device_type: &str, brand: &str) -> u32 {
        self.appliance(device_type, brand)
            .map(|profile| profile.warranty_years)
            .unwrap_or(DEFAULT_WARRANTY_YEARS)
    }

    /// Finds the failure pattern a free-text problem description refers to.
    ///
    /// A pattern whose code words all appear in the description wins outright;
    /// otherwise the pattern sharing the most significant words with the
    /// description is chosen. Ties keep catalog order.
    pub fn match_failure(
        &self,
        device_type: &str,
        brand: &str,
        description: &str,
    ) -> Option<&FailurePattern> {
        let profile = self.appliance(device_type, brand)?;
        let words = tokenize(description);

        let by_code = profile.failure_patterns.iter().find(|pattern| {
            let code_words = tokenize(&pattern.code);
            !code_words.is_empty() && code_words.iter().all(|word| words.contains(word))
        });
        if by_code.is_some() {
            return by_code;
        }

        let significant: Vec<&String> = words.iter().filter(|word| is_significant(word)).collect();
        let mut best: Option<(&FailurePattern, usize)> = None;
        for pattern in &profile.failure_patterns {
            let overlap = tokenize(&pattern.description)
                .iter()
                .filter(|word| is_significant(word) && significant.contains(word))
                .count();
            if overlap > 0 && best.map_or(true, |(_, current)| overlap > current) {
                best = Some((pattern, overlap));
            }
        }
        best.map(|(pattern, _)| pattern)
    }

    pub fn replacements(&self, device_type: &str) -> &[ReplacementProduct] {
        self.replacements
            .get(&device_type.trim().to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn original_value(&self, device_type: &str) -> Decimal {
        self.original_values
            .get(&device_type.trim().to_lowercase())
            .copied()
            .unwrap_or(self.default_original_value)
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn is_significant(word: &str) -> bool {
    word.chars().count() >= 4 && !STOP_WORDS.contains(&word)
}

fn appliance(
    device_type: &str,
    brand: &str,
    warranty_years: u32,
    avg_lifespan: u32,
    failure_patterns: Vec<FailurePattern>,
) -> ApplianceProfile {
    ApplianceProfile {
        device_type: device_type.to_owned(),
        brand: brand.to_owned(),
        warranty_years,
        avg_lifespan,
        failure_patterns,
    }
}

fn pattern(code: &str, description: &str, repair_cost: i64, success_rate: f64) -> FailurePattern {
    FailurePattern {
        code: code.to_owned(),
        description: description.to_owned(),
        repair_cost: Decimal::from(repair_cost),
        success_rate,
    }
}

fn product(
    brand: &str,
    model: &str,
    price: i64,
    margin: i64,
    stock: StockLevel,
    energy_rating: EnergyRating,
    features: &[&str],
) -> ReplacementProduct {
    ReplacementProduct {
        brand: brand.to_owned(),
        model: model.to_owned(),
        price: Decimal::from(price),
        margin: Decimal::from(margin),
        stock,
        energy_rating,
        features: features.iter().map(|feature| (*feature).to_owned()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::ReferenceCatalog;

    #[test]
    fn code_words_in_description_select_the_pattern() {
        let catalog = ReferenceCatalog::builtin();
        let matched = catalog
            .match_failure("Cooktop", "V-Zug", "F7 and E3 error codes, heating element not working")
            .expect("pattern");

        assert_eq!(matched.code, "F7_E3");
        assert_eq!(matched.repair_cost, Decimal::from(220));
    }

    #[test]
    fn description_overlap_is_used_when_no_code_matches() {
        let catalog = ReferenceCatalog::builtin();
        let matched = catalog
            .match_failure("cooktop", "Miele", "the temperature sensor seems off")
            .expect("pattern");

        assert_eq!(matched.code, "sensor_fault");
    }

    #[test]
    fn unrelated_description_matches_nothing() {
        let catalog = ReferenceCatalog::builtin();
        assert!(catalog.match_failure("oven", "Siemens", "Complete control board failure").is_none());
        assert!(catalog.match_failure("fridge", "Bosch", "water leak").is_none());
    }

    #[test]
    fn lookups_fall_back_to_defaults() {
        let catalog = ReferenceCatalog::builtin();

        assert_eq!(catalog.original_value("Oven"), Decimal::from(2500));
        assert_eq!(catalog.original_value("washer"), Decimal::from(1800));
        assert_eq!(catalog.warranty_years("washer", "Bosch"), 2);
        assert_eq!(catalog.replacements("cooktop").len(), 4);
        assert!(catalog.replacements("washer").is_empty());
    }
}
