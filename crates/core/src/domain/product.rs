use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    High,
    Medium,
    Low,
    OutOfStock,
}

impl StockLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::OutOfStock => "out_of_stock",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnergyRating {
    #[serde(rename = "A+++")]
    APlusPlusPlus,
    #[serde(rename = "A++")]
    APlusPlus,
    #[serde(rename = "A+")]
    APlus,
    A,
    B,
}

impl EnergyRating {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::APlusPlusPlus => "A+++",
            Self::APlusPlus => "A++",
            Self::APlus => "A+",
            Self::A => "A",
            Self::B => "B",
        }
    }

    pub fn is_top_tier(self) -> bool {
        matches!(self, Self::APlusPlusPlus | Self::APlusPlus)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementProduct {
    pub brand: String,
    pub model: String,
    pub price: Decimal,
    pub margin: Decimal,
    pub stock: StockLevel,
    pub energy_rating: EnergyRating,
    pub features: Vec<String>,
}

impl ReplacementProduct {
    /// Margin as a percentage of the list price.
    pub fn margin_percentage(&self) -> Decimal {
        if self.price.is_zero() {
            return Decimal::ZERO;
        }
        self.margin / self.price * Decimal::ONE_HUNDRED
    }
}
