use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerTier {
    Standard,
    Silver,
    Gold,
    Platinum,
}

impl CustomerTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
            Self::Platinum => "Platinum",
        }
    }

    pub fn is_premium(self) -> bool {
        matches!(self, Self::Gold | Self::Platinum)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub customer_id: String,
    pub name: String,
    pub tier: CustomerTier,
    pub brand_loyalty: Vec<String>,
}

impl CustomerProfile {
    /// Profile used when no CRM lookup is wired in.
    pub fn premium_default() -> Self {
        Self {
            customer_id: "CUST-DEFAULT".to_owned(),
            name: "Premium Customer".to_owned(),
            tier: CustomerTier::Gold,
            brand_loyalty: vec!["V-Zug".to_owned(), "Miele".to_owned()],
        }
    }
}

impl Default for CustomerProfile {
    fn default() -> Self {
        Self::premium_default()
    }
}
