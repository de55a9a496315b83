use serde::{Deserialize, Serialize};

/// Final disposition of a service case. Declaration order doubles as the
/// tie-break order when rule weights are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Repair,
    Replace,
    ManufacturerReferral,
    ManualReview,
}

impl Recommendation {
    pub const ALL: [Recommendation; 4] =
        [Self::Repair, Self::Replace, Self::ManufacturerReferral, Self::ManualReview];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Repair => "repair",
            Self::Replace => "replace",
            Self::ManufacturerReferral => "manufacturer_referral",
            Self::ManualReview => "manual_review",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|candidate| candidate.as_str() == value)
    }
}
