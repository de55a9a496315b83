use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceCaseId(pub String);

impl ServiceCaseId {
    pub fn generate() -> Self {
        Self(format!("SC-{}", Uuid::new_v4()))
    }
}

impl fmt::Display for ServiceCaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CasePriority {
    #[default]
    Standard,
    High,
    Urgent,
}

impl CasePriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "standard" => Some(Self::Standard),
            "high" => Some(Self::High),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerPreferences {
    #[serde(default)]
    pub preferred_brands: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCase {
    pub id: ServiceCaseId,
    pub device_type: String,
    pub brand: String,
    pub age: Option<u32>,
    pub error_description: String,
    pub customer_preferences: CustomerPreferences,
    pub priority: CasePriority,
}

impl ServiceCase {
    /// Mandatory fields that are absent or blank, in declaration order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.device_type.trim().is_empty() {
            missing.push("device_type");
        }
        if self.brand.trim().is_empty() {
            missing.push("brand");
        }
        if self.age.is_none() {
            missing.push("age");
        }
        if self.error_description.trim().is_empty() {
            missing.push("error_description");
        }
        missing
    }

    pub fn normalized_device_type(&self) -> String {
        self.device_type.trim().to_lowercase()
    }

    pub fn normalized_description(&self) -> String {
        self.error_description.trim().to_lowercase()
    }

    pub fn age_years(&self) -> u32 {
        self.age.unwrap_or(0)
    }
}

/// Wire shape of an incoming case; every field may be omitted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCaseInput {
    #[serde(default)]
    pub device_type: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub error_description: String,
    #[serde(default)]
    pub customer_preferences: CustomerPreferences,
    #[serde(default)]
    pub priority: CasePriority,
}

impl ServiceCaseInput {
    pub fn into_case(self) -> ServiceCase {
        ServiceCase {
            id: ServiceCaseId::generate(),
            device_type: self.device_type.trim().to_owned(),
            brand: self.brand.trim().to_owned(),
            age: self.age,
            error_description: self.error_description.trim().to_owned(),
            customer_preferences: self.customer_preferences,
            priority: self.priority,
        }
    }
}
