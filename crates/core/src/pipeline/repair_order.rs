use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::case::{CasePriority, ServiceCase};
use crate::pipeline::enrichment::EnrichedCase;
use crate::pipeline::technical::{TechnicalAssessment, WarrantyStatus};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepairOrderId(pub String);

impl RepairOrderId {
    pub fn generate() -> Self {
        let suffix: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
        Self(format!("REP-{}", suffix.to_uppercase()))
    }
}

impl fmt::Display for RepairOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_type: String,
    pub brand: String,
    pub age: Option<u32>,
    pub error_description: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub parts_cost: Decimal,
    pub labor_cost: Decimal,
    pub total_cost: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairTimeline {
    pub estimated_duration: String,
    pub technician_availability: String,
    pub parts_delivery: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarrantyInfo {
    pub status: WarrantyStatus,
    pub repair_warranty: String,
    pub coverage: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnicianAssignment {
    pub skill_level_required: String,
    pub estimated_duration: String,
    pub priority: CasePriority,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityAssurance {
    pub follow_up_required: bool,
    pub customer_satisfaction_survey: bool,
    pub warranty_registration: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairOrderStatus {
    Created,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairOrder {
    pub order_id: RepairOrderId,
    pub device_info: DeviceInfo,
    pub cost_breakdown: CostBreakdown,
    pub timeline: RepairTimeline,
    pub warranty_info: WarrantyInfo,
    pub priority: CasePriority,
    pub technician_assignment: TechnicianAssignment,
    pub quality_assurance: QualityAssurance,
    pub special_instructions: String,
    pub status: RepairOrderStatus,
    pub created_at: DateTime<Utc>,
}

impl RepairOrder {
    pub fn generate(
        case: &ServiceCase,
        enriched: &EnrichedCase,
        technical: &TechnicalAssessment,
    ) -> Self {
        let technician_priority = if case.normalized_description().contains("urgent") {
            CasePriority::High
        } else {
            CasePriority::Standard
        };

        Self {
            order_id: RepairOrderId::generate(),
            device_info: DeviceInfo {
                device_type: case.device_type.clone(),
                brand: case.brand.clone(),
                age: case.age,
                error_description: case.error_description.clone(),
            },
            cost_breakdown: CostBreakdown {
                parts_cost: enriched.repair.parts_cost,
                labor_cost: enriched.repair.labor_cost,
                total_cost: enriched.repair.estimated_repair_cost,
            },
            timeline: RepairTimeline {
                estimated_duration: technical.estimated_timeline.clone(),
                technician_availability: enriched.repair.technician_availability.clone(),
                parts_delivery: "2-3 days".to_owned(),
            },
            warranty_info: WarrantyInfo {
                status: technical.warranty_status,
                repair_warranty: "6 months".to_owned(),
                coverage: "parts and labor".to_owned(),
            },
            priority: case.priority,
            technician_assignment: TechnicianAssignment {
                skill_level_required: technical.required_expertise.clone(),
                estimated_duration: technical.estimated_timeline.clone(),
                priority: technician_priority,
            },
            quality_assurance: QualityAssurance {
                follow_up_required: true,
                customer_satisfaction_survey: true,
                warranty_registration: true,
            },
            special_instructions:
                "Follow standard safety protocols. Customer preferred contact: email".to_owned(),
            status: RepairOrderStatus::Created,
            created_at: Utc::now(),
        }
    }
}
