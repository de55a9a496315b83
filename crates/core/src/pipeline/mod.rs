//! Decision pipeline: triage, enrichment, technical and economic analysis,
//! synthesis, and the workflow that strings them together.

pub mod economic;
pub mod enrichment;
pub mod recommend;
pub mod repair_order;
pub mod replacement;
pub mod scenarios;
pub mod technical;
pub mod triage;
pub mod workflow;

pub use economic::{assess_economic, EconomicAssessment, EconomicFactors};
pub use enrichment::{CatalogEnrichment, EnrichedCase, EnrichmentSource, MarketData, RepairEstimate};
pub use recommend::{synthesize, DecisionTrace, RecommendationOutcome};
pub use repair_order::{RepairOrder, RepairOrderId};
pub use replacement::{rank_replacements, ReplacementOption};
pub use scenarios::{demo_scenarios, DemoScenario};
pub use technical::{assess_technical, Complexity, DamageClass, TechnicalAssessment, WarrantyStatus};
pub use triage::{triage, TriageDecision, TriageRoute, TriageStatus};
pub use workflow::{
    workflow_visualization, CaseOutcome, ServiceWorkflow, WorkflowError, WorkflowOptions,
    WorkflowStage,
};
