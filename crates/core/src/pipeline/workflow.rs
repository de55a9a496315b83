use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditOutcome, AuditSink};
use crate::catalog::ReferenceCatalog;
use crate::domain::case::{ServiceCase, ServiceCaseId};
use crate::domain::recommendation::Recommendation;
use crate::errors::ApplicationError;
use crate::pipeline::economic::{assess_economic, EconomicAssessment};
use crate::pipeline::enrichment::{CatalogEnrichment, EnrichedCase, EnrichmentSource};
use crate::pipeline::recommend::{synthesize, DecisionTrace};
use crate::pipeline::repair_order::RepairOrder;
use crate::pipeline::replacement::{rank_replacements, ReplacementOption};
use crate::pipeline::technical::{assess_technical, TechnicalAssessment};
use crate::pipeline::triage::{triage, TriageDecision, TriageRoute};
use crate::rules::{RulesEngine, RulesEvaluation};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("enrichment failed for case {case_id}: {reason}")]
    Enrichment { case_id: String, reason: String },
}

impl From<WorkflowError> for ApplicationError {
    fn from(value: WorkflowError) -> Self {
        Self::ReferenceData(value.to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    Triage,
    DataEnrichment,
    TechnicalAnalysis,
    EconomicAnalysis,
    BusinessRules,
    Recommendation,
    ManufacturerReferral,
    ManualReviewRequired,
}

impl WorkflowStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Triage => "triage",
            Self::DataEnrichment => "data_enrichment",
            Self::TechnicalAnalysis => "technical_analysis",
            Self::EconomicAnalysis => "economic_analysis",
            Self::BusinessRules => "business_rules",
            Self::Recommendation => "recommendation",
            Self::ManufacturerReferral => "manufacturer_referral",
            Self::ManualReviewRequired => "manual_review_required",
        }
    }

    fn category(self) -> AuditCategory {
        match self {
            Self::Triage | Self::ManufacturerReferral | Self::ManualReviewRequired => {
                AuditCategory::Triage
            }
            Self::DataEnrichment | Self::TechnicalAnalysis | Self::EconomicAnalysis => {
                AuditCategory::Analysis
            }
            Self::BusinessRules => AuditCategory::Rules,
            Self::Recommendation => AuditCategory::Decision,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowOptions {
    /// Let override rules (e.g. safety) replace the synthesized recommendation.
    pub enforce_rule_overrides: bool,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self { enforce_rule_overrides: true }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaseOutcome {
    pub case_id: ServiceCaseId,
    pub recommendation: Recommendation,
    pub justification: String,
    pub confidence_score: f64,
    pub repair_order: Option<RepairOrder>,
    pub replacement_options: Vec<ReplacementOption>,
    pub triage: TriageDecision,
    pub decision_trace: Option<DecisionTrace>,
    pub business_rules: Option<RulesEvaluation>,
    pub rules_override_applied: bool,
    pub workflow_path: Vec<WorkflowStage>,
    pub processing_time_ms: u64,
    pub decided_at: DateTime<Utc>,
}

pub struct ServiceWorkflow<E = CatalogEnrichment> {
    catalog: Arc<ReferenceCatalog>,
    enrichment: E,
    options: WorkflowOptions,
}

impl ServiceWorkflow<CatalogEnrichment> {
    pub fn new(catalog: Arc<ReferenceCatalog>) -> Self {
        let enrichment = CatalogEnrichment::new(catalog.clone());
        Self { catalog, enrichment, options: WorkflowOptions::default() }
    }

    /// Workflow over the built-in reference catalog.
    pub fn builtin() -> Self {
        Self::new(Arc::new(ReferenceCatalog::builtin()))
    }
}

impl<E> ServiceWorkflow<E>
where
    E: EnrichmentSource,
{
    pub fn with_enrichment(catalog: Arc<ReferenceCatalog>, enrichment: E) -> Self {
        Self { catalog, enrichment, options: WorkflowOptions::default() }
    }

    pub fn with_options(mut self, options: WorkflowOptions) -> Self {
        self.options = options;
        self
    }

    pub fn catalog(&self) -> &ReferenceCatalog {
        &self.catalog
    }

    pub fn options(&self) -> WorkflowOptions {
        self.options
    }

    pub fn process<S>(
        &self,
        case: &ServiceCase,
        rules: &RulesEngine,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<CaseOutcome, WorkflowError>
    where
        S: AuditSink,
    {
        let started = Instant::now();
        let audit = AuditContext { case_id: Some(case.id.clone()), ..audit.clone() };
        let mut path = vec![WorkflowStage::Triage];

        let decision = triage(case);
        emit_stage(
            sink,
            &audit,
            WorkflowStage::Triage,
            &[("route", decision.route.as_str().to_owned()), ("reasoning", decision.reasoning.clone())],
        );

        let early_exit = match decision.route {
            TriageRoute::Manufacturer | TriageRoute::UrgentManufacturer => {
                Some((WorkflowStage::ManufacturerReferral, Recommendation::ManufacturerReferral, 1.0))
            }
            TriageRoute::ManualReview => {
                Some((WorkflowStage::ManualReviewRequired, Recommendation::ManualReview, 0.0))
            }
            TriageRoute::Normal | TriageRoute::ReplacementFocus => None,
        };
        if let Some((stage, recommendation, confidence_score)) = early_exit {
            path.push(stage);
            emit_stage(sink, &audit, stage, &[]);
            let outcome = CaseOutcome {
                case_id: case.id.clone(),
                recommendation,
                justification: decision.reasoning.clone(),
                confidence_score,
                repair_order: None,
                replacement_options: Vec::new(),
                triage: decision,
                decision_trace: None,
                business_rules: None,
                rules_override_applied: false,
                workflow_path: path,
                processing_time_ms: elapsed_ms(started),
                decided_at: Utc::now(),
            };
            emit_decision(sink, &audit, &outcome);
            return Ok(outcome);
        }

        let enriched = match self.enrichment.enrich(case, &decision) {
            Ok(enriched) => enriched,
            Err(error) => {
                sink.emit(
                    audit
                        .event("workflow.stage_failed", AuditCategory::Analysis, AuditOutcome::Failed)
                        .with_metadata("stage", WorkflowStage::DataEnrichment.as_str())
                        .with_metadata("error", error.to_string()),
                );
                tracing::warn!(
                    event_name = "workflow.enrichment_failed",
                    case_id = %case.id,
                    correlation_id = %audit.correlation_id,
                    error = %error,
                    "enrichment failed"
                );
                return Err(error);
            }
        };
        path.push(WorkflowStage::DataEnrichment);
        emit_stage(
            sink,
            &audit,
            WorkflowStage::DataEnrichment,
            &[
                ("repair_cost", enriched.repair.estimated_repair_cost.to_string()),
                ("cost_ceiling", enriched.cost_ceiling.to_string()),
            ],
        );

        let technical = assess_technical(case, &enriched, &self.catalog);
        path.push(WorkflowStage::TechnicalAnalysis);
        emit_stage(
            sink,
            &audit,
            WorkflowStage::TechnicalAnalysis,
            &[("repair_probability", format!("{:.3}", technical.repair_probability))],
        );

        let economic = assess_economic(case, &enriched, &self.catalog);
        path.push(WorkflowStage::EconomicAnalysis);
        emit_stage(
            sink,
            &audit,
            WorkflowStage::EconomicAnalysis,
            &[("economic_score", economic.economic_score.to_string())],
        );

        let evaluation = rules.evaluate(&case_facts(case, &enriched, &technical, &economic));
        path.push(WorkflowStage::BusinessRules);
        emit_stage(
            sink,
            &audit,
            WorkflowStage::BusinessRules,
            &[
                ("rules_recommendation", evaluation.final_recommendation.as_str().to_owned()),
                ("override_applied", evaluation.override_applied.to_string()),
            ],
        );

        let synthesized = synthesize(case, &decision, &enriched, &technical, &economic, &self.catalog);
        path.push(WorkflowStage::Recommendation);

        let mut recommendation = synthesized.recommendation;
        let mut justification = synthesized.justification;
        let mut confidence_score = synthesized.confidence_score;
        let mut repair_order = synthesized.repair_order;
        let mut replacement_options = synthesized.replacement_options;
        let rules_override_applied =
            evaluation.override_applied && self.options.enforce_rule_overrides;

        if rules_override_applied {
            recommendation = evaluation.final_recommendation;
            confidence_score = evaluation.confidence_score;
            if let Some(rule) = evaluation.override_rule() {
                justification = format!("{justification} | Business rule override: {}", rule.reasoning);
            }
            match recommendation {
                Recommendation::Repair => {
                    replacement_options.clear();
                    if repair_order.is_none() {
                        repair_order = Some(RepairOrder::generate(case, &enriched, &technical));
                    }
                }
                Recommendation::Replace => repair_order = None,
                Recommendation::ManufacturerReferral | Recommendation::ManualReview => {
                    repair_order = None;
                    replacement_options.clear();
                }
            }
        }
        if recommendation == Recommendation::Replace && replacement_options.is_empty() {
            replacement_options = rank_replacements(case, &enriched, &self.catalog);
        }

        let outcome = CaseOutcome {
            case_id: case.id.clone(),
            recommendation,
            justification,
            confidence_score,
            repair_order,
            replacement_options,
            triage: decision,
            decision_trace: Some(synthesized.decision_trace),
            business_rules: Some(evaluation),
            rules_override_applied,
            workflow_path: path,
            processing_time_ms: elapsed_ms(started),
            decided_at: Utc::now(),
        };
        emit_decision(sink, &audit, &outcome);
        Ok(outcome)
    }
}

/// Fact document the business rules are evaluated against.
pub fn case_facts(
    case: &ServiceCase,
    enriched: &EnrichedCase,
    technical: &TechnicalAssessment,
    economic: &EconomicAssessment,
) -> Value {
    json!({
        "device_type": case.normalized_device_type(),
        "brand": case.brand,
        "age": case.age_years(),
        "error_description": case.error_description,
        "priority": case.priority.as_str(),
        "customer_tier": enriched.customer.tier.as_str(),
        "repair_cost": enriched.repair.estimated_repair_cost.to_f64(),
        "cost_ceiling": enriched.cost_ceiling.to_f64(),
        "current_market_value": enriched.market.current_market_value.to_f64(),
        "repair_probability": technical.repair_probability,
        "warranty_status": technical.warranty_status.as_str(),
        "damage_classification": technical.damage_classification.as_str(),
        "economic_score": economic.economic_score,
        "replacement_margin": economic.best_replacement_margin.to_f64(),
    })
}

fn emit_stage<S>(sink: &S, audit: &AuditContext, stage: WorkflowStage, details: &[(&str, String)])
where
    S: AuditSink,
{
    let mut event = audit
        .event("workflow.stage_completed", stage.category(), AuditOutcome::Success)
        .with_metadata("stage", stage.as_str());
    for (key, value) in details {
        event = event.with_metadata(*key, value.clone());
    }
    sink.emit(event);
    tracing::debug!(
        event_name = "workflow.stage_completed",
        correlation_id = %audit.correlation_id,
        stage = stage.as_str(),
        "workflow stage completed"
    );
}

fn emit_decision<S>(sink: &S, audit: &AuditContext, outcome: &CaseOutcome)
where
    S: AuditSink,
{
    sink.emit(
        audit
            .event("workflow.decision_recorded", AuditCategory::Decision, AuditOutcome::Success)
            .with_metadata("recommendation", outcome.recommendation.as_str())
            .with_metadata("confidence_score", format!("{:.2}", outcome.confidence_score))
            .with_metadata("route", outcome.triage.route.as_str()),
    );
    tracing::info!(
        event_name = "workflow.decision_recorded",
        case_id = %outcome.case_id,
        correlation_id = %audit.correlation_id,
        recommendation = outcome.recommendation.as_str(),
        confidence_score = outcome.confidence_score,
        processing_time_ms = outcome.processing_time_ms,
        "service case decided"
    );
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

pub fn workflow_visualization() -> &'static str {
    r#"Service Recommendation Workflow

1. TRIAGE
   ├─ Input Validation
   ├─ Safety Check
   ├─ Age/Warranty Assessment
   └─ Routing Decision

2. DATA ENRICHMENT
   ├─ Repair Cost Estimate (failure catalog)
   ├─ Customer Profile
   └─ Market Value & Replacement Catalog

3. TECHNICAL ANALYSIS              4. ECONOMIC ANALYSIS
   ├─ Damage Classification          ├─ Cost-Benefit Analysis
   ├─ Repair Probability             ├─ Margin Analysis
   ├─ Complexity Assessment          ├─ Customer Tier Impact
   └─ Risk Evaluation                └─ Sustainability Factor

5. BUSINESS RULES
   ├─ Priority-Ordered Rule Sets
   ├─ Override Rules (safety)
   └─ Weighted Scoring

6. RECOMMENDATION ENGINE
   ├─ Synthesis of All Data
   ├─ Confidence Scoring
   ├─ Override Logic
   └─ Final Decision + Justification

Possible Outcomes:
• Repair Order (with detailed specifications)
• Replacement Options (ranked by profitability & preference)
• Manufacturer Referral
• Manual Review Required
"#
}
