pub mod audit;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod pipeline;
pub mod rules;

pub use audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use catalog::{ApplianceProfile, FailurePattern, ReferenceCatalog};
pub use domain::batch::{
    BatchCaseResult, BatchCaseStatus, BatchCaseSummary, BatchJob, BatchJobId, BatchJobStatus,
};
pub use domain::case::{CasePriority, CustomerPreferences, ServiceCase, ServiceCaseId, ServiceCaseInput};
pub use domain::customer::{CustomerProfile, CustomerTier};
pub use domain::product::{EnergyRating, ReplacementProduct, StockLevel};
pub use domain::recommendation::Recommendation;
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use pipeline::{CaseOutcome, ServiceWorkflow, WorkflowError, WorkflowOptions, WorkflowStage};
pub use rules::{RuleBook, RulesEngine, RulesError, RulesEvaluation};
