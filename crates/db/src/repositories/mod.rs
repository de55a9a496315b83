use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use repairdesk_core::audit::AuditEvent;
use repairdesk_core::domain::batch::{BatchJob, BatchJobId};
use repairdesk_core::domain::case::{ServiceCase, ServiceCaseId};
use repairdesk_core::pipeline::CaseOutcome;

pub mod audit;
pub mod batch;
pub mod case;
pub mod memory;

pub use audit::SqlAuditRepository;
pub use batch::SqlBatchJobRepository;
pub use case::SqlCaseRepository;
pub use memory::{InMemoryAuditRepository, InMemoryBatchJobRepository, InMemoryCaseRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// A processed case together with the outcome the workflow produced for it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub case: ServiceCase,
    pub outcome: CaseOutcome,
}

impl CaseRecord {
    pub fn new(case: ServiceCase, outcome: CaseOutcome) -> Self {
        Self { case, outcome }
    }

    pub fn id(&self) -> &ServiceCaseId {
        &self.case.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.outcome.decided_at
    }
}

#[async_trait]
pub trait CaseRepository: Send + Sync {
    async fn save(&self, record: CaseRecord) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: &ServiceCaseId) -> Result<Option<CaseRecord>, RepositoryError>;
    /// Newest first.
    async fn list_recent(&self, limit: u32) -> Result<Vec<CaseRecord>, RepositoryError>;
}

#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn append(&self, event: AuditEvent) -> Result<(), RepositoryError>;

    async fn append_all(&self, events: Vec<AuditEvent>) -> Result<(), RepositoryError> {
        for event in events {
            self.append(event).await?;
        }
        Ok(())
    }

    /// Oldest first.
    async fn list_for_case(&self, case_id: &ServiceCaseId)
        -> Result<Vec<AuditEvent>, RepositoryError>;

    /// Every event recorded under one correlation id, oldest first. Batch job
    /// events carry no case id and are found this way.
    async fn list_for_correlation(&self, correlation_id: &str)
        -> Result<Vec<AuditEvent>, RepositoryError>;
}

#[async_trait]
pub trait BatchJobRepository: Send + Sync {
    /// Inserts or replaces the job by id.
    async fn save(&self, job: BatchJob) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: &BatchJobId) -> Result<Option<BatchJob>, RepositoryError>;
}

pub(crate) fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("invalid timestamp in `{column}`: {e}")))
}
