use std::collections::HashMap;

use tokio::sync::RwLock;

use repairdesk_core::audit::AuditEvent;
use repairdesk_core::domain::batch::{BatchJob, BatchJobId};
use repairdesk_core::domain::case::ServiceCaseId;

use super::{AuditRepository, BatchJobRepository, CaseRecord, CaseRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryCaseRepository {
    cases: RwLock<HashMap<String, CaseRecord>>,
}

#[async_trait::async_trait]
impl CaseRepository for InMemoryCaseRepository {
    async fn save(&self, record: CaseRecord) -> Result<(), RepositoryError> {
        let mut cases = self.cases.write().await;
        cases.insert(record.case.id.0.clone(), record);
        Ok(())
    }

    async fn find_by_id(&self, id: &ServiceCaseId) -> Result<Option<CaseRecord>, RepositoryError> {
        let cases = self.cases.read().await;
        Ok(cases.get(&id.0).cloned())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<CaseRecord>, RepositoryError> {
        let cases = self.cases.read().await;
        let mut records: Vec<CaseRecord> = cases.values().cloned().collect();
        records.sort_by(|a, b| {
            b.created_at().cmp(&a.created_at()).then_with(|| a.case.id.0.cmp(&b.case.id.0))
        });
        records.truncate(limit as usize);
        Ok(records)
    }
}

#[derive(Default)]
pub struct InMemoryAuditRepository {
    events: RwLock<Vec<AuditEvent>>,
}

#[async_trait::async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn append(&self, event: AuditEvent) -> Result<(), RepositoryError> {
        let mut events = self.events.write().await;
        events.push(event);
        Ok(())
    }

    async fn list_for_case(
        &self,
        case_id: &ServiceCaseId,
    ) -> Result<Vec<AuditEvent>, RepositoryError> {
        let events = self.events.read().await;
        Ok(events.iter().filter(|event| event.case_id.as_ref() == Some(case_id)).cloned().collect())
    }

    async fn list_for_correlation(
        &self,
        correlation_id: &str,
    ) -> Result<Vec<AuditEvent>, RepositoryError> {
        let events = self.events.read().await;
        Ok(events.iter().filter(|event| event.correlation_id == correlation_id).cloned().collect())
    }
}

#[derive(Default)]
pub struct InMemoryBatchJobRepository {
    jobs: RwLock<HashMap<String, BatchJob>>,
}

#[async_trait::async_trait]
impl BatchJobRepository for InMemoryBatchJobRepository {
    async fn save(&self, job: BatchJob) -> Result<(), RepositoryError> {
        let mut jobs = self.jobs.write().await;
        jobs.insert(job.job_id.0.clone(), job);
        Ok(())
    }

    async fn find_by_id(&self, id: &BatchJobId) -> Result<Option<BatchJob>, RepositoryError> {
        let jobs = self.jobs.read().await;
        Ok(jobs.get(&id.0).cloned())
    }
}
