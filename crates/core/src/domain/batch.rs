use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::case::{CasePriority, ServiceCaseId};
use crate::domain::recommendation::Recommendation;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchJobId(pub String);

impl BatchJobId {
    pub fn generate() -> Self {
        Self(format!("BATCH-{}", Uuid::new_v4()))
    }
}

impl fmt::Display for BatchJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchJobStatus {
    Queued,
    Processing,
    Completed,
}

impl BatchJobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "queued" => Some(Self::Queued),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchCaseStatus {
    Success,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchCaseSummary {
    pub case_id: ServiceCaseId,
    pub recommendation: Recommendation,
    pub confidence_score: f64,
    pub justification: String,
    pub device_type: String,
    pub brand: String,
    pub age: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchCaseResult {
    pub case_index: usize,
    pub status: BatchCaseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<BatchCaseSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchJob {
    pub job_id: BatchJobId,
    pub status: BatchJobStatus,
    pub priority: CasePriority,
    pub total_cases: usize,
    pub completed_cases: usize,
    pub failed_cases: usize,
    pub results: Vec<BatchCaseResult>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl BatchJob {
    pub fn new(total_cases: usize, priority: CasePriority) -> Self {
        Self {
            job_id: BatchJobId::generate(),
            status: BatchJobStatus::Queued,
            priority,
            total_cases,
            completed_cases: 0,
            failed_cases: 0,
            results: Vec::new(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn can_transition_to(&self, next: BatchJobStatus) -> bool {
        matches!(
            (self.status, next),
            (BatchJobStatus::Queued, BatchJobStatus::Processing)
                | (BatchJobStatus::Processing, BatchJobStatus::Completed)
        )
    }

    pub fn transition_to(&mut self, next: BatchJobStatus) -> Result<(), DomainError> {
        if !self.can_transition_to(next) {
            return Err(DomainError::InvalidBatchTransition { from: self.status, to: next });
        }
        self.status = next;
        if next == BatchJobStatus::Completed {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    pub fn record_success(&mut self, case_index: usize, summary: BatchCaseSummary) {
        self.completed_cases += 1;
        self.results.push(BatchCaseResult {
            case_index,
            status: BatchCaseStatus::Success,
            result: Some(summary),
            error: None,
        });
    }

    pub fn record_failure(&mut self, case_index: usize, error: impl Into<String>) {
        self.failed_cases += 1;
        self.results.push(BatchCaseResult {
            case_index,
            status: BatchCaseStatus::Failed,
            result: None,
            error: Some(error.into()),
        });
    }

    pub fn processed_cases(&self) -> usize {
        self.completed_cases + self.failed_cases
    }

    /// Ends the job early: every case without a result is recorded as failed
    /// with `reason` and the job is completed. A completed job is left as is.
    pub fn abort(&mut self, reason: &str) {
        if self.status == BatchJobStatus::Completed {
            return;
        }
        for case_index in 0..self.total_cases {
            if !self.results.iter().any(|result| result.case_index == case_index) {
                self.record_failure(case_index, reason);
            }
        }
        self.status = BatchJobStatus::Completed;
        self.completed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::{BatchCaseSummary, BatchJob, BatchJobStatus};
    use crate::domain::case::{CasePriority, ServiceCaseId};
    use crate::domain::recommendation::Recommendation;
    use crate::errors::DomainError;

    #[test]
    fn job_moves_queued_processing_completed() {
        let mut job = BatchJob::new(2, CasePriority::Standard);
        assert_eq!(job.status, BatchJobStatus::Queued);

        job.transition_to(BatchJobStatus::Processing).expect("start");
        job.record_success(
            0,
            BatchCaseSummary {
                case_id: ServiceCaseId("SC-1".to_owned()),
                recommendation: Recommendation::Repair,
                confidence_score: 0.9,
                justification: "ok".to_owned(),
                device_type: "oven".to_owned(),
                brand: "Siemens".to_owned(),
                age: Some(4),
            },
        );
        job.record_failure(1, "missing age");
        job.transition_to(BatchJobStatus::Completed).expect("complete");

        assert_eq!(job.completed_cases, 1);
        assert_eq!(job.failed_cases, 1);
        assert_eq!(job.processed_cases(), job.total_cases);
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn completed_job_cannot_restart() {
        let mut job = BatchJob::new(1, CasePriority::High);
        job.transition_to(BatchJobStatus::Processing).expect("start");
        job.transition_to(BatchJobStatus::Completed).expect("complete");

        let error = job.transition_to(BatchJobStatus::Processing).expect_err("must reject");
        assert_eq!(
            error,
            DomainError::InvalidBatchTransition {
                from: BatchJobStatus::Completed,
                to: BatchJobStatus::Processing,
            }
        );
    }

    #[test]
    fn abort_fails_unfinished_cases_and_completes_the_job() {
        let mut job = BatchJob::new(3, CasePriority::Standard);
        job.transition_to(BatchJobStatus::Processing).expect("start");
        job.record_failure(0, "missing age");

        job.abort("batch aborted: disk full");

        assert_eq!(job.status, BatchJobStatus::Completed);
        assert!(job.completed_at.is_some());
        assert_eq!(job.failed_cases, 3);
        assert_eq!(job.processed_cases(), job.total_cases);
        let indexes: Vec<usize> = job.results.iter().map(|result| result.case_index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
        assert_eq!(job.results[2].error.as_deref(), Some("batch aborted: disk full"));

        job.abort("again");
        assert_eq!(job.failed_cases, 3);
    }

    #[test]
    fn queued_job_can_be_aborted() {
        let mut job = BatchJob::new(1, CasePriority::Urgent);

        job.abort("batch aborted");

        assert_eq!(job.status, BatchJobStatus::Completed);
        assert_eq!(job.failed_cases, 1);
    }
}
