use tracing::{error, info, warn};

use repairdesk_core::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome};
use repairdesk_core::domain::batch::{BatchCaseSummary, BatchJob, BatchJobStatus};
use repairdesk_core::domain::case::ServiceCaseInput;
use repairdesk_core::errors::ApplicationError;

use crate::api::{persistence_error, process_and_store, AppState};

const BATCH_ACTOR: &str = "batch";

pub fn spawn(
    state: AppState,
    job: BatchJob,
    cases: Vec<ServiceCaseInput>,
    correlation_id: String,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let job_id = job.job_id.clone();
        if let Err(failure) = run(&state, job, cases, &correlation_id).await {
            error!(
                event_name = "batch.job_failed",
                correlation_id = %correlation_id,
                job_id = %job_id,
                error = %failure,
                "batch job aborted"
            );
        }
    })
}

/// Processes every case in order, saving progress after each one.
///
/// A job that cannot be saved is aborted: the remaining cases are recorded as
/// failed and the completed job is saved once more before the error returns.
pub async fn run(
    state: &AppState,
    mut job: BatchJob,
    cases: Vec<ServiceCaseInput>,
    correlation_id: &str,
) -> Result<BatchJob, ApplicationError> {
    let context = AuditContext::new(None, correlation_id, BATCH_ACTOR);

    match process_cases(state, &mut job, cases, &context).await {
        Ok(()) => {
            record_audit(
                state,
                job_event(&context, &job, "batch.job_completed", AuditCategory::Batch, AuditOutcome::Success),
            )
            .await;
            info!(
                event_name = "batch.job_completed",
                correlation_id = %correlation_id,
                job_id = %job.job_id,
                completed_cases = job.completed_cases,
                failed_cases = job.failed_cases,
                "batch job completed"
            );
            Ok(job)
        }
        Err(failure) => {
            job.abort(&format!("Failed to process case: batch aborted: {failure}"));
            if let Err(save_error) = state.batches.save(job.clone()).await {
                error!(
                    event_name = "batch.final_save_failed",
                    correlation_id = %correlation_id,
                    job_id = %job.job_id,
                    error = %save_error,
                    "aborted batch job could not be saved"
                );
            }
            record_audit(
                state,
                job_event(&context, &job, "batch.job_aborted", AuditCategory::Persistence, AuditOutcome::Failed)
                    .with_metadata("error", failure.to_string()),
            )
            .await;
            Err(failure)
        }
    }
}

async fn process_cases(
    state: &AppState,
    job: &mut BatchJob,
    cases: Vec<ServiceCaseInput>,
    context: &AuditContext,
) -> Result<(), ApplicationError> {
    job.transition_to(BatchJobStatus::Processing)?;
    state.batches.save(job.clone()).await.map_err(persistence_error)?;
    record_audit(
        state,
        job_event(context, job, "batch.job_started", AuditCategory::Batch, AuditOutcome::Success),
    )
    .await;

    for (index, input) in cases.into_iter().enumerate() {
        let case = input.into_case();
        let (device_type, brand, age) = (case.device_type.clone(), case.brand.clone(), case.age);

        match process_and_store(state, case, BATCH_ACTOR, &context.correlation_id).await {
            Ok(outcome) => job.record_success(
                index,
                BatchCaseSummary {
                    case_id: outcome.case_id,
                    recommendation: outcome.recommendation,
                    confidence_score: outcome.confidence_score,
                    justification: outcome.justification,
                    device_type,
                    brand,
                    age,
                },
            ),
            Err(failure) => {
                warn!(
                    event_name = "batch.case_failed",
                    correlation_id = %context.correlation_id,
                    job_id = %job.job_id,
                    case_index = index,
                    error = %failure,
                    "batch case failed"
                );
                record_audit(
                    state,
                    job_event(context, job, "batch.case_failed", AuditCategory::Batch, AuditOutcome::Failed)
                        .with_metadata("case_index", index.to_string())
                        .with_metadata("error", failure.to_string()),
                )
                .await;
                job.record_failure(index, format!("Failed to process case: {failure}"));
            }
        }
        state.batches.save(job.clone()).await.map_err(persistence_error)?;
    }

    job.transition_to(BatchJobStatus::Completed)?;
    state.batches.save(job.clone()).await.map_err(persistence_error)?;
    Ok(())
}

pub(crate) fn job_event(
    context: &AuditContext,
    job: &BatchJob,
    event_type: &str,
    category: AuditCategory,
    outcome: AuditOutcome,
) -> AuditEvent {
    context
        .event(event_type, category, outcome)
        .with_metadata("job_id", job.job_id.to_string())
        .with_metadata("status", job.status.as_str())
        .with_metadata("completed_cases", job.completed_cases.to_string())
        .with_metadata("failed_cases", job.failed_cases.to_string())
}

/// Audit writes never fail a batch; a lost event is logged instead.
pub(crate) async fn record_audit(state: &AppState, event: AuditEvent) {
    let event_type = event.event_type.clone();
    if let Err(failure) = state.audit.append(event).await {
        warn!(
            event_name = "batch.audit_failed",
            audit_event_type = %event_type,
            error = %failure,
            "batch audit event could not be stored"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::{
        extract::{Path, State},
        http::StatusCode,
        Json,
    };

    use repairdesk_core::audit::{AuditCategory, AuditOutcome};
    use repairdesk_core::domain::batch::{BatchCaseStatus, BatchJob, BatchJobId, BatchJobStatus};
    use repairdesk_core::domain::case::{CasePriority, ServiceCaseId, ServiceCaseInput};
        use repairdesk_core::errors::{ApplicationError, InterfaceError};
    use repairdesk_core::pipeline::demo_scenarios;
    use repairdesk_db::repositories::{
        AuditRepository, BatchJobRepository, CaseRecord, CaseRepository, InMemoryBatchJobRepository,
        InMemoryCaseRepository, RepositoryError,
    };

    use super::run;
    use crate::api::tests::memory_state;
    use crate::api::{get_batch, submit_batch, AppState, BatchServiceCaseInput};

    /// Refuses to store cases for one brand.
    #[derive(Default)]
    struct BrandRejectingCases {
        inner: InMemoryCaseRepository,
    }

    #[async_trait]
    impl CaseRepository for BrandRejectingCases {
        async fn save(&self, record: CaseRecord) -> Result<(), RepositoryError> {
            if record.case.brand == "Unstorable" {
                return Err(RepositoryError::Decode("case table is read-only".to_string()));
            }
            self.inner.save(record).await
        }

        async fn find_by_id(&self, id: &ServiceCaseId) -> Result<Option<CaseRecord>, RepositoryError> {
            self.inner.find_by_id(id).await
        }

        async fn list_recent(&self, limit: u32) -> Result<Vec<CaseRecord>, RepositoryError> {
            self.inner.list_recent(limit).await
        }
    }

    /// Fails exactly one save, counted from 1.
    struct FlakyBatchJobs {
        inner: InMemoryBatchJobRepository,
        saves: AtomicUsize,
        failing_save: usize,
    }

    impl FlakyBatchJobs {
        fn failing_on(failing_save: usize) -> Self {
            Self { inner: InMemoryBatchJobRepository::default(), saves: AtomicUsize::new(0), failing_save }
        }
    }

    #[async_trait]
    impl BatchJobRepository for FlakyBatchJobs {
        async fn save(&self, job: BatchJob) -> Result<(), RepositoryError> {
            let attempt = self.saves.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt == self.failing_save {
                return Err(RepositoryError::Decode("disk full".to_string()));
            }
            self.inner.save(job).await
        }

        async fn find_by_id(&self, id: &BatchJobId) -> Result<Option<BatchJob>, RepositoryError> {
            self.inner.find_by_id(id).await
        }
    }

    fn scenario_inputs() -> Vec<ServiceCaseInput> {
        demo_scenarios().into_iter().map(|scenario| scenario.input).collect()
    }

    async fn batch_event_types(state: &AppState, correlation_id: &str) -> Vec<String> {
        state
            .audit
            .list_for_correlation(correlation_id)
            .await
            .expect("audit trail")
            .into_iter()
            .filter(|event| event.event_type.starts_with("batch."))
            .map(|event| event.event_type)
            .collect()
    }

    #[tokio::test]
    async fn run_processes_every_case_in_order() {
        let state = memory_state(10);
        let scenarios = demo_scenarios();
        let inputs: Vec<_> = scenarios.iter().map(|scenario| scenario.input.clone()).collect();
        let job = BatchJob::new(inputs.len(), CasePriority::High);

        let finished = run(&state, job, inputs, "corr-batch-run").await.expect("run");

        assert_eq!(finished.status, BatchJobStatus::Completed);
        assert_eq!(finished.completed_cases, scenarios.len());
        assert_eq!(finished.failed_cases, 0);
        assert!(finished.completed_at.is_some());
        let outcomes: Vec<_> = finished
            .results
            .iter()
            .map(|result| result.result.as_ref().map(|summary| summary.recommendation))
            .collect();
        let expected: Vec<_> = scenarios.iter().map(|scenario| Some(scenario.expected_outcome)).collect();
        assert_eq!(outcomes, expected);
        assert_eq!(
            finished.results.iter().map(|result| result.case_index).collect::<Vec<_>>(),
            (0..scenarios.len()).collect::<Vec<_>>()
        );
        assert!(finished.results.iter().all(|result| result.status == BatchCaseStatus::Success));

        let stored = state.batches.find_by_id(&finished.job_id).await.expect("find");
        assert_eq!(stored.map(|job| job.status), Some(BatchJobStatus::Completed));
        assert_eq!(
            batch_event_types(&state, "corr-batch-run").await,
            vec!["batch.job_started".to_string(), "batch.job_completed".to_string()]
        );
    }

    #[tokio::test]
    async fn failing_case_is_recorded_and_the_batch_continues() {
        let state = AppState { cases: Arc::new(BrandRejectingCases::default()), ..memory_state(10) };
        let mut inputs = scenario_inputs();
        inputs.insert(
            1,
            ServiceCaseInput {
                device_type: "cooktop".to_string(),
                brand: "Unstorable".to_string(),
                age: Some(2),
                error_description: "Display flickers".to_string(),
                ..ServiceCaseInput::default()
            },
        );
        let job = BatchJob::new(inputs.len(), CasePriority::Standard);

        let finished = run(&state, job, inputs, "corr-batch-partial").await.expect("run");

        assert_eq!(finished.status, BatchJobStatus::Completed);
        assert_eq!(finished.completed_cases, 4);
        assert_eq!(finished.failed_cases, 1);
        let failed = &finished.results[1];
        assert_eq!(failed.case_index, 1);
        assert_eq!(failed.status, BatchCaseStatus::Failed);
        assert!(failed.result.is_none());
        let message = failed.error.as_deref().unwrap_or_default();
        assert!(message.starts_with("Failed to process case: "), "unexpected message: {message}");
        assert!(message.contains("case table is read-only"));
        assert_eq!(finished.results[2].status, BatchCaseStatus::Success);

        let trail = state.audit.list_for_correlation("corr-batch-partial").await.expect("audit");
        let case_failed = trail
            .iter()
            .find(|event| event.event_type == "batch.case_failed")
            .expect("case failure audited");
        assert_eq!(case_failed.category, AuditCategory::Batch);
        assert_eq!(case_failed.outcome, AuditOutcome::Failed);
        assert_eq!(case_failed.metadata.get("case_index").map(String::as_str), Some("1"));
    }

    #[tokio::test]
    async fn unsaved_job_is_aborted_into_a_terminal_state() {
        let state = AppState { batches: Arc::new(FlakyBatchJobs::failing_on(3)), ..memory_state(10) };
        let job = BatchJob::new(4, CasePriority::Standard);
        let job_id = job.job_id.clone();

        let error = run(&state, job, scenario_inputs(), "corr-batch-abort").await.expect_err("abort");
        assert!(matches!(error, ApplicationError::Persistence(ref message) if message.contains("disk full")));

        let stored = state.batches.find_by_id(&job_id).await.expect("find").expect("stored job");
        assert_eq!(stored.status, BatchJobStatus::Completed);
        assert!(stored.completed_at.is_some());
        assert_eq!(stored.completed_cases, 2);
        assert_eq!(stored.failed_cases, 2);
        assert_eq!(stored.processed_cases(), stored.total_cases);
        assert!(stored.results[3]
            .error
            .as_deref()
            .is_some_and(|message| message.contains("batch aborted") && message.contains("disk full")));

        let trail = state.audit.list_for_correlation("corr-batch-abort").await.expect("audit");
        let aborted = trail.last().expect("abort audited");
        assert_eq!(aborted.event_type, "batch.job_aborted");
        assert_eq!(aborted.category, AuditCategory::Persistence);
        assert_eq!(aborted.outcome, AuditOutcome::Failed);
        assert_eq!(aborted.metadata.get("job_id"), Some(&job_id.0));
    }

    #[tokio::test]
    async fn job_that_cannot_start_still_finishes() {
        let state = AppState { batches: Arc::new(FlakyBatchJobs::failing_on(1)), ..memory_state(10) };
        let job = BatchJob::new(2, CasePriority::Standard);
        let job_id = job.job_id.clone();
        let inputs = scenario_inputs().into_iter().take(2).collect();

        run(&state, job, inputs, "corr-batch-start").await.expect_err("abort");

        let stored = state.batches.find_by_id(&job_id).await.expect("find").expect("stored job");
        assert_eq!(stored.status, BatchJobStatus::Completed);
        assert_eq!(stored.failed_cases, 2);
        assert_eq!(stored.completed_cases, 0);
    }

    #[tokio::test]
    async fn submitted_batch_completes_in_background() {
        let state = memory_state(10);

        let (status, Json(queued)) = submit_batch(
            State(state.clone()),
            Json(BatchServiceCaseInput { cases: scenario_inputs(), priority: CasePriority::Urgent }),
        )
        .await
        .expect("submit");
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(queued.status, BatchJobStatus::Queued);
        assert_eq!(queued.total_cases, 4);

        let mut latest = queued.clone();
        for _ in 0..100 {
            let Json(job) = get_batch(State(state.clone()), Path(queued.job_id.0.clone()))
                .await
                .expect("batch status");
            latest = job;
            if latest.status == BatchJobStatus::Completed {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(latest.status, BatchJobStatus::Completed);
        assert_eq!(latest.completed_cases, 4);
        assert_eq!(latest.priority, CasePriority::Urgent);
    }

    #[tokio::test]
    async fn oversized_and_empty_batches_are_rejected() {
        let state = memory_state(2);

        let oversized = submit_batch(
            State(state.clone()),
            Json(BatchServiceCaseInput { cases: scenario_inputs(), priority: CasePriority::Standard }),
        )
        .await
        .expect_err("oversized batch");
        assert!(matches!(
            oversized.0,
            InterfaceError::BadRequest { ref message, .. } if message.contains("limit is 2")
        ));
        let rejected = state
            .audit
            .list_for_correlation(oversized.0.correlation_id())
            .await
            .expect("audit");
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].event_type, "batch.rejected");
        assert_eq!(rejected[0].outcome, AuditOutcome::Rejected);

        let empty = submit_batch(
            State(state),
            Json(BatchServiceCaseInput { cases: Vec::new(), priority: CasePriority::Standard }),
        )
        .await
        .expect_err("empty batch");
        assert!(matches!(empty.0, InterfaceError::BadRequest { .. }));
    }

    #[tokio::test]
    async fn unknown_batch_job_is_not_found() {
        let error = get_batch(State(memory_state(10)), Path("BATCH-missing".to_string()))
            .await
            .expect_err("missing job");
        assert!(matches!(error.0, InterfaceError::NotFound { .. }));
    }
}
