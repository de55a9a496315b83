use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use repairdesk_core::audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink,
};
use repairdesk_core::domain::batch::{BatchJob, BatchJobId};
use repairdesk_core::domain::case::{CasePriority, ServiceCase, ServiceCaseId, ServiceCaseInput};
use repairdesk_core::errors::{ApplicationError, DomainError, InterfaceError};
use repairdesk_core::pipeline::{
    demo_scenarios, workflow_visualization, CaseOutcome, DemoScenario, ServiceWorkflow,
};
use repairdesk_core::rules::{Rule, RuleSummary, RulesEngine, RulesEvaluation};
use repairdesk_db::repositories::{
    AuditRepository, BatchJobRepository, CaseRecord, CaseRepository, RepositoryError,
};

use crate::batch;

const DEFAULT_CASE_LIST_LIMIT: u32 = 20;
const MAX_CASE_LIST_LIMIT: u32 = 100;

#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<ServiceWorkflow>,
    pub rules: Arc<RwLock<RulesEngine>>,
    pub cases: Arc<dyn CaseRepository>,
    pub audit: Arc<dyn AuditRepository>,
    pub batches: Arc<dyn BatchJobRepository>,
    pub batch_limit: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WorkflowStatus {
    pub status: &'static str,
    pub message: &'static str,
    pub workflow_visualization: &'static str,
}

#[derive(Clone, Debug, Serialize)]
pub struct DemoScenariosResponse {
    pub scenarios: Vec<DemoScenario>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ListCasesQuery {
    pub limit: Option<u32>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BatchServiceCaseInput {
    pub cases: Vec<ServiceCaseInput>,
    #[serde(default)]
    pub priority: CasePriority,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AddRuleRequest {
    pub rule_set: String,
    pub rule: Rule,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: Option<String>,
    pub correlation_id: String,
}

#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

impl From<InterfaceError> for ApiError {
    fn from(value: InterfaceError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error = self.0;
        let (status, detail) = match &error {
            InterfaceError::BadRequest { message, .. } => {
                (StatusCode::BAD_REQUEST, Some(message.clone()))
            }
            InterfaceError::NotFound { message, .. } => {
                (StatusCode::NOT_FOUND, Some(message.clone()))
            }
            InterfaceError::ServiceUnavailable { .. } => (StatusCode::SERVICE_UNAVAILABLE, None),
            InterfaceError::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, None),
        };

        if status.is_server_error() {
            error!(
                event_name = "api.request_failed",
                correlation_id = %error.correlation_id(),
                status = status.as_u16(),
                error = %error.message(),
                "request failed"
            );
        } else {
            warn!(
                event_name = "api.request_rejected",
                correlation_id = %error.correlation_id(),
                status = status.as_u16(),
                error = %error.message(),
                "request rejected"
            );
        }

        let body = ErrorBody {
            error: error.user_message().to_string(),
            detail,
            correlation_id: error.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/service-case", post(submit_case))
        .route("/cases", get(list_cases))
        .route("/cases/{case_id}", get(get_case))
        .route("/cases/{case_id}/audit", get(get_case_audit))
        .route("/workflow-status", get(workflow_status))
        .route("/demo-scenarios", get(list_demo_scenarios))
        .route("/business-rules/summary", get(rules_summary))
        .route("/business-rules/evaluate", post(evaluate_rules))
        .route("/business-rules/rules", post(add_rule))
        .route("/batch/service-cases", post(submit_batch))
        .route("/batch/{job_id}", get(get_batch))
        .with_state(state)
}

pub fn new_correlation_id() -> String {
    format!("req-{}", Uuid::new_v4())
}

pub(crate) fn persistence_error(error: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}

/// Runs one case through the workflow and stores the outcome with its audit trail.
pub(crate) async fn process_and_store(
    state: &AppState,
    case: ServiceCase,
    actor: &str,
    correlation_id: &str,
) -> Result<CaseOutcome, ApplicationError> {
    let sink = InMemoryAuditSink::default();
    let context = AuditContext::new(Some(case.id.clone()), correlation_id, actor);
    sink.emit(
        context
            .event("case.received", AuditCategory::Ingress, AuditOutcome::Success)
            .with_metadata("device_type", case.device_type.clone())
            .with_metadata("brand", case.brand.clone()),
    );

    let outcome = {
        let rules = state.rules.read().await;
        state.workflow.process(&case, &rules, &sink, &context)?
    };

    state
        .cases
        .save(CaseRecord::new(case, outcome.clone()))
        .await
        .map_err(persistence_error)?;
    state.audit.append_all(sink.drain()).await.map_err(persistence_error)?;

    info!(
        event_name = "api.case_processed",
        correlation_id = %correlation_id,
        case_id = %outcome.case_id,
        recommendation = outcome.recommendation.as_str(),
        processing_time_ms = outcome.processing_time_ms,
        "service case processed"
    );
    Ok(outcome)
}

pub async fn submit_case(
    State(state): State<AppState>,
    Json(input): Json<ServiceCaseInput>,
) -> Result<Json<CaseOutcome>, ApiError> {
    let correlation_id = new_correlation_id();
    let outcome = process_and_store(&state, input.into_case(), "api", &correlation_id)
        .await
        .map_err(|error| error.into_interface(correlation_id.clone()))?;
    Ok(Json(outcome))
}

pub async fn list_cases(
    State(state): State<AppState>,
    Query(query): Query<ListCasesQuery>,
) -> Result<Json<Vec<CaseRecord>>, ApiError> {
    let correlation_id = new_correlation_id();
    let limit = query.limit.unwrap_or(DEFAULT_CASE_LIST_LIMIT).clamp(1, MAX_CASE_LIST_LIMIT);
    let records = state
        .cases
        .list_recent(limit)
        .await
        .map_err(|error| persistence_error(error).into_interface(correlation_id))?;
    Ok(Json(records))
}

pub async fn get_case(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
) -> Result<Json<CaseRecord>, ApiError> {
    let correlation_id = new_correlation_id();
    let record = find_case(&state, &ServiceCaseId(case_id))
        .await
        .map_err(|error| error.into_interface(correlation_id))?;
    Ok(Json(record))
}

pub async fn get_case_audit(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
) -> Result<Json<Vec<AuditEvent>>, ApiError> {
    let correlation_id = new_correlation_id();
    let case_id = ServiceCaseId(case_id);
    find_case(&state, &case_id)
        .await
        .map_err(|error| error.into_interface(correlation_id.clone()))?;
    let events = state
        .audit
        .list_for_case(&case_id)
        .await
        .map_err(|error| persistence_error(error).into_interface(correlation_id))?;
    Ok(Json(events))
}

async fn find_case(state: &AppState, case_id: &ServiceCaseId) -> Result<CaseRecord, ApplicationError> {
    state
        .cases
        .find_by_id(case_id)
        .await
        .map_err(persistence_error)?
        .ok_or_else(|| ApplicationError::NotFound(format!("service case `{case_id}`")))
}

pub async fn workflow_status() -> Json<WorkflowStatus> {
    Json(WorkflowStatus {
        status: "operational",
        message: "All workflow stages are operational and ready to process service cases",
        workflow_visualization: workflow_visualization(),
    })
}

pub async fn list_demo_scenarios() -> Json<DemoScenariosResponse> {
    Json(DemoScenariosResponse { scenarios: demo_scenarios() })
}

pub async fn rules_summary(State(state): State<AppState>) -> Json<RuleSummary> {
    let rules = state.rules.read().await;
    Json(rules.summary())
}

pub async fn evaluate_rules(
    State(state): State<AppState>,
    Json(facts): Json<Value>,
) -> Result<Json<RulesEvaluation>, ApiError> {
    if !facts.is_object() {
        let correlation_id = new_correlation_id();
        return Err(ApplicationError::from(DomainError::InvariantViolation(
            "rule facts must be a JSON object".to_string(),
        ))
        .into_interface(correlation_id)
        .into());
    }
    let rules = state.rules.read().await;
    Ok(Json(rules.evaluate(&facts)))
}

pub async fn add_rule(
    State(state): State<AppState>,
    Json(request): Json<AddRuleRequest>,
) -> Result<(StatusCode, Json<RuleSummary>), ApiError> {
    let correlation_id = new_correlation_id();
    let mut rules = state.rules.write().await;
    rules
        .add_rule(&request.rule_set, request.rule)
        .map_err(|error| ApplicationError::from(error).into_interface(correlation_id))?;
    Ok((StatusCode::CREATED, Json(rules.summary())))
}

pub async fn submit_batch(
    State(state): State<AppState>,
    Json(input): Json<BatchServiceCaseInput>,
) -> Result<(StatusCode, Json<BatchJob>), ApiError> {
    let correlation_id = new_correlation_id();
    let rejection = if input.cases.is_empty() {
        Some("batch must contain at least one case".to_string())
    } else if input.cases.len() > state.batch_limit {
        Some(format!(
            "batch contains {} cases; the limit is {}",
            input.cases.len(),
            state.batch_limit
        ))
    } else {
        None
    };
    if let Some(reason) = rejection {
        batch::record_audit(
            &state,
            AuditContext::new(None, correlation_id.as_str(), "api")
                .event("batch.rejected", AuditCategory::Batch, AuditOutcome::Rejected)
                .with_metadata("total_cases", input.cases.len().to_string())
                .with_metadata("reason", reason.clone()),
        )
        .await;
        return Err(ApplicationError::from(DomainError::InvariantViolation(reason))
            .into_interface(correlation_id)
            .into());
    }

    let job = BatchJob::new(input.cases.len(), input.priority);
    state
        .batches
        .save(job.clone())
        .await
        .map_err(|error| persistence_error(error).into_interface(correlation_id.clone()))?;

    batch::record_audit(
        &state,
        batch::job_event(
            &AuditContext::new(None, correlation_id.as_str(), "api"),
            &job,
            "batch.job_queued",
            AuditCategory::Batch,
            AuditOutcome::Success,
        ),
    )
    .await;
    info!(
        event_name = "batch.job_queued",
        correlation_id = %correlation_id,
        job_id = %job.job_id,
        total_cases = job.total_cases,
        priority = job.priority.as_str(),
        "batch job queued"
    );
    batch::spawn(state.clone(), job.clone(), input.cases, correlation_id);

    Ok((StatusCode::ACCEPTED, Json(job)))
}

pub async fn get_batch(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<BatchJob>, ApiError> {
    let correlation_id = new_correlation_id();
    let job_id = BatchJobId(job_id);
    let job = state
        .batches
        .find_by_id(&job_id)
        .await
        .map_err(|error| persistence_error(error).into_interface(correlation_id.clone()))?
        .ok_or_else(|| {
            ApplicationError::NotFound(format!("batch job `{job_id}`")).into_interface(correlation_id)
        })?;
    Ok(Json(job))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        extract::{Path, State},
        http::{Request, StatusCode},
        Json,
    };
    use serde_json::json;
    use tokio::sync::RwLock;
    use tower::ServiceExt;

    use repairdesk_core::domain::case::ServiceCaseInput;
    use repairdesk_core::domain::recommendation::Recommendation;
    use repairdesk_core::errors::InterfaceError;
    use repairdesk_core::pipeline::ServiceWorkflow;
    use repairdesk_core::rules::RulesEngine;
    use repairdesk_db::repositories::{
        InMemoryAuditRepository, InMemoryBatchJobRepository, InMemoryCaseRepository,
    };

    use super::{
        get_case, get_case_audit, router, submit_case, workflow_status, ApiError, AppState,
        ErrorBody,
    };

    pub(crate) fn memory_state(batch_limit: usize) -> AppState {
        AppState {
            workflow: Arc::new(ServiceWorkflow::builtin()),
            rules: Arc::new(RwLock::new(RulesEngine::default())),
            cases: Arc::new(InMemoryCaseRepository::default()),
            audit: Arc::new(InMemoryAuditRepository::default()),
            batches: Arc::new(InMemoryBatchJobRepository::default()),
            batch_limit,
        }
    }

    fn cooktop_input() -> ServiceCaseInput {
        ServiceCaseInput {
            device_type: "cooktop".to_string(),
            brand: "V-Zug".to_string(),
            age: Some(3),
            error_description: "F7 and E3 error codes, heating element not working".to_string(),
            ..ServiceCaseInput::default()
        }
    }

    fn not_found_message(error: ApiError) -> String {
        match error.0 {
            InterfaceError::NotFound { message, .. } => message,
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn submit_case_persists_outcome_and_audit_trail() {
        let state = memory_state(10);

        let Json(outcome) =
            submit_case(State(state.clone()), Json(cooktop_input())).await.expect("submit");
        assert_eq!(outcome.recommendation, Recommendation::Repair);
        assert!(outcome.repair_order.is_some());

        let Json(record) = get_case(State(state.clone()), Path(outcome.case_id.0.clone()))
            .await
            .expect("stored case");
        assert_eq!(record.outcome.case_id, outcome.case_id);

        let Json(trail) =
            get_case_audit(State(state), Path(outcome.case_id.0.clone())).await.expect("audit");
        assert_eq!(trail.first().map(|event| event.event_type.as_str()), Some("case.received"));
        assert_eq!(
            trail.last().map(|event| event.event_type.as_str()),
            Some("workflow.decision_recorded")
        );
        assert!(trail.iter().all(|event| event.correlation_id == trail[0].correlation_id));
    }

    #[tokio::test]
    async fn unknown_case_is_not_found() {
        let state = memory_state(10);

        let error = get_case(State(state.clone()), Path("SC-missing".to_string()))
            .await
            .expect_err("missing case");
        assert_eq!(not_found_message(error), "service case `SC-missing` not found");

        let error = get_case_audit(State(state), Path("SC-missing".to_string()))
            .await
            .expect_err("missing audit");
        assert!(not_found_message(error).contains("SC-missing"));
    }

    #[tokio::test]
    async fn workflow_status_reports_operational() {
        let Json(status) = workflow_status().await;
        assert_eq!(status.status, "operational");
        assert!(status.workflow_visualization.contains("1. TRIAGE"));
    }

    #[tokio::test]
    async fn safety_case_routes_to_manufacturer_over_http() {
        let app = router(memory_state(10));
        let body = json!({
            "device_type": "cooktop",
            "brand": "Miele",
            "age": 1,
            "error_description": "Smoke coming from unit, burning smell"
        });

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/service-case")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let payload: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(payload["recommendation"], "manufacturer_referral");
        assert_eq!(payload["confidence_score"], 1.0);
    }

    #[tokio::test]
    async fn rules_can_be_added_and_evaluated_over_http() {
        let app = router(memory_state(10));
        let rule = json!({
            "rule_set": "recall_rules",
            "rule": {
                "name": "recalled_model",
                "conditions": [
                    { "field": "brand", "operator": "equals", "value": "Acme" }
                ],
                "action": "refer_manufacturer",
                "override": true,
                "reasoning": "Model under active recall"
            }
        });

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/business-rules/rules")
                    .header("content-type", "application/json")
                    .body(Body::from(rule.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CREATED);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let summary: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(summary["rule_sets"]["recall_rules"]["priority"], 99);
        assert_eq!(summary["total_rules"], 11);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/business-rules/evaluate")
                    .header("content-type", "application/json")
                    .body(Body::from(json!({ "brand": "Acme" }).to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let evaluation: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(evaluation["final_recommendation"], "manufacturer_referral");
        assert_eq!(evaluation["override_applied"], true);
    }

    #[tokio::test]
    async fn invalid_rule_is_a_bad_request_with_detail() {
        let app = router(memory_state(10));
        let rule = json!({
            "rule_set": "custom",
            "rule": {
                "name": "no_conditions",
                "conditions": [],
                "action": "recommend_repair",
                "reasoning": "missing conditions"
            }
        });

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/business-rules/rules")
                    .header("content-type", "application/json")
                    .body(Body::from(rule.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body: ErrorBody = serde_json::from_slice(&bytes).expect("json");
        assert!(body.detail.unwrap_or_default().contains("no_conditions"));
        assert!(body.correlation_id.starts_with("req-"));
    }

    #[tokio::test]
    async fn demo_scenarios_are_listed() {
        let response = router(memory_state(10))
            .oneshot(Request::builder().uri("/demo-scenarios").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let payload: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(payload["scenarios"].as_array().map(Vec::len), Some(4));
        assert_eq!(payload["scenarios"][1]["expected_outcome"], "replace");
    }
}
