use std::sync::Arc;

use axum::Router;
use repairdesk_core::config::{AppConfig, ConfigError, LoadOptions};
use repairdesk_core::pipeline::{ServiceWorkflow, WorkflowOptions};
use repairdesk_core::rules::{RulesEngine, RulesError};
use repairdesk_db::connection::connect_with_config;
use repairdesk_db::repositories::{SqlAuditRepository, SqlBatchJobRepository, SqlCaseRepository};
use repairdesk_db::{migrations, DbPool};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::api::{self, AppState};
use crate::health::{self, HealthState};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub workflow: Arc<ServiceWorkflow>,
    pub rules: Arc<RwLock<RulesEngine>>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("business rules could not be loaded: {0}")]
    Rules(#[from] RulesError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let rules = RulesEngine::load_or_init(&config.rules.path)?;
    info!(
        event_name = "system.bootstrap.rules_loaded",
        correlation_id = "bootstrap",
        rules_path = %config.rules.path.display(),
        total_rules = rules.summary().total_rules,
        fingerprint = %rules.fingerprint(),
        "business rules loaded"
    );

    let workflow = ServiceWorkflow::builtin().with_options(WorkflowOptions {
        enforce_rule_overrides: config.rules.enforce_overrides,
    });

    Ok(Application {
        config,
        db_pool,
        workflow: Arc::new(workflow),
        rules: Arc::new(RwLock::new(rules)),
    })
}

impl Application {
    pub fn app_state(&self) -> AppState {
        AppState {
            workflow: self.workflow.clone(),
            rules: self.rules.clone(),
            cases: Arc::new(SqlCaseRepository::new(self.db_pool.clone())),
            audit: Arc::new(SqlAuditRepository::new(self.db_pool.clone())),
            batches: Arc::new(SqlBatchJobRepository::new(self.db_pool.clone())),
            batch_limit: self.config.batch.max_cases,
        }
    }

    pub fn router(&self) -> Router {
        api::router(self.app_state()).merge(health::router(HealthState {
            db_pool: self.db_pool.clone(),
            rules: self.rules.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use repairdesk_core::config::{ConfigOverrides, LoadOptions};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::bootstrap::bootstrap;

    fn options(database_url: &str, rules_path: std::path::PathBuf) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                rules_path: Some(rules_path),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_on_invalid_database_url() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = bootstrap(options("postgres://elsewhere", dir.path().join("rules.json"))).await;

        let message = result.err().expect("error").to_string();
        assert!(message.contains("database.url"));
    }

    #[tokio::test]
    async fn bootstrap_fails_on_malformed_rule_book() {
        let dir = tempfile::tempdir().expect("tempdir");
        let rules_path = dir.path().join("rules.json");
        std::fs::write(&rules_path, "{ not json").expect("write rules");

        let result = bootstrap(options("sqlite::memory:", rules_path)).await;

        let message = result.err().expect("error").to_string();
        assert!(message.starts_with("business rules could not be loaded"));
    }

    #[tokio::test]
    async fn integration_smoke_covers_startup_case_flow_and_persistence() {
        let dir = tempfile::tempdir().expect("tempdir");
        let rules_path = dir.path().join("config").join("business_rules.json");
        let app = bootstrap(options("sqlite::memory:", rules_path.clone()))
            .await
            .expect("bootstrap should succeed");
        assert!(rules_path.exists(), "default rule book should be written on first start");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('service_case', 'audit_event', 'batch_job')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("schema should be available after bootstrap");
        assert_eq!(table_count, 3);

        let response = app
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/service-case")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        json!({
                            "device_type": "oven",
                            "brand": "Siemens",
                            "age": 15,
                            "error_description": "Complete control board failure"
                        })
                        .to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let outcome: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(outcome["recommendation"], "replace");
        let case_id = outcome["case_id"].as_str().expect("case id").to_string();

        let response = app
            .router()
            .oneshot(
                Request::builder()
                    .uri(format!("/cases/{case_id}/audit"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let trail: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert!(trail.as_array().map(|events| events.len() > 2).unwrap_or(false));

        let response = app
            .router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        app.db_pool.close().await;
    }
}
