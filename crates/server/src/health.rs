use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use repairdesk_core::rules::RulesEngine;
use repairdesk_db::DbPool;
use serde::Serialize;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct HealthState {
    pub db_pool: DbPool,
    pub rules: Arc<RwLock<RulesEngine>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: HealthCheck,
    pub database: HealthCheck,
    pub business_rules: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let business_rules = rules_check(&state.rules).await;
    let ready = database.status == "ready" && business_rules.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        service: HealthCheck {
            status: "ready",
            detail: "repairdesk-server runtime initialized".to_string(),
        },
        database,
        business_rules,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}

async fn rules_check(rules: &RwLock<RulesEngine>) -> HealthCheck {
    let summary = rules.read().await.summary();
    if summary.total_rules == 0 {
        HealthCheck { status: "degraded", detail: "no business rules loaded".to_string() }
    } else {
        HealthCheck {
            status: "ready",
            detail: format!(
                "{} rules in {} sets loaded (version {})",
                summary.total_rules,
                summary.rule_sets.len(),
                summary.version
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, Json};
    use repairdesk_core::rules::{RuleBook, RulesEngine};
    use repairdesk_db::connect_with_settings;
    use tokio::sync::RwLock;

    use crate::health::{health, HealthState};

    fn default_rules() -> Arc<RwLock<RulesEngine>> {
        Arc::new(RwLock::new(RulesEngine::default()))
    }

    #[tokio::test]
    async fn health_returns_ready_when_database_is_reachable() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");

        let (status, Json(payload)) =
            health(State(HealthState { db_pool: pool.clone(), rules: default_rules() })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.database.status, "ready");
        assert_eq!(payload.business_rules.detail, "10 rules in 5 sets loaded (version 1.0)");

        pool.close().await;
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_when_database_is_unavailable() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");
        pool.close().await;

        let (status, Json(payload)) =
            health(State(HealthState { db_pool: pool, rules: default_rules() })).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.database.status, "degraded");
        assert_eq!(payload.service.status, "ready");
    }

    #[tokio::test]
    async fn empty_rule_book_degrades_health() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");
        let empty = RulesEngine::new(RuleBook {
            version: "1.0".to_string(),
            last_updated: "2024-01-01T00:00:00Z".to_string(),
            rule_sets: BTreeMap::new(),
        });

        let (status, Json(payload)) = health(State(HealthState {
            db_pool: pool.clone(),
            rules: Arc::new(RwLock::new(empty)),
        }))
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.business_rules.status, "degraded");

        pool.close().await;
    }
}
