use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row};

use repairdesk_core::audit::{AuditCategory, AuditEvent, AuditOutcome};
use repairdesk_core::domain::case::ServiceCaseId;

use super::{parse_timestamp, AuditRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAuditRepository {
    pool: DbPool,
}

impl SqlAuditRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for SqlAuditRepository {
    async fn append(&self, event: AuditEvent) -> Result<(), RepositoryError> {
        let metadata_json = serde_json::to_string(&event.metadata)?;

        sqlx::query(
            r#"
            INSERT INTO audit_event (
                id, case_id, correlation_id, event_type, category,
                actor, outcome, metadata_json, occurred_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.event_id)
        .bind(event.case_id.as_ref().map(|id| id.0.as_str()))
        .bind(&event.correlation_id)
        .bind(&event.event_type)
        .bind(event.category.as_str())
        .bind(&event.actor)
        .bind(event.outcome.as_str())
        .bind(metadata_json)
        .bind(event.occurred_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn append_all(&self, events: Vec<AuditEvent>) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for event in events {
            let metadata_json = serde_json::to_string(&event.metadata)?;
            sqlx::query(
                r#"
                INSERT INTO audit_event (
                    id, case_id, correlation_id, event_type, category,
                    actor, outcome, metadata_json, occurred_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&event.event_id)
            .bind(event.case_id.as_ref().map(|id| id.0.as_str()))
            .bind(&event.correlation_id)
            .bind(&event.event_type)
            .bind(event.category.as_str())
            .bind(&event.actor)
            .bind(event.outcome.as_str())
            .bind(metadata_json)
            .bind(event.occurred_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_for_case(
        &self,
        case_id: &ServiceCaseId,
    ) -> Result<Vec<AuditEvent>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT
                id, case_id, correlation_id, event_type, category,
                actor, outcome, metadata_json, occurred_at
            FROM audit_event
            WHERE case_id = ?
            ORDER BY occurred_at ASC, rowid ASC
            "#,
        )
        .bind(&case_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(audit_event_from_row).collect()
    }

    async fn list_for_correlation(
        &self,
        correlation_id: &str,
    ) -> Result<Vec<AuditEvent>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT
                id, case_id, correlation_id, event_type, category,
                actor, outcome, metadata_json, occurred_at
            FROM audit_event
            WHERE correlation_id = ?
            ORDER BY occurred_at ASC, rowid ASC
            "#,
        )
        .bind(correlation_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(audit_event_from_row).collect()
    }
}

fn audit_event_from_row(row: &SqliteRow) -> Result<AuditEvent, RepositoryError> {
    let case_id: Option<String> = row.try_get("case_id")?;
    let category: String = row.try_get("category")?;
    let outcome: String = row.try_get("outcome")?;
    let metadata_json: String = row.try_get("metadata_json")?;
    let occurred_at: String = row.try_get("occurred_at")?;

    let metadata: BTreeMap<String, String> = serde_json::from_str(&metadata_json)
        .map_err(|e| RepositoryError::Decode(format!("invalid metadata_json: {e}")))?;

    Ok(AuditEvent {
        event_id: row.try_get("id")?,
        case_id: case_id.map(ServiceCaseId),
        correlation_id: row.try_get("correlation_id")?,
        event_type: row.try_get("event_type")?,
        category: AuditCategory::parse(&category)
            .ok_or_else(|| RepositoryError::Decode(format!("invalid category: {category}")))?,
        actor: row.try_get("actor")?,
        outcome: AuditOutcome::parse(&outcome)
            .ok_or_else(|| RepositoryError::Decode(format!("invalid outcome: {outcome}")))?,
        metadata,
        occurred_at: parse_timestamp("occurred_at", &occurred_at)?,
    })
}

#[cfg(test)]
mod tests {
    use repairdesk_core::audit::{AuditCategory, AuditContext, AuditOutcome};
    use repairdesk_core::domain::case::ServiceCaseId;

    use super::SqlAuditRepository;
    use crate::repositories::{AuditRepository, RepositoryError};
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn sql_audit_repo_round_trip_preserves_metadata_and_order() {
        let pool = setup_pool().await;
        let repo = SqlAuditRepository::new(pool.clone());
        let case_id = ServiceCaseId("SC-audit-1".to_string());
        let context = AuditContext::new(Some(case_id.clone()), "corr-audit-1", "api");

        let first = context
            .event("workflow.stage_completed", AuditCategory::Triage, AuditOutcome::Success)
            .with_metadata("stage", "triage");
        let second = context
            .event("workflow.decision_recorded", AuditCategory::Decision, AuditOutcome::Success)
            .with_metadata("recommendation", "repair");
        let unrelated = AuditContext::new(None, "corr-audit-2", "api").event(
            "batch.job_created",
            AuditCategory::Batch,
            AuditOutcome::Success,
        );

        repo.append_all(vec![first.clone(), second.clone()]).await.expect("append all");
        repo.append(unrelated).await.expect("append unrelated");

        let trail = repo.list_for_case(&case_id).await.expect("list");
        assert_eq!(trail, vec![first.clone(), second.clone()]);

        let by_correlation = repo.list_for_correlation("corr-audit-1").await.expect("list");
        assert_eq!(by_correlation, vec![first, second]);
        let batch_events = repo.list_for_correlation("corr-audit-2").await.expect("list");
        assert_eq!(batch_events.len(), 1);
        assert_eq!(batch_events[0].case_id, None);
        assert_eq!(batch_events[0].category, AuditCategory::Batch);

        pool.close().await;
    }

    #[tokio::test]
    async fn duplicate_event_ids_roll_back_the_whole_batch() {
        let pool = setup_pool().await;
        let repo = SqlAuditRepository::new(pool.clone());
        let case_id = ServiceCaseId("SC-audit-2".to_string());
        let event = AuditContext::new(Some(case_id.clone()), "corr-audit-3", "api").event(
            "workflow.stage_completed",
            AuditCategory::Analysis,
            AuditOutcome::Success,
        );

        let result = repo.append_all(vec![event.clone(), event]).await;
        assert!(matches!(result, Err(RepositoryError::Database(_))));
        assert!(repo.list_for_case(&case_id).await.expect("list").is_empty());

        pool.close().await;
    }
}
