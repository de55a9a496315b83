use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row};

use repairdesk_core::domain::case::ServiceCaseId;

use super::{CaseRecord, CaseRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCaseRepository {
    pool: DbPool,
}

impl SqlCaseRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CaseRepository for SqlCaseRepository {
    async fn save(&self, record: CaseRecord) -> Result<(), RepositoryError> {
        let case_json = serde_json::to_string(&record.case)?;
        let outcome_json = serde_json::to_string(&record.outcome)?;

        sqlx::query(
            r#"
            INSERT INTO service_case (
                id, device_type, brand, age, priority, recommendation,
                confidence_score, case_json, outcome_json, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                recommendation = excluded.recommendation,
                confidence_score = excluded.confidence_score,
                outcome_json = excluded.outcome_json,
                created_at = excluded.created_at
            "#,
        )
        .bind(&record.case.id.0)
        .bind(&record.case.device_type)
        .bind(&record.case.brand)
        .bind(record.case.age.map(i64::from))
        .bind(record.case.priority.as_str())
        .bind(record.outcome.recommendation.as_str())
        .bind(record.outcome.confidence_score)
        .bind(case_json)
        .bind(outcome_json)
        .bind(record.created_at().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &ServiceCaseId) -> Result<Option<CaseRecord>, RepositoryError> {
        let row = sqlx::query("SELECT case_json, outcome_json FROM service_case WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| case_record_from_row(&r)).transpose()
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<CaseRecord>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT case_json, outcome_json
            FROM service_case
            ORDER BY created_at DESC, id ASC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(case_record_from_row).collect()
    }
}

fn case_record_from_row(row: &SqliteRow) -> Result<CaseRecord, RepositoryError> {
    let case_json: String = row.try_get("case_json")?;
    let outcome_json: String = row.try_get("outcome_json")?;

    Ok(CaseRecord {
        case: serde_json::from_str(&case_json)
            .map_err(|e| RepositoryError::Decode(format!("invalid case_json: {e}")))?,
        outcome: serde_json::from_str(&outcome_json)
            .map_err(|e| RepositoryError::Decode(format!("invalid outcome_json: {e}")))?,
    })
}
