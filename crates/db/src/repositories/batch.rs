use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row};

use repairdesk_core::domain::batch::{BatchCaseResult, BatchJob, BatchJobId, BatchJobStatus};
use repairdesk_core::domain::case::CasePriority;

use super::{parse_timestamp, BatchJobRepository, RepositoryError};
use crate::DbPool;

pub struct SqlBatchJobRepository {
    pool: DbPool,
}

impl SqlBatchJobRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BatchJobRepository for SqlBatchJobRepository {
    async fn save(&self, job: BatchJob) -> Result<(), RepositoryError> {
        let results_json = serde_json::to_string(&job.results)?;

        sqlx::query(
            r#"
            INSERT INTO batch_job (
                id, status, priority, total_cases, completed_cases,
                failed_cases, results_json, created_at, completed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                completed_cases = excluded.completed_cases,
                failed_cases = excluded.failed_cases,
                results_json = excluded.results_json,
                completed_at = excluded.completed_at
            "#,
        )
        .bind(&job.job_id.0)
        .bind(job.status.as_str())
        .bind(job.priority.as_str())
        .bind(job.total_cases as i64)
        .bind(job.completed_cases as i64)
        .bind(job.failed_cases as i64)
        .bind(results_json)
        .bind(job.created_at.to_rfc3339())
        .bind(job.completed_at.map(|ts| ts.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &BatchJobId) -> Result<Option<BatchJob>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT
                id, status, priority, total_cases, completed_cases,
                failed_cases, results_json, created_at, completed_at
            FROM batch_job
            WHERE id = ?
            "#,
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| batch_job_from_row(&r)).transpose()
    }
}

fn batch_job_from_row(row: &SqliteRow) -> Result<BatchJob, RepositoryError> {
    let status: String = row.try_get("status")?;
    let priority: String = row.try_get("priority")?;
    let results_json: String = row.try_get("results_json")?;
    let created_at: String = row.try_get("created_at")?;
    let completed_at: Option<String> = row.try_get("completed_at")?;

    let results: Vec<BatchCaseResult> = serde_json::from_str(&results_json)
        .map_err(|e| RepositoryError::Decode(format!("invalid results_json: {e}")))?;

    Ok(BatchJob {
        job_id: BatchJobId(row.try_get("id")?),
        status: BatchJobStatus::parse(&status)
            .ok_or_else(|| RepositoryError::Decode(format!("invalid status: {status}")))?,
        priority: CasePriority::parse(&priority)
            .ok_or_else(|| RepositoryError::Decode(format!("invalid priority: {priority}")))?,
        total_cases: count_column(row, "total_cases")?,
        completed_cases: count_column(row, "completed_cases")?,
        failed_cases: count_column(row, "failed_cases")?,
        results,
        created_at: parse_timestamp("created_at", &created_at)?,
        completed_at: completed_at
            .map(|ts| parse_timestamp("completed_at", &ts))
            .transpose()?,
    })
}

fn count_column(row: &SqliteRow, column: &str) -> Result<usize, RepositoryError> {
    let value: i64 = row.try_get(column)?;
    usize::try_from(value)
        .map_err(|_| RepositoryError::Decode(format!("negative count in `{column}`: {value}")))
}
