use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use typed_builder::TypedBuilder;

use crate::common::{ManufacturerId, ModelId, ScraperJobId};

/// ScraperJob - one batch scraper invocation for a search results URL.
///
/// The server writes `pending`, `running`, `failed` and `cancelled`. The scraper script
/// writes the counters and (under the worker-reports policy) `completed`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScraperJob {
    pub id: ScraperJobId,
    pub search_url: String,
    pub manufacturer_id: ManufacturerId,
    pub model_id: Option<ModelId>,
    pub status: JobStatus,
    pub total_found: i32,
    pub total_added: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Job row joined with manufacturer and model display names (admin listing)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScraperJobSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub job: ScraperJob,
    pub manufacturer_name: Option<String>,
    pub model_name: Option<String>,
}

/// Values for a new job row. Status is always `pending` on insert.
#[derive(Debug, Clone, TypedBuilder)]
pub struct NewScraperJob {
    #[builder(setter(into))]
    pub search_url: String,
    pub manufacturer_id: ManufacturerId,
    #[builder(default)]
    pub model_id: Option<ModelId>,
}

/// Job status state machine.
///
/// ```text
/// pending -> running -> completed | failed | cancelled
/// pending -> failed | cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// `error_message` stored on a job cancelled from the admin API
pub const CANCELLED_BY_USER: &str = "Job cancelled by user";

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal rows are immutable; every later write is a no-op.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            _ => Err(anyhow::anyhow!("Invalid job status: {}", s)),
        }
    }
}

// Stored as VARCHAR, so map through &str rather than a Postgres enum type.
mod sqlx_impls {
    use super::JobStatus;
    use sqlx::encode::IsNull;
    use sqlx::error::BoxDynError;
    use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef, Postgres};
    use sqlx::{Decode, Encode, Type};

    impl Type<Postgres> for JobStatus {
        fn type_info() -> PgTypeInfo {
            <&str as Type<Postgres>>::type_info()
        }

        fn compatible(ty: &PgTypeInfo) -> bool {
            <&str as Type<Postgres>>::compatible(ty)
        }
    }

    impl Encode<'_, Postgres> for JobStatus {
        fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
            <&str as Encode<Postgres>>::encode_by_ref(&self.as_str(), buf)
        }
    }

    impl Decode<'_, Postgres> for JobStatus {
        fn decode(value: PgValueRef<'_>) -> Result<Self, BoxDynError> {
            let raw = <&str as Decode<Postgres>>::decode(value)?;
            Ok(raw.parse::<JobStatus>()?)
        }
    }
}

const SUMMARY_SELECT: &str = r#"
    SELECT sj.*, m.name AS manufacturer_name, mo.name AS model_name
    FROM scraper_jobs sj
    LEFT JOIN manufacturers m ON m.id = sj.manufacturer_id
    LEFT JOIN models mo ON mo.id = sj.model_id
"#;

impl ScraperJob {
    /// Insert a new job row with status `pending`
    pub async fn create(new: &NewScraperJob, pool: &PgPool) -> Result<Self> {
        let job = sqlx::query_as::<_, ScraperJob>(
            r#"
            INSERT INTO scraper_jobs (search_url, manufacturer_id, model_id, status)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&new.search_url)
        .bind(new.manufacturer_id)
        .bind(new.model_id)
        .bind(JobStatus::Pending)
        .fetch_one(pool)
        .await?;
        Ok(job)
    }

    pub async fn find_by_id(id: ScraperJobId, pool: &PgPool) -> Result<Option<Self>> {
        let job = sqlx::query_as::<_, ScraperJob>("SELECT * FROM scraper_jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(job)
    }

    /// pending -> running. Returns false if the row already left `pending`.
    pub async fn mark_running(id: ScraperJobId, pool: &PgPool) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE scraper_jobs SET status = $2 WHERE id = $1 AND status = $3",
        )
        .bind(id)
        .bind(JobStatus::Running)
        .bind(JobStatus::Pending)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Move a non-terminal row into `status` and stamp `completed_at`.
    ///
    /// Returns false (and writes nothing) if the row is already terminal. A `None`
    /// message keeps whatever the worker wrote.
    pub async fn finalize(
        id: ScraperJobId,
        status: JobStatus,
        error_message: Option<&str>,
        pool: &PgPool,
    ) -> Result<bool> {
        debug_assert!(status.is_terminal());
        let result = sqlx::query(
            r#"
            UPDATE scraper_jobs
            SET status = $2,
                error_message = COALESCE($3, error_message),
                completed_at = NOW()
            WHERE id = $1 AND status IN ('pending', 'running')
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(error_message)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Fail every non-terminal row. Returns the ids that were swept.
    pub async fn fail_all_non_terminal(message: &str, pool: &PgPool) -> Result<Vec<ScraperJobId>> {
        let ids = sqlx::query_scalar::<_, ScraperJobId>(
            r#"
            UPDATE scraper_jobs
            SET status = 'failed', error_message = $1, completed_at = NOW()
            WHERE status IN ('pending', 'running')
            RETURNING id
            "#,
        )
        .bind(message)
        .fetch_all(pool)
        .await?;
        Ok(ids)
    }
}

impl ScraperJobSummary {
    /// Most recent jobs first, with display names
    pub async fn list_recent(limit: i64, pool: &PgPool) -> Result<Vec<Self>> {
        let query = format!("{} ORDER BY sj.created_at DESC, sj.id DESC LIMIT $1", SUMMARY_SELECT);
        let jobs = sqlx::query_as::<_, ScraperJobSummary>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await?;
        Ok(jobs)
    }

    pub async fn find_by_id(id: ScraperJobId, pool: &PgPool) -> Result<Option<Self>> {
        let query = format!("{} WHERE sj.id = $1", SUMMARY_SELECT);
        let job = sqlx::query_as::<_, ScraperJobSummary>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(job)
    }
}
