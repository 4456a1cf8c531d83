use crate::common::ScraperJobId;
use crate::domains::scraper_jobs::error::{ScraperJobError, ScraperJobResult};
use crate::domains::scraper_jobs::models::ScraperJobSummary;
use crate::kernel::{ActiveProcess, ServerDeps};

/// Page size of the admin job list
pub const RECENT_JOBS_LIMIT: i64 = 50;

/// Most recent jobs with manufacturer/model names, newest first
pub async fn list_jobs(deps: &ServerDeps) -> ScraperJobResult<Vec<ScraperJobSummary>> {
    Ok(deps.scraper_jobs.list_recent_jobs(RECENT_JOBS_LIMIT).await?)
}

pub async fn get_job(job_id: ScraperJobId, deps: &ServerDeps) -> ScraperJobResult<ScraperJobSummary> {
    deps.scraper_jobs
        .find_job_summary(job_id)
        .await?
        .ok_or_else(|| ScraperJobError::not_found("Job not found"))
}

/// Live child processes tracked by this server
pub fn active_jobs(deps: &ServerDeps) -> Vec<ActiveProcess> {
    deps.process_registry.snapshot()
}
