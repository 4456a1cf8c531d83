//! Admin endpoints for batch scraper jobs.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Extension, Path,
    },
    Json,
};

use crate::common::ScraperJobId;
use crate::domains::scraper_jobs::actions::{
    active_jobs, cancel_job, get_job, list_jobs, submit_job, SubmitJobRequest, SubmittedJobData,
};
use crate::domains::scraper_jobs::{ScraperJobError, ScraperJobSummary};
use crate::kernel::ActiveProcess;
use crate::server::app::AxumAppState;
use crate::server::response::{ApiResponse, ApiResult, MessageData};

fn job_id(path: Result<Path<ScraperJobId>, PathRejection>) -> Result<ScraperJobId, ScraperJobError> {
    path.map(|Path(id)| id)
        .map_err(|_| ScraperJobError::validation("Invalid job ID"))
}

/// GET /admin/scraper-jobs
pub async fn list_jobs_handler(
    Extension(state): Extension<AxumAppState>,
) -> ApiResult<Vec<ScraperJobSummary>> {
    let jobs = list_jobs(&state.server_deps).await?;
    Ok(ApiResponse::ok(jobs))
}

/// POST /admin/scraper-jobs
///
/// Returns as soon as the scraper is spawned. Later failures only show up on the
/// job row (and the log stream).
pub async fn submit_job_handler(
    Extension(state): Extension<AxumAppState>,
    payload: Result<Json<SubmitJobRequest>, JsonRejection>,
) -> ApiResult<SubmittedJobData> {
    let Json(request) = payload?;
    let submitted = submit_job(request, &state.server_deps).await?;
    Ok(ApiResponse::ok(SubmittedJobData::from(&submitted)))
}

/// GET /admin/scraper-jobs/active
pub async fn active_jobs_handler(
    Extension(state): Extension<AxumAppState>,
) -> ApiResult<Vec<ActiveProcess>> {
    Ok(ApiResponse::ok(active_jobs(&state.server_deps)))
}

/// GET /admin/scraper-jobs/:id
pub async fn get_job_handler(
    Extension(state): Extension<AxumAppState>,
    path: Result<Path<ScraperJobId>, PathRejection>,
) -> ApiResult<ScraperJobSummary> {
    let job = get_job(job_id(path)?, &state.server_deps).await?;
    Ok(ApiResponse::ok(job))
}

/// POST /admin/scraper-jobs/:id/cancel
pub async fn cancel_job_handler(
    Extension(state): Extension<AxumAppState>,
    path: Result<Path<ScraperJobId>, PathRejection>,
) -> ApiResult<MessageData> {
    cancel_job(job_id(path)?, &state.server_deps).await?;
    Ok(ApiResponse::ok(MessageData::new("Job cancelled successfully")))
}
