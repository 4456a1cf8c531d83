use tracing::{debug, info};

use crate::common::ScraperJobId;
use crate::domains::scraper_jobs::error::{ScraperJobError, ScraperJobResult};
use crate::domains::scraper_jobs::models::JobStatus;
use crate::kernel::ServerDeps;

pub use crate::domains::scraper_jobs::models::CANCELLED_BY_USER;
const NOT_CANCELLABLE: &str = "Job is not running or pending";

/// Cancel a pending or running job.
///
/// The row is marked `cancelled` without waiting for the child to exit. If the
/// child is still registered it is asked to terminate; its monitor repeats the
/// guarded cancel write once the child is gone, so a failed write here still ends
/// with a terminal row. A job with no registered child is still cancelled.
pub async fn cancel_job(job_id: ScraperJobId, deps: &ServerDeps) -> ScraperJobResult<()> {
    let job = deps
        .scraper_jobs
        .find_job(job_id)
        .await?
        .ok_or_else(|| ScraperJobError::not_found("Job not found"))?;

    if job.status.is_terminal() {
        return Err(ScraperJobError::invalid_state(NOT_CANCELLABLE));
    }

    match deps.process_registry.remove(job_id) {
        Some(entry) => {
            info!(job_id = %job_id, pid = ?entry.pid, "Sending termination signal to scraper");
            entry.request_termination();
        }
        None => {
            debug!(job_id = %job_id, status = %job.status, "No live scraper process for job");
        }
    }

    let cancelled = deps
        .scraper_jobs
        .finalize_job(job_id, JobStatus::Cancelled, Some(CANCELLED_BY_USER))
        .await?;
    if !cancelled {
        // Finished between the lookup and the update
        return Err(ScraperJobError::invalid_state(NOT_CANCELLABLE));
    }

    info!(job_id = %job_id, "Scraper job cancelled");
    Ok(())
}
