use anyhow::Result;
use tracing::{info, warn};

use crate::common::ScraperJobId;
use crate::kernel::ServerDeps;

pub const ORPHANED_MESSAGE: &str = "Orphaned by server restart: scraper process no longer tracked";

/// Fail jobs that a previous server process left `pending` or `running`.
///
/// Child handles do not survive a restart, so nothing can observe those jobs
/// finishing. Only call this before the first submission of this process.
pub async fn sweep_orphaned_jobs(deps: &ServerDeps) -> Result<Vec<ScraperJobId>> {
    if !deps.process_registry.is_empty() {
        warn!("Skipping orphan sweep, scraper processes are already tracked");
        return Ok(Vec::new());
    }

    let swept = deps
        .scraper_jobs
        .fail_non_terminal_jobs(ORPHANED_MESSAGE)
        .await?;

    if swept.is_empty() {
        info!("No orphaned scraper jobs");
    } else {
        warn!(count = swept.len(), job_ids = ?swept, "Marked orphaned scraper jobs as failed");
    }
    Ok(swept)
}
