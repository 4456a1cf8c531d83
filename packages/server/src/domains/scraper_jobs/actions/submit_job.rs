//! Submit a batch scraper job.
//!
//! Validate, insert the `pending` row, spawn the scraper, register it, flip the row
//! to `running`, hand the child to its monitor and return. The caller gets the job
//! id right away; the terminal state arrives later through the outcome channel and
//! the job row.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::common::{ManufacturerId, ModelId, ScraperJobId};
use crate::domains::scraper_jobs::actions::validate_submission::{
    validate_submission, ModelSelection, SubmissionKind,
};
use crate::domains::scraper_jobs::effects::{
    monitor_process, record_spawn_failure, JobOutcome, MonitoredProcess,
};
use crate::domains::scraper_jobs::error::{ProcessFailure, ScraperJobError, ScraperJobResult};
use crate::domains::scraper_jobs::models::{JobStatus, NewScraperJob};
use crate::kernel::{RegistryEntry, ScraperCommand, ServerDeps};

/// `POST /admin/scraper-jobs` body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitJobRequest {
    pub search_url: Option<String>,
    pub manufacturer_id: Option<ManufacturerId>,
    pub model_id: Option<ModelId>,
    pub model_name: Option<String>,
}

impl SubmitJobRequest {
    fn model(&self) -> ModelSelection {
        ModelSelection {
            model_id: self.model_id,
            model_name: self.model_name.clone(),
        }
    }
}

/// Accepted submission. `pid` is None when the scraper could not be started; the
/// job row is failed asynchronously in that case.
#[derive(Debug)]
pub struct SubmittedJob {
    pub id: ScraperJobId,
    pub pid: Option<u32>,
    pub outcome: oneshot::Receiver<JobOutcome>,
}

/// Response payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedJobData {
    pub id: ScraperJobId,
    pub pid: Option<u32>,
}

impl From<&SubmittedJob> for SubmittedJobData {
    fn from(job: &SubmittedJob) -> Self {
        Self {
            id: job.id,
            pid: job.pid,
        }
    }
}

pub async fn submit_job(
    request: SubmitJobRequest,
    deps: &ServerDeps,
) -> ScraperJobResult<SubmittedJob> {
    let submission = validate_submission(
        deps.catalog.as_ref(),
        SubmissionKind::BatchSearch,
        request.search_url.as_deref(),
        request.manufacturer_id,
        &request.model(),
    )
    .await?;

    let permit = match &deps.job_slots {
        Some(slots) => Some(slots.clone().try_acquire_owned().map_err(|_| {
            ScraperJobError::invalid_state("Too many scraper jobs running, try again later")
        })?),
        None => None,
    };

    let new_job = NewScraperJob::builder()
        .search_url(submission.url.clone())
        .manufacturer_id(submission.manufacturer.id)
        .model_id(submission.model.id())
        .build();
    let job = deps
        .scraper_jobs
        .insert_job(&new_job)
        .await
        .context("Failed to create scraper job")?;
    let job_id = job.id;

    info!(
        job_id = %job_id,
        search_url = %job.search_url,
        manufacturer = %submission.manufacturer.name,
        model = %submission.model.display_name(),
        "Starting scraper job"
    );

    let (outcome_tx, outcome_rx) = oneshot::channel();

    let spawned = ScraperCommand::batch(
        &deps.scraper,
        &job.search_url,
        job.manufacturer_id,
        job.model_id,
        job_id,
    )
    .map_err(|e| e.to_string())
    .and_then(|command| {
        debug!(job_id = %job_id, command = %command, "Spawning scraper");
        command.to_command().spawn().map_err(|e| e.to_string())
    });

    let child = match spawned {
        Ok(child) => child,
        Err(reason) => {
            error!(job_id = %job_id, error = %reason, "Failed to start scraper process");
            // Reported out of band, like any other post-submission failure
            let deps = deps.clone();
            tokio::spawn(async move {
                let outcome = record_spawn_failure(&deps, job_id, ProcessFailure::Spawn(reason)).await;
                let _ = outcome_tx.send(outcome);
            });
            return Ok(SubmittedJob {
                id: job_id,
                pid: None,
                outcome: outcome_rx,
            });
        }
    };

    let pid = child.id();
    let cancel = CancellationToken::new();
    deps.process_registry.insert(
        job_id,
        RegistryEntry::new(
            pid,
            submission.manufacturer.name.clone(),
            Some(submission.model.display_name().to_string()),
            cancel.clone(),
        ),
    );

    // The monitor owns the child before anything else is awaited, so a dropped
    // request cannot orphan the registry entry. It holds off recording an exit
    // until the `running` write below has settled, or until this future is dropped.
    let (started_tx, started_rx) = oneshot::channel::<()>();
    let monitor_deps = deps.clone();
    let process = MonitoredProcess {
        job_id,
        child,
        cancel,
        permit,
    };
    tokio::spawn(async move {
        let outcome = monitor_process(monitor_deps, process, started_rx).await;
        let _ = outcome_tx.send(outcome);
    });

    let running = deps.scraper_jobs.mark_running(job_id).await;

    let result = match running {
        Ok(true) => {
            info!(job_id = %job_id, pid = ?pid, "Scraper job running");
            Ok(())
        }
        Ok(false) => {
            // Cancelled while still pending; the row is already terminal
            warn!(job_id = %job_id, "Scraper job left pending before it started, stopping process");
            if let Some(entry) = deps.process_registry.remove(job_id) {
                entry.request_termination();
            }
            Ok(())
        }
        Err(e) => {
            error!(job_id = %job_id, error = %e, "Failed to mark scraper job running, stopping process");
            if let Some(entry) = deps.process_registry.remove(job_id) {
                entry.request_termination();
            }
            let message = format!("Failed to mark job running: {}", e);
            if let Err(e) = deps
                .scraper_jobs
                .finalize_job(job_id, JobStatus::Failed, Some(&message))
                .await
            {
                error!(job_id = %job_id, error = %e, "Failed to record scraper job failure");
            }
            Err(e.context("Failed to start scraper job"))
        }
    };
    let _ = started_tx.send(());
    result?;

    Ok(SubmittedJob {
        id: job_id,
        pid,
        outcome: outcome_rx,
    })
}
