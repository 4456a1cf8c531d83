//! Import one vehicle by URL.
//!
//! Same process model as batch jobs but the caller waits for the child, and no
//! job row is written. Success means the scraper exited 0 *and* a vehicle row with
//! the URL exists afterwards.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::common::{ManufacturerId, ModelId, VehicleId};
use crate::domains::scraper_jobs::actions::validate_submission::{
    validate_submission, ModelSelection, ResolvedModel, SubmissionKind,
};
use crate::domains::scraper_jobs::error::{ScraperJobError, ScraperJobResult};
use crate::kernel::{OutputLines, ScraperCommand, ServerDeps};

/// `POST /admin/vehicles/add-single` body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddVehicleRequest {
    pub url: Option<String>,
    pub manufacturer_id: Option<ManufacturerId>,
    pub model_id: Option<ModelId>,
    pub model_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddedVehicle {
    pub id: VehicleId,
}

pub async fn add_single_vehicle(
    request: AddVehicleRequest,
    deps: &ServerDeps,
) -> ScraperJobResult<AddedVehicle> {
    let submission = validate_submission(
        deps.catalog.as_ref(),
        SubmissionKind::SingleVehicle,
        request.url.as_deref(),
        request.manufacturer_id,
        &ModelSelection {
            model_id: request.model_id,
            model_name: request.model_name.clone(),
        },
    )
    .await?;
    let url = submission.url;

    if deps.catalog.find_vehicle_by_url(&url).await?.is_some() {
        return Err(ScraperJobError::Duplicate(
            "Vehicle with this URL already exists".to_string(),
        ));
    }

    // The script needs a concrete model id, so free-text names are created here
    let model_id = match submission.model {
        ResolvedModel::Existing(model) => model.id,
        ResolvedModel::Unresolved(name) => {
            let model = deps
                .catalog
                .find_or_create_model(submission.manufacturer.id, &name)
                .await
                .context("Failed to create model")?;
            info!(model_id = %model.id, model = %model.name, "Created model for single vehicle import");
            model.id
        }
    };

    let command = ScraperCommand::single_vehicle(
        &deps.scraper,
        &url,
        submission.manufacturer.id,
        model_id,
    )
    .map_err(|e| ScraperJobError::validation(e.to_string()))?;

    info!(url = %url, command = %command, "Starting single vehicle scraper");

    let mut child = command.to_command().spawn().map_err(|e| {
        error!(url = %url, error = %e, "Failed to start single vehicle scraper");
        ScraperJobError::Ingestion(format!("Failed to start scraper process: {}", e))
    })?;

    let stdout = child.stdout.take().map(|out| collect_output(out, false));
    let stderr = child.stderr.take().map(|err| collect_output(err, true));

    let timeout = deps.scraper.single_vehicle_timeout;
    let status = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(status) => status.context("Failed to wait for single vehicle scraper")?,
        Err(_) => {
            warn!(url = %url, timeout_secs = timeout.as_secs(), "Single vehicle scraper timed out, killing");
            if let Err(e) = child.start_kill() {
                warn!(url = %url, error = %e, "Failed to kill single vehicle scraper");
            }
            let _ = child.wait().await;
            return Err(ScraperJobError::Ingestion(format!(
                "Scraper timed out after {} seconds",
                timeout.as_secs()
            )));
        }
    };

    if let Some(stdout) = stdout {
        let _ = stdout.await;
    }
    let stderr_text = match stderr {
        Some(handle) => handle.await.unwrap_or_default(),
        None => String::new(),
    };

    if !status.success() {
        let detail = stderr_text.trim();
        let detail = if detail.is_empty() { "Unknown error" } else { detail };
        error!(url = %url, exit_code = ?status.code(), "Single vehicle scraper failed");
        return Err(ScraperJobError::Ingestion(format!(
            "Failed to scrape vehicle data: {}",
            detail
        )));
    }

    match deps.catalog.find_vehicle_by_url(&url).await? {
        Some(id) => {
            info!(vehicle_id = %id, url = %url, "Vehicle imported");
            Ok(AddedVehicle { id })
        }
        None => {
            warn!(url = %url, "Single vehicle scraper exited cleanly without saving a vehicle");
            Err(ScraperJobError::Ingestion(
                "Failed to add vehicle - scraper did not save data".to_string(),
            ))
        }
    }
}

/// Log each line and return everything read, newline separated.
fn collect_output<R>(reader: R, is_stderr: bool) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = OutputLines::new(reader);
        let mut collected = String::new();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if is_stderr {
                        error!(line = %line, "single vehicle scraper stderr");
                    } else {
                        info!(line = %line, "single vehicle scraper stdout");
                    }
                    collected.push_str(&line);
                    collected.push('\n');
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Failed to read single vehicle scraper output");
                    break;
                }
            }
        }
        collected
    })
}
