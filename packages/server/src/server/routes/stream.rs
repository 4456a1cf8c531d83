//! SSE endpoint for live scraper output.
//!
//! GET /admin/scraper-jobs/:id/logs
//!
//! Sends `connected`, then one `stdout`/`stderr` event per line and a final `exit`
//! event. Slow clients get a `lagged` event with the number of lines they missed.
//! Jobs that are no longer tracked by this server get a single `exit` event built
//! from the job row.

use std::convert::Infallible;

use axum::{
    extract::{rejection::PathRejection, Extension, Path},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, BoxStream, StreamExt};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::debug;

use crate::common::ScraperJobId;
use crate::domains::scraper_jobs::ScraperJobError;
use crate::kernel::JobLogEvent;
use crate::server::app::AxumAppState;

type EventStream = BoxStream<'static, Result<Event, Infallible>>;

fn to_sse(event: &JobLogEvent) -> Option<Event> {
    Event::default().event(event.kind()).json_data(event).ok()
}

pub async fn job_logs_handler(
    Extension(state): Extension<AxumAppState>,
    path: Result<Path<ScraperJobId>, PathRejection>,
) -> Result<Sse<EventStream>, ScraperJobError> {
    let Path(job_id) = path.map_err(|_| ScraperJobError::validation("Invalid job ID"))?;
    let deps = &state.server_deps;

    // Subscribe before looking at the row so an exit in between is not missed
    let rx = deps.job_logs.subscribe(job_id).await;

    let job = match deps.scraper_jobs.find_job(job_id).await? {
        Some(job) => job,
        None => {
            drop(rx);
            deps.job_logs.cleanup().await;
            return Err(ScraperJobError::not_found("Job not found"));
        }
    };

    let connected = stream::once(async {
        Ok::<_, Infallible>(Event::default().event("connected").data("ok"))
    });

    if !deps.process_registry.contains(job_id) {
        debug!(job_id = %job_id, status = %job.status, "Job not tracked, sending final state");
        drop(rx);
        deps.job_logs.cleanup().await;

        // The row may have been finalized after the first read
        let job = deps.scraper_jobs.find_job(job_id).await?.unwrap_or(job);
        let exit = JobLogEvent::Exit {
            exit_code: None,
            status: Some(job.status),
            message: job.error_message,
        };
        let last = stream::iter(to_sse(&exit).map(Ok));
        return Ok(Sse::new(connected.chain(last).boxed()));
    }

    let events = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => to_sse(&event).map(Ok),
            Err(BroadcastStreamRecvError::Lagged(n)) => Event::default()
                .event("lagged")
                .json_data(serde_json::json!({ "missed": n }))
                .ok()
                .map(Ok),
        }
    });

    Ok(Sse::new(connected.chain(events).boxed()).keep_alive(KeepAlive::default()))
}
