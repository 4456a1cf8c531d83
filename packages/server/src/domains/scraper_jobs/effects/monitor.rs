//! Process lifecycle monitor.
//!
//! One monitor task per spawned batch scraper. It owns the `Child`, forwards the
//! child's output into logs and the job log hub, waits for exit (or for a
//! termination request), removes the registry entry and records the outcome on the
//! job row before draining the remaining output. Every status write is guarded:
//! terminal rows are never overwritten.

use std::io;
use std::process::ExitStatus;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;
use tokio::process::Child;
use tokio::sync::{oneshot, OwnedSemaphorePermit};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::common::ScraperJobId;
use crate::domains::scraper_jobs::error::ProcessFailure;
use crate::domains::scraper_jobs::models::{JobStatus, CANCELLED_BY_USER};
use crate::kernel::{JobLogEvent, JobLogHub, OutputLines, ServerDeps};

/// How long to keep draining output after the child exited. A grandchild that
/// inherited the pipes can otherwise hold them open indefinitely.
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Who marks a job `completed` after the scraper exits with code 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanExitPolicy {
    /// The monitor finalizes a still non-terminal row as `completed`.
    #[default]
    Finalize,
    /// The scraper writes `completed` itself; the monitor only cleans up.
    WorkerReports,
}

impl FromStr for CleanExitPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "finalize" => Ok(CleanExitPolicy::Finalize),
            "worker_reports" | "worker-reports" => Ok(CleanExitPolicy::WorkerReports),
            other => Err(anyhow::anyhow!(
                "Invalid SCRAPER_CLEAN_EXIT_POLICY: {} (expected finalize or worker_reports)",
                other
            )),
        }
    }
}

/// How the child ended, as seen by the monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessExit {
    Clean,
    Failed(ProcessFailure),
    /// Killed on request (cancellation). The requester normally writes `cancelled`
    /// first; the monitor's own guarded write only lands if that one failed.
    Terminated,
}

/// Terminal signal of a submitted job, resolved once the child is gone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub job_id: ScraperJobId,
    pub exit: ProcessExit,
    /// Status the monitor wrote, or None if it left the row alone
    pub recorded: Option<JobStatus>,
}

/// A spawned child handed over to its monitor
pub struct MonitoredProcess {
    pub job_id: ScraperJobId,
    pub child: Child,
    pub cancel: CancellationToken,
    /// Concurrency slot, released when the monitor finishes
    pub permit: Option<OwnedSemaphorePermit>,
}

/// Supervise a child until it exits and record the outcome.
///
/// `started` resolves once the launcher's `running` write has settled (or the
/// launcher went away); the exit is not recorded before that.
pub async fn monitor_process(
    deps: ServerDeps,
    process: MonitoredProcess,
    started: oneshot::Receiver<()>,
) -> JobOutcome {
    let MonitoredProcess {
        job_id,
        mut child,
        cancel,
        permit,
    } = process;

    let stdout = child
        .stdout
        .take()
        .map(|out| forward_output(job_id, out, OutputStream::Stdout, deps.job_logs.clone()));
    let stderr = child
        .stderr
        .take()
        .map(|err| forward_output(job_id, err, OutputStream::Stderr, deps.job_logs.clone()));

    let waited = tokio::select! {
        status = child.wait() => Some(status),
        _ = cancel.cancelled() => None,
    };
    let (status, terminated) = match waited {
        Some(status) => (status, false),
        None => {
            info!(job_id = %job_id, pid = ?child.id(), "Terminating scraper process");
            (terminate(job_id, &mut child, deps.scraper.termination_grace).await, true)
        }
    };

    // From here on a cancel request finds no live process
    deps.process_registry.remove(job_id);
    let _ = started.await;

    let exit = match status {
        _ if terminated => ProcessExit::Terminated,
        Ok(status) => match ProcessFailure::from_exit_status(status) {
            None => ProcessExit::Clean,
            Some(failure) => ProcessExit::Failed(failure),
        },
        Err(e) => {
            error!(job_id = %job_id, error = %e, "Lost track of scraper process");
            ProcessExit::Failed(ProcessFailure::Lost(e.to_string()))
        }
    };

    let recorded = record_exit(&deps, job_id, &exit).await;

    // Output arrives before exit
    for reader in [stdout, stderr].into_iter().flatten() {
        drain(job_id, reader).await;
    }

    deps.job_logs
        .publish(
            job_id,
            JobLogEvent::Exit {
                exit_code: status_code(&exit),
                status: recorded,
                message: match &exit {
                    ProcessExit::Failed(failure) => Some(failure.to_string()),
                    _ => None,
                },
            },
        )
        .await;
    deps.job_logs.close(job_id).await;

    drop(permit);

    JobOutcome {
        job_id,
        exit,
        recorded,
    }
}

/// Record a child that never started. Used when spawn itself failed.
pub async fn record_spawn_failure(
    deps: &ServerDeps,
    job_id: ScraperJobId,
    failure: ProcessFailure,
) -> JobOutcome {
    deps.process_registry.remove(job_id);

    let message = failure.to_string();
    let exit = ProcessExit::Failed(failure);
    let recorded = record_exit(deps, job_id, &exit).await;

    deps.job_logs
        .publish(
            job_id,
            JobLogEvent::Exit {
                exit_code: None,
                status: recorded,
                message: Some(message),
            },
        )
        .await;
    deps.job_logs.close(job_id).await;

    JobOutcome {
        job_id,
        exit,
        recorded,
    }
}

async fn record_exit(
    deps: &ServerDeps,
    job_id: ScraperJobId,
    exit: &ProcessExit,
) -> Option<JobStatus> {
    let (status, message) = match exit {
        ProcessExit::Terminated => {
            debug!(job_id = %job_id, "Scraper process terminated on request");
            (JobStatus::Cancelled, Some(CANCELLED_BY_USER.to_string()))
        }
        ProcessExit::Clean => match deps.scraper.clean_exit_policy {
            CleanExitPolicy::WorkerReports => {
                info!(job_id = %job_id, "Scraper process exited cleanly");
                return None;
            }
            CleanExitPolicy::Finalize => (JobStatus::Completed, None),
        },
        ProcessExit::Failed(failure) => {
            error!(job_id = %job_id, error = %failure, "Scraper process failed");
            (JobStatus::Failed, Some(failure.to_string()))
        }
    };

    match deps
        .scraper_jobs
        .finalize_job(job_id, status, message.as_deref())
        .await
    {
        Ok(true) => {
            info!(job_id = %job_id, status = %status, "Scraper job finalized");
            Some(status)
        }
        Ok(false) => {
            debug!(
                job_id = %job_id,
                status = %status,
                "Scraper job already terminal, leaving row unchanged"
            );
            None
        }
        Err(e) => {
            error!(job_id = %job_id, error = %e, "Failed to record scraper job outcome");
            None
        }
    }
}

fn status_code(exit: &ProcessExit) -> Option<i32> {
    match exit {
        ProcessExit::Clean => Some(0),
        ProcessExit::Failed(ProcessFailure::NonZeroExit(code)) => Some(*code),
        _ => None,
    }
}

// =============================================================================
// Output forwarding
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum OutputStream {
    Stdout,
    Stderr,
}

fn forward_output<R>(
    job_id: ScraperJobId,
    reader: R,
    stream: OutputStream,
    hub: JobLogHub,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = OutputLines::new(reader);
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let event = match stream {
                        OutputStream::Stdout => {
                            info!(job_id = %job_id, line = %line, "scraper stdout");
                            JobLogEvent::stdout(line)
                        }
                        OutputStream::Stderr => {
                            error!(job_id = %job_id, line = %line, "scraper stderr");
                            JobLogEvent::stderr(line)
                        }
                    };
                    hub.publish(job_id, event).await;
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(job_id = %job_id, error = %e, stream = ?stream, "Failed to read scraper output");
                    break;
                }
            }
        }
    })
}

async fn drain(job_id: ScraperJobId, reader: JoinHandle<()>) {
    let abort = reader.abort_handle();
    if tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, reader).await.is_err() {
        warn!(job_id = %job_id, "Scraper output still open after exit, detaching");
        abort.abort();
    }
}

// =============================================================================
// Termination
// =============================================================================

/// SIGTERM, then SIGKILL if the child is still alive after `grace`.
async fn terminate(
    job_id: ScraperJobId,
    child: &mut Child,
    grace: Duration,
) -> io::Result<ExitStatus> {
    if let Err(e) = send_terminate(child) {
        // Usually the child exited between the status check and the signal
        warn!(job_id = %job_id, error = %e, "Failed to signal scraper process");
    }

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(status) => status,
        Err(_) => {
            warn!(
                job_id = %job_id,
                grace_secs = grace.as_secs(),
                "Scraper process ignored termination signal, killing"
            );
            if let Err(e) = child.start_kill() {
                warn!(job_id = %job_id, error = %e, "Failed to kill scraper process");
            }
            child.wait().await
        }
    }
}

#[cfg(unix)]
fn send_terminate(child: &mut Child) -> io::Result<()> {
    // No pid means the child was already reaped
    let Some(pid) = child.id() else {
        return Ok(());
    };
    let pid = libc::pid_t::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    // SAFETY: plain kill(2) on a pid we spawned and have not reaped yet
    let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn send_terminate(child: &mut Child) -> io::Result<()> {
    child.start_kill()
}
