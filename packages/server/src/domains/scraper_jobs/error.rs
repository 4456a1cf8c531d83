//! Error taxonomy for scraper job orchestration.

use thiserror::Error;

/// Errors returned synchronously to the caller of a scraper job operation.
#[derive(Debug, Error)]
pub enum ScraperJobError {
    /// Missing or invalid submission fields. Nothing was written.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// The job's current state does not allow the operation
    #[error("{0}")]
    InvalidState(String),

    /// Single-vehicle target URL is already in the vehicles table
    #[error("{0}")]
    Duplicate(String),

    /// Single-vehicle scraper failed or exited cleanly without saving a row
    #[error("{0}")]
    Ingestion(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ScraperJobError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }
}

pub type ScraperJobResult<T> = Result<T, ScraperJobError>;

/// Failure of a child process after the submission already returned.
///
/// `Display` is the exact text recorded in `scraper_jobs.error_message`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessFailure {
    #[error("Failed to start process: {0}")]
    Spawn(String),

    #[error("Process exited with code {0}")]
    NonZeroExit(i32),

    #[error("Process terminated by signal {}", .0.map(|s| s.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    Signalled(Option<i32>),

    /// Waiting on the child failed, so its exit status is unknown
    #[error("Lost track of process: {0}")]
    Lost(String),
}

impl ProcessFailure {
    /// Classify a finished child. Returns None for a clean exit.
    pub fn from_exit_status(status: std::process::ExitStatus) -> Option<Self> {
        if status.success() {
            return None;
        }
        match status.code() {
            Some(code) => Some(ProcessFailure::NonZeroExit(code)),
            None => Some(ProcessFailure::Signalled(exit_signal(&status))),
        }
    }
}

#[cfg(unix)]
fn exit_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_failure_messages() {
        assert_eq!(
            ProcessFailure::NonZeroExit(1).to_string(),
            "Process exited with code 1"
        );
        assert_eq!(
            ProcessFailure::Spawn("No such file or directory (os error 2)".into()).to_string(),
            "Failed to start process: No such file or directory (os error 2)"
        );
        assert_eq!(
            ProcessFailure::Signalled(Some(9)).to_string(),
            "Process terminated by signal 9"
        );
        assert_eq!(
            ProcessFailure::Signalled(None).to_string(),
            "Process terminated by signal unknown"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_classifies_exit_status() {
        use std::os::unix::process::ExitStatusExt;

        assert_eq!(ProcessFailure::from_exit_status(ExitStatusExt::from_raw(0)), None);
        // Raw wait status: exit code lives in the high byte
        assert_eq!(
            ProcessFailure::from_exit_status(ExitStatusExt::from_raw(3 << 8)),
            Some(ProcessFailure::NonZeroExit(3))
        );
        assert_eq!(
            ProcessFailure::from_exit_status(ExitStatusExt::from_raw(15)),
            Some(ProcessFailure::Signalled(Some(15)))
        );
    }
}
