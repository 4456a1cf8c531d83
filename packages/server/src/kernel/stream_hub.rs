//! In-process pub/sub hub for live scraper job output.
//!
//! One broadcast channel per job. The lifecycle monitor publishes every captured
//! output line and a final exit event; SSE endpoints subscribe by job id.
//!
//! # Usage
//!
//! Producers (lifecycle monitor):
//!   hub.publish(job_id, JobLogEvent::stdout("Found 12 listings")).await;
//!
//! Consumers (SSE endpoints):
//!   let rx = hub.subscribe(job_id).await;

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use crate::common::ScraperJobId;
use crate::domains::scraper_jobs::models::JobStatus;

/// Event pushed to subscribers of a job's log stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobLogEvent {
    Stdout { line: String },
    Stderr { line: String },
    /// Process is gone. `status` is what the server recorded, if it wrote anything.
    Exit {
        exit_code: Option<i32>,
        status: Option<JobStatus>,
        message: Option<String>,
    },
}

impl JobLogEvent {
    pub fn stdout(line: impl Into<String>) -> Self {
        JobLogEvent::Stdout { line: line.into() }
    }

    pub fn stderr(line: impl Into<String>) -> Self {
        JobLogEvent::Stderr { line: line.into() }
    }

    /// SSE event name
    pub fn kind(&self) -> &'static str {
        match self {
            JobLogEvent::Stdout { .. } => "stdout",
            JobLogEvent::Stderr { .. } => "stderr",
            JobLogEvent::Exit { .. } => "exit",
        }
    }
}

/// Per-job broadcast hub.
///
/// Thread-safe, cloneable. Publishing to a job nobody watches is a no-op.
#[derive(Clone)]
pub struct JobLogHub {
    channels: Arc<RwLock<HashMap<ScraperJobId, broadcast::Sender<JobLogEvent>>>>,
    capacity: usize,
}

impl JobLogHub {
    /// Create a hub with default capacity (512 lines per job).
    pub fn new() -> Self {
        Self::with_capacity(512)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    pub async fn publish(&self, job_id: ScraperJobId, event: JobLogEvent) {
        let channels = self.channels.read().await;
        if let Some(tx) = channels.get(&job_id) {
            // Ignore send errors (no active receivers)
            let _ = tx.send(event);
        }
    }

    /// Subscribe to a job's stream. Creates the channel if it doesn't exist.
    pub async fn subscribe(&self, job_id: ScraperJobId) -> broadcast::Receiver<JobLogEvent> {
        let mut channels = self.channels.write().await;
        let tx = channels
            .entry(job_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        tx.subscribe()
    }

    /// Drop the job's sender. Subscribers drain buffered events, then see the stream end.
    pub async fn close(&self, job_id: ScraperJobId) {
        self.channels.write().await.remove(&job_id);
    }

    /// Remove channels with zero subscribers (housekeeping).
    pub async fn cleanup(&self) {
        let mut channels = self.channels.write().await;
        channels.retain(|_, tx| tx.receiver_count() > 0);
    }

    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }
}

impl Default for JobLogHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_subscribe_roundtrip() {
        let hub = JobLogHub::new();
        let job_id = ScraperJobId::new(42);
        let mut rx = hub.subscribe(job_id).await;

        hub.publish(job_id, JobLogEvent::stdout("page 1 done")).await;

        assert_eq!(rx.recv().await.unwrap(), JobLogEvent::stdout("page 1 done"));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let hub = JobLogHub::new();
        hub.publish(ScraperJobId::new(1), JobLogEvent::stderr("dropped"))
            .await;
        assert_eq!(hub.channel_count().await, 0);
    }

    #[tokio::test]
    async fn test_close_ends_stream_after_buffered_events() {
        let hub = JobLogHub::new();
        let job_id = ScraperJobId::new(7);
        let mut rx = hub.subscribe(job_id).await;

        hub.publish(job_id, JobLogEvent::stdout("last words")).await;
        hub.close(job_id).await;

        assert_eq!(rx.recv().await.unwrap(), JobLogEvent::stdout("last words"));
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_cleanup_removes_empty_channels() {
        let hub = JobLogHub::new();
        let rx = hub.subscribe(ScraperJobId::new(3)).await;
        assert_eq!(hub.channel_count().await, 1);

        drop(rx);
        hub.cleanup().await;

        assert_eq!(hub.channel_count().await, 0);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let value = serde_json::to_value(JobLogEvent::Exit {
            exit_code: Some(1),
            status: Some(JobStatus::Failed),
            message: Some("Process exited with code 1".to_string()),
        })
        .unwrap();
        assert_eq!(value["type"], "exit");
        assert_eq!(value["status"], "failed");
        assert_eq!(value["exit_code"], 1);
    }
}
