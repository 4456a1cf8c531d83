//! In-memory registry of live scraper child processes.
//!
//! Keyed by job id. An entry exists from the moment a child is spawned until it exits
//! or is cancelled. Nothing here is persisted: a restart forgets every live child.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

use crate::common::ScraperJobId;

/// A tracked child process.
///
/// The `Child` handle itself is owned by the lifecycle monitor; the registry keeps the
/// token that asks the monitor to terminate it.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub pid: Option<u32>,
    pub started_at: DateTime<Utc>,
    pub manufacturer_name: String,
    pub model_name: Option<String>,
    cancel: CancellationToken,
}

impl RegistryEntry {
    pub fn new(
        pid: Option<u32>,
        manufacturer_name: impl Into<String>,
        model_name: Option<String>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            pid,
            started_at: Utc::now(),
            manufacturer_name: manufacturer_name.into(),
            model_name,
            cancel,
        }
    }

    /// Ask the monitor to terminate the child. Idempotent.
    pub fn request_termination(&self) {
        self.cancel.cancel();
    }
}

/// Progress view of one entry (admin "active jobs" panel)
#[derive(Debug, Clone, Serialize)]
pub struct ActiveProcess {
    pub job_id: ScraperJobId,
    pub pid: Option<u32>,
    pub started_at: DateTime<Utc>,
    pub elapsed_seconds: i64,
    pub manufacturer_name: String,
    pub model_name: Option<String>,
}

/// Thread-safe, cloneable handle to the registry map.
///
/// Critical sections never await, so a blocking mutex is enough.
#[derive(Clone, Default)]
pub struct ProcessRegistry {
    entries: Arc<Mutex<HashMap<ScraperJobId, RegistryEntry>>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<ScraperJobId, RegistryEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert(&self, job_id: ScraperJobId, entry: RegistryEntry) {
        self.entries().insert(job_id, entry);
    }

    /// Remove and return the entry. Exactly one caller wins when exit and cancel race.
    pub fn remove(&self, job_id: ScraperJobId) -> Option<RegistryEntry> {
        self.entries().remove(&job_id)
    }

    pub fn contains(&self, job_id: ScraperJobId) -> bool {
        self.entries().contains_key(&job_id)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Snapshot of live processes, oldest first
    pub fn snapshot(&self) -> Vec<ActiveProcess> {
        let now = Utc::now();
        let mut active: Vec<ActiveProcess> = self
            .entries()
            .iter()
            .map(|(job_id, entry)| ActiveProcess {
                job_id: *job_id,
                pid: entry.pid,
                started_at: entry.started_at,
                elapsed_seconds: (now - entry.started_at).num_seconds(),
                manufacturer_name: entry.manufacturer_name.clone(),
                model_name: entry.model_name.clone(),
            })
            .collect();
        active.sort_by_key(|p| (p.started_at, p.job_id));
        active
    }
}
