//! Server dependencies for actions (using traits for testability)
//!
//! This module provides the central dependency container used by the scraper job
//! actions and the lifecycle monitor. Persistence goes through trait objects so the
//! process lifecycle can be tested against an in-memory store.

use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::config::ScraperSettings;
use crate::kernel::{
    BaseCatalog, BaseScraperJobStore, JobLogHub, PostgresStore, ProcessRegistry,
};

/// Server dependencies shared by request handlers and monitor tasks
#[derive(Clone)]
pub struct ServerDeps {
    pub catalog: Arc<dyn BaseCatalog>,
    pub scraper_jobs: Arc<dyn BaseScraperJobStore>,
    /// Live child processes keyed by job id (owned here, never global)
    pub process_registry: ProcessRegistry,
    /// Per-job output streams for SSE endpoints
    pub job_logs: JobLogHub,
    pub scraper: ScraperSettings,
    /// Present when `max_concurrent_jobs` is configured
    pub job_slots: Option<Arc<Semaphore>>,
}

impl ServerDeps {
    pub fn new(
        catalog: Arc<dyn BaseCatalog>,
        scraper_jobs: Arc<dyn BaseScraperJobStore>,
        scraper: ScraperSettings,
    ) -> Self {
        let job_slots = scraper
            .max_concurrent_jobs
            .map(|limit| Arc::new(Semaphore::new(limit)));
        Self {
            catalog,
            scraper_jobs,
            process_registry: ProcessRegistry::new(),
            job_logs: JobLogHub::new(),
            scraper,
            job_slots,
        }
    }

    /// Production wiring: both stores backed by the same pool
    pub fn postgres(pool: PgPool, scraper: ScraperSettings) -> Self {
        let store = Arc::new(PostgresStore::new(pool));
        Self::new(store.clone(), store, scraper)
    }
}
