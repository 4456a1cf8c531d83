// TestDependencies - in-memory implementations for testing
//
// Provides a store that can be injected into ServerDeps so process lifecycle tests
// run without a database.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{BaseCatalog, BaseScraperJobStore};
use crate::common::{ManufacturerId, ModelId, ScraperJobId, VehicleId};
use crate::domains::catalog::models::{Manufacturer, VehicleModel};
use crate::domains::scraper_jobs::models::{
    JobStatus, NewScraperJob, ScraperJob, ScraperJobSummary,
};

// =============================================================================
// In-memory store
// =============================================================================

#[derive(Default)]
struct StoreState {
    manufacturers: BTreeMap<ManufacturerId, Manufacturer>,
    models: BTreeMap<ModelId, VehicleModel>,
    vehicles: HashMap<String, VehicleId>,
    jobs: BTreeMap<ScraperJobId, ScraperJob>,
    status_history: HashMap<ScraperJobId, Vec<JobStatus>>,
    next_vehicle_id: i32,
    next_job_id: i32,
    writes: usize,
}

/// Injected failures and delays (simulated database trouble)
#[derive(Default)]
struct Faults {
    fail_inserts: bool,
    failing_finalizes: usize,
    mark_running_delay: Option<Duration>,
}

/// In-memory catalog + job store with the same guarded-write semantics as Postgres.
///
/// Cloning shares state, so a test can keep a handle after moving one into ServerDeps.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
    faults: Arc<Mutex<Faults>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed a manufacturer with a fixed id
    pub fn with_manufacturer(self, id: i32, name: &str) -> Self {
        let id = ManufacturerId::new(id);
        self.state().manufacturers.insert(
            id,
            Manufacturer {
                id,
                name: name.to_string(),
                created_at: Utc::now(),
            },
        );
        self
    }

    /// Seed a model with a fixed id
    pub fn with_model(self, id: i32, manufacturer_id: i32, name: &str) -> Self {
        let id = ModelId::new(id);
        self.state().models.insert(
            id,
            VehicleModel {
                id,
                manufacturer_id: ManufacturerId::new(manufacturer_id),
                name: name.to_string(),
                created_at: Utc::now(),
            },
        );
        self
    }

    fn faults(&self) -> MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every subsequent `insert_job` fail (simulates a database outage)
    pub fn fail_job_inserts(&self) {
        self.faults().fail_inserts = true;
    }

    /// Make the next `count` calls to `finalize_job` fail without writing
    pub fn fail_next_finalizes(&self, count: usize) {
        self.faults().failing_finalizes = count;
    }

    /// Stall `mark_running` before it touches the row
    pub fn delay_mark_running(&self, delay: Duration) {
        self.faults().mark_running_delay = Some(delay);
    }

    /// Insert a vehicle row the way a scraper script would
    pub fn insert_vehicle(&self, url: &str) -> VehicleId {
        let mut state = self.state();
        state.next_vehicle_id += 1;
        let id = VehicleId::new(state.next_vehicle_id);
        state.vehicles.insert(url.to_string(), id);
        id
    }

    /// Overwrite a job's status the way a scraper script would
    pub fn set_job_status(&self, id: ScraperJobId, status: JobStatus) {
        let mut state = self.state();
        if let Some(job) = state.jobs.get_mut(&id) {
            job.status = status;
            job.completed_at = status.is_terminal().then(Utc::now);
        }
        state.status_history.entry(id).or_default().push(status);
    }

    pub fn job(&self, id: ScraperJobId) -> Option<ScraperJob> {
        self.state().jobs.get(&id).cloned()
    }

    /// Every status the row has held, in write order
    pub fn status_history(&self, id: ScraperJobId) -> Vec<JobStatus> {
        self.state()
            .status_history
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn job_count(&self) -> usize {
        self.state().jobs.len()
    }

    pub fn model_count(&self) -> usize {
        self.state().models.len()
    }

    /// Number of mutating calls that changed something
    pub fn write_count(&self) -> usize {
        self.state().writes
    }

    fn summarize(state: &StoreState, job: &ScraperJob) -> ScraperJobSummary {
        ScraperJobSummary {
            job: job.clone(),
            manufacturer_name: state
                .manufacturers
                .get(&job.manufacturer_id)
                .map(|m| m.name.clone()),
            model_name: job
                .model_id
                .and_then(|id| state.models.get(&id))
                .map(|m| m.name.clone()),
        }
    }
}

#[async_trait]
impl BaseCatalog for InMemoryStore {
    async fn find_manufacturer(&self, id: ManufacturerId) -> Result<Option<Manufacturer>> {
        Ok(self.state().manufacturers.get(&id).cloned())
    }

    async fn find_model_for_manufacturer(
        &self,
        id: ModelId,
        manufacturer_id: ManufacturerId,
    ) -> Result<Option<VehicleModel>> {
        Ok(self
            .state()
            .models
            .get(&id)
            .filter(|m| m.manufacturer_id == manufacturer_id)
            .cloned())
    }

    async fn find_model_by_name(
        &self,
        manufacturer_id: ManufacturerId,
        name: &str,
    ) -> Result<Option<VehicleModel>> {
        let wanted = name.trim().to_lowercase();
        Ok(self
            .state()
            .models
            .values()
            .find(|m| m.manufacturer_id == manufacturer_id && m.name.to_lowercase() == wanted)
            .cloned())
    }

    async fn find_or_create_model(
        &self,
        manufacturer_id: ManufacturerId,
        name: &str,
    ) -> Result<VehicleModel> {
        if let Some(existing) = self.find_model_by_name(manufacturer_id, name).await? {
            return Ok(existing);
        }
        let mut state = self.state();
        let next = state.models.keys().last().map(|id| id.as_i32()).unwrap_or(0) + 1;
        let model = VehicleModel {
            id: ModelId::new(next),
            manufacturer_id,
            name: name.trim().to_string(),
            created_at: Utc::now(),
        };
        state.models.insert(model.id, model.clone());
        state.writes += 1;
        Ok(model)
    }

    async fn find_vehicle_by_url(&self, url: &str) -> Result<Option<VehicleId>> {
        Ok(self.state().vehicles.get(url).copied())
    }
}

#[async_trait]
impl BaseScraperJobStore for InMemoryStore {
    async fn insert_job(&self, new: &NewScraperJob) -> Result<ScraperJob> {
        if self.faults().fail_inserts {
            return Err(anyhow!("connection refused"));
        }
        let mut state = self.state();
        state.next_job_id += 1;
        let job = ScraperJob {
            id: ScraperJobId::new(state.next_job_id),
            search_url: new.search_url.clone(),
            manufacturer_id: new.manufacturer_id,
            model_id: new.model_id,
            status: JobStatus::Pending,
            total_found: 0,
            total_added: 0,
            error_message: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        state.jobs.insert(job.id, job.clone());
        state
            .status_history
            .entry(job.id)
            .or_default()
            .push(JobStatus::Pending);
        state.writes += 1;
        Ok(job)
    }

    async fn find_job(&self, id: ScraperJobId) -> Result<Option<ScraperJob>> {
        Ok(self.job(id))
    }

    async fn find_job_summary(&self, id: ScraperJobId) -> Result<Option<ScraperJobSummary>> {
        let state = self.state();
        Ok(state.jobs.get(&id).map(|job| Self::summarize(&state, job)))
    }

    async fn mark_running(&self, id: ScraperJobId) -> Result<bool> {
        let delay = self.faults().mark_running_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state();
        let Some(job) = state.jobs.get_mut(&id) else {
            return Ok(false);
        };
        if job.status != JobStatus::Pending {
            return Ok(false);
        }
        job.status = JobStatus::Running;
        state
            .status_history
            .entry(id)
            .or_default()
            .push(JobStatus::Running);
        state.writes += 1;
        Ok(true)
    }

    async fn finalize_job(
        &self,
        id: ScraperJobId,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> Result<bool> {
        {
            let mut faults = self.faults();
            if faults.failing_finalizes > 0 {
                faults.failing_finalizes -= 1;
                return Err(anyhow!("connection reset"));
            }
        }
        let mut state = self.state();
        let Some(job) = state.jobs.get_mut(&id) else {
            return Ok(false);
        };
        if job.status.is_terminal() {
            return Ok(false);
        }
        job.status = status;
        if let Some(message) = error_message {
            job.error_message = Some(message.to_string());
        }
        job.completed_at = Some(Utc::now());
        state.status_history.entry(id).or_default().push(status);
        state.writes += 1;
        Ok(true)
    }

    async fn list_recent_jobs(&self, limit: i64) -> Result<Vec<ScraperJobSummary>> {
        let state = self.state();
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(state
            .jobs
            .values()
            .rev()
            .take(limit)
            .map(|job| Self::summarize(&state, job))
            .collect())
    }

    async fn fail_non_terminal_jobs(&self, message: &str) -> Result<Vec<ScraperJobId>> {
        let mut state = self.state();
        let now = Utc::now();
        let mut swept = Vec::new();
        for job in state.jobs.values_mut() {
            if !job.status.is_terminal() {
                job.status = JobStatus::Failed;
                job.error_message = Some(message.to_string());
                job.completed_at = Some(now);
                swept.push(job.id);
            }
        }
        for id in &swept {
            state
                .status_history
                .entry(*id)
                .or_default()
                .push(JobStatus::Failed);
        }
        state.writes += swept.len();
        Ok(swept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_finalize_is_noop_on_terminal_rows() {
        let store = InMemoryStore::new().with_manufacturer(1, "Toyota");
        let job = store
            .insert_job(
                &NewScraperJob::builder()
                    .search_url("https://example.test/search")
                    .manufacturer_id(ManufacturerId::new(1))
                    .build(),
            )
            .await
            .unwrap();

        assert!(store
            .finalize_job(job.id, JobStatus::Cancelled, Some("Job cancelled by user"))
            .await
            .unwrap());
        assert!(!store
            .finalize_job(job.id, JobStatus::Failed, Some("Process exited with code 1"))
            .await
            .unwrap());

        let job = store.job(job.id).unwrap();
        assert_eq!(job.status, JobStatus::Cancelled);
        assert_eq!(job.error_message.as_deref(), Some("Job cancelled by user"));
    }

    #[tokio::test]
    async fn test_model_lookup_ignores_case() {
        let store = InMemoryStore::new()
            .with_manufacturer(1, "Toyota")
            .with_model(5, 1, "Land Cruiser");

        let found = store
            .find_model_by_name(ManufacturerId::new(1), "land CRUISER")
            .await
            .unwrap();
        assert_eq!(found.map(|m| m.id), Some(ModelId::new(5)));

        let other_maker = store
            .find_model_by_name(ManufacturerId::new(2), "Land Cruiser")
            .await
            .unwrap();
        assert!(other_maker.is_none());
    }
}
