// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Validation, model resolution and the job state machine live in domain actions
// that take these traits.
//
// Naming convention: Base* for trait names (e.g., BaseCatalog, BaseScraperJobStore)

use anyhow::Result;
use async_trait::async_trait;

use crate::common::{ManufacturerId, ModelId, ScraperJobId, VehicleId};
use crate::domains::catalog::models::{Manufacturer, VehicleModel};
use crate::domains::scraper_jobs::models::{
    JobStatus, NewScraperJob, ScraperJob, ScraperJobSummary,
};

// =============================================================================
// Catalog (manufacturers, models, vehicles)
// =============================================================================

#[async_trait]
pub trait BaseCatalog: Send + Sync {
    async fn find_manufacturer(&self, id: ManufacturerId) -> Result<Option<Manufacturer>>;

    /// Model by id, only if it belongs to `manufacturer_id`
    async fn find_model_for_manufacturer(
        &self,
        id: ModelId,
        manufacturer_id: ManufacturerId,
    ) -> Result<Option<VehicleModel>>;

    /// Case-insensitive lookup scoped to the manufacturer
    async fn find_model_by_name(
        &self,
        manufacturer_id: ManufacturerId,
        name: &str,
    ) -> Result<Option<VehicleModel>>;

    async fn find_or_create_model(
        &self,
        manufacturer_id: ManufacturerId,
        name: &str,
    ) -> Result<VehicleModel>;

    async fn find_vehicle_by_url(&self, url: &str) -> Result<Option<VehicleId>>;
}

// =============================================================================
// Scraper job rows
// =============================================================================

#[async_trait]
pub trait BaseScraperJobStore: Send + Sync {
    /// Insert with status `pending`
    async fn insert_job(&self, new: &NewScraperJob) -> Result<ScraperJob>;

    async fn find_job(&self, id: ScraperJobId) -> Result<Option<ScraperJob>>;

    async fn find_job_summary(&self, id: ScraperJobId) -> Result<Option<ScraperJobSummary>>;

    /// pending -> running; false if the row already moved on
    async fn mark_running(&self, id: ScraperJobId) -> Result<bool>;

    /// Non-terminal -> `status` with `completed_at = now()`; false (no write) if already terminal
    async fn finalize_job(
        &self,
        id: ScraperJobId,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> Result<bool>;

    async fn list_recent_jobs(&self, limit: i64) -> Result<Vec<ScraperJobSummary>>;

    /// Fail every pending/running row with `message`
    async fn fail_non_terminal_jobs(&self, message: &str) -> Result<Vec<ScraperJobId>>;

    /// Connectivity probe for the health endpoint
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
