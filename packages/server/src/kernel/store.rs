//! Postgres-backed store (production implementation of the Base* store traits)

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::common::{ManufacturerId, ModelId, ScraperJobId, VehicleId};
use crate::domains::catalog::models::{Manufacturer, Vehicle, VehicleModel};
use crate::domains::scraper_jobs::models::{
    JobStatus, NewScraperJob, ScraperJob, ScraperJobSummary,
};
use crate::kernel::{BaseCatalog, BaseScraperJobStore};

/// Thin adapter from the store traits to the model methods
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl BaseCatalog for PostgresStore {
    async fn find_manufacturer(&self, id: ManufacturerId) -> Result<Option<Manufacturer>> {
        Manufacturer::find_by_id(id, &self.pool).await
    }

    async fn find_model_for_manufacturer(
        &self,
        id: ModelId,
        manufacturer_id: ManufacturerId,
    ) -> Result<Option<VehicleModel>> {
        VehicleModel::find_for_manufacturer(id, manufacturer_id, &self.pool).await
    }

    async fn find_model_by_name(
        &self,
        manufacturer_id: ManufacturerId,
        name: &str,
    ) -> Result<Option<VehicleModel>> {
        VehicleModel::find_by_name(manufacturer_id, name, &self.pool).await
    }

    async fn find_or_create_model(
        &self,
        manufacturer_id: ManufacturerId,
        name: &str,
    ) -> Result<VehicleModel> {
        VehicleModel::find_or_create(manufacturer_id, name, &self.pool).await
    }

    async fn find_vehicle_by_url(&self, url: &str) -> Result<Option<VehicleId>> {
        Vehicle::find_id_by_url(url, &self.pool).await
    }
}

#[async_trait]
impl BaseScraperJobStore for PostgresStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_job(&self, new: &NewScraperJob) -> Result<ScraperJob> {
        ScraperJob::create(new, &self.pool).await
    }

    async fn find_job(&self, id: ScraperJobId) -> Result<Option<ScraperJob>> {
        ScraperJob::find_by_id(id, &self.pool).await
    }

    async fn find_job_summary(&self, id: ScraperJobId) -> Result<Option<ScraperJobSummary>> {
        ScraperJobSummary::find_by_id(id, &self.pool).await
    }

    async fn mark_running(&self, id: ScraperJobId) -> Result<bool> {
        ScraperJob::mark_running(id, &self.pool).await
    }

    async fn finalize_job(
        &self,
        id: ScraperJobId,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> Result<bool> {
        ScraperJob::finalize(id, status, error_message, &self.pool).await
    }

    async fn list_recent_jobs(&self, limit: i64) -> Result<Vec<ScraperJobSummary>> {
        ScraperJobSummary::list_recent(limit, &self.pool).await
    }

    async fn fail_non_terminal_jobs(&self, message: &str) -> Result<Vec<ScraperJobId>> {
        ScraperJob::fail_all_non_terminal(message, &self.pool).await
    }
}
