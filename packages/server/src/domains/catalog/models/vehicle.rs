use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::{ManufacturerId, ModelId, VehicleId};

/// Vehicle - a listing imported from an external site.
///
/// Rows are normally written by the scraper scripts; the server only looks them up by
/// source URL.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vehicle {
    pub id: VehicleId,
    pub url: String,
    pub manufacturer_id: Option<ManufacturerId>,
    pub model_id: Option<ModelId>,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Vehicle {
    pub async fn find_id_by_url(url: &str, pool: &PgPool) -> Result<Option<VehicleId>> {
        let id = sqlx::query_scalar::<_, VehicleId>("SELECT id FROM vehicles WHERE url = $1")
            .bind(url)
            .fetch_optional(pool)
            .await?;
        Ok(id)
    }

    pub async fn create(
        url: &str,
        manufacturer_id: Option<ManufacturerId>,
        model_id: Option<ModelId>,
        title: Option<&str>,
        pool: &PgPool,
    ) -> Result<Self> {
        let vehicle = sqlx::query_as::<_, Vehicle>(
            r#"
            INSERT INTO vehicles (url, manufacturer_id, model_id, title)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(url)
        .bind(manufacturer_id)
        .bind(model_id)
        .bind(title)
        .fetch_one(pool)
        .await?;
        Ok(vehicle)
    }
}
