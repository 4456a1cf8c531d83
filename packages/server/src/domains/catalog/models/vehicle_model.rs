use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::{ManufacturerId, ModelId};

/// VehicleModel - a model line scoped to one manufacturer (Land Cruiser, Hiace, ...)
///
/// Names are unique per manufacturer ignoring case.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VehicleModel {
    pub id: ModelId,
    pub manufacturer_id: ManufacturerId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl VehicleModel {
    /// Find a model by id, only if it belongs to the given manufacturer
    pub async fn find_for_manufacturer(
        id: ModelId,
        manufacturer_id: ManufacturerId,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        let model = sqlx::query_as::<_, VehicleModel>(
            "SELECT * FROM models WHERE id = $1 AND manufacturer_id = $2",
        )
        .bind(id)
        .bind(manufacturer_id)
        .fetch_optional(pool)
        .await?;
        Ok(model)
    }

    /// Case-insensitive lookup by name within a manufacturer
    pub async fn find_by_name(
        manufacturer_id: ManufacturerId,
        name: &str,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        let model = sqlx::query_as::<_, VehicleModel>(
            "SELECT * FROM models WHERE LOWER(name) = LOWER($1) AND manufacturer_id = $2",
        )
        .bind(name.trim())
        .bind(manufacturer_id)
        .fetch_optional(pool)
        .await?;
        Ok(model)
    }

    /// Return the existing model with this name (ignoring case) or insert a new one.
    ///
    /// Concurrent callers racing on the same name converge on one row via the
    /// `(manufacturer_id, LOWER(name))` unique index.
    pub async fn find_or_create(
        manufacturer_id: ManufacturerId,
        name: &str,
        pool: &PgPool,
    ) -> Result<Self> {
        if let Some(existing) = Self::find_by_name(manufacturer_id, name, pool).await? {
            return Ok(existing);
        }

        let inserted = sqlx::query_as::<_, VehicleModel>(
            r#"
            INSERT INTO models (manufacturer_id, name)
            VALUES ($1, $2)
            ON CONFLICT (manufacturer_id, (LOWER(name))) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(manufacturer_id)
        .bind(name.trim())
        .fetch_optional(pool)
        .await?;

        match inserted {
            Some(model) => Ok(model),
            None => Self::find_by_name(manufacturer_id, name, pool)
                .await?
                .context("model vanished after insert conflict"),
        }
    }
}
