use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::ManufacturerId;

/// Manufacturer - a vehicle make (Toyota, Nissan, ...)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Manufacturer {
    pub id: ManufacturerId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Manufacturer {
    pub async fn find_by_id(id: ManufacturerId, pool: &PgPool) -> Result<Option<Self>> {
        let manufacturer =
            sqlx::query_as::<_, Manufacturer>("SELECT * FROM manufacturers WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await?;
        Ok(manufacturer)
    }

    pub async fn create(name: &str, pool: &PgPool) -> Result<Self> {
        let manufacturer = sqlx::query_as::<_, Manufacturer>(
            "INSERT INTO manufacturers (name) VALUES ($1) RETURNING *",
        )
        .bind(name)
        .fetch_one(pool)
        .await?;
        Ok(manufacturer)
    }
}
