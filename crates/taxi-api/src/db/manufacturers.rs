//! Manufacturer persistence operations.
//!
//! Deleting a manufacturer cascades to its cars in SQL, mirroring the
//! cascade the handlers apply in memory.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::state::ManufacturerRecord;

/// Insert a new manufacturer.
pub async fn insert(pool: &PgPool, record: &ManufacturerRecord) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO manufacturers (id, name, country, created_at) VALUES ($1, $2, $3, $4)")
        .bind(record.id)
        .bind(&record.name)
        .bind(&record.country)
        .bind(record.created_at)
        .execute(pool)
        .await?;
    Ok(())
}

/// Replace a manufacturer's name and country.
pub async fn update(pool: &PgPool, record: &ManufacturerRecord) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE manufacturers SET name = $1, country = $2 WHERE id = $3")
        .bind(&record.name)
        .bind(&record.country)
        .bind(record.id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete a manufacturer and, by cascade, its cars.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM manufacturers WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Load all manufacturers on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<ManufacturerRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ManufacturerRow>(
        "SELECT id, name, country, created_at FROM manufacturers ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(ManufacturerRow::into_record).collect())
}

#[derive(sqlx::FromRow)]
struct ManufacturerRow {
    id: Uuid,
    name: String,
    country: String,
    created_at: DateTime<Utc>,
}

impl ManufacturerRow {
    fn into_record(self) -> ManufacturerRecord {
        ManufacturerRecord {
            id: self.id,
            name: self.name,
            country: self.country,
            created_at: self.created_at,
        }
    }
}
