//! Car persistence operations.
//!
//! Driver assignments live in `car_drivers`. Writes that touch both tables
//! run in one transaction.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::state::CarRecord;

async fn replace_drivers(
    tx: &mut Transaction<'_, Postgres>,
    car_id: Uuid,
    driver_ids: &BTreeSet<Uuid>,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM car_drivers WHERE car_id = $1")
        .bind(car_id)
        .execute(&mut **tx)
        .await?;
    for driver_id in driver_ids {
        sqlx::query("INSERT INTO car_drivers (car_id, driver_id) VALUES ($1, $2)")
            .bind(car_id)
            .bind(*driver_id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

/// Insert a new car and its driver assignments.
pub async fn insert(pool: &PgPool, record: &CarRecord) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("INSERT INTO cars (id, model, manufacturer_id, created_at) VALUES ($1, $2, $3, $4)")
        .bind(record.id)
        .bind(&record.model)
        .bind(record.manufacturer_id)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;
    replace_drivers(&mut tx, record.id, &record.driver_ids).await?;
    tx.commit().await
}

/// Replace a car's model, manufacturer and drivers.
pub async fn update(pool: &PgPool, record: &CarRecord) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query("UPDATE cars SET model = $1, manufacturer_id = $2 WHERE id = $3")
        .bind(&record.model)
        .bind(record.manufacturer_id)
        .bind(record.id)
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        return Ok(false);
    }
    replace_drivers(&mut tx, record.id, &record.driver_ids).await?;
    tx.commit().await?;
    Ok(true)
}

/// Replace only a car's driver assignments.
pub async fn set_drivers(
    pool: &PgPool,
    car_id: Uuid,
    driver_ids: &BTreeSet<Uuid>,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    replace_drivers(&mut tx, car_id, driver_ids).await?;
    tx.commit().await
}

/// Delete a car. Its assignments go with it by cascade.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cars WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Load all cars with their driver assignments on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<CarRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, CarRow>(
        "SELECT id, model, manufacturer_id, created_at FROM cars ORDER BY model",
    )
    .fetch_all(pool)
    .await?;

    let links = sqlx::query_as::<_, (Uuid, Uuid)>("SELECT car_id, driver_id FROM car_drivers")
        .fetch_all(pool)
        .await?;

    let mut drivers_by_car: HashMap<Uuid, BTreeSet<Uuid>> = HashMap::new();
    for (car_id, driver_id) in links {
        drivers_by_car.entry(car_id).or_default().insert(driver_id);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let driver_ids = drivers_by_car.remove(&row.id).unwrap_or_default();
            row.into_record(driver_ids)
        })
        .collect())
}

#[derive(sqlx::FromRow)]
struct CarRow {
    id: Uuid,
    model: String,
    manufacturer_id: Uuid,
    created_at: DateTime<Utc>,
}

impl CarRow {
    fn into_record(self, driver_ids: BTreeSet<Uuid>) -> CarRecord {
        CarRecord {
            id: self.id,
            model: self.model,
            manufacturer_id: self.manufacturer_id,
            driver_ids,
            created_at: self.created_at,
        }
    }
}
