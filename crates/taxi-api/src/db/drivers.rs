//! Driver persistence operations.
//!
//! The password hash lives in the `drivers` table but is loaded separately
//! from the record, which never carries it.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use taxi_core::{LicenseNumber, Username};
use uuid::Uuid;

use super::decode_error;
use crate::auth::PasswordHash;
use crate::state::DriverRecord;

/// Insert a new driver with their password hash.
pub async fn insert(
    pool: &PgPool,
    record: &DriverRecord,
    password_hash: &PasswordHash,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO drivers (id, username, first_name, last_name, email, license_number, password_hash, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(record.id)
    .bind(record.username.as_str())
    .bind(&record.first_name)
    .bind(&record.last_name)
    .bind(&record.email)
    .bind(record.license_number.as_str())
    .bind(password_hash.encode())
    .bind(record.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Change a driver's license number.
pub async fn update_license(
    pool: &PgPool,
    id: Uuid,
    license_number: &LicenseNumber,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE drivers SET license_number = $1 WHERE id = $2")
        .bind(license_number.as_str())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete a driver. Car assignments go with them by cascade.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM drivers WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Load all drivers and their password hashes on startup.
///
/// A row whose username, license number or hash no longer validates fails
/// the whole load rather than being skipped.
pub async fn load_all(pool: &PgPool) -> Result<Vec<(DriverRecord, PasswordHash)>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DriverRow>(
        "SELECT id, username, first_name, last_name, email, license_number, password_hash, created_at
         FROM drivers ORDER BY username",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(DriverRow::into_record).collect()
}

#[derive(sqlx::FromRow)]
struct DriverRow {
    id: Uuid,
    username: String,
    first_name: String,
    last_name: String,
    email: String,
    license_number: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl DriverRow {
    fn into_record(self) -> Result<(DriverRecord, PasswordHash), sqlx::Error> {
        let username =
            Username::new(&self.username).map_err(|e| decode_error("username", e))?;
        let license_number = LicenseNumber::new(self.license_number.trim())
            .map_err(|e| decode_error("license_number", e))?;
        let hash = PasswordHash::decode(&self.password_hash)
            .map_err(|e| decode_error("password_hash", e))?;

        let record = DriverRecord {
            id: self.id,
            username,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            license_number,
            created_at: self.created_at,
        };
        Ok((record, hash))
    }
}
