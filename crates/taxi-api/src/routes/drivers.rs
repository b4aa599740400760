//! # Drivers API
//!
//! List and search by username, sign-up through [`DriverCreationForm`],
//! license number updates, detail with assigned cars, and removal.
//!
//! Usernames and license numbers are unique across drivers. Removing a
//! driver also unassigns them from every car and ends their sessions.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use taxi_core::{DriverCreationForm, LicenseNumber, LicenseUpdateForm, NewDriver};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::{extract_path, extract_query, list_page, DriverPage};
use crate::auth::hash_password;
use crate::error::AppError;
use crate::extractors::extract_form;
use crate::state::{AppState, CarRecord, DriverRecord};

/// Driver list filters.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DriverQuery {
    /// Case-insensitive substring of the username.
    pub username: Option<String>,
    /// 1-based page number.
    pub page: Option<usize>,
}

/// A driver with the cars assigned to them.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DriverDetail {
    pub driver: DriverRecord,
    pub cars: Vec<CarRecord>,
}

/// Build the drivers router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/drivers", get(list_drivers).post(create_driver))
        .route("/drivers/:id", get(get_driver).delete(delete_driver))
        .route("/drivers/:id/license", put(update_license))
}

fn driver_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("driver {id} not found"))
}

fn license_taken(state: &AppState, license_number: &LicenseNumber, except: Option<Uuid>) -> bool {
    state
        .drivers
        .any(|d| Some(d.id) != except && &d.license_number == license_number)
}

/// Store a cleaned sign-up as a new driver.
///
/// Shared by `POST /drivers` and startup bootstrap. Fails with
/// [`AppError::Conflict`] when the username or license number is taken.
pub async fn register_driver(state: &AppState, new: NewDriver) -> Result<DriverRecord, AppError> {
    let hash = hash_password(new.password.clone(), state.config.password_iterations).await?;
    let _gate = state.write_gate.lock().await;

    if state.drivers.any(|d| d.username == new.username) {
        return Err(AppError::Conflict(format!(
            "username \"{}\" is already taken",
            new.username
        )));
    }
    if license_taken(state, &new.license_number, None) {
        return Err(AppError::Conflict(format!(
            "license number {} is already registered",
            new.license_number
        )));
    }

    let record = DriverRecord {
        id: Uuid::new_v4(),
        username: new.username,
        first_name: new.first_name,
        last_name: new.last_name,
        email: new.email,
        license_number: new.license_number,
        created_at: Utc::now(),
    };

    if let Some(pool) = &state.db_pool {
        crate::db::drivers::insert(pool, &record, &hash).await?;
    }
    state.credentials.insert(record.id, hash);
    state.drivers.insert(record.id, record.clone());
    tracing::info!(driver_id = %record.id, username = %record.username, "driver registered");

    Ok(record)
}

/// GET /drivers: List drivers, optionally filtered by username.
#[utoipa::path(
    get,
    path = "/drivers",
    params(DriverQuery),
    responses(
        (status = 200, description = "One page of drivers", body = DriverPage),
        (status = 404, description = "Page out of range", body = crate::error::ErrorBody),
    ),
    tag = "drivers"
)]
async fn list_drivers(
    State(state): State<AppState>,
    query: Result<Query<DriverQuery>, QueryRejection>,
) -> Result<Json<DriverPage>, AppError> {
    let query = extract_query(query)?;
    let page = list_page(
        state.drivers.list(),
        query.username.as_deref(),
        query.page,
        state.config.page_size,
    )?;
    Ok(Json(page))
}

/// POST /drivers: Create a driver account.
#[utoipa::path(
    post,
    path = "/drivers",
    request_body(
        content = serde_json::Value,
        description = "`{username, password, password_confirmation, first_name, last_name, email, license_number}`"
    ),
    responses(
        (status = 201, description = "Driver created", body = DriverRecord),
        (status = 409, description = "Username or license number taken", body = crate::error::ErrorBody),
        (status = 422, description = "Field errors", body = crate::error::ErrorBody),
    ),
    tag = "drivers"
)]
async fn create_driver(
    State(state): State<AppState>,
    body: Result<Json<DriverCreationForm>, JsonRejection>,
) -> Result<(StatusCode, Json<DriverRecord>), AppError> {
    let new = extract_form(body)?;
    let record = register_driver(&state, new).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /drivers/:id: Get a driver with their assigned cars.
#[utoipa::path(
    get,
    path = "/drivers/{id}",
    params(("id" = Uuid, Path, description = "Driver ID")),
    responses(
        (status = 200, description = "Driver found", body = DriverDetail),
        (status = 404, description = "Driver not found", body = crate::error::ErrorBody),
    ),
    tag = "drivers"
)]
async fn get_driver(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<DriverDetail>, AppError> {
    let id = extract_path(path)?;
    let driver = state.drivers.get(&id).ok_or_else(|| driver_not_found(id))?;
    let mut cars: Vec<CarRecord> = state
        .cars
        .list()
        .into_iter()
        .filter(|c| c.driver_ids.contains(&id))
        .collect();
    cars.sort_by(|a, b| a.model.cmp(&b.model));

    Ok(Json(DriverDetail { driver, cars }))
}

/// PUT /drivers/:id/license: Change a driver's license number.
#[utoipa::path(
    put,
    path = "/drivers/{id}/license",
    params(("id" = Uuid, Path, description = "Driver ID")),
    request_body(content = serde_json::Value, description = "`{license_number}`"),
    responses(
        (status = 200, description = "License number updated", body = DriverRecord),
        (status = 404, description = "Driver not found", body = crate::error::ErrorBody),
        (status = 409, description = "License number taken", body = crate::error::ErrorBody),
        (status = 422, description = "Malformed license number", body = crate::error::ErrorBody),
    ),
    tag = "drivers"
)]
async fn update_license(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<LicenseUpdateForm>, JsonRejection>,
) -> Result<Json<DriverRecord>, AppError> {
    let id = extract_path(path)?;
    let license_number = extract_form(body)?;

    let _gate = state.write_gate.lock().await;
    if !state.drivers.contains(&id) {
        return Err(driver_not_found(id));
    }
    if license_taken(&state, &license_number, Some(id)) {
        return Err(AppError::Conflict(format!(
            "license number {license_number} is already registered"
        )));
    }

    if let Some(pool) = &state.db_pool {
        crate::db::drivers::update_license(pool, id, &license_number).await?;
    }
    let record = state
        .drivers
        .update(&id, |d| d.license_number = license_number)
        .ok_or_else(|| driver_not_found(id))?;
    tracing::info!(driver_id = %id, license_number = %record.license_number, "license number updated");

    Ok(Json(record))
}

/// DELETE /drivers/:id: Remove a driver.
#[utoipa::path(
    delete,
    path = "/drivers/{id}",
    params(("id" = Uuid, Path, description = "Driver ID")),
    responses(
        (status = 204, description = "Driver deleted"),
        (status = 404, description = "Driver not found", body = crate::error::ErrorBody),
    ),
    tag = "drivers"
)]
async fn delete_driver(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let id = extract_path(path)?;
    let _gate = state.write_gate.lock().await;
    if !state.drivers.contains(&id) {
        return Err(driver_not_found(id));
    }

    if let Some(pool) = &state.db_pool {
        crate::db::drivers::delete(pool, id).await?;
    }
    state.drivers.remove(&id);
    state.credentials.remove(&id);
    let unassigned = state.cars.update_all(|c| c.driver_ids.remove(&id));
    let sessions = state.sessions.revoke_driver(id);
    tracing::info!(driver_id = %id, unassigned, sessions, "driver deleted");

    Ok(StatusCode::NO_CONTENT)
}
