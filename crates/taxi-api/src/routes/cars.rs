//! # Cars API
//!
//! List and search by model, create, read, update and delete, plus
//! `toggle-assign` which adds the calling driver to a car or removes them.
//!
//! Every car references an existing manufacturer, and every assigned driver
//! must exist at the time of the write.

use std::collections::BTreeSet;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use taxi_core::{CarForm, FormErrors, NewCar};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::{extract_path, extract_query, list_page, CarPage};
use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::extract_form;
use crate::state::{AppState, CarRecord, DriverRecord, ManufacturerRecord};

/// Car list filters.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CarQuery {
    /// Case-insensitive substring of the car model.
    pub model: Option<String>,
    /// 1-based page number.
    pub page: Option<usize>,
}

/// A car with its manufacturer and assigned drivers resolved.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CarDetail {
    pub car: CarRecord,
    pub manufacturer: ManufacturerRecord,
    pub drivers: Vec<DriverRecord>,
}

/// Build the cars router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cars", get(list_cars).post(create_car))
        .route(
            "/cars/:id",
            get(get_car).put(update_car).delete(delete_car),
        )
        .route("/cars/:id/toggle-assign", post(toggle_assign))
}

/// Check that the manufacturer and every driver a car references exist.
fn check_references(state: &AppState, car: &NewCar) -> Result<(), AppError> {
    let mut errors = FormErrors::new();
    if !state.manufacturers.contains(&car.manufacturer_id) {
        errors.add(
            "manufacturer_id",
            format!("manufacturer {} does not exist", car.manufacturer_id),
        );
    }
    for driver_id in &car.driver_ids {
        if !state.drivers.contains(driver_id) {
            errors.add("driver_ids", format!("driver {driver_id} does not exist"));
        }
    }
    errors.into_result(|| ()).map_err(AppError::from)
}

fn car_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("car {id} not found"))
}

/// GET /cars: List cars, optionally filtered by model.
#[utoipa::path(
    get,
    path = "/cars",
    params(CarQuery),
    responses(
        (status = 200, description = "One page of cars", body = CarPage),
        (status = 404, description = "Page out of range", body = crate::error::ErrorBody),
    ),
    tag = "cars"
)]
async fn list_cars(
    State(state): State<AppState>,
    query: Result<Query<CarQuery>, QueryRejection>,
) -> Result<Json<CarPage>, AppError> {
    let query = extract_query(query)?;
    let page = list_page(
        state.cars.list(),
        query.model.as_deref(),
        query.page,
        state.config.page_size,
    )?;
    Ok(Json(page))
}

/// POST /cars: Create a car.
#[utoipa::path(
    post,
    path = "/cars",
    request_body(content = serde_json::Value, description = "`{model, manufacturer_id, driver_ids}`"),
    responses(
        (status = 201, description = "Car created", body = CarRecord),
        (status = 422, description = "Field errors", body = crate::error::ErrorBody),
    ),
    tag = "cars"
)]
async fn create_car(
    State(state): State<AppState>,
    body: Result<Json<CarForm>, JsonRejection>,
) -> Result<(StatusCode, Json<CarRecord>), AppError> {
    let car = extract_form(body)?;

    let _gate = state.write_gate.lock().await;
    check_references(&state, &car)?;

    let record = CarRecord {
        id: Uuid::new_v4(),
        model: car.model,
        manufacturer_id: car.manufacturer_id,
        driver_ids: car.driver_ids,
        created_at: Utc::now(),
    };

    if let Some(pool) = &state.db_pool {
        crate::db::cars::insert(pool, &record).await?;
    }
    state.cars.insert(record.id, record.clone());
    tracing::info!(car_id = %record.id, model = %record.model, "car created");

    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /cars/:id: Get a car with its manufacturer and drivers.
#[utoipa::path(
    get,
    path = "/cars/{id}",
    params(("id" = Uuid, Path, description = "Car ID")),
    responses(
        (status = 200, description = "Car found", body = CarDetail),
        (status = 404, description = "Car not found", body = crate::error::ErrorBody),
    ),
    tag = "cars"
)]
async fn get_car(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<CarDetail>, AppError> {
    let id = extract_path(path)?;
    let car = state.cars.get(&id).ok_or_else(|| car_not_found(id))?;
    let manufacturer = state.manufacturers.get(&car.manufacturer_id).ok_or_else(|| {
        AppError::Internal(format!(
            "car {id} references missing manufacturer {}",
            car.manufacturer_id
        ))
    })?;
    let mut drivers: Vec<DriverRecord> = car
        .driver_ids
        .iter()
        .filter_map(|driver_id| state.drivers.get(driver_id))
        .collect();
    drivers.sort_by(|a, b| a.username.as_str().cmp(b.username.as_str()));

    Ok(Json(CarDetail {
        car,
        manufacturer,
        drivers,
    }))
}

/// PUT /cars/:id: Replace a car's model, manufacturer and drivers.
#[utoipa::path(
    put,
    path = "/cars/{id}",
    params(("id" = Uuid, Path, description = "Car ID")),
    request_body(content = serde_json::Value, description = "`{model, manufacturer_id, driver_ids}`"),
    responses(
        (status = 200, description = "Car updated", body = CarRecord),
        (status = 404, description = "Car not found", body = crate::error::ErrorBody),
        (status = 422, description = "Field errors", body = crate::error::ErrorBody),
    ),
    tag = "cars"
)]
async fn update_car(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<CarForm>, JsonRejection>,
) -> Result<Json<CarRecord>, AppError> {
    let id = extract_path(path)?;
    let car = extract_form(body)?;

    let _gate = state.write_gate.lock().await;
    let mut record = state.cars.get(&id).ok_or_else(|| car_not_found(id))?;
    check_references(&state, &car)?;
    record.model = car.model;
    record.manufacturer_id = car.manufacturer_id;
    record.driver_ids = car.driver_ids;

    if let Some(pool) = &state.db_pool {
        crate::db::cars::update(pool, &record).await?;
    }
    state.cars.insert(id, record.clone());

    Ok(Json(record))
}

/// DELETE /cars/:id: Delete a car.
#[utoipa::path(
    delete,
    path = "/cars/{id}",
    params(("id" = Uuid, Path, description = "Car ID")),
    responses(
        (status = 204, description = "Car deleted"),
        (status = 404, description = "Car not found", body = crate::error::ErrorBody),
    ),
    tag = "cars"
)]
async fn delete_car(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let id = extract_path(path)?;
    let _gate = state.write_gate.lock().await;
    if !state.cars.contains(&id) {
        return Err(car_not_found(id));
    }

    if let Some(pool) = &state.db_pool {
        crate::db::cars::delete(pool, id).await?;
    }
    state.cars.remove(&id);
    tracing::info!(car_id = %id, "car deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// POST /cars/:id/toggle-assign: Assign or unassign the calling driver.
#[utoipa::path(
    post,
    path = "/cars/{id}/toggle-assign",
    params(("id" = Uuid, Path, description = "Car ID")),
    responses(
        (status = 200, description = "Assignment toggled", body = CarRecord),
        (status = 404, description = "Car not found", body = crate::error::ErrorBody),
    ),
    tag = "cars"
)]
async fn toggle_assign(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    caller: CallerIdentity,
) -> Result<Json<CarRecord>, AppError> {
    let id = extract_path(path)?;
    let _gate = state.write_gate.lock().await;
    let car = state.cars.get(&id).ok_or_else(|| car_not_found(id))?;

    let mut driver_ids: BTreeSet<Uuid> = car.driver_ids;
    let assigned = if driver_ids.remove(&caller.driver_id) {
        false
    } else {
        driver_ids.insert(caller.driver_id);
        true
    };

    if let Some(pool) = &state.db_pool {
        crate::db::cars::set_drivers(pool, id, &driver_ids).await?;
    }
    let record = state
        .cars
        .update(&id, |c| c.driver_ids = driver_ids)
        .ok_or_else(|| car_not_found(id))?;
    tracing::info!(car_id = %id, driver_id = %caller.driver_id, assigned, "car assignment toggled");

    Ok(Json(record))
}
