//! # Manufacturers API
//!
//! List and search by name, plus create, read, update and delete.
//! Deleting a manufacturer deletes its cars.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use taxi_core::{ManufacturerForm, NewManufacturer};
use utoipa::IntoParams;
use uuid::Uuid;

use super::{extract_path, extract_query, list_page, ManufacturerPage};
use crate::error::AppError;
use crate::extractors::extract_form;
use crate::state::{AppState, ManufacturerRecord};

/// Manufacturer list filters.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ManufacturerQuery {
    /// Case-insensitive substring of the manufacturer name.
    pub name: Option<String>,
    /// 1-based page number.
    pub page: Option<usize>,
}

/// Build the manufacturers router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/manufacturers",
            get(list_manufacturers).post(create_manufacturer),
        )
        .route(
            "/manufacturers/:id",
            get(get_manufacturer)
                .put(update_manufacturer)
                .delete(delete_manufacturer),
        )
}

fn name_taken(state: &AppState, name: &str, except: Option<Uuid>) -> bool {
    let name = name.to_lowercase();
    state
        .manufacturers
        .any(|m| Some(m.id) != except && m.name.to_lowercase() == name)
}

/// GET /manufacturers: List manufacturers, optionally filtered by name.
#[utoipa::path(
    get,
    path = "/manufacturers",
    params(ManufacturerQuery),
    responses(
        (status = 200, description = "One page of manufacturers", body = ManufacturerPage),
        (status = 404, description = "Page out of range", body = crate::error::ErrorBody),
    ),
    tag = "manufacturers"
)]
async fn list_manufacturers(
    State(state): State<AppState>,
    query: Result<Query<ManufacturerQuery>, QueryRejection>,
) -> Result<Json<ManufacturerPage>, AppError> {
    let query = extract_query(query)?;
    let page = list_page(
        state.manufacturers.list(),
        query.name.as_deref(),
        query.page,
        state.config.page_size,
    )?;
    Ok(Json(page))
}

/// POST /manufacturers: Create a manufacturer.
#[utoipa::path(
    post,
    path = "/manufacturers",
    request_body(content = serde_json::Value, description = "`{name, country}`"),
    responses(
        (status = 201, description = "Manufacturer created", body = ManufacturerRecord),
        (status = 409, description = "Name already taken", body = crate::error::ErrorBody),
        (status = 422, description = "Field errors", body = crate::error::ErrorBody),
    ),
    tag = "manufacturers"
)]
async fn create_manufacturer(
    State(state): State<AppState>,
    body: Result<Json<ManufacturerForm>, JsonRejection>,
) -> Result<(StatusCode, Json<ManufacturerRecord>), AppError> {
    let NewManufacturer { name, country } = extract_form(body)?;

    let _gate = state.write_gate.lock().await;
    if name_taken(&state, &name, None) {
        return Err(AppError::Conflict(format!(
            "manufacturer \"{name}\" already exists"
        )));
    }

    let record = ManufacturerRecord {
        id: Uuid::new_v4(),
        name,
        country,
        created_at: Utc::now(),
    };

    if let Some(pool) = &state.db_pool {
        crate::db::manufacturers::insert(pool, &record).await?;
    }
    state.manufacturers.insert(record.id, record.clone());
    tracing::info!(manufacturer_id = %record.id, name = %record.name, "manufacturer created");

    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /manufacturers/:id: Get a manufacturer.
#[utoipa::path(
    get,
    path = "/manufacturers/{id}",
    params(("id" = Uuid, Path, description = "Manufacturer ID")),
    responses(
        (status = 200, description = "Manufacturer found", body = ManufacturerRecord),
        (status = 404, description = "Manufacturer not found", body = crate::error::ErrorBody),
    ),
    tag = "manufacturers"
)]
async fn get_manufacturer(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ManufacturerRecord>, AppError> {
    let id = extract_path(path)?;
    state
        .manufacturers
        .get(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("manufacturer {id} not found")))
}

/// PUT /manufacturers/:id: Replace a manufacturer's name and country.
#[utoipa::path(
    put,
    path = "/manufacturers/{id}",
    params(("id" = Uuid, Path, description = "Manufacturer ID")),
    request_body(content = serde_json::Value, description = "`{name, country}`"),
    responses(
        (status = 200, description = "Manufacturer updated", body = ManufacturerRecord),
        (status = 404, description = "Manufacturer not found", body = crate::error::ErrorBody),
        (status = 409, description = "Name already taken", body = crate::error::ErrorBody),
        (status = 422, description = "Field errors", body = crate::error::ErrorBody),
    ),
    tag = "manufacturers"
)]
async fn update_manufacturer(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<ManufacturerForm>, JsonRejection>,
) -> Result<Json<ManufacturerRecord>, AppError> {
    let id = extract_path(path)?;
    let NewManufacturer { name, country } = extract_form(body)?;

    let _gate = state.write_gate.lock().await;
    let mut record = state
        .manufacturers
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("manufacturer {id} not found")))?;
    if name_taken(&state, &name, Some(id)) {
        return Err(AppError::Conflict(format!(
            "manufacturer \"{name}\" already exists"
        )));
    }
    record.name = name;
    record.country = country;

    if let Some(pool) = &state.db_pool {
        crate::db::manufacturers::update(pool, &record).await?;
    }
    state.manufacturers.insert(id, record.clone());

    Ok(Json(record))
}

/// DELETE /manufacturers/:id: Delete a manufacturer and its cars.
#[utoipa::path(
    delete,
    path = "/manufacturers/{id}",
    params(("id" = Uuid, Path, description = "Manufacturer ID")),
    responses(
        (status = 204, description = "Manufacturer deleted"),
        (status = 404, description = "Manufacturer not found", body = crate::error::ErrorBody),
    ),
    tag = "manufacturers"
)]
async fn delete_manufacturer(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let id = extract_path(path)?;
    let _gate = state.write_gate.lock().await;
    if !state.manufacturers.contains(&id) {
        return Err(AppError::NotFound(format!("manufacturer {id} not found")));
    }

    if let Some(pool) = &state.db_pool {
        crate::db::manufacturers::delete(pool, id).await?;
    }
    state.manufacturers.remove(&id);
    let cars = state.cars.remove_where(|c| c.manufacturer_id == id);
    tracing::info!(manufacturer_id = %id, cars_deleted = cars.len(), "manufacturer deleted");

    Ok(StatusCode::NO_CONTENT)
}
