//! # Index
//!
//! Fleet-wide counters and the caller's visit count for this session.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::state::AppState;

/// Landing page data.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IndexResponse {
    pub num_drivers: usize,
    pub num_cars: usize,
    pub num_manufacturers: usize,
    /// Visits to this page in the current session, including this one.
    pub num_visits: u64,
}

/// Build the index router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(index))
}

/// GET /: Fleet counters and session visit count.
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Index counters", body = IndexResponse),
        (status = 401, description = "Login required", body = crate::error::ErrorBody),
    ),
    tag = "index"
)]
async fn index(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<IndexResponse>, AppError> {
    let num_visits = state
        .sessions
        .record_visit(&caller.session_key)
        .ok_or_else(|| AppError::Unauthorized("session has ended".into()))?;

    Ok(Json(IndexResponse {
        num_drivers: state.drivers.len(),
        num_cars: state.cars.len(),
        num_manufacturers: state.manufacturers.len(),
        num_visits,
    }))
}
