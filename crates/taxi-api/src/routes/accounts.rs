//! # Accounts
//!
//! Login issues a bearer token for a driver; logout revokes it. Login is
//! the only route besides the health probes reachable without a session.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{verify_password, CallerIdentity};
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::{AppState, DriverRecord};

/// Login credentials.
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Successful login.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Bearer token for the `Authorization` header.
    pub token: String,
    pub driver: DriverRecord,
}

/// Routes reachable without a session.
pub fn public_router() -> Router<AppState> {
    Router::new().route("/accounts/login", post(login))
}

/// Routes that need a session.
pub fn router() -> Router<AppState> {
    Router::new().route("/accounts/logout", post(logout))
}

/// POST /accounts/login: Exchange credentials for a session token.
#[utoipa::path(
    post,
    path = "/accounts/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid username or password", body = crate::error::ErrorBody),
    ),
    tag = "accounts"
)]
async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let req = extract_json(body)?;
    let username = req.username.trim();

    let driver = state.drivers.find(|d| d.username == username);
    let stored = driver.as_ref().and_then(|d| state.credentials.get(&d.id));
    let verified =
        verify_password(stored, req.password, state.config.password_iterations).await?;

    let Some(driver) = driver.filter(|_| verified) else {
        tracing::warn!(username, "login failed");
        return Err(AppError::Unauthorized(
            "invalid username or password".into(),
        ));
    };

    let token = state.sessions.create(driver.id, driver.username.as_str());
    tracing::info!(driver_id = %driver.id, "driver logged in");
    Ok(Json(LoginResponse { token, driver }))
}

/// POST /accounts/logout: End the caller's session.
#[utoipa::path(
    post,
    path = "/accounts/logout",
    responses(
        (status = 204, description = "Logged out"),
        (status = 401, description = "Login required", body = crate::error::ErrorBody),
    ),
    tag = "accounts"
)]
async fn logout(State(state): State<AppState>, caller: CallerIdentity) -> StatusCode {
    state.sessions.revoke(&caller.session_key);
    tracing::info!(driver_id = %caller.driver_id, "driver logged out");
    StatusCode::NO_CONTENT
}
