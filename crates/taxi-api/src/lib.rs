//! # taxi-api: Axum API Service for the Taxi Fleet
//!
//! Drivers, cars and manufacturers behind login-gated JSON routes. Driver
//! sign-up and license updates run through the taxi-core forms, so every
//! stored license number satisfies the `AAA99999` grammar.
//!
//! ## API Surface
//!
//! | Prefix               | Module                        | Domain               |
//! |----------------------|-------------------------------|----------------------|
//! | `/`                  | [`routes::index`]             | Counters, visits     |
//! | `/accounts/*`        | [`routes::accounts`]          | Login, logout        |
//! | `/manufacturers/*`   | [`routes::manufacturers`]     | Manufacturers        |
//! | `/cars/*`            | [`routes::cars`]              | Cars, assignment     |
//! | `/drivers/*`         | [`routes::drivers`]           | Drivers, licenses    |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → AuthMiddleware → Handler
//! ```
//!
//! ## OpenAPI
//!
//! Auto-generated OpenAPI spec via utoipa derive macros at `/openapi.json`.

pub mod auth;
pub mod bootstrap;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::middleware::from_fn;
use axum::Router;

use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes and login are mounted outside the auth middleware so they
/// remain reachable without a session.
pub fn app(state: AppState) -> Router {
    let sessions = state.sessions.clone();

    // Authenticated routes.
    let api = Router::new()
        .merge(routes::index::router())
        .merge(routes::accounts::router())
        .merge(routes::manufacturers::router())
        .merge(routes::cars::router())
        .merge(routes::drivers::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(axum::Extension(sessions));

    let public = routes::accounts::public_router();

    // Unauthenticated health probes.
    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new()
        .merge(health)
        .merge(public)
        .merge(api)
        .layer(middleware::tracing_layer::layer())
        .with_state(state)
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: returns 200 when the application is ready to serve.
async fn readiness() -> &'static str {
    "ready"
}
