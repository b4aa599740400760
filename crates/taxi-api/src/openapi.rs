//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Assembled OpenAPI spec for the fleet API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Taxi Fleet API",
        version = "0.1.0",
        description = "Drivers, cars and manufacturers of a taxi fleet. Every route except login requires a bearer session token.",
        license(name = "BUSL-1.1")
    ),
    paths(
        crate::routes::index::index,
        crate::routes::accounts::login,
        crate::routes::accounts::logout,
        crate::routes::manufacturers::list_manufacturers,
        crate::routes::manufacturers::create_manufacturer,
        crate::routes::manufacturers::get_manufacturer,
        crate::routes::manufacturers::update_manufacturer,
        crate::routes::manufacturers::delete_manufacturer,
        crate::routes::cars::list_cars,
        crate::routes::cars::create_car,
        crate::routes::cars::get_car,
        crate::routes::cars::update_car,
        crate::routes::cars::delete_car,
        crate::routes::cars::toggle_assign,
        crate::routes::drivers::list_drivers,
        crate::routes::drivers::create_driver,
        crate::routes::drivers::get_driver,
        crate::routes::drivers::update_license,
        crate::routes::drivers::delete_driver,
    ),
    components(schemas(
        crate::state::ManufacturerRecord,
        crate::state::CarRecord,
        crate::state::DriverRecord,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::ManufacturerPage,
        crate::routes::CarPage,
        crate::routes::DriverPage,
        crate::routes::index::IndexResponse,
        crate::routes::accounts::LoginRequest,
        crate::routes::accounts::LoginResponse,
        crate::routes::cars::CarDetail,
        crate::routes::drivers::DriverDetail,
    )),
    modifiers(&BearerSecurity),
    tags(
        (name = "index", description = "Fleet counters"),
        (name = "accounts", description = "Login and logout"),
        (name = "manufacturers", description = "Car manufacturers"),
        (name = "cars", description = "Cars and driver assignment"),
        (name = "drivers", description = "Driver accounts and license numbers"),
    )
)]
pub struct ApiDoc;

/// Registers the bearer session token scheme.
struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_token",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_lists_every_route() {
        let spec = ApiDoc::openapi();
        for path in [
            "/",
            "/accounts/login",
            "/accounts/logout",
            "/manufacturers",
            "/manufacturers/{id}",
            "/cars",
            "/cars/{id}",
            "/cars/{id}/toggle-assign",
            "/drivers",
            "/drivers/{id}",
            "/drivers/{id}/license",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn spec_registers_bearer_scheme() {
        let json = serde_json::to_value(ApiDoc::openapi()).unwrap();
        assert_eq!(
            json["components"]["securitySchemes"]["session_token"]["scheme"],
            "bearer"
        );
    }
}
