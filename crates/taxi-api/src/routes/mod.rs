//! # API Route Modules
//!
//! - `index`: landing page counters and the per-session visit count.
//! - `accounts`: login and logout.
//! - `manufacturers`: manufacturer list, search and CRUD.
//! - `cars`: car list, search, CRUD and driver self-assignment.
//! - `drivers`: driver list, search, sign-up, license update and removal.
//!
//! Every list route filters on one text field, orders by that field and
//! paginates with the configured page size.

pub mod accounts;
pub mod cars;
pub mod drivers;
pub mod index;
pub mod manufacturers;

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use serde::Serialize;
use taxi_core::{filter_sorted, Page, Searchable};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::state::{CarRecord, DriverRecord, ManufacturerRecord};

/// Declare a concrete list-page response for one record type.
macro_rules! page_response {
    ($(#[$doc:meta])* $name:ident, $record:ty) => {
        $(#[$doc])*
        #[derive(Debug, Serialize, serde::Deserialize, ToSchema)]
        pub struct $name {
            pub items: Vec<$record>,
            /// 1-based page number.
            pub page: usize,
            pub num_pages: usize,
            /// Number of matching records across all pages.
            pub total: usize,
            pub has_next: bool,
            pub has_previous: bool,
        }

        impl From<Page<$record>> for $name {
            fn from(page: Page<$record>) -> Self {
                Self {
                    items: page.items,
                    page: page.page,
                    num_pages: page.num_pages,
                    total: page.total,
                    has_next: page.has_next,
                    has_previous: page.has_previous,
                }
            }
        }
    };
}

page_response!(
    /// One page of manufacturers.
    ManufacturerPage,
    ManufacturerRecord
);
page_response!(
    /// One page of cars.
    CarPage,
    CarRecord
);
page_response!(
    /// One page of drivers.
    DriverPage,
    DriverRecord
);

/// Extract query parameters, mapping parse failures to [`AppError::BadRequest`].
pub(crate) fn extract_query<T>(result: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    result
        .map(|Query(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a path parameter, mapping parse failures to [`AppError::BadRequest`].
pub(crate) fn extract_path<T>(result: Result<Path<T>, PathRejection>) -> Result<T, AppError> {
    result
        .map(|Path(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Filter, order and paginate `records` for a list view.
pub(crate) fn list_page<T: Searchable, R: From<Page<T>>>(
    records: Vec<T>,
    search: Option<&str>,
    page: Option<usize>,
    per_page: usize,
) -> Result<R, AppError> {
    let matched = filter_sorted(records, search);
    let page = Page::paginate(matched, page.unwrap_or(1), per_page)?;
    Ok(page.into())
}
