//! # Custom Extractors & Form Cleaning
//!
//! Helpers to extract a JSON body and run it through a taxi-core [`Form`].

use axum::extract::rejection::JsonRejection;
use axum::Json;
use taxi_core::Form;

use crate::error::AppError;

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
///
/// Handlers should use:
/// ```ignore
/// async fn handler(body: Result<Json<T>, JsonRejection>) -> Result<..., AppError> {
///     let req = extract_json(body)?;
///     // use req...
/// }
/// ```
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and clean it, returning the form's output.
///
/// Field errors become a 422 with per-field details.
pub fn extract_form<F: Form>(result: Result<Json<F>, JsonRejection>) -> Result<F::Output, AppError> {
    let form = extract_json(result)?;
    Ok(form.clean()?)
}
