//! # First-Driver Bootstrap
//!
//! Every route except login needs a session, and sessions belong to
//! drivers, so a fresh deployment needs one account created out of band.
//!
//! When `BOOTSTRAP_USERNAME`, `BOOTSTRAP_PASSWORD` and
//! `BOOTSTRAP_LICENSE_NUMBER` are all set, startup registers that driver
//! through the same form cleaning as `POST /drivers`. If a driver with that
//! username already exists (for example after hydrating from Postgres), the
//! step is skipped. If none are set, nothing happens.

use taxi_core::{DriverCreationForm, Form, FormErrors};

use crate::error::AppError;
use crate::routes::drivers::register_driver;
use crate::state::{AppState, DriverRecord};

const USERNAME_VAR: &str = "BOOTSTRAP_USERNAME";
const PASSWORD_VAR: &str = "BOOTSTRAP_PASSWORD";
const LICENSE_VAR: &str = "BOOTSTRAP_LICENSE_NUMBER";

/// Errors during first-driver bootstrap.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// Some but not all bootstrap variables are set.
    #[error("bootstrap driver is partially configured; missing {missing:?}")]
    Incomplete { missing: Vec<&'static str> },

    /// The configured driver failed form cleaning.
    #[error("bootstrap driver is invalid: {0}")]
    InvalidDriver(FormErrors),

    /// Registering the driver failed.
    #[error("bootstrap driver could not be registered: {0}")]
    Register(#[from] AppError),
}

/// Register the bootstrap driver from the process environment.
pub async fn bootstrap_driver(state: &AppState) -> Result<Option<DriverRecord>, BootstrapError> {
    bootstrap_driver_from(state, |key| std::env::var(key).ok()).await
}

async fn bootstrap_driver_from(
    state: &AppState,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Option<DriverRecord>, BootstrapError> {
    let username = lookup(USERNAME_VAR).filter(|v| !v.trim().is_empty());
    let password = lookup(PASSWORD_VAR).filter(|v| !v.is_empty());
    let license = lookup(LICENSE_VAR).filter(|v| !v.trim().is_empty());

    let (username, password, license_number) = match (username, password, license) {
        (None, None, None) => {
            tracing::debug!("no bootstrap driver configured");
            return Ok(None);
        }
        (Some(u), Some(p), Some(l)) => (u, p, l),
        (u, p, l) => {
            let missing = [
                (USERNAME_VAR, u.is_none()),
                (PASSWORD_VAR, p.is_none()),
                (LICENSE_VAR, l.is_none()),
            ]
            .into_iter()
            .filter_map(|(var, absent)| absent.then_some(var))
            .collect();
            return Err(BootstrapError::Incomplete { missing });
        }
    };

    if state.drivers.any(|d| d.username == username.trim()) {
        tracing::info!(username = %username.trim(), "bootstrap driver already exists");
        return Ok(None);
    }

    let form = DriverCreationForm {
        username,
        password_confirmation: password.clone(),
        password,
        license_number,
        ..DriverCreationForm::default()
    };
    let new = form.clean().map_err(BootstrapError::InvalidDriver)?;
    let record = register_driver(state, new).await?;
    tracing::info!(driver_id = %record.id, username = %record.username, "bootstrap driver registered");

    Ok(Some(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MIN_PASSWORD_ITERATIONS;
    use crate::state::AppConfig;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn test_state() -> AppState {
        let config = AppConfig {
            password_iterations: MIN_PASSWORD_ITERATIONS,
            ..AppConfig::default()
        };
        AppState::with_config(config, None)
    }

    const FULL: &[(&str, &str)] = &[
        (USERNAME_VAR, "admin"),
        (PASSWORD_VAR, "3231qwerty"),
        (LICENSE_VAR, "ADM00001"),
    ];

    #[tokio::test]
    async fn nothing_configured_is_a_no_op() {
        let state = test_state();
        let result = bootstrap_driver_from(&state, env(&[])).await.unwrap();
        assert!(result.is_none());
        assert!(state.drivers.is_empty());
    }

    #[tokio::test]
    async fn full_configuration_registers_driver_with_login() {
        let state = test_state();
        let record = bootstrap_driver_from(&state, env(FULL))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.username, "admin");
        assert_eq!(record.license_number, "ADM00001");
        assert!(state.credentials.get(&record.id).unwrap().verify("3231qwerty"));
    }

    #[tokio::test]
    async fn second_run_skips_existing_driver() {
        let state = test_state();
        bootstrap_driver_from(&state, env(FULL)).await.unwrap();
        let again = bootstrap_driver_from(&state, env(FULL)).await.unwrap();
        assert!(again.is_none());
        assert_eq!(state.drivers.len(), 1);
    }

    #[tokio::test]
    async fn partial_configuration_names_missing_vars() {
        let state = test_state();
        let err = bootstrap_driver_from(&state, env(&[(USERNAME_VAR, "admin")]))
            .await
            .unwrap_err();
        match err {
            BootstrapError::Incomplete { missing } => {
                assert_eq!(missing, vec![PASSWORD_VAR, LICENSE_VAR]);
            }
            other => panic!("expected Incomplete, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_license_is_rejected() {
        let state = test_state();
        let err = bootstrap_driver_from(
            &state,
            env(&[
                (USERNAME_VAR, "admin"),
                (PASSWORD_VAR, "3231qwerty"),
                (LICENSE_VAR, "adm00001"),
            ]),
        )
        .await
        .unwrap_err();
        match err {
            BootstrapError::InvalidDriver(errors) => {
                assert!(errors.field("license_number").is_some());
            }
            other => panic!("expected InvalidDriver, got: {other:?}"),
        }
        assert!(state.drivers.is_empty());
    }
}
