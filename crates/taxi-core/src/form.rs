//! # Form Cleaning
//!
//! Submitted data is deserialized into a form struct and then cleaned.
//! Cleaning validates every field, collects all failures into
//! [`FormErrors`], and on success yields a typed value whose fields are
//! already validated (a [`LicenseNumber`], a [`Username`], trimmed text).
//!
//! Forms are plain data. The HTTP layer calls [`Form::clean`] during request
//! handling; the license rule itself lives in [`crate::license::validate`]
//! and is reached from [`clean_license_number`].

use std::collections::BTreeSet;

use serde::Deserialize;
use uuid::Uuid;

use crate::error::{FormErrors, LicenseError, ValidationError};
use crate::identity::Username;
use crate::license::{self, LicenseNumber};

/// Maximum length of free-text name fields.
pub const NAME_MAX_LENGTH: usize = 255;

/// Minimum password length.
pub const PASSWORD_MIN_LENGTH: usize = 8;

/// A submitted form that can be cleaned into a validated value.
pub trait Form {
    /// The validated value produced by a successful clean.
    type Output;

    /// Validate every field, returning all failures at once.
    fn clean(self) -> Result<Self::Output, FormErrors>;
}

/// Field-cleaning step for `license_number`.
///
/// Surrounding whitespace is stripped, as for any text field, and the
/// remainder must satisfy the license grammar exactly.
pub fn clean_license_number(value: &str) -> Result<LicenseNumber, LicenseError> {
    license::validate(value.trim())
}

/// Trim a required text field and enforce its maximum length.
pub fn clean_required_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    clean_optional_text(field, trimmed, max)
}

/// Trim an optional text field and enforce its maximum length.
pub fn clean_optional_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_string())
}

fn clean_email(value: &str) -> Result<String, ValidationError> {
    let email = clean_optional_text("email", value, 254)?;
    if email.is_empty() {
        return Ok(email);
    }
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace) =>
        {
            Ok(email)
        }
        _ => Err(ValidationError::InvalidEmail(email)),
    }
}

fn clean_password(password: &str, confirmation: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::Empty { field: "password" });
    }
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        return Err(ValidationError::WeakPassword(
            "must contain at least 8 characters",
        ));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::WeakPassword("must not be entirely numeric"));
    }
    if password != confirmation {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

// ── Driver creation ─────────────────────────────────────────────────

/// Sign-up form for a new driver account.
#[derive(Clone, Default, Deserialize)]
pub struct DriverCreationForm {
    /// Requested login name.
    #[serde(default)]
    pub username: String,
    /// Plaintext password.
    #[serde(default)]
    pub password: String,
    /// Must equal `password`.
    #[serde(default)]
    pub password_confirmation: String,
    /// Optional given name.
    #[serde(default)]
    pub first_name: String,
    /// Optional family name.
    #[serde(default)]
    pub last_name: String,
    /// Optional contact address.
    #[serde(default)]
    pub email: String,
    /// Raw license number as submitted.
    #[serde(default)]
    pub license_number: String,
}

impl std::fmt::Debug for DriverCreationForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverCreationForm")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("license_number", &self.license_number)
            .finish()
    }
}

/// A cleaned driver-creation submission.
#[derive(Clone)]
pub struct NewDriver {
    /// Validated login name.
    pub username: Username,
    /// Plaintext password. Hash it before storing.
    pub password: String,
    /// Trimmed given name, possibly empty.
    pub first_name: String,
    /// Trimmed family name, possibly empty.
    pub last_name: String,
    /// Trimmed email, possibly empty.
    pub email: String,
    /// Validated license number.
    pub license_number: LicenseNumber,
}

impl std::fmt::Debug for NewDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewDriver")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("license_number", &self.license_number)
            .finish_non_exhaustive()
    }
}

impl Form for DriverCreationForm {
    type Output = NewDriver;

    fn clean(self) -> Result<NewDriver, FormErrors> {
        let mut errors = FormErrors::new();

        let username = Username::new(&self.username)
            .map_err(|e| errors.add("username", e.to_string()))
            .ok();
        if let Err(e) = clean_password(&self.password, &self.password_confirmation) {
            let field = match e {
                ValidationError::PasswordMismatch => "password_confirmation",
                _ => "password",
            };
            errors.add(field, e.to_string());
        }
        let first_name = clean_optional_text("first_name", &self.first_name, 150)
            .map_err(|e| errors.add("first_name", e.to_string()))
            .ok();
        let last_name = clean_optional_text("last_name", &self.last_name, 150)
            .map_err(|e| errors.add("last_name", e.to_string()))
            .ok();
        let email = clean_email(&self.email)
            .map_err(|e| errors.add("email", e.to_string()))
            .ok();
        let license_number = clean_license_number(&self.license_number)
            .map_err(|e| errors.add("license_number", e.to_string()))
            .ok();

        match (username, first_name, last_name, email, license_number) {
            (Some(username), Some(first_name), Some(last_name), Some(email), Some(license_number))
                if errors.is_empty() =>
            {
                Ok(NewDriver {
                    username,
                    password: self.password,
                    first_name,
                    last_name,
                    email,
                    license_number,
                })
            }
            _ => Err(errors),
        }
    }
}

// ── License update ──────────────────────────────────────────────────

/// Form for changing an existing driver's license number.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LicenseUpdateForm {
    /// Raw replacement license number.
    #[serde(default)]
    pub license_number: String,
}

impl Form for LicenseUpdateForm {
    type Output = LicenseNumber;

    fn clean(self) -> Result<LicenseNumber, FormErrors> {
        clean_license_number(&self.license_number).map_err(|e| {
            let mut errors = FormErrors::new();
            errors.add("license_number", e.to_string());
            errors
        })
    }
}

// ── Manufacturer ────────────────────────────────────────────────────

/// Create/update form for a manufacturer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManufacturerForm {
    /// Manufacturer name.
    #[serde(default)]
    pub name: String,
    /// Country of origin.
    #[serde(default)]
    pub country: String,
}

/// A cleaned manufacturer submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewManufacturer {
    /// Trimmed, non-empty name.
    pub name: String,
    /// Trimmed, non-empty country.
    pub country: String,
}

impl Form for ManufacturerForm {
    type Output = NewManufacturer;

    fn clean(self) -> Result<NewManufacturer, FormErrors> {
        let mut errors = FormErrors::new();
        let name = clean_required_text("name", &self.name, NAME_MAX_LENGTH)
            .map_err(|e| errors.add("name", e.to_string()))
            .unwrap_or_default();
        let country = clean_required_text("country", &self.country, NAME_MAX_LENGTH)
            .map_err(|e| errors.add("country", e.to_string()))
            .unwrap_or_default();
        errors.into_result(|| NewManufacturer { name, country })
    }
}

// ── Car ─────────────────────────────────────────────────────────────

/// Create/update form for a car.
#[derive(Debug, Clone, Deserialize)]
pub struct CarForm {
    /// Car model name.
    #[serde(default)]
    pub model: String,
    /// Manufacturer the car belongs to.
    #[serde(default)]
    pub manufacturer_id: Option<Uuid>,
    /// Drivers assigned to the car.
    #[serde(default)]
    pub driver_ids: Vec<Uuid>,
}

/// A cleaned car submission. Referenced ids are not yet checked for existence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCar {
    /// Trimmed, non-empty model.
    pub model: String,
    /// Referenced manufacturer.
    pub manufacturer_id: Uuid,
    /// Referenced drivers, deduplicated.
    pub driver_ids: BTreeSet<Uuid>,
}

impl Form for CarForm {
    type Output = NewCar;

    fn clean(self) -> Result<NewCar, FormErrors> {
        let mut errors = FormErrors::new();
        let model = clean_required_text("model", &self.model, NAME_MAX_LENGTH)
            .map_err(|e| errors.add("model", e.to_string()))
            .unwrap_or_default();
        let manufacturer_id = self
            .manufacturer_id
            .ok_or(ValidationError::Empty {
                field: "manufacturer_id",
            })
            .map_err(|e| errors.add("manufacturer_id", e.to_string()))
            .unwrap_or_default();
        let driver_ids = self.driver_ids.into_iter().collect();
        errors.into_result(|| NewCar {
            model,
            manufacturer_id,
            driver_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver_form(license_number: &str) -> DriverCreationForm {
        DriverCreationForm {
            username: "test".to_string(),
            password: "3231qwerty".to_string(),
            password_confirmation: "3231qwerty".to_string(),
            license_number: license_number.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn driver_form_valid_with_correct_license_number() {
        let driver = driver_form("ABC12345").clean().unwrap();
        assert_eq!(driver.username, "test");
        assert_eq!(driver.license_number, "ABC12345");
    }

    #[test]
    fn driver_form_reports_license_error_under_license_field() {
        for bad in ["ABC1234", "abc12345", "ABCXX345", ""] {
            let errors = driver_form(bad).clean().unwrap_err();
            assert_eq!(
                errors.field_names().collect::<Vec<_>>(),
                vec!["license_number"],
                "license {bad:?}"
            );
        }
    }

    #[test]
    fn driver_form_license_field_strips_whitespace() {
        let driver = driver_form("  ABC12345 ").clean().unwrap();
        assert_eq!(driver.license_number.as_str(), "ABC12345");
    }

    #[test]
    fn driver_form_collects_every_failing_field() {
        let form = DriverCreationForm {
            username: "bad name".to_string(),
            password: "short".to_string(),
            password_confirmation: "short".to_string(),
            email: "not-an-email".to_string(),
            license_number: "abc".to_string(),
            ..Default::default()
        };
        let errors = form.clean().unwrap_err();
        assert_eq!(
            errors.field_names().collect::<Vec<_>>(),
            vec!["email", "license_number", "password", "username"]
        );
    }

    #[test]
    fn driver_form_missing_fields_are_field_errors() {
        let form: DriverCreationForm = serde_json::from_str("{}").unwrap();
        let errors = form.clean().unwrap_err();
        assert!(errors.field("username").is_some());
        assert!(errors.field("password").is_some());
        assert!(errors.field("license_number").is_some());
    }

    #[test]
    fn driver_form_password_rules() {
        let mut form = driver_form("ABC12345");
        form.password_confirmation = "different1".to_string();
        let errors = form.clean().unwrap_err();
        assert!(errors.field("password_confirmation").is_some());

        let mut form = driver_form("ABC12345");
        form.password = "12345678".to_string();
        form.password_confirmation = "12345678".to_string();
        let errors = form.clean().unwrap_err();
        assert!(errors.field("password").unwrap()[0].contains("numeric"));
    }

    #[test]
    fn driver_form_accepts_optional_profile_fields() {
        let mut form = driver_form("ABC12345");
        form.first_name = " Brad ".to_string();
        form.last_name = "Pitt".to_string();
        form.email = "brad@example.com".to_string();
        let driver = form.clean().unwrap();
        assert_eq!(driver.first_name, "Brad");
        assert_eq!(driver.email, "brad@example.com");
    }

    #[test]
    fn driver_form_debug_redacts_password() {
        let rendered = format!("{:?}", driver_form("ABC12345"));
        assert!(!rendered.contains("3231qwerty"));
        let rendered = format!("{:?}", driver_form("ABC12345").clean().unwrap());
        assert!(!rendered.contains("3231qwerty"));
    }

    #[test]
    fn license_update_form() {
        let form = LicenseUpdateForm {
            license_number: "XYZ54321".to_string(),
        };
        assert_eq!(form.clean().unwrap(), "XYZ54321");

        let form = LicenseUpdateForm {
            license_number: "XYZ5432".to_string(),
        };
        assert!(form.clean().unwrap_err().field("license_number").is_some());
    }

    #[test]
    fn manufacturer_form_requires_both_fields() {
        let form = ManufacturerForm {
            name: " BMW ".to_string(),
            country: "Germany".to_string(),
        };
        assert_eq!(
            form.clean().unwrap(),
            NewManufacturer {
                name: "BMW".to_string(),
                country: "Germany".to_string()
            }
        );

        let errors = ManufacturerForm::default().clean().unwrap_err();
        assert_eq!(
            errors.field_names().collect::<Vec<_>>(),
            vec!["country", "name"]
        );
    }

    #[test]
    fn car_form_dedupes_drivers() {
        let driver = Uuid::new_v4();
        let form = CarForm {
            model: "X5".to_string(),
            manufacturer_id: Some(Uuid::new_v4()),
            driver_ids: vec![driver, driver],
        };
        let car = form.clean().unwrap();
        assert_eq!(car.driver_ids.len(), 1);
    }

    #[test]
    fn car_form_requires_manufacturer() {
        let form: CarForm = serde_json::from_str(r#"{"model": "X5"}"#).unwrap();
        let errors = form.clean().unwrap_err();
        assert!(errors.field("manufacturer_id").is_some());
        assert!(errors.field("model").is_none());
    }

    #[test]
    fn car_form_rejects_long_model() {
        let form = CarForm {
            model: "m".repeat(256),
            manufacturer_id: Some(Uuid::new_v4()),
            driver_ids: Vec::new(),
        };
        assert!(form.clean().unwrap_err().field("model").is_some());
    }

    #[test]
    fn clean_text_helpers() {
        assert_eq!(
            clean_required_text("name", "  ", 10).unwrap_err(),
            ValidationError::Empty { field: "name" }
        );
        assert_eq!(clean_optional_text("name", "  ", 10).unwrap(), "");
    }
}
