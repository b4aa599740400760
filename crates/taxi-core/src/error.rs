//! # Error Hierarchy
//!
//! Structured error types for the taxi fleet service, built with `thiserror`.
//! No `Box<dyn Error>`, no `.unwrap()` outside tests.
//!
//! Input errors are local and user-correctable. They are returned as values,
//! never raised, and the caller decides how to present them.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

/// Top-level error type for the taxi core.
#[derive(Error, Debug)]
pub enum TaxiError {
    /// License number grammar violation.
    #[error("license error: {0}")]
    License(#[from] LicenseError),

    /// Single-field validation failure.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// One or more form fields failed cleaning.
    #[error("form error: {0}")]
    Form(#[from] FormErrors),
}

/// Which rule of the `AAA99999` license grammar a candidate broke.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseError {
    /// The candidate is not exactly 8 characters long.
    #[error("license number must be exactly 8 characters, got {length}")]
    WrongLength {
        /// Length of the candidate in characters.
        length: usize,
    },

    /// One of the first 3 characters is not an uppercase ASCII letter.
    #[error("first 3 characters of the license number must be uppercase letters")]
    NonUppercaseLetterPrefix,

    /// One of the last 5 characters is not an ASCII digit.
    #[error("last 5 characters of the license number must be digits")]
    NonDigitSuffix,
}

impl LicenseError {
    /// Stable machine-readable name of the failed rule.
    pub fn rule(&self) -> &'static str {
        match self {
            Self::WrongLength { .. } => "wrong_length",
            Self::NonUppercaseLetterPrefix => "non_uppercase_letter_prefix",
            Self::NonDigitSuffix => "non_digit_suffix",
        }
    }
}

/// Field-level validation errors for everything other than license numbers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required field is empty after trimming.
    #[error("{field} must not be empty")]
    Empty {
        /// Field name.
        field: &'static str,
    },

    /// Field exceeds its maximum length.
    #[error("{field} must not exceed {max} characters")]
    TooLong {
        /// Field name.
        field: &'static str,
        /// Maximum number of characters.
        max: usize,
    },

    /// Username contains characters outside letters, digits and `@.+-_`.
    #[error("invalid username \"{0}\" (letters, digits and @/./+/-/_ only)")]
    InvalidUsername(String),

    /// Email address is not of the form `local@domain`.
    #[error("invalid email address \"{0}\"")]
    InvalidEmail(String),

    /// Password does not meet the minimum policy.
    #[error("password {0}")]
    WeakPassword(&'static str),

    /// Password and confirmation differ.
    #[error("the two password fields didn't match")]
    PasswordMismatch,

    /// Requested page does not exist.
    #[error("page {page} is out of range (1..={num_pages})")]
    PageOutOfRange {
        /// Requested page.
        page: usize,
        /// Number of available pages.
        num_pages: usize,
    },
}

/// Errors collected while cleaning a form, keyed by field name.
///
/// Every field is cleaned even after an earlier one fails, so a single
/// submission reports all problems at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors {
    fields: BTreeMap<&'static str, Vec<String>>,
}

impl FormErrors {
    /// Create an empty error set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error message against a field.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_default().push(message.into());
    }

    /// Whether no errors were recorded.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Messages recorded against `field`, if any.
    pub fn field(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    /// Names of the fields that failed.
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.keys().copied()
    }

    /// `Ok(value)` if no errors were recorded, otherwise `Err(self)`.
    pub fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for FormErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} field(s) failed validation", self.fields.len())?;
        for (i, (field, messages)) in self.fields.iter().enumerate() {
            let sep = if i == 0 { ": " } else { ", " };
            write!(f, "{sep}{field}: {}", messages.join("; "))?;
        }
        Ok(())
    }
}

impl std::error::Error for FormErrors {}
