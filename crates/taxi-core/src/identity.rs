//! # Account Identity
//!
//! Validated login name for driver accounts.
//!
//! ## Validation
//!
//! - 1 to 150 characters
//! - letters, digits and `@`, `.`, `+`, `-`, `_` only
//!
//! Letters are Unicode letters, matching the usual user-account rule where
//! names like `zoë` are accepted.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum username length in characters.
pub const USERNAME_MAX_LENGTH: usize = 150;

/// Login name of a driver account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Create a username, validating length and character set.
    ///
    /// Surrounding whitespace is trimmed before validation.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Empty`], [`ValidationError::TooLong`] or
    /// [`ValidationError::InvalidUsername`].
    pub fn new(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        let s = value.as_ref().trim();
        if s.is_empty() {
            return Err(ValidationError::Empty { field: "username" });
        }
        if s.chars().count() > USERNAME_MAX_LENGTH {
            return Err(ValidationError::TooLong {
                field: "username",
                max: USERNAME_MAX_LENGTH,
            });
        }
        if !s
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
        {
            return Err(ValidationError::InvalidUsername(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// Access the username string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Username {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl PartialEq<&str> for Username {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
