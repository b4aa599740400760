//! # Driver License Numbers
//!
//! Every driver carries a license number in the fixed format `AAA99999`:
//! three uppercase ASCII letters followed by five ASCII digits.
//!
//! [`validate`] is the single entry point for the grammar. It is a pure
//! function over a string, so form cleaning, the HTTP layer, the CLI and
//! deserialization all share one definition of what a license number is.
//!
//! ## Rule order
//!
//! Rules are checked in a fixed order and the first failure is reported:
//!
//! 1. length is exactly 8 characters ([`LicenseError::WrongLength`])
//! 2. characters 0..3 are uppercase letters ([`LicenseError::NonUppercaseLetterPrefix`])
//! 3. characters 3..8 are digits ([`LicenseError::NonDigitSuffix`])

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LicenseError;

/// Total number of characters in a license number.
pub const LICENSE_NUMBER_LENGTH: usize = 8;

/// Number of leading uppercase letters.
pub const LICENSE_PREFIX_LENGTH: usize = 3;

/// A license number that has passed [`validate`].
///
/// The only ways to obtain one are [`validate`] and the conversions that
/// call it, so holding a `LicenseNumber` is proof the grammar was checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LicenseNumber(String);

/// Check `candidate` against the license-number grammar.
///
/// Returns the candidate unchanged on success. Length is counted in
/// characters, not bytes, so multi-byte input is reported as the length
/// a user would see.
///
/// # Errors
///
/// Returns the first [`LicenseError`] rule the candidate breaks.
pub fn validate(candidate: &str) -> Result<LicenseNumber, LicenseError> {
    let length = candidate.chars().count();
    if length != LICENSE_NUMBER_LENGTH {
        return Err(LicenseError::WrongLength { length });
    }

    let mut chars = candidate.chars();
    if !chars
        .by_ref()
        .take(LICENSE_PREFIX_LENGTH)
        .all(|c| c.is_ascii_uppercase())
    {
        return Err(LicenseError::NonUppercaseLetterPrefix);
    }
    if !chars.all(|c| c.is_ascii_digit()) {
        return Err(LicenseError::NonDigitSuffix);
    }

    Ok(LicenseNumber(candidate.to_string()))
}

impl LicenseNumber {
    /// Validate and wrap a license number.
    ///
    /// # Errors
    ///
    /// See [`validate`].
    pub fn new(value: impl AsRef<str>) -> Result<Self, LicenseError> {
        validate(value.as_ref())
    }

    /// Access the license number string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The three-letter prefix.
    pub fn prefix(&self) -> &str {
        // ASCII-only after validation, so byte slicing is on char boundaries.
        &self.0[..LICENSE_PREFIX_LENGTH]
    }

    /// The five-digit serial.
    pub fn serial(&self) -> &str {
        &self.0[LICENSE_PREFIX_LENGTH..]
    }

    /// Unwrap into the owned string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for LicenseNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LicenseNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for LicenseNumber {
    type Err = LicenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate(s)
    }
}

impl TryFrom<String> for LicenseNumber {
    type Error = LicenseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate(&value)
    }
}

impl From<LicenseNumber> for String {
    fn from(value: LicenseNumber) -> Self {
        value.0
    }
}

impl PartialEq<&str> for LicenseNumber {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_number() {
        let license = validate("ABC12345").unwrap();
        assert_eq!(license.as_str(), "ABC12345");
        assert_eq!(license.prefix(), "ABC");
        assert_eq!(license.serial(), "12345");
    }

    #[test]
    fn rejects_nine_characters_as_wrong_length() {
        assert_eq!(
            validate("AB1234567").unwrap_err(),
            LicenseError::WrongLength { length: 9 }
        );
    }

    #[test]
    fn rejects_empty_string_as_wrong_length() {
        assert_eq!(
            validate("").unwrap_err(),
            LicenseError::WrongLength { length: 0 }
        );
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        // 8 characters, 9 bytes.
        assert_eq!(
            validate("ÄBC12345").unwrap_err(),
            LicenseError::NonUppercaseLetterPrefix
        );
        assert_eq!(
            validate("ABC1234é5").unwrap_err(),
            LicenseError::WrongLength { length: 9 }
        );
    }

    #[test]
    fn rejects_lowercase_prefix() {
        assert_eq!(
            validate("abc12345").unwrap_err(),
            LicenseError::NonUppercaseLetterPrefix
        );
        assert_eq!(
            validate("ABc12345").unwrap_err(),
            LicenseError::NonUppercaseLetterPrefix
        );
    }

    #[test]
    fn rejects_digit_in_prefix() {
        assert_eq!(
            validate("A1C12345").unwrap_err(),
            LicenseError::NonUppercaseLetterPrefix
        );
    }

    #[test]
    fn rejects_letters_in_suffix() {
        assert_eq!(
            validate("ABCXX345").unwrap_err(),
            LicenseError::NonDigitSuffix
        );
        assert_eq!(
            validate("ABC1234X").unwrap_err(),
            LicenseError::NonDigitSuffix
        );
    }

    #[test]
    fn length_is_checked_before_prefix() {
        assert_eq!(
            validate("abc").unwrap_err(),
            LicenseError::WrongLength { length: 3 }
        );
    }

    #[test]
    fn revalidation_is_idempotent() {
        let first = validate("XYZ00001").unwrap();
        let second = validate(first.as_str()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn from_str_and_try_from_agree_with_validate() {
        let parsed: LicenseNumber = "QWE98765".parse().unwrap();
        let converted = LicenseNumber::try_from("QWE98765".to_string()).unwrap();
        assert_eq!(parsed, converted);
        assert!("qwe98765".parse::<LicenseNumber>().is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        let license = LicenseNumber::new("ABC12345").unwrap();
        let json = serde_json::to_string(&license).unwrap();
        assert_eq!(json, "\"ABC12345\"");
    }

    #[test]
    fn deserialization_runs_validation() {
        let ok: LicenseNumber = serde_json::from_str("\"ABC12345\"").unwrap();
        assert_eq!(ok, "ABC12345");
        assert!(serde_json::from_str::<LicenseNumber>("\"ABC1234\"").is_err());
    }
}
