#![deny(missing_docs)]

//! # taxi-core: Foundational Types for the Taxi Fleet Service
//!
//! This crate defines the types every other crate in the workspace builds
//! on. It has no internal crate dependencies and performs no I/O.
//!
//! ## Design Principles
//!
//! 1. **One license grammar.** [`license::validate`] is the only place the
//!    `AAA99999` rule is written down. Forms, HTTP handlers, the CLI and
//!    serde deserialization all go through it.
//!
//! 2. **Validated newtypes.** A [`LicenseNumber`] or [`Username`] can only be
//!    obtained through its validating constructor.
//!
//! 3. **Forms by composition.** Each form is plain data with a
//!    [`Form::clean`] step that collects every field error into
//!    [`FormErrors`]. The web layer decides how to present them.
//!
//! 4. **Structured errors.** `thiserror` enums with the failing rule in the
//!    variant. No `Box<dyn Error>`, no `.unwrap()` outside tests.

pub mod error;
pub mod form;
pub mod identity;
pub mod license;
pub mod listing;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{FormErrors, LicenseError, TaxiError, ValidationError};
pub use form::{
    CarForm, DriverCreationForm, Form, LicenseUpdateForm, ManufacturerForm, NewCar, NewDriver,
    NewManufacturer,
};
pub use identity::Username;
pub use license::{validate as validate_license, LicenseNumber};
pub use listing::{filter_sorted, matches_query, Page, Searchable};
