//! # Middleware
//!
//! Tower layers applied around the fleet routes.

pub mod tracing_layer;
