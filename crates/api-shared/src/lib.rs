//! # API Shared
//!
//! Shared definitions for the image host API.
//!
//! Contains:
//! - JSON request/response types with OpenAPI schemas (`dto` module)
//! - `HealthService`
//!
//! Used by `api-rest` and by the root runner.

pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
