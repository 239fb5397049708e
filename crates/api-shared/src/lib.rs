//! # API Shared
//!
//! Shared utilities and definitions for the telehealth APIs.
//!
//! Contains:
//! - Wire types for requests and responses (`wire` module), with OpenAPI schemas
//! - Shared services like `HealthService`
//! - Bearer-credential parsing
//!
//! Used by `api-rest` and the workspace server binary.

pub mod auth;
pub mod health;
pub mod wire;

pub use health::HealthService;
pub use wire::*;
