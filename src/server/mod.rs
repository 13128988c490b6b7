//! HTTP integration for axum routers

pub mod middleware;

pub use middleware::{DEFAULT_BODY_LIMIT, ValidationLayer, ValidationService, validate_request};
