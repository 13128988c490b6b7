//! # field-guard
//!
//! Declarative request-field validation for axum routers.
//!
//! ## Features
//!
//! - **Flat Schemas**: one rule per field (primitive type, optional regex, optional presence)
//! - **Any Location**: JSON body, query string or route parameters
//! - **Unexpected Fields**: request fields the schema does not declare are refused
//! - **Typed Faults**: every fault maps to a status code, an error code and a message
//! - **Quiet Configuration Errors**: schema problems are logged, callers only see a 500
//! - **Configuration-Based**: declare schemas in YAML and look them up by name
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use field_guard::prelude::*;
//!
//! let schema = SchemaDefinition::new(Location::Body)
//!     .field("name", RuleDefinition::string().pattern(r"^[A-Za-z ]+$"))
//!     .field("age", RuleDefinition::number().optional());
//!
//! let app = Router::new()
//!     .route("/users", post(create_user))
//!     .route_layer(ValidationLayer::new(Validator::new(&schema)));
//! ```

pub mod config;
pub mod core;
pub mod server;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Schema ===
    pub use crate::core::schema::{ExpectedType, Location, RuleDefinition, SchemaDefinition};

    // === Validation ===
    pub use crate::core::validation::{
        FaultLog, ReportMode, RequestView, TracingFaultLog, Validator,
    };

    // === Errors ===
    pub use crate::core::error::{
        ErrorResponse, Fault, Rejection, RequestFault, RuleFault, SchemaFault, ValidationFault,
    };

    // === Config ===
    pub use crate::config::{GuardConfig, GuardOptions};

    // === Server ===
    pub use crate::server::{ValidationLayer, ValidationService, validate_request};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use serde::{Deserialize, Serialize};

    // === Axum ===
    pub use axum::{
        Router,
        routing::{delete, get, post, put},
    };
}
