//! Typed faults raised while guarding a request
//!
//! Every fault maps to an HTTP status code, a stable error code and a
//! caller-facing message. Configuration problems never leak their detail to
//! the caller: the detail goes to the fault log, the caller only sees
//! `Internal Server Error`.
//!
//! # Fault Categories
//!
//! - [`SchemaFault`]: the schema itself is unusable (missing location, bad data)
//! - [`RuleFault`]: one declared rule could not be compiled
//! - [`ValidationFault`]: the request content violates a rule
//! - [`RequestFault`]: the request location could not be decoded at all

use super::schema::Location;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// Message returned to callers for every configuration fault
pub const INTERNAL_SERVER_ERROR: &str = "Internal Server Error";

/// A single reason for refusing a request
#[derive(Debug, Clone, PartialEq)]
pub enum Fault {
    /// The schema is misconfigured
    Internal(SchemaFault),

    /// A rule in the schema is misconfigured
    Rule(RuleFault),

    /// The request violates a rule
    Validation(ValidationFault),

    /// The request location could not be decoded
    Request(RequestFault),
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::Internal(_) => f.write_str(INTERNAL_SERVER_ERROR),
            Fault::Rule(e) => write!(f, "{}", e),
            Fault::Validation(e) => write!(f, "{}", e),
            Fault::Request(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Fault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Fault::Internal(e) => Some(e),
            Fault::Rule(e) => Some(e),
            Fault::Validation(e) => Some(e),
            Fault::Request(e) => Some(e),
        }
    }
}

impl Fault {
    /// Get the HTTP status code for this fault
    pub fn status_code(&self) -> StatusCode {
        match self {
            Fault::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Fault::Rule(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Fault::Validation(_) => StatusCode::BAD_REQUEST,
            Fault::Request(e) => e.status_code(),
        }
    }

    /// Get the error code for this fault
    pub fn error_code(&self) -> &'static str {
        match self {
            Fault::Internal(_) => "INTERNAL_ERROR",
            Fault::Rule(_) => "RULE_ERROR",
            Fault::Validation(_) => "VALIDATION_ERROR",
            Fault::Request(_) => "INVALID_REQUEST",
        }
    }

    /// The caller-facing message
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Whether this fault comes from the schema rather than the request
    pub fn is_configuration(&self) -> bool {
        matches!(self, Fault::Internal(_) | Fault::Rule(_))
    }
}

impl From<SchemaFault> for Fault {
    fn from(err: SchemaFault) -> Self {
        Fault::Internal(err)
    }
}

impl From<RuleFault> for Fault {
    fn from(err: RuleFault) -> Self {
        Fault::Rule(err)
    }
}

impl From<ValidationFault> for Fault {
    fn from(err: ValidationFault) -> Self {
        Fault::Validation(err)
    }
}

impl From<RequestFault> for Fault {
    fn from(err: RequestFault) -> Self {
        Fault::Request(err)
    }
}

// =============================================================================
// Schema Faults
// =============================================================================

/// The schema cannot be used to check any field
///
/// The `Display` output is the operator-facing reason written to the fault log.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaFault {
    #[error("Location is missing")]
    MissingLocation,

    #[error("Invalid location provided")]
    InvalidLocation { location: String },

    #[error("Data is missing")]
    MissingData,

    #[error("Data must be a object")]
    DataNotObject,
}

// =============================================================================
// Rule Faults
// =============================================================================

/// A declared rule that could not be compiled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleFault {
    /// The pattern is not a string or does not compile as a regex
    InvalidPattern { field: String, location: Location },

    /// The expected type names no supported primitive
    UnknownType {
        field: String,
        location: Location,
        type_name: String,
    },

    /// The rule is not a mapping or lacks `expectedType`
    Malformed { field: String, location: Location },
}

impl fmt::Display for RuleFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleFault::InvalidPattern { field, location } => {
                write!(
                    f,
                    "Invalid regex provided for '{}' in request {}.",
                    field, location
                )
            }
            RuleFault::UnknownType {
                field,
                location,
                type_name,
            } => {
                write!(
                    f,
                    "Invalid type '{}' provided for '{}' in request {}.",
                    type_name, field, location
                )
            }
            RuleFault::Malformed { field, location } => {
                write!(
                    f,
                    "Invalid rule provided for '{}' in request {}.",
                    field, location
                )
            }
        }
    }
}

impl std::error::Error for RuleFault {}

// =============================================================================
// Validation Faults
// =============================================================================

/// The request content violates a declared rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationFault {
    /// A required field is absent
    MissingField { field: String, location: Location },

    /// The value has the wrong runtime type
    TypeMismatch {
        field: String,
        value: String,
        expected: String,
        received: String,
    },

    /// The stringified value does not match the rule's pattern
    PatternMismatch { field: String, value: String },

    /// The request carries a field the schema does not declare
    UnexpectedField { field: String, location: Location },
}

impl ValidationFault {
    /// Name of the offending field
    pub fn field(&self) -> &str {
        match self {
            ValidationFault::MissingField { field, .. }
            | ValidationFault::TypeMismatch { field, .. }
            | ValidationFault::PatternMismatch { field, .. }
            | ValidationFault::UnexpectedField { field, .. } => field,
        }
    }
}

impl fmt::Display for ValidationFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationFault::MissingField { field, location } => {
                write!(f, "'{}' in request {} is missing", field, location)
            }
            ValidationFault::TypeMismatch {
                value,
                expected,
                received,
                ..
            } => {
                write!(
                    f,
                    "'{}' must be '{}', received as '{}'.",
                    value, expected, received
                )
            }
            ValidationFault::PatternMismatch { field, value } => {
                write!(f, "'{}' is not a valid {}.", value, field)
            }
            ValidationFault::UnexpectedField { field, location } => {
                write!(f, "Unexpected field '{}' in request {}.", field, location)
            }
        }
    }
}

impl std::error::Error for ValidationFault {}

// =============================================================================
// Request Faults
// =============================================================================

/// The request location could not be decoded into a mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestFault {
    /// The body is not valid JSON
    InvalidJson,

    /// The body is valid JSON but not an object
    BodyNotObject,

    /// The body exceeds the configured limit
    BodyTooLarge { limit: usize },

    /// The body stream failed before it was fully read
    UnreadableBody,

    /// The query string cannot be decoded
    MalformedQuery,

    /// A route parameter is not valid UTF-8 once percent-decoded
    InvalidPathParams,
}

impl fmt::Display for RequestFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestFault::InvalidJson => f.write_str("Request body is not valid JSON."),
            RequestFault::BodyNotObject => f.write_str("Request body must be a JSON object."),
            RequestFault::BodyTooLarge { .. } => f.write_str("Request body is too large."),
            RequestFault::UnreadableBody => f.write_str("Request body could not be read."),
            RequestFault::MalformedQuery => f.write_str("Request query is malformed."),
            RequestFault::InvalidPathParams => f.write_str("Request params are malformed."),
        }
    }
}

impl std::error::Error for RequestFault {}

impl RequestFault {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RequestFault::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

// =============================================================================
// Rejection
// =============================================================================

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Every fault message, when more than one was collected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// The faults that stop a request at the guard, in the order they were raised
///
/// Never empty: the first fault decides the status code and message.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    first: Fault,
    rest: Vec<Fault>,
}

impl Rejection {
    pub fn new(first: Fault) -> Self {
        Self {
            first,
            rest: Vec::new(),
        }
    }

    /// Build a rejection from collected faults, `None` when there are none
    pub fn from_faults(faults: Vec<Fault>) -> Option<Self> {
        let mut faults = faults.into_iter();
        let first = faults.next()?;
        Some(Self {
            first,
            rest: faults.collect(),
        })
    }

    /// The fault that decides the response
    pub fn first(&self) -> &Fault {
        &self.first
    }

    /// All faults in signal order
    pub fn faults(&self) -> impl Iterator<Item = &Fault> {
        std::iter::once(&self.first).chain(self.rest.iter())
    }

    pub fn len(&self) -> usize {
        1 + self.rest.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn status_code(&self) -> StatusCode {
        self.first.status_code()
    }

    pub fn message(&self) -> String {
        self.first.message()
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        let details = if self.rest.is_empty() {
            None
        } else {
            let messages: Vec<String> = self.faults().map(Fault::message).collect();
            Some(serde_json::json!({ "faults": messages }))
        };

        ErrorResponse {
            code: self.first.error_code().to_string(),
            message: self.first.message(),
            details,
        }
    }
}

impl From<Fault> for Rejection {
    fn from(fault: Fault) -> Self {
        Rejection::new(fault)
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.first)
    }
}

impl std::error::Error for Rejection {}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

impl IntoResponse for Fault {
    fn into_response(self) -> Response {
        Rejection::new(self).into_response()
    }
}
