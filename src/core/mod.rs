//! Core module containing the schema model, faults and the validator

pub mod error;
pub mod schema;
pub mod validation;

pub use error::{Fault, Rejection, RequestFault, RuleFault, SchemaFault, ValidationFault};
pub use schema::{ExpectedType, Location, RuleDefinition, SchemaDefinition};
pub use validation::{FaultLog, ReportMode, RequestView, TracingFaultLog, Validator};
