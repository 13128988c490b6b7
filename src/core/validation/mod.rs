//! Request validation
//!
//! This module holds the per-request decision logic: given a compiled schema
//! and a [`RequestView`], decide whether the request may proceed.

pub mod log;
pub mod request;
pub mod validator;

pub use log::{FaultLog, TracingFaultLog};
pub use request::RequestView;
pub use validator::{ReportMode, Validator};
