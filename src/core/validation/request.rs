//! Request view handed to the validator

use crate::core::schema::Location;
use serde_json::{Map, Value};

/// The parts of a request a schema can address
///
/// A location that is not a JSON object is seen as an empty mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestView {
    path: String,
    body: Value,
    query: Value,
    params: Value,
}

impl RequestView {
    /// Empty view of a request to `path`
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set the decoded JSON body
    pub fn with_body(self, body: Value) -> Self {
        self.with(Location::Body, body)
    }

    /// Set the decoded query string
    pub fn with_query(self, query: Value) -> Self {
        self.with(Location::Query, query)
    }

    /// Set the route parameters
    pub fn with_params(self, params: Value) -> Self {
        self.with(Location::Params, params)
    }

    /// Set the value of one location
    pub fn with(mut self, location: Location, value: Value) -> Self {
        match location {
            Location::Body => self.body = value,
            Location::Query => self.query = value,
            Location::Params => self.params = value,
        }
        self
    }

    /// Request path, used in log lines
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Fields present at a location
    pub fn fields(&self, location: Location) -> Option<&Map<String, Value>> {
        match location {
            Location::Body => self.body.as_object(),
            Location::Query => self.query.as_object(),
            Location::Params => self.params.as_object(),
        }
    }
}
