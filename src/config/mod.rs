//! Configuration loading and management
//!
//! Schemas can be declared in YAML and looked up by name when building
//! routes:
//!
//! ```yaml
//! options:
//!   report: all_faults
//!   body_limit: 65536
//! schemas:
//!   create_user:
//!     location: body
//!     data:
//!       name: { expectedType: string, pattern: "^[A-Za-z ]+$" }
//!       age: { expectedType: number, isOptional: true }
//! ```

use crate::core::schema::SchemaDefinition;
use crate::core::validation::{ReportMode, Validator};
use crate::server::{DEFAULT_BODY_LIMIT, ValidationLayer};
use anyhow::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Options shared by every validator built from a config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardOptions {
    /// First fault only, or every fault
    #[serde(default)]
    pub report: ReportMode,

    /// Largest body read for body schemas, in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
}

impl Default for GuardOptions {
    fn default() -> Self {
        Self {
            report: ReportMode::default(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

fn default_body_limit() -> usize {
    DEFAULT_BODY_LIMIT
}

/// Named schemas plus the options used to build their validators
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuardConfig {
    #[serde(default)]
    pub options: GuardOptions,

    /// Schema name -> schema, in declaration order
    #[serde(default)]
    pub schemas: IndexMap<String, SchemaDefinition>,
}

impl GuardConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Names of the declared schemas
    pub fn schema_names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Build the validator for a named schema
    ///
    /// Configuration faults go to `tracing`; use [`Validator::with_log`] on
    /// the result to redirect them.
    pub fn validator(&self, name: &str) -> Option<Validator> {
        let schema = self.schemas.get(name)?;
        Some(Validator::new(schema).with_report(self.options.report))
    }

    /// Build the axum layer for a named schema
    pub fn layer(&self, name: &str) -> Option<ValidationLayer> {
        let validator = self.validator(name)?;
        Some(ValidationLayer::new(validator).with_body_limit(self.options.body_limit))
    }

    /// Add or replace a schema
    pub fn with_schema(mut self, name: impl Into<String>, schema: SchemaDefinition) -> Self {
        self.schemas.insert(name.into(), schema);
        self
    }
}
