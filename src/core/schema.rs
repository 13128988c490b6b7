//! Schema declarations and their compiled form
//!
//! A [`SchemaDefinition`] is what callers write, either through the builder
//! methods or deserialized from JSON/YAML. It may be malformed: compilation
//! never fails outright, it records what is wrong so the validator can report
//! it on every request.

use super::error::{RuleFault, SchemaFault};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;
use std::str::FromStr;

/// Part of the request a schema applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Body,
    Query,
    Params,
}

impl Location {
    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Body => "body",
            Location::Query => "query",
            Location::Params => "params",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Location {
    type Err = SchemaFault;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "body" => Ok(Location::Body),
            "query" => Ok(Location::Query),
            "params" => Ok(Location::Params),
            other => Err(SchemaFault::InvalidLocation {
                location: other.to_string(),
            }),
        }
    }
}

/// Primitive type a field value must have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpectedType {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl ExpectedType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(ExpectedType::String),
            "number" => Some(ExpectedType::Number),
            "boolean" => Some(ExpectedType::Boolean),
            "object" => Some(ExpectedType::Object),
            "array" => Some(ExpectedType::Array),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExpectedType::String => "string",
            ExpectedType::Number => "number",
            ExpectedType::Boolean => "boolean",
            ExpectedType::Object => "object",
            ExpectedType::Array => "array",
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        type_of(value) == self.name()
    }
}

impl fmt::Display for ExpectedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runtime type name of a JSON value
pub fn type_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Text form of a value, as used in messages and for pattern matching
///
/// Strings render raw, everything else as compact JSON.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// =============================================================================
// Declarations
// =============================================================================

/// Declared constraint for one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDefinition {
    /// Name of the primitive type: string, number, boolean, object or array
    pub expected_type: String,

    /// Regex the stringified value must match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Absent values are accepted when true
    #[serde(default)]
    pub is_optional: bool,
}

impl RuleDefinition {
    pub fn new(expected_type: impl Into<String>) -> Self {
        Self {
            expected_type: expected_type.into(),
            pattern: None,
            is_optional: false,
        }
    }

    pub fn string() -> Self {
        Self::new(ExpectedType::String.name())
    }

    pub fn number() -> Self {
        Self::new(ExpectedType::Number.name())
    }

    pub fn boolean() -> Self {
        Self::new(ExpectedType::Boolean.name())
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    fn to_value(&self) -> Value {
        let mut rule = Map::new();
        rule.insert("expectedType".into(), json!(self.expected_type));
        if let Some(pattern) = &self.pattern {
            rule.insert("pattern".into(), json!(pattern));
        }
        if self.is_optional {
            rule.insert("isOptional".into(), json!(true));
        }
        Value::Object(rule)
    }
}

/// Declared schema for one request location
///
/// # Example
///
/// ```rust,ignore
/// let schema = SchemaDefinition::new(Location::Body)
///     .field("name", RuleDefinition::string().pattern(r"^[A-Za-z ]+$"))
///     .field("age", RuleDefinition::number().optional());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDefinition {
    /// `body`, `query` or `params`
    #[serde(default)]
    pub location: Option<String>,

    /// Field name to rule mapping
    #[serde(default)]
    pub data: Option<Value>,

    /// Every field is optional when true
    #[serde(default)]
    pub is_optional: bool,
}

impl SchemaDefinition {
    pub fn new(location: Location) -> Self {
        Self {
            location: Some(location.as_str().to_string()),
            data: Some(Value::Object(Map::new())),
            is_optional: false,
        }
    }

    /// Declare a rule for a field, replacing any previous one
    ///
    /// Ignored when `data` is set to something other than a mapping.
    pub fn field(mut self, name: impl Into<String>, rule: RuleDefinition) -> Self {
        let data = self.data.get_or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(map) = data {
            map.insert(name.into(), rule.to_value());
        }
        self
    }

    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    pub fn with_location_name(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Compile the declaration, collecting every schema-level fault
    pub fn compile(&self) -> Result<CompiledSchema, Vec<SchemaFault>> {
        let mut faults = Vec::new();

        let location = match self.location.as_deref() {
            None | Some("") => {
                faults.push(SchemaFault::MissingLocation);
                None
            }
            Some(name) => match name.parse::<Location>() {
                Ok(location) => Some(location),
                Err(fault) => {
                    faults.push(fault);
                    None
                }
            },
        };

        let data = match &self.data {
            None | Some(Value::Null) => {
                faults.push(SchemaFault::MissingData);
                None
            }
            Some(Value::Object(map)) => Some(map),
            Some(_) => {
                faults.push(SchemaFault::DataNotObject);
                None
            }
        };

        let (Some(location), Some(data)) = (location, data) else {
            return Err(faults);
        };

        let rules = data
            .iter()
            .map(|(field, rule)| (field.clone(), compile_rule(field, rule, location)))
            .collect();

        Ok(CompiledSchema {
            location,
            rules,
            is_optional: self.is_optional,
        })
    }
}

// =============================================================================
// Compiled form
// =============================================================================

/// A field rule ready to be evaluated
#[derive(Debug, Clone)]
pub struct Rule {
    pub expected_type: ExpectedType,
    pub pattern: Option<Regex>,
    pub is_optional: bool,
}

/// A schema whose location and data are usable
///
/// Individual rules may still be faulty; they are reported when evaluated.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    pub location: Location,
    pub rules: IndexMap<String, Result<Rule, RuleFault>>,
    pub is_optional: bool,
}

impl CompiledSchema {
    pub fn declares(&self, field: &str) -> bool {
        self.rules.contains_key(field)
    }
}

fn compile_rule(field: &str, rule: &Value, location: Location) -> Result<Rule, RuleFault> {
    let malformed = || RuleFault::Malformed {
        field: field.to_string(),
        location,
    };

    let Value::Object(rule) = rule else {
        return Err(malformed());
    };

    let type_name = rule
        .get("expectedType")
        .and_then(Value::as_str)
        .ok_or_else(malformed)?;

    let expected_type =
        ExpectedType::from_name(type_name).ok_or_else(|| RuleFault::UnknownType {
            field: field.to_string(),
            location,
            type_name: type_name.to_string(),
        })?;

    let pattern = match rule.get("pattern") {
        None | Some(Value::Null) => None,
        Some(Value::String(source)) => {
            Some(Regex::new(source).map_err(|_| RuleFault::InvalidPattern {
                field: field.to_string(),
                location,
            })?)
        }
        Some(_) => {
            return Err(RuleFault::InvalidPattern {
                field: field.to_string(),
                location,
            });
        }
    };

    let is_optional = match rule.get("isOptional") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(_) => return Err(malformed()),
    };

    Ok(Rule {
        expected_type,
        pattern,
        is_optional,
    })
}
