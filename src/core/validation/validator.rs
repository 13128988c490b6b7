//! The request validator
//!
//! Checks run in a fixed order:
//!
//! 1. schema sanity (location and data usable)
//! 2. declared fields in declaration order: rule, presence, type, pattern
//! 3. request fields in request order: anything undeclared is unexpected
//!
//! How many faults end up in the [`Rejection`] depends on the [`ReportMode`].

use super::log::{FaultLog, TracingFaultLog};
use super::request::RequestView;
use crate::core::error::{Fault, Rejection, SchemaFault, ValidationFault};
use crate::core::schema::{CompiledSchema, Location, Rule, SchemaDefinition, stringify, type_of};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ops::ControlFlow;
use std::sync::Arc;

/// How many faults a single check reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    /// Stop at the first fault
    #[default]
    FirstFault,

    /// Keep checking and report every fault in the order raised
    AllFaults,
}

/// Reusable checker built from one schema
///
/// Cheap to clone; holds no per-request state.
#[derive(Clone)]
pub struct Validator {
    schema: Arc<Result<CompiledSchema, Vec<SchemaFault>>>,
    report: ReportMode,
    log: Arc<dyn FaultLog>,
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("schema", &self.schema)
            .field("report", &self.report)
            .finish_non_exhaustive()
    }
}

impl Validator {
    /// Build a validator; never fails, schema problems surface per request
    pub fn new(schema: &SchemaDefinition) -> Self {
        Self {
            schema: Arc::new(schema.compile()),
            report: ReportMode::default(),
            log: Arc::new(TracingFaultLog),
        }
    }

    /// Send configuration faults to `log` instead of `tracing`
    pub fn with_log(mut self, log: impl FaultLog) -> Self {
        self.log = Arc::new(log);
        self
    }

    /// Choose between stopping at the first fault and collecting all of them
    pub fn with_report(mut self, report: ReportMode) -> Self {
        self.report = report;
        self
    }

    /// Report mode used by [`Validator::check`]
    pub fn report(&self) -> ReportMode {
        self.report
    }

    /// Location the schema addresses, `None` when the schema is unusable
    pub fn location(&self) -> Option<Location> {
        match self.schema.as_ref() {
            Ok(schema) => Some(schema.location),
            Err(_) => None,
        }
    }

    /// Check one request
    ///
    /// `Ok(())` lets the request through; a rejection carries at least one
    /// fault.
    pub fn check(&self, request: &RequestView) -> Result<(), Rejection> {
        let mut sink = FaultSink {
            report: self.report,
            faults: Vec::new(),
        };

        let stopped = match self.schema.as_ref() {
            Ok(schema) => self.check_fields(schema, request, &mut sink),
            Err(faults) => self.report_schema_faults(faults, request, &mut sink),
        }
        .is_break();
        tracing::trace!(
            target: "field_guard",
            path = request.path(),
            stopped,
            faults = sink.faults.len(),
            "request checked"
        );

        match Rejection::from_faults(sink.faults) {
            Some(rejection) => Err(rejection),
            None => Ok(()),
        }
    }

    fn report_schema_faults(
        &self,
        faults: &[SchemaFault],
        request: &RequestView,
        sink: &mut FaultSink,
    ) -> ControlFlow<()> {
        for fault in faults {
            self.log.log(&format!("{} - '{}'", fault, request.path()));
        }
        for fault in faults {
            sink.push(Fault::Internal(fault.clone()))?;
        }
        ControlFlow::Continue(())
    }

    fn check_fields(
        &self,
        schema: &CompiledSchema,
        request: &RequestView,
        sink: &mut FaultSink,
    ) -> ControlFlow<()> {
        let location = schema.location;
        let fields = request.fields(location);

        // Every broken rule is logged, even one an earlier field fault hides.
        for fault in schema.rules.values().filter_map(|rule| rule.as_ref().err()) {
            self.log.log(&format!("{} - '{}'", fault, request.path()));
        }

        for (field, rule) in &schema.rules {
            let rule = match rule {
                Ok(rule) => rule,
                Err(fault) => {
                    sink.push(Fault::Rule(fault.clone()))?;
                    // A broken rule aborts the pass whatever the report mode.
                    return ControlFlow::Break(());
                }
            };

            let value = fields
                .and_then(|fields| fields.get(field))
                .filter(|value| !value.is_null());

            match value {
                None if schema.is_optional || rule.is_optional => {}
                None => sink.push(
                    ValidationFault::MissingField {
                        field: field.clone(),
                        location,
                    }
                    .into(),
                )?,
                Some(value) => check_value(field, rule, value, sink)?,
            }
        }

        let Some(fields) = fields else {
            return ControlFlow::Continue(());
        };
        for field in fields.keys() {
            if !schema.declares(field) {
                sink.push(
                    ValidationFault::UnexpectedField {
                        field: field.clone(),
                        location,
                    }
                    .into(),
                )?;
            }
        }

        ControlFlow::Continue(())
    }
}

/// Type and pattern checks for a present value; both may fire
fn check_value(field: &str, rule: &Rule, value: &Value, sink: &mut FaultSink) -> ControlFlow<()> {
    let text = stringify(value);

    if !rule.expected_type.matches(value) {
        sink.push(
            ValidationFault::TypeMismatch {
                field: field.to_string(),
                value: text.clone(),
                expected: rule.expected_type.name().to_string(),
                received: type_of(value).to_string(),
            }
            .into(),
        )?;
    }

    if let Some(pattern) = &rule.pattern {
        if !pattern.is_match(&text) {
            sink.push(
                ValidationFault::PatternMismatch {
                    field: field.to_string(),
                    value: text,
                }
                .into(),
            )?;
        }
    }

    ControlFlow::Continue(())
}

struct FaultSink {
    report: ReportMode,
    faults: Vec<Fault>,
}

impl FaultSink {
    fn push(&mut self, fault: Fault) -> ControlFlow<()> {
        self.faults.push(fault);
        match self.report {
            ReportMode::FirstFault => ControlFlow::Break(()),
            ReportMode::AllFaults => ControlFlow::Continue(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::RuleDefinition;
    use serde_json::json;
    use std::sync::Mutex;

    fn recorded() -> (Arc<Mutex<Vec<String>>>, impl FaultLog) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let lines = Arc::clone(&lines);
            move |message: &str| lines.lock().unwrap().push(message.to_string())
        };
        (lines, sink)
    }

    fn user_schema() -> SchemaDefinition {
        SchemaDefinition::new(Location::Body)
            .field("name", RuleDefinition::string().pattern("^[A-Za-z ]+$"))
            .field("age", RuleDefinition::number())
    }

    #[test]
    fn test_valid_request_passes() {
        let validator = Validator::new(&user_schema());
        let request = RequestView::new("/users").with_body(json!({"name": "John Doe", "age": 42}));
        assert!(validator.check(&request).is_ok());
    }

    #[test]
    fn test_first_fault_mode_stops_at_first_fault() {
        let validator = Validator::new(&user_schema());
        let request = RequestView::new("/users").with_body(json!({"age": "old", "extra": 1}));

        let rejection = validator.check(&request).unwrap_err();
        assert_eq!(rejection.len(), 1);
        assert_eq!(rejection.message(), "'name' in request body is missing");
    }

    #[test]
    fn test_all_faults_mode_reports_in_signal_order() {
        let validator = Validator::new(&user_schema()).with_report(ReportMode::AllFaults);
        let request = RequestView::new("/users").with_body(json!({
            "name": 7,
            "extra": true
        }));

        let rejection = validator.check(&request).unwrap_err();
        let messages: Vec<String> = rejection.faults().map(Fault::message).collect();
        assert_eq!(
            messages,
            vec![
                "'7' must be 'string', received as 'number'.",
                "'7' is not a valid name.",
                "'age' in request body is missing",
                "Unexpected field 'extra' in request body.",
            ]
        );
    }

    #[test]
    fn test_type_check_runs_on_falsy_values() {
        let validator = Validator::new(&user_schema());
        let request = RequestView::new("/users").with_body(json!({"name": "Ann", "age": false}));

        let rejection = validator.check(&request).unwrap_err();
        assert_eq!(
            rejection.message(),
            "'false' must be 'number', received as 'boolean'."
        );
    }

    #[test]
    fn test_null_counts_as_absent() {
        let validator = Validator::new(&user_schema());
        let request = RequestView::new("/users").with_body(json!({"name": null, "age": 1}));
        assert_eq!(
            validator.check(&request).unwrap_err().message(),
            "'name' in request body is missing"
        );
    }

    #[test]
    fn test_schema_faults_logged_even_when_only_first_reported() {
        let (lines, log) = recorded();
        let validator = Validator::new(&SchemaDefinition::default()).with_log(log);

        let rejection = validator.check(&RequestView::new("/broken")).unwrap_err();
        assert_eq!(rejection.len(), 1);
        assert_eq!(rejection.message(), "Internal Server Error");
        assert_eq!(
            *lines.lock().unwrap(),
            vec![
                "Location is missing - '/broken'",
                "Data is missing - '/broken'"
            ]
        );
    }

    #[test]
    fn test_rule_fault_aborts_in_all_faults_mode() {
        let (lines, log) = recorded();
        let schema = SchemaDefinition::new(Location::Body)
            .field("code", RuleDefinition::string().pattern("[unclosed"))
            .field("other", RuleDefinition::string());
        let validator = Validator::new(&schema)
            .with_log(log)
            .with_report(ReportMode::AllFaults);

        let rejection = validator
            .check(&RequestView::new("/codes").with_body(json!({"code": "x"})))
            .unwrap_err();
        assert_eq!(rejection.len(), 1);
        assert_eq!(
            rejection.message(),
            "Invalid regex provided for 'code' in request body."
        );
        assert_eq!(lines.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_broken_rule_logged_behind_earlier_field_fault() {
        let (lines, log) = recorded();
        let schema = SchemaDefinition::new(Location::Body)
            .field("a", RuleDefinition::string())
            .field("b", RuleDefinition::string().pattern("(unclosed"));
        let validator = Validator::new(&schema).with_log(log);

        let rejection = validator
            .check(&RequestView::new("/items").with_body(json!({})))
            .unwrap_err();

        assert_eq!(rejection.message(), "'a' in request body is missing");
        assert_eq!(
            *lines.lock().unwrap(),
            vec!["Invalid regex provided for 'b' in request body. - '/items'"]
        );
    }

    #[test]
    fn test_validation_faults_are_not_logged() {
        let (lines, log) = recorded();
        let validator = Validator::new(&user_schema()).with_log(log);
        let _ = validator.check(&RequestView::new("/users").with_body(json!({})));
        assert!(lines.lock().unwrap().is_empty());
    }
}
