//! Operator log sink for configuration faults
//!
//! The validator never writes to a global logger directly: it receives a
//! [`FaultLog`] at construction, which keeps it testable.

/// Receives one formatted line per configuration fault
pub trait FaultLog: Send + Sync + 'static {
    fn log(&self, message: &str);
}

/// Default sink: emits a `tracing` error event
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingFaultLog;

impl FaultLog for TracingFaultLog {
    fn log(&self, message: &str) {
        tracing::error!(target: "field_guard", "{}", message);
    }
}

impl<F> FaultLog for F
where
    F: Fn(&str) + Send + Sync + 'static,
{
    fn log(&self, message: &str) {
        self(message)
    }
}
