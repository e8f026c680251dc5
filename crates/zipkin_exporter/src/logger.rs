//! Diagnostic sink injected into the exporter.
//!
//! The exporter only needs two levels. Implementations must not block and
//! must not panic.

/// Receives diagnostic messages from the export pipeline.
pub trait Logger: Send + Sync {
    fn debug(&self, message: &str);
    fn error(&self, message: &str);
}

/// Discards everything. Used when no logger is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn debug(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

/// Forwards messages to the `tracing` macros under the `zipkin_exporter` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(target: "zipkin_exporter", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "zipkin_exporter", "{message}");
    }
}

/// Records messages in memory for assertions.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingLogger {
    pub(crate) debug: std::sync::Mutex<Vec<String>>,
    pub(crate) error: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl RecordingLogger {
    pub(crate) fn debug_lines(&self) -> Vec<String> {
        self.debug.lock().unwrap().clone()
    }

    pub(crate) fn error_lines(&self) -> Vec<String> {
        self.error.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Logger for RecordingLogger {
    fn debug(&self, message: &str) {
        self.debug.lock().unwrap().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.error.lock().unwrap().push(message.to_string());
    }
}
