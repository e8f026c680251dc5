use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::SystemTime;

/// A finished unit of work as captured by the tracing SDK.
///
/// The exporter only ever reads spans; it never mutates a caller's span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    /// Trace identifier (128-bit), shared by every span in the trace
    pub trace_id: u128,
    /// Span identifier (64-bit), unique within the trace
    pub span_id: u64,
    /// Parent span identifier, `None` for a root span
    pub parent_span_id: Option<u64>,
    /// Span start time (Unix nanoseconds)
    pub start_time: u64,
    /// Span end time (Unix nanoseconds)
    pub end_time: u64,
    /// Operation name
    pub name: String,
    /// Span attributes
    pub attributes: HashMap<String, AttributeValue>,
    /// Point-in-time events, in recording order
    pub events: Vec<SpanEvent>,
    /// Span status
    pub status: SpanStatus,
    /// Span kind
    pub kind: SpanKind,
}

/// Attribute value types for span metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<String>),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// A timestamped event recorded on a span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanEvent {
    pub name: String,
    /// Unix nanoseconds
    pub timestamp: u64,
    pub attributes: HashMap<String, AttributeValue>,
}

impl SpanEvent {
    /// Creates an event with no attributes.
    pub fn new(name: impl Into<String>, timestamp: u64) -> Self {
        Self {
            name: name.into(),
            timestamp,
            attributes: HashMap::new(),
        }
    }

    /// Adds an attribute to the event.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Status code of a finished span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatusCode {
    /// Span status unknown
    #[default]
    Unset,
    /// Span completed successfully
    Ok,
    /// Span completed with error
    Error,
}

impl StatusCode {
    /// Symbolic name used in the status code tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unset => "UNSET",
            Self::Ok => "OK",
            Self::Error => "ERROR",
        }
    }
}

/// Span execution status
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpanStatus {
    pub code: StatusCode,
    pub description: Option<String>,
}

impl SpanStatus {
    pub fn ok() -> Self {
        Self {
            code: StatusCode::Ok,
            description: None,
        }
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self {
            code: StatusCode::Error,
            description: Some(description.into()),
        }
    }
}

/// Span kind according to OpenTelemetry specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpanKind {
    /// Internal operation span
    #[default]
    Internal,
    /// Server-side RPC span
    Server,
    /// Client-side RPC span
    Client,
    /// Producer span (messaging)
    Producer,
    /// Consumer span (messaging)
    Consumer,
}

fn unix_nanos_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

impl Span {
    /// Creates a new span starting now
    pub fn new(
        trace_id: u128,
        span_id: u64,
        parent_span_id: Option<u64>,
        name: impl Into<String>,
        kind: SpanKind,
    ) -> Self {
        let now = unix_nanos_now();

        Self {
            trace_id,
            span_id,
            parent_span_id,
            start_time: now,
            end_time: now,
            name: name.into(),
            attributes: HashMap::new(),
            events: Vec::new(),
            status: SpanStatus::default(),
            kind,
        }
    }

    /// Overrides both timestamps (Unix nanoseconds)
    pub fn with_times(mut self, start_time: u64, end_time: u64) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }

    /// Marks the span as completed with the given status
    pub fn finish(&mut self, status: SpanStatus) {
        self.end_time = unix_nanos_now();
        self.status = status;
    }

    /// Adds an attribute to the span
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Records an event at the current time
    pub fn add_event(&mut self, name: impl Into<String>) {
        self.events.push(SpanEvent::new(name, unix_nanos_now()));
    }

    /// Duration of the span in nanoseconds
    pub fn duration_nanos(&self) -> u64 {
        self.end_time.saturating_sub(self.start_time)
    }

    /// Returns `true` when the end time precedes the start time.
    pub fn is_inverted(&self) -> bool {
        self.end_time < self.start_time
    }
}
