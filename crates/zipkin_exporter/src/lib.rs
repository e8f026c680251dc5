//! Zipkin Span Exporter
//!
//! Converts finished spans into the Zipkin v2 JSON format and delivers them
//! to a collector over HTTP. Delivery is best-effort and never blocks the
//! instrumented application: each export runs on a spawned task and reports
//! its outcome through a callback.
//!
//! # Pipeline
//!
//! ```text
//! Span ──► BatchSpanProcessor (optional) ──► ZipkinExporter ──► transform ──► Transport ──► collector
//!                                                  │
//!                                                  └──► on_result(ExportResult)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use zipkin_exporter::{ExporterConfig, Span, SpanKind, TracingLogger, ZipkinExporter};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let exporter = ZipkinExporter::new(ExporterConfig::new("checkout"))?
//!         .with_logger(Arc::new(TracingLogger));
//!
//!     let span = Span::new(1, 1, None, "charge-card", SpanKind::Server);
//!     exporter.export(&[span], |result| println!("export finished: {result:?}"));
//!
//!     exporter.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod exporter;
mod invariants;
pub mod logger;
pub mod processor;
pub mod span;
pub mod transform;
pub mod transport;
pub mod wire;

// Re-export main types
pub use config::{BatchConfig, ExporterConfig, DEFAULT_COLLECTOR_URL};
pub use error::{ConfigError, ExportError};
pub use exporter::{ExportResult, ZipkinExporter};
pub use logger::{Logger, NoopLogger, TracingLogger};
pub use processor::{BatchSpanProcessor, ProcessorMetrics};
pub use span::{AttributeValue, Span, SpanEvent, SpanKind, SpanStatus, StatusCode};
pub use transform::{transform, transform_with};
pub use transport::{HttpTransport, Transport};
pub use wire::{Annotation, Endpoint, WireKind, WireSpan};
