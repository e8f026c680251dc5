use crate::config::ExporterConfig;
use crate::error::{ConfigError, ExportError};
use crate::invariants::debug_assert_batch_complete;
use crate::logger::{Logger, NoopLogger};
use crate::span::Span;
use crate::transform::transform_with;
use crate::transport::{HttpTransport, Transport};
use crate::wire::WireSpan;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Outcome of one export call, delivered to the result callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportResult {
    Success,
    Failure(ExportError),
}

impl ExportResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Best-effort Zipkin exporter.
///
/// Every `export` call transforms its spans and hands exactly one batch to
/// the transport on a spawned task. The caller never waits on the network;
/// the outcome arrives through the callback. Failures are logged and
/// reported, never retried.
///
/// Cloning is cheap and shares configuration, transport and logger.
pub struct ZipkinExporter<T = HttpTransport> {
    config: Arc<ExporterConfig>,
    transport: Arc<T>,
    logger: Arc<dyn Logger>,
}

impl<T> Clone for ZipkinExporter<T> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            transport: Arc::clone(&self.transport),
            logger: Arc::clone(&self.logger),
        }
    }
}

impl ZipkinExporter<HttpTransport> {
    /// Creates an exporter posting to `config.url` over HTTP.
    pub fn new(config: ExporterConfig) -> Result<Self, ConfigError> {
        let transport = HttpTransport::new(config.url.clone());
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> ZipkinExporter<T> {
    /// Creates an exporter delivering through a custom transport.
    pub fn with_transport(config: ExporterConfig, transport: T) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            transport: Arc::new(transport),
            logger: Arc::new(NoopLogger),
        })
    }

    /// Replaces the diagnostic sink (no-op by default).
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &ExporterConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Transforms `spans` and submits them as one batch.
    ///
    /// Returns before the request resolves. `on_result` is invoked exactly
    /// once: immediately with `Success` for an empty batch, otherwise from
    /// the delivery task. Must be called from within a tokio runtime; outside
    /// one the batch is dropped and `Failure(NoRuntime)` is reported.
    pub fn export<F>(&self, spans: &[Span], on_result: F)
    where
        F: FnOnce(ExportResult) + Send + 'static,
    {
        if spans.is_empty() {
            self.logger.debug("export called with an empty batch, nothing to send");
            on_result(ExportResult::Success);
            return;
        }

        let batch = self.transform_batch(spans);

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                self.logger.error(&format!(
                    "dropping {} spans: {}",
                    batch.len(),
                    ExportError::NoRuntime
                ));
                on_result(ExportResult::Failure(ExportError::NoRuntime));
                return;
            }
        };

        let span_count = batch.len();
        let transport = Arc::clone(&self.transport);
        let logger = Arc::clone(&self.logger);

        // Delivery runs in its own task so a panicking transport still
        // resolves the callback.
        let delivery = handle.spawn(async move { transport.send(batch).await });

        handle.spawn(async move {
            let result = match delivery.await {
                Ok(Ok(())) => {
                    logger.debug(&format!("exported {span_count} spans"));
                    ExportResult::Success
                }
                Ok(Err(e)) => {
                    if e.is_rejected() {
                        logger.error(&format!("collector rejected {span_count} spans: {e}"));
                    } else {
                        logger.error(&format!("failed to export {span_count} spans: {e}"));
                    }
                    ExportResult::Failure(e)
                }
                Err(e) => {
                    logger.error(&format!("export task for {span_count} spans panicked: {e}"));
                    ExportResult::Failure(ExportError::Transport(format!("task join error: {e}")))
                }
            };
            on_result(result);
        });
    }

    /// Exports `spans` and waits for the outcome.
    pub async fn export_and_wait(&self, spans: &[Span]) -> ExportResult {
        let (tx, rx) = oneshot::channel();
        self.export(spans, move |result| {
            let _ = tx.send(result);
        });
        rx.await.unwrap_or_else(|_| {
            ExportResult::Failure(ExportError::Transport(
                "export result channel closed".to_string(),
            ))
        })
    }

    /// Final flush. With `force_flush` enabled this issues one export of an
    /// empty batch; pending spans held by a batching processor are that
    /// processor's to drain. Safe to call repeatedly, and the exporter keeps
    /// accepting exports afterwards.
    pub async fn shutdown(&self) -> ExportResult {
        if !self.config.force_flush {
            return ExportResult::Success;
        }
        self.export_and_wait(&[]).await
    }

    fn transform_batch(&self, spans: &[Span]) -> Vec<WireSpan> {
        let batch: Vec<WireSpan> = spans
            .iter()
            .map(|span| {
                if span.is_inverted() {
                    self.logger.debug(&format!(
                        "span {:016x} ends before it starts, duration clamped to 0",
                        span.span_id
                    ));
                }
                transform_with(span, &self.config)
            })
            .collect();

        debug_assert_batch_complete!(spans.len(), batch.len());
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::RecordingLogger;
    use crate::span::{SpanKind, SpanStatus};
    use crate::transform::transform;
    use crate::transport::{GatedTransport, PanickingTransport, RecordingTransport};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn test_span(span_id: u64, name: &str) -> Span {
        let mut span = Span::new(7, span_id, None, name, SpanKind::Server)
            .with_times(1_000_000_000, 1_005_000_000);
        span.status = SpanStatus::ok();
        span
    }

    fn exporter_with(
        transport: RecordingTransport,
    ) -> (ZipkinExporter<RecordingTransport>, Arc<RecordingLogger>) {
        let logger = Arc::new(RecordingLogger::default());
        let exporter = ZipkinExporter::with_transport(ExporterConfig::new("my-service"), transport)
            .unwrap()
            .with_logger(logger.clone());
        (exporter, logger)
    }

    #[tokio::test]
    async fn test_empty_batch_short_circuits() {
        let (exporter, logger) = exporter_with(RecordingTransport::new());
        let calls = Arc::new(Mutex::new(Vec::new()));

        let calls_clone = Arc::clone(&calls);
        exporter.export(&[], move |r| calls_clone.lock().unwrap().push(r));

        // Invoked synchronously, before any await.
        assert_eq!(*calls.lock().unwrap(), vec![ExportResult::Success]);
        assert!(exporter.transport.batches().is_empty());
        assert_eq!(logger.debug_lines().len(), 1);
    }

    #[tokio::test]
    async fn test_single_submission_preserves_order() {
        let (exporter, _) = exporter_with(RecordingTransport::new());
        let s1 = test_span(1, "first");
        let s2 = test_span(2, "second");

        let result = exporter.export_and_wait(&[s1.clone(), s2.clone()]).await;
        assert_eq!(result, ExportResult::Success);

        let batches = exporter.transport.batches();
        assert_eq!(batches.len(), 1);
        let config = exporter.config();
        assert_eq!(
            batches[0],
            vec![
                transform(&s1, "my-service", &config.status_code_tag_name, &config.status_description_tag_name),
                transform(&s2, "my-service", &config.status_code_tag_name, &config.status_description_tag_name),
            ]
        );
    }

    #[tokio::test]
    async fn test_caller_spans_are_untouched() {
        let (exporter, _) = exporter_with(RecordingTransport::new());
        let spans = vec![test_span(1, "a"), test_span(2, "b")];
        let before = spans.clone();

        exporter.export_and_wait(&spans).await;
        assert_eq!(spans, before);
    }

    #[tokio::test]
    async fn test_transport_failure_reported_once() {
        let (exporter, logger) =
            exporter_with(RecordingTransport::failing(ExportError::Transport("connection refused".into())));
        let invocations = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = oneshot::channel();

        let counter = Arc::clone(&invocations);
        exporter.export(&[test_span(1, "a")], move |result| {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(result);
        });

        let result = rx.await.unwrap();
        assert_eq!(
            result,
            ExportResult::Failure(ExportError::Transport("connection refused".into()))
        );
        tokio::task::yield_now().await;
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
        assert_eq!(logger.error_lines().len(), 1);
        assert!(logger.error_lines()[0].starts_with("failed to export 1 spans"));
    }

    #[tokio::test]
    async fn test_rejected_batch_logged_as_rejection() {
        let (exporter, logger) = exporter_with(RecordingTransport::failing(ExportError::Status(400)));

        let result = exporter.export_and_wait(&[test_span(1, "a"), test_span(2, "b")]).await;
        assert_eq!(result, ExportResult::Failure(ExportError::Status(400)));

        let errors = logger.error_lines();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("collector rejected 2 spans"), "{errors:?}");
    }

    #[tokio::test]
    async fn test_export_returns_before_delivery() {
        let exporter =
            ZipkinExporter::with_transport(ExporterConfig::new("svc"), GatedTransport::new()).unwrap();
        let results = Arc::new(Mutex::new(Vec::new()));
        let (tx, rx) = oneshot::channel();

        let slot = Arc::clone(&results);
        exporter.export(&[test_span(1, "gated")], move |result| {
            slot.lock().unwrap().push(result);
            let _ = tx.send(());
        });
        assert!(results.lock().unwrap().is_empty());

        // The delivery task reaches the transport and parks on the gate.
        while exporter.transport().entered() == 0 {
            tokio::task::yield_now().await;
        }
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(results.lock().unwrap().is_empty());

        exporter.transport().release(1);
        rx.await.unwrap();
        tokio::task::yield_now().await;

        assert_eq!(*results.lock().unwrap(), vec![ExportResult::Success]);
        assert_eq!(exporter.transport().batches().len(), 1);
    }

    #[tokio::test]
    async fn test_panicking_transport_reports_failure_once() {
        let logger = Arc::new(RecordingLogger::default());
        let exporter = ZipkinExporter::with_transport(ExporterConfig::new("svc"), PanickingTransport)
            .unwrap()
            .with_logger(logger.clone());
        let invocations = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = oneshot::channel();

        let counter = Arc::clone(&invocations);
        exporter.export(&[test_span(1, "a")], move |result| {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(result);
        });

        let result = rx.await.unwrap();
        assert!(
            matches!(&result, ExportResult::Failure(ExportError::Transport(msg)) if msg.contains("panicked")),
            "{result:?}"
        );
        tokio::task::yield_now().await;
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
        assert_eq!(logger.error_lines().len(), 1);
        assert!(logger.error_lines()[0].contains("panicked"));
    }

    #[test]
    fn test_export_outside_runtime_fails_without_panicking() {
        let (exporter, logger) = exporter_with(RecordingTransport::new());
        let result = Arc::new(Mutex::new(None));

        let slot = Arc::clone(&result);
        exporter.export(&[test_span(1, "a")], move |r| *slot.lock().unwrap() = Some(r));

        assert_eq!(
            *result.lock().unwrap(),
            Some(ExportResult::Failure(ExportError::NoRuntime))
        );
        assert_eq!(logger.error_lines().len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_with_force_flush_sends_nothing() {
        let (exporter, logger) = exporter_with(RecordingTransport::new());

        assert!(exporter.shutdown().await.is_success());
        assert!(exporter.shutdown().await.is_success());
        assert!(exporter.transport.batches().is_empty());
        assert_eq!(logger.debug_lines().len(), 2);

        // No closed state: exports keep working after shutdown.
        assert!(exporter.export_and_wait(&[test_span(1, "late")]).await.is_success());
        assert_eq!(exporter.transport.span_count(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_without_force_flush_is_silent() {
        let logger = Arc::new(RecordingLogger::default());
        let exporter = ZipkinExporter::with_transport(
            ExporterConfig::new("svc").with_force_flush(false),
            RecordingTransport::new(),
        )
        .unwrap()
        .with_logger(logger.clone());

        assert!(exporter.shutdown().await.is_success());
        assert!(logger.debug_lines().is_empty());
    }

    #[tokio::test]
    async fn test_inverted_span_is_logged_and_clamped() {
        let (exporter, logger) = exporter_with(RecordingTransport::new());
        let span = test_span(9, "backwards").with_times(5_000, 1_000);

        exporter.export_and_wait(&[span]).await;

        assert_eq!(exporter.transport.batches()[0][0].duration, 0);
        assert!(logger.debug_lines().iter().any(|l| l.contains("clamped")));
    }

    #[test]
    fn test_empty_service_name_rejected() {
        let err = ZipkinExporter::with_transport(ExporterConfig::new(""), RecordingTransport::new())
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::EmptyServiceName));
    }
}
