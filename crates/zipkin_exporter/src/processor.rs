//! Batch Span Processor
//!
//! Buffers ended spans and hands them to a [`ZipkinExporter`] in batches.
//! The exporter itself never batches across calls; this is the component
//! that does, and the one that owns pending spans at shutdown.
//!
//! # Flush triggers
//!
//! - pending spans reach [`BatchConfig::max_export_batch_size`]
//! - every [`BatchConfig::scheduled_delay`] tick, if anything is pending
//! - [`BatchSpanProcessor::force_flush`]
//! - [`BatchSpanProcessor::shutdown`], which drains everything queued and
//!   then runs the exporter's own shutdown
//!
//! # Concurrency
//!
//! `on_end` only does a `try_send` on a bounded channel, so instrumented code
//! never waits on the exporter. When the queue is full the span is dropped
//! and counted in [`ProcessorMetrics::spans_dropped`]. A single worker task
//! owns the pending buffer and exports sequentially, so spans leave in the
//! order they arrived.

use crate::config::BatchConfig;
use crate::error::ExportError;
use crate::exporter::{ExportResult, ZipkinExporter};
use crate::span::Span;
use crate::transport::Transport;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Thread-safe processor counters (atomics, shared with the worker task).
#[derive(Debug, Default)]
pub struct ProcessorMetrics {
    /// Spans handed to the exporter that it reported as delivered
    pub spans_exported: AtomicU64,
    /// Batches delivered
    pub batches_exported: AtomicU64,
    /// Batches that failed to deliver
    pub export_errors: AtomicU64,
    /// Spans discarded because the queue was full or the processor shut down
    pub spans_dropped: AtomicU64,
}

impl ProcessorMetrics {
    pub fn spans_exported(&self) -> u64 {
        self.spans_exported.load(Ordering::Relaxed)
    }

    pub fn batches_exported(&self) -> u64 {
        self.batches_exported.load(Ordering::Relaxed)
    }

    pub fn export_errors(&self) -> u64 {
        self.export_errors.load(Ordering::Relaxed)
    }

    pub fn spans_dropped(&self) -> u64 {
        self.spans_dropped.load(Ordering::Relaxed)
    }

    fn record_success(&self, span_count: u64) {
        self.spans_exported.fetch_add(span_count, Ordering::Relaxed);
        self.batches_exported.fetch_add(1, Ordering::Relaxed);
    }

    fn record_error(&self) {
        self.export_errors.fetch_add(1, Ordering::Relaxed);
    }

    fn record_dropped(&self) {
        self.spans_dropped.fetch_add(1, Ordering::Relaxed);
    }
}

enum Control {
    Flush(oneshot::Sender<ExportResult>),
    Shutdown(oneshot::Sender<ExportResult>),
}

/// Buffers spans and exports them in batches on a background task.
pub struct BatchSpanProcessor {
    spans_tx: mpsc::Sender<Span>,
    control_tx: mpsc::UnboundedSender<Control>,
    worker: Mutex<Option<JoinHandle<()>>>,
    is_shutdown: AtomicBool,
    metrics: Arc<ProcessorMetrics>,
}

impl BatchSpanProcessor {
    /// Spawns the worker task. Must be called from within a tokio runtime.
    pub fn new<T: Transport>(exporter: ZipkinExporter<T>, config: BatchConfig) -> Self {
        let (spans_tx, spans_rx) = mpsc::channel(config.max_queue_size.max(1));
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let metrics = Arc::new(ProcessorMetrics::default());

        let worker = tokio::spawn(run_worker(
            exporter,
            config,
            spans_rx,
            control_rx,
            Arc::clone(&metrics),
        ));

        Self {
            spans_tx,
            control_tx,
            worker: Mutex::new(Some(worker)),
            is_shutdown: AtomicBool::new(false),
            metrics,
        }
    }

    /// Queues an ended span. Never waits; drops the span if the queue is full.
    pub fn on_end(&self, span: Span) {
        if self.is_shutdown.load(Ordering::Acquire) || self.spans_tx.try_send(span).is_err() {
            self.metrics.record_dropped();
        }
    }

    /// Exports every span queued so far and waits for the result.
    pub async fn force_flush(&self) -> ExportResult {
        let (tx, rx) = oneshot::channel();
        if self.control_tx.send(Control::Flush(tx)).is_err() {
            return worker_gone();
        }
        rx.await.unwrap_or_else(|_| worker_gone())
    }

    /// Drains queued spans through the exporter, shuts the exporter down and
    /// stops the worker. Later calls return `Success` without doing anything.
    pub async fn shutdown(&self) -> ExportResult {
        if self.is_shutdown.swap(true, Ordering::AcqRel) {
            return ExportResult::Success;
        }

        let (tx, rx) = oneshot::channel();
        let result = if self.control_tx.send(Control::Shutdown(tx)).is_ok() {
            rx.await.unwrap_or_else(|_| worker_gone())
        } else {
            worker_gone()
        };

        let worker = self.worker.lock().ok().and_then(|mut guard| guard.take());
        if let Some(worker) = worker {
            let _ = worker.await;
        }

        result
    }

    pub fn metrics(&self) -> &Arc<ProcessorMetrics> {
        &self.metrics
    }
}

fn worker_gone() -> ExportResult {
    ExportResult::Failure(ExportError::Transport(
        "batch processor worker has stopped".to_string(),
    ))
}

async fn run_worker<T: Transport>(
    exporter: ZipkinExporter<T>,
    config: BatchConfig,
    mut spans_rx: mpsc::Receiver<Span>,
    mut control_rx: mpsc::UnboundedReceiver<Control>,
    metrics: Arc<ProcessorMetrics>,
) {
    let batch_size = config.max_export_batch_size.max(1);
    let mut pending: Vec<Span> = Vec::with_capacity(batch_size);

    let mut interval = tokio::time::interval(config.scheduled_delay);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    interval.tick().await;

    loop {
        tokio::select! {
            Some(span) = spans_rx.recv() => {
                pending.push(span);
                if pending.len() >= batch_size {
                    export_pending(&exporter, &mut pending, batch_size, &metrics).await;
                }
            }

            _ = interval.tick() => {
                if !pending.is_empty() {
                    export_pending(&exporter, &mut pending, batch_size, &metrics).await;
                }
            }

            control = control_rx.recv() => {
                while let Ok(span) = spans_rx.try_recv() {
                    pending.push(span);
                }
                let result = export_pending(&exporter, &mut pending, batch_size, &metrics).await;

                match control {
                    Some(Control::Flush(reply)) => {
                        let _ = reply.send(result);
                    }
                    Some(Control::Shutdown(reply)) => {
                        spans_rx.close();
                        // Sends racing the drain above are still buffered after close().
                        while let Ok(span) = spans_rx.try_recv() {
                            pending.push(span);
                        }
                        let late = export_pending(&exporter, &mut pending, batch_size, &metrics).await;
                        let shutdown = exporter.shutdown().await;

                        let outcome = [result, late]
                            .into_iter()
                            .find(|r| !r.is_success())
                            .unwrap_or(shutdown);
                        let _ = reply.send(outcome);
                        break;
                    }
                    // Processor dropped without shutdown; what was queued has been exported.
                    None => break,
                }
            }
        }
    }
}

/// Exports all pending spans in chunks of at most `batch_size`, in order.
/// Returns the first failure, or `Success` if every chunk was delivered.
async fn export_pending<T: Transport>(
    exporter: &ZipkinExporter<T>,
    pending: &mut Vec<Span>,
    batch_size: usize,
    metrics: &ProcessorMetrics,
) -> ExportResult {
    let spans = std::mem::take(pending);
    let mut outcome = ExportResult::Success;

    for chunk in spans.chunks(batch_size) {
        match exporter.export_and_wait(chunk).await {
            ExportResult::Success => metrics.record_success(chunk.len() as u64),
            failure @ ExportResult::Failure(_) => {
                metrics.record_error();
                if outcome.is_success() {
                    outcome = failure;
                }
            }
        }
    }

    outcome
}
