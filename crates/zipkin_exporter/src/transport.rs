//! Delivery of serialized span batches to a collector.
//!
//! [`Transport`] uses native async fn in traits (`impl Future + Send`), the
//! same way the exporter traits elsewhere in this workspace do. The exporter
//! is generic over it, so no boxing is needed.

use crate::error::ExportError;
use crate::wire::WireSpan;
use std::future::Future;
use std::time::Duration;

/// Submits one batch to the collector.
///
/// The response status is the only success signal. Implementations must
/// report failures through the returned `Result`, never by panicking.
pub trait Transport: Send + Sync + 'static {
    fn send(&self, batch: Vec<WireSpan>) -> impl Future<Output = Result<(), ExportError>> + Send;
}

/// HTTP POST of a JSON array to the Zipkin v2 spans endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    timeout: Option<Duration>,
}

impl HttpTransport {
    /// Creates a transport posting to `url` with a fresh client.
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    /// Creates a transport sharing an existing client's connection pool.
    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            timeout: None,
        }
    }

    /// Sets a per-request timeout. No timeout is applied by default.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Collector endpoint this transport posts to.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for HttpTransport {
    async fn send(&self, batch: Vec<WireSpan>) -> Result<(), ExportError> {
        let body =
            serde_json::to_vec(&batch).map_err(|e| ExportError::Serialization(e.to_string()))?;

        let mut request = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExportError::Status(status.as_u16()));
        }
        Ok(())
    }
}

/// Records every batch it receives (for verification).
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingTransport {
    batches: std::sync::Mutex<Vec<Vec<WireSpan>>>,
    fail_with: Option<ExportError>,
}

#[cfg(test)]
impl RecordingTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing(error: ExportError) -> Self {
        Self {
            batches: std::sync::Mutex::new(Vec::new()),
            fail_with: Some(error),
        }
    }

    pub(crate) fn batches(&self) -> Vec<Vec<WireSpan>> {
        self.batches.lock().unwrap().clone()
    }

    pub(crate) fn span_count(&self) -> usize {
        self.batches.lock().unwrap().iter().map(Vec::len).sum()
    }
}

#[cfg(test)]
impl Transport for RecordingTransport {
    async fn send(&self, batch: Vec<WireSpan>) -> Result<(), ExportError> {
        self.batches.lock().unwrap().push(batch);
        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// Holds every `send` until [`GatedTransport::release`] hands out a permit,
/// then records the batch.
#[cfg(test)]
pub(crate) struct GatedTransport {
    gate: tokio::sync::Semaphore,
    entered: std::sync::atomic::AtomicUsize,
    inner: RecordingTransport,
}

#[cfg(test)]
impl GatedTransport {
    pub(crate) fn new() -> Self {
        Self {
            gate: tokio::sync::Semaphore::new(0),
            entered: std::sync::atomic::AtomicUsize::new(0),
            inner: RecordingTransport::new(),
        }
    }

    /// Lets `sends` blocked or future sends through.
    pub(crate) fn release(&self, sends: usize) {
        self.gate.add_permits(sends);
    }

    /// Number of sends that have reached the gate.
    pub(crate) fn entered(&self) -> usize {
        self.entered.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub(crate) fn batches(&self) -> Vec<Vec<WireSpan>> {
        self.inner.batches()
    }
}

#[cfg(test)]
impl Transport for GatedTransport {
    async fn send(&self, batch: Vec<WireSpan>) -> Result<(), ExportError> {
        self.entered.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
        self.inner.send(batch).await
    }
}

/// Panics on every send.
#[cfg(test)]
pub(crate) struct PanickingTransport;

#[cfg(test)]
impl Transport for PanickingTransport {
    async fn send(&self, _batch: Vec<WireSpan>) -> Result<(), ExportError> {
        panic!("collector client blew up")
    }
}
