//! Configuration for the exporter and the batch span processor.

use crate::error::ConfigError;
use serde::Deserialize;
use std::time::Duration;

/// Collector endpoint used when no `url` is configured.
pub const DEFAULT_COLLECTOR_URL: &str = "http://localhost:9411/api/v2/spans";

/// Tag key carrying the span status code.
pub const DEFAULT_STATUS_CODE_TAG: &str = "ot.status_code";

/// Tag key carrying the span status description.
pub const DEFAULT_STATUS_DESCRIPTION_TAG: &str = "ot.status_description";

/// Exporter configuration, immutable once the exporter is built.
///
/// Deserializes from the camelCase option names:
///
/// ```json
/// { "serviceName": "checkout", "url": "http://zipkin:9411/api/v2/spans", "forceFlush": false }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExporterConfig {
    /// Collector endpoint.
    ///
    /// Default: `http://localhost:9411/api/v2/spans`
    #[serde(default = "default_url")]
    pub url: String,

    /// Service name reported as `localEndpoint.serviceName`. Required.
    pub service_name: String,

    /// Tag key for the status code.
    ///
    /// Default: `ot.status_code`
    #[serde(default = "default_status_code_tag")]
    pub status_code_tag_name: String,

    /// Tag key for the status description.
    ///
    /// Default: `ot.status_description`
    #[serde(default = "default_status_description_tag")]
    pub status_description_tag_name: String,

    /// Whether `shutdown()` issues a final flush.
    ///
    /// Default: true
    #[serde(default = "default_force_flush")]
    pub force_flush: bool,
}

fn default_url() -> String {
    DEFAULT_COLLECTOR_URL.to_string()
}

fn default_status_code_tag() -> String {
    DEFAULT_STATUS_CODE_TAG.to_string()
}

fn default_status_description_tag() -> String {
    DEFAULT_STATUS_DESCRIPTION_TAG.to_string()
}

fn default_force_flush() -> bool {
    true
}

impl ExporterConfig {
    /// Creates a configuration with defaults for everything but the service name.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            url: default_url(),
            service_name: service_name.into(),
            status_code_tag_name: default_status_code_tag(),
            status_description_tag_name: default_status_description_tag(),
            force_flush: default_force_flush(),
        }
    }

    /// Loads and validates a configuration from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the collector URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Sets the status code tag key.
    pub fn with_status_code_tag_name(mut self, name: impl Into<String>) -> Self {
        self.status_code_tag_name = name.into();
        self
    }

    /// Sets the status description tag key.
    pub fn with_status_description_tag_name(mut self, name: impl Into<String>) -> Self {
        self.status_description_tag_name = name.into();
        self
    }

    /// Enables or disables the flush on shutdown.
    pub fn with_force_flush(mut self, force_flush: bool) -> Self {
        self.force_flush = force_flush;
        self
    }

    /// Checks the service name and collector URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::EmptyServiceName);
        }
        reqwest::Url::parse(&self.url).map_err(|e| ConfigError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

/// Configuration for the batch span processor.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum number of spans buffered before new spans are dropped.
    ///
    /// Default: 2048
    pub max_queue_size: usize,

    /// Pending span count that triggers an immediate export.
    ///
    /// Default: 512
    pub max_export_batch_size: usize,

    /// Interval between scheduled exports of whatever is pending.
    ///
    /// Default: 5s
    pub scheduled_delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 2048,
            max_export_batch_size: 512,
            scheduled_delay: Duration::from_secs(5),
        }
    }
}

impl BatchConfig {
    /// Sets the queue bound.
    pub fn with_max_queue_size(mut self, size: usize) -> Self {
        self.max_queue_size = size;
        self
    }

    /// Sets the batch size that triggers an export.
    pub fn with_max_export_batch_size(mut self, size: usize) -> Self {
        self.max_export_batch_size = size;
        self
    }

    /// Sets the scheduled export interval.
    pub fn with_scheduled_delay(mut self, delay: Duration) -> Self {
        self.scheduled_delay = delay;
        self
    }
}
