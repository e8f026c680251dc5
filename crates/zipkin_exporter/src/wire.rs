//! Zipkin v2 JSON span model.
//!
//! Field names follow the collector's `POST /api/v2/spans` schema. Tags use a
//! `BTreeMap` so a given span always serializes to the same bytes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Span kinds the collector understands. There is no `INTERNAL`; local spans
/// leave `kind` unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WireKind {
    Server,
    Client,
    Producer,
    Consumer,
}

/// The network context of the node that recorded the span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub service_name: String,
}

/// A timestamped event attached to a span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Epoch microseconds
    pub timestamp: u64,
    pub value: String,
}

/// One span as submitted to the collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSpan {
    /// 32 lowercase hex characters
    pub trace_id: String,
    /// 16 lowercase hex characters
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub name: String,
    /// Epoch microseconds
    pub timestamp: u64,
    /// Microseconds
    pub duration: u64,
    pub local_endpoint: Endpoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<WireKind>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}
