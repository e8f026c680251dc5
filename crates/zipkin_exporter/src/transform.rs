//! Span → Zipkin wire span conversion.
//!
//! Pure and deterministic: no I/O, no clock reads, no shared state. The same
//! span and tag keys always produce an identical [`WireSpan`].
//!
//! # Mapping
//!
//! | Internal                 | Wire                                   |
//! |--------------------------|----------------------------------------|
//! | `trace_id` (u128)        | `traceId`, 32 lowercase hex chars      |
//! | `span_id` (u64)          | `id`, 16 lowercase hex chars           |
//! | `parent_span_id`         | `parentId`, omitted for root spans     |
//! | `start_time` (ns)        | `timestamp` (µs)                       |
//! | `end_time - start_time`  | `duration` (µs), clamped at 0          |
//! | `kind`                   | `kind`, omitted for `Internal`         |
//! | `attributes`             | `tags`, values stringified             |
//! | `status`                 | two tags under configurable keys       |
//! | `events`                 | `annotations`                          |
//!
//! # Events
//!
//! Zipkin annotations carry only a timestamp and a string, so an event's
//! attributes are flattened into the value as `"<name> <json object>"` with
//! keys in sorted order. An event without attributes is just its name.

use crate::config::ExporterConfig;
use crate::invariants::{debug_assert_hex_width, debug_assert_valid_ids};
use crate::span::{AttributeValue, Span, SpanEvent, SpanKind};
use crate::wire::{Annotation, Endpoint, WireKind, WireSpan};
use std::collections::{BTreeMap, HashMap};

const NANOS_PER_MICRO: u64 = 1_000;

/// Converts one span using the tag keys from `config`.
pub fn transform_with(span: &Span, config: &ExporterConfig) -> WireSpan {
    transform(
        span,
        &config.service_name,
        &config.status_code_tag_name,
        &config.status_description_tag_name,
    )
}

/// Converts one span into its Zipkin representation.
///
/// The status code is always tagged under `status_code_tag_key`; the
/// description is tagged under `status_description_tag_key` only when it is
/// present and non-empty.
pub fn transform(
    span: &Span,
    service_name: &str,
    status_code_tag_key: &str,
    status_description_tag_key: &str,
) -> WireSpan {
    debug_assert_valid_ids!(span.trace_id, span.span_id);

    let trace_id = format!("{:032x}", span.trace_id);
    let id = format!("{:016x}", span.span_id);
    debug_assert_hex_width!(trace_id, 32);
    debug_assert_hex_width!(id, 16);

    let mut tags = to_tags(&span.attributes);
    tags.insert(
        status_code_tag_key.to_string(),
        span.status.code.as_str().to_string(),
    );
    if let Some(description) = span.status.description.as_deref().filter(|d| !d.is_empty()) {
        tags.insert(status_description_tag_key.to_string(), description.to_string());
    }

    WireSpan {
        trace_id,
        id,
        parent_id: span.parent_span_id.map(|p| format!("{p:016x}")),
        name: span.name.clone(),
        timestamp: to_micros(span.start_time),
        duration: to_micros(span.duration_nanos()),
        local_endpoint: Endpoint {
            service_name: service_name.to_string(),
        },
        kind: to_wire_kind(span.kind),
        tags,
        annotations: span.events.iter().map(to_annotation).collect(),
    }
}

#[inline]
fn to_micros(nanos: u64) -> u64 {
    nanos / NANOS_PER_MICRO
}

fn to_wire_kind(kind: SpanKind) -> Option<WireKind> {
    match kind {
        SpanKind::Server => Some(WireKind::Server),
        SpanKind::Client => Some(WireKind::Client),
        SpanKind::Producer => Some(WireKind::Producer),
        SpanKind::Consumer => Some(WireKind::Consumer),
        SpanKind::Internal => None,
    }
}

fn to_tags(attributes: &HashMap<String, AttributeValue>) -> BTreeMap<String, String> {
    attributes
        .iter()
        .map(|(k, v)| (k.clone(), tag_value(v)))
        .collect()
}

fn tag_value(value: &AttributeValue) -> String {
    match value {
        AttributeValue::String(s) => s.clone(),
        AttributeValue::Int(i) => i.to_string(),
        AttributeValue::Float(f) => f.to_string(),
        AttributeValue::Bool(b) => b.to_string(),
        AttributeValue::Array(items) => {
            serde_json::to_string(items).unwrap_or_else(|_| items.join(","))
        }
    }
}

fn to_annotation(event: &SpanEvent) -> Annotation {
    let value = if event.attributes.is_empty() {
        event.name.clone()
    } else {
        // BTreeMap keeps key order stable across calls.
        let sorted: BTreeMap<&String, &AttributeValue> = event.attributes.iter().collect();
        match serde_json::to_string(&sorted) {
            Ok(json) => format!("{} {}", event.name, json),
            Err(_) => event.name.clone(),
        }
    };

    Annotation {
        timestamp: to_micros(event.timestamp),
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::{SpanStatus, StatusCode};

    const TRACE_ID: u128 = 0xabc1_2300_0000_0000_0000_0000_0000_0001;
    const SPAN_ID: u64 = 0xdef4_5600_0000_0001;

    fn do_work_span() -> Span {
        let mut span = Span::new(TRACE_ID, SPAN_ID, None, "doWork", SpanKind::Internal)
            .with_times(1_000_000_000, 1_005_000_000);
        span.status = SpanStatus::ok();
        span
    }

    #[test]
    fn test_basic_transform() {
        let wire = transform(&do_work_span(), "my-service", "ot.status_code", "ot.status_description");

        assert_eq!(wire.trace_id, "abc12300000000000000000000000001");
        assert_eq!(wire.id, "def4560000000001");
        assert_eq!(wire.parent_id, None);
        assert_eq!(wire.name, "doWork");
        assert_eq!(wire.timestamp, 1_000_000);
        assert_eq!(wire.duration, 5_000);
        assert_eq!(wire.local_endpoint.service_name, "my-service");
        assert_eq!(wire.kind, None);
        assert_eq!(wire.tags.get("ot.status_code").map(String::as_str), Some("OK"));
        assert!(!wire.tags.contains_key("ot.status_description"));
    }

    #[test]
    fn test_ids_are_zero_padded() {
        let span = Span::new(1, 2, Some(3), "pad", SpanKind::Internal);
        let wire = transform(&span, "svc", "c", "d");

        assert_eq!(wire.trace_id, "00000000000000000000000000000001");
        assert_eq!(wire.id, "0000000000000002");
        assert_eq!(wire.parent_id.as_deref(), Some("0000000000000003"));
    }

    #[test]
    fn test_full_width_ids_not_truncated() {
        let span = Span::new(u128::MAX, u64::MAX, None, "max", SpanKind::Internal);
        let wire = transform(&span, "svc", "c", "d");

        assert_eq!(wire.trace_id, "f".repeat(32));
        assert_eq!(wire.id, "f".repeat(16));
    }

    #[test]
    fn test_kind_mapping() {
        let cases = [
            (SpanKind::Internal, None),
            (SpanKind::Server, Some(WireKind::Server)),
            (SpanKind::Client, Some(WireKind::Client)),
            (SpanKind::Producer, Some(WireKind::Producer)),
            (SpanKind::Consumer, Some(WireKind::Consumer)),
        ];
        for (kind, expected) in cases {
            let span = Span::new(1, 1, None, "k", kind);
            assert_eq!(transform(&span, "svc", "c", "d").kind, expected, "{kind:?}");
        }
    }

    #[test]
    fn test_status_description_tag() {
        let mut span = do_work_span();
        span.status = SpanStatus::error("boom");
        let wire = transform(&span, "svc", "code", "desc");
        assert_eq!(wire.tags.get("code").map(String::as_str), Some("ERROR"));
        assert_eq!(wire.tags.get("desc").map(String::as_str), Some("boom"));

        span.status = SpanStatus {
            code: StatusCode::Error,
            description: Some(String::new()),
        };
        let wire = transform(&span, "svc", "code", "desc");
        assert!(!wire.tags.contains_key("desc"));

        span.status = SpanStatus::default();
        let wire = transform(&span, "svc", "code", "desc");
        assert_eq!(wire.tags.get("code").map(String::as_str), Some("UNSET"));
        assert!(!wire.tags.contains_key("desc"));
    }

    #[test]
    fn test_attributes_become_tags() {
        let mut span = do_work_span();
        span.set_attribute("http.method", "GET");
        span.set_attribute("http.status_code", 200_i64);
        span.set_attribute("cache.hit", true);
        span.set_attribute("ratio", 0.5);
        span.set_attribute(
            "peers",
            AttributeValue::Array(vec!["a".to_string(), "b".to_string()]),
        );

        let wire = transform(&span, "svc", "code", "desc");
        assert_eq!(wire.tags["http.method"], "GET");
        assert_eq!(wire.tags["http.status_code"], "200");
        assert_eq!(wire.tags["cache.hit"], "true");
        assert_eq!(wire.tags["ratio"], "0.5");
        assert_eq!(wire.tags["peers"], r#"["a","b"]"#);
        assert_eq!(wire.tags.len(), 6);
    }

    #[test]
    fn test_events_become_annotations() {
        let mut span = do_work_span();
        span.events.push(SpanEvent::new("cache.miss", 1_001_000_000));
        span.events.push(
            SpanEvent::new("retry", 1_002_500_999)
                .with_attribute("attempt", 2_i64)
                .with_attribute("backend", "db-1"),
        );

        let wire = transform(&span, "svc", "code", "desc");
        assert_eq!(wire.annotations.len(), 2);
        assert_eq!(wire.annotations[0].timestamp, 1_001_000);
        assert_eq!(wire.annotations[0].value, "cache.miss");
        assert_eq!(wire.annotations[1].timestamp, 1_002_500);
        assert_eq!(wire.annotations[1].value, r#"retry {"attempt":2,"backend":"db-1"}"#);
        assert!(!wire.tags.contains_key("retry"));
    }

    #[test]
    fn test_inverted_times_clamp_to_zero() {
        let span = do_work_span().with_times(2_000_000, 1_000_000);
        assert!(span.is_inverted());
        assert_eq!(transform(&span, "svc", "c", "d").duration, 0);
    }

    #[test]
    fn test_deterministic_serialization() {
        let mut span = do_work_span();
        for i in 0..32 {
            span.set_attribute(format!("key.{i}"), i as i64);
        }
        span.events.push(
            SpanEvent::new("evt", 1_000_500_000)
                .with_attribute("z", 1_i64)
                .with_attribute("a", 2_i64)
                .with_attribute("m", 3_i64),
        );

        let first = serde_json::to_vec(&transform(&span, "svc", "c", "d")).unwrap();
        let second = serde_json::to_vec(&transform(&span.clone(), "svc", "c", "d")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_transform_with_uses_config_keys() {
        let config = ExporterConfig::new("cfg-svc").with_status_code_tag_name("status");
        let wire = transform_with(&do_work_span(), &config);

        assert_eq!(wire.local_endpoint.service_name, "cfg-svc");
        assert_eq!(wire.tags.get("status").map(String::as_str), Some("OK"));
    }
}
