//! # Zipkin Exporter Demo
//!
//! Generates a few synthetic request traces and ships them to a Zipkin
//! collector through a `BatchSpanProcessor`.
//!
//! Start a collector first (`docker run -p 9411:9411 openzipkin/zipkin`), then:
//!
//! ```text
//! cargo run --bin demo -- [--url http://localhost:9411/api/v2/spans] [--traces 20] [--no-flush]
//! ```
//!
//! Set `RUST_LOG=zipkin_exporter=debug` to see every export.

use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;
use zipkin_exporter::{
    BatchConfig, BatchSpanProcessor, ExporterConfig, Span, SpanEvent, SpanKind, SpanStatus,
    TracingLogger, ZipkinExporter, DEFAULT_COLLECTOR_URL,
};

struct DemoArgs {
    url: String,
    traces: usize,
    force_flush: bool,
}

fn parse_args() -> DemoArgs {
    let args: Vec<String> = std::env::args().collect();
    let value_of = |flag: &str| {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .cloned()
    };

    DemoArgs {
        url: value_of("--url").unwrap_or_else(|| DEFAULT_COLLECTOR_URL.to_string()),
        traces: value_of("--traces")
            .and_then(|v| v.parse().ok())
            .unwrap_or(20),
        force_flush: !args.contains(&"--no-flush".to_string()),
    }
}

fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

/// Builds one `GET /checkout` trace: a server span with a db and a cache child.
fn generate_trace(rng: &mut impl Rng) -> Vec<Span> {
    let trace_id: u128 = rng.gen_range(1..=u128::MAX);
    let root_id: u64 = rng.gen_range(1..=u64::MAX);
    let start = now_nanos();

    let db_latency = rng.gen_range(2_000_000..40_000_000);
    let cache_latency = rng.gen_range(100_000..2_000_000);
    let total = db_latency + cache_latency + rng.gen_range(1_000_000..5_000_000);
    let failed = rng.gen_bool(0.1);

    let mut cache = Span::new(trace_id, rng.gen_range(1..=u64::MAX), Some(root_id), "cache.get", SpanKind::Client)
        .with_times(start + 500_000, start + 500_000 + cache_latency);
    cache.set_attribute("cache.hit", false);
    cache.status = SpanStatus::ok();

    let db_start = start + 500_000 + cache_latency;
    let mut db = Span::new(trace_id, rng.gen_range(1..=u64::MAX), Some(root_id), "SELECT orders", SpanKind::Client)
        .with_times(db_start, db_start + db_latency);
    db.set_attribute("db.system", "postgresql");
    db.set_attribute("db.rows", rng.gen_range(0..500_i64));
    db.status = if failed {
        SpanStatus::error("deadlock detected")
    } else {
        SpanStatus::ok()
    };

    let mut root = Span::new(trace_id, root_id, None, "GET /checkout", SpanKind::Server)
        .with_times(start, start + total);
    root.set_attribute("http.method", "GET");
    root.set_attribute("http.status_code", if failed { 500_i64 } else { 200_i64 });
    root.events.push(
        SpanEvent::new("request.received", start).with_attribute("bytes", rng.gen_range(64..4096_i64)),
    );
    root.status = if failed {
        SpanStatus::error("database error")
    } else {
        SpanStatus::ok()
    };

    vec![cache, db, root]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = parse_args();
    tracing::info!(url = %args.url, traces = args.traces, "starting zipkin exporter demo");

    let config = ExporterConfig::new("checkout-demo")
        .with_url(args.url)
        .with_force_flush(args.force_flush);
    let exporter = ZipkinExporter::new(config)?.with_logger(Arc::new(TracingLogger));

    let batch_config = BatchConfig::default()
        .with_max_export_batch_size(32)
        .with_scheduled_delay(Duration::from_millis(500));
    let processor = BatchSpanProcessor::new(exporter, batch_config);

    let mut rng = rand::thread_rng();
    for _ in 0..args.traces {
        for span in generate_trace(&mut rng) {
            processor.on_end(span);
        }
        tokio::time::sleep(Duration::from_millis(rng.gen_range(5..50))).await;
    }

    let result = processor.shutdown().await;
    let metrics = processor.metrics();
    tracing::info!(
        exported = metrics.spans_exported(),
        batches = metrics.batches_exported(),
        errors = metrics.export_errors(),
        dropped = metrics.spans_dropped(),
        success = result.is_success(),
        "demo finished"
    );

    Ok(())
}
