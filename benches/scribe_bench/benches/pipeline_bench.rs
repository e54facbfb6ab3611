//! Logging pipeline benchmarks
//!
//! Measures the per-exchange cost of property selection, coercion,
//! serialization and a full request/response log.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use scribe_core::{
    coerce, pick, serialize, HostSnapshot, HttpLogger, LogBackend, LogConfig, LogValue,
    MessageBuilder, RequestRecord, ResponseHead, SharedValue, TargetType,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Backend that drops every line
struct Discard;

impl LogBackend for Discard {
    fn info(&self, line: &str) {
        black_box(line);
    }
    fn warn(&self, line: &str) {
        black_box(line);
    }
    fn error(&self, line: &str) {
        black_box(line);
    }
}

fn order() -> Value {
    json!({
        "id": "7f1c",
        "method": "POST",
        "url": "/orders",
        "headers": {"content-type": "application/json", "x-request-id": "abc"},
        "body": {
            "id": 123,
            "items": [{"sku": "A-1", "qty": 2}, {"sku": "B-7", "qty": 1}],
            "customer": {"name": "Papyrus", "tier": "gold"}
        }
    })
}

fn bench_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("select");
    let value = order();

    for props in [
        vec!["id", "body"],
        vec!["id", "method", "url", "body.id", "body.customer.name", "missing.path"],
    ] {
        group.bench_with_input(BenchmarkId::new("pick", props.len()), &props, |b, props| {
            b.iter(|| pick(black_box(&value), black_box(props.as_slice())))
        });
    }

    group.finish();
}

fn bench_coerce(c: &mut Criterion) {
    let fields = match order() {
        Value::Object(map) => map,
        _ => unreachable!(),
    };
    let targets = vec![
        ("body.id".to_string(), TargetType::String),
        ("body.items".to_string(), TargetType::Boolean),
        ("id".to_string(), TargetType::Number),
    ];
    c.bench_function("coerce", |b| b.iter(|| coerce(black_box(&fields), &targets)));
}

fn bench_serialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialize");

    let plain = LogValue::from(order());
    group.bench_function("plain", |b| b.iter(|| serialize(black_box(&plain))));

    let shared = SharedValue::new(LogValue::object([("name", LogValue::from("Papyrus"))]));
    shared.update(|v| {
        v.insert("self", shared.clone());
    });
    let cyclic = LogValue::from(shared.clone());
    group.bench_function("cyclic", |b| b.iter(|| serialize(black_box(&cyclic))));

    group.finish();
}

fn bench_exchange(c: &mut Criterion) {
    let mut group = c.benchmark_group("exchange");
    let builder = MessageBuilder::new("bench").host(HostSnapshot::fixed("bench-host", 1));
    let record = Arc::new(
        RequestRecord::new("POST", "/orders")
            .with_header("content-type", "application/json")
            .with_body(Some(json!({"id": 123}))),
    );
    let body = serde_json::to_vec(&order()).unwrap_or_default();

    for (name, config) in [
        ("defaults", LogConfig::default()),
        (
            "parsed",
            LogConfig::builder()
                .response_props(["id", "statusCode", "body.id", "latency"])
                .parse_prop("body.id", TargetType::String)
                .prop_max_length("body.id", 8)
                .build(),
        ),
    ] {
        let logger = HttpLogger::new(config, builder.clone(), Discard);
        group.bench_function(name, |b| {
            b.iter(|| {
                logger.log_request(&record);
                let mut capture = logger.capture_response(Arc::clone(&record), ResponseHead::new(200));
                for chunk in body.chunks(64) {
                    capture.write(chunk);
                }
                capture.finalize(None)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_select, bench_coerce, bench_serialize, bench_exchange);
criterion_main!(benches);
