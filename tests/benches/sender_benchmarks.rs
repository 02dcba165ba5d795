//! # Shuttle Sender Benchmarks
//!
//! Throughput of the dispatch pipeline against the in-memory transport.
//!
//! | Path | What it measures |
//! |------|------------------|
//! | build_envelope | marshal + type tag + option chain |
//! | send_message | full dispatch: spawn, race, metrics |
//! | send_message_batch | batch fill + single dispatch |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use shuttle_sender::{
    message_body, set_correlation_id, set_message_id, BincodeMarshaller, InMemoryTransport,
    SendContext, Sender, SenderOptions,
};

#[derive(Serialize)]
struct OrderPlaced {
    order_id: u64,
    customer: String,
    lines: Vec<(String, u32)>,
}
message_body!(OrderPlaced);

fn sample_order(order_id: u64) -> OrderPlaced {
    OrderPlaced {
        order_id,
        customer: "customer-0042".to_string(),
        lines: (0..8).map(|i| (format!("sku-{i}"), i)).collect(),
    }
}

fn bench_build_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("build-envelope");
    let ctx = SendContext::background();
    let order = sample_order(1);
    let options = [set_message_id("m-1"), set_correlation_id("c-1")];

    let json = Sender::new(Arc::new(InMemoryTransport::new()));
    group.bench_function("json", |b| {
        b.iter(|| black_box(json.build_envelope(&ctx, &order, &options).is_ok()))
    });

    let bincode = Sender::with_options(
        Arc::new(InMemoryTransport::new()),
        SenderOptions::with_marshaller(BincodeMarshaller),
    );
    group.bench_function("bincode", |b| {
        b.iter(|| black_box(bincode.build_envelope(&ctx, &order, &options).is_ok()))
    });

    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("runtime");
    let mut group = c.benchmark_group("dispatch");
    group.measurement_time(Duration::from_secs(10));

    let sender = Sender::new(Arc::new(InMemoryTransport::new().without_history()));
    let ctx = SendContext::background();
    let order = sample_order(7);

    group.bench_function("send_message", |b| {
        b.to_async(&runtime)
            .iter(|| async { black_box(sender.send_message(&ctx, &order, &[]).await.is_ok()) })
    });

    for size in [10u64, 100] {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::new("send_message_batch", size), &size, |b, &size| {
            b.to_async(&runtime).iter(|| async {
                let envelopes = (0..size)
                    .filter_map(|i| sender.build_envelope(&ctx, &sample_order(i), &[]).ok())
                    .collect();
                black_box(sender.send_message_batch(&ctx, envelopes).await.is_ok())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build_envelope, bench_dispatch);
criterion_main!(benches);
