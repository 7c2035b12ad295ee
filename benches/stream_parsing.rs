use std::hint::black_box;
use std::io::Cursor;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use memory_album::parsers::{ArrayStream, InputSchema};
use serde_json::json;

/// Generate a synthetic graph-structured export with `num_conversations` entries
fn generate_export(num_conversations: usize) -> Vec<u8> {
    let conversations: Vec<_> = (0..num_conversations)
        .map(|i| {
            json!({
                "id": format!("conv-{}", i),
                "title": format!("Conversation {}", i),
                "create_time": 1_700_000_000.0 + i as f64,
                "update_time": 1_700_000_500.0 + i as f64,
                "mapping": {
                    "a": {"message": {
                        "author": {"role": "user"},
                        "content": {
                            "parts": [format!("Question {} with \"quoted\" text {{}}", i)]
                        },
                        "create_time": 1_700_000_001.0 + i as f64
                    }},
                    "b": {"message": {
                        "author": {"role": "assistant"},
                        "content": {"parts": ["A reply a little longer than the question."]},
                        "create_time": 1_700_000_002.0 + i as f64,
                        "metadata": {"model_slug": "gpt-4o"}
                    }}
                }
            })
        })
        .collect();
    serde_json::to_vec(&conversations).unwrap()
}

fn bench_array_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("array_stream");

    for size in [100, 1_000, 10_000].iter() {
        let bytes = generate_export(*size);
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &bytes, |b, bytes| {
            b.iter(|| {
                let stream = ArrayStream::new(Cursor::new(black_box(bytes.as_slice())), 1 << 20);
                stream.filter_map(Result::ok).count()
            });
        });
    }

    group.finish();
}

fn bench_stream_and_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_and_normalize");

    for size in [1_000, 10_000].iter() {
        let bytes = generate_export(*size);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &bytes, |b, bytes| {
            b.iter(|| {
                ArrayStream::new(Cursor::new(black_box(bytes.as_slice())), 1 << 20)
                    .filter_map(Result::ok)
                    .filter_map(|v| InputSchema::GraphExport.normalize(v))
                    .count()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_array_stream, bench_stream_and_normalize);
criterion_main!(benches);
