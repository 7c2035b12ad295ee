use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use memory_album::indexer::{IndexState, SourceDocument};
use memory_album::models::{DocKind, SearchDocument};

fn build_index(num_docs: usize) -> IndexState {
    IndexState::from_documents((0..num_docs).map(|i| SourceDocument {
        document: SearchDocument {
            id: format!("m:m{}", i),
            kind: DocKind::Moment,
            ref_id: format!("m{}", i),
            preview_text: format!("Moment {}", i),
        },
        text: format!("moment {} about the {} by the sea, topic {}", i, i % 13, i % 101),
    }))
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("trigram_query");
    let index = build_index(50_000);

    let queries = [
        ("common_gram", "the"),
        ("multi_gram", "about the 7 by"),
        ("rare", "topic 100"),
        ("absent", "zzz"),
        ("short_scan", "mo"),
    ];
    for (name, query) in queries {
        group.bench_with_input(BenchmarkId::new("query", name), &query, |b, query| {
            b.iter(|| index.query(black_box(query), 50));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_query);
criterion_main!(benches);
