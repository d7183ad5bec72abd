use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};
use brace_blocks_engine::text::Span;
use brace_blocks_engine::{BlockTagger, SnapshotSpan, TextBuffer, create_context};
mod common;

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("tagger_queries");
    group.sample_size(10);

    let buffer = TextBuffer::new(&common::generate_source(500));
    let tagger = BlockTagger::new(buffer.clone());
    tagger.attach();
    assert!(tagger.wait_for_scan(Duration::from_secs(30)));
    let snapshot = buffer.current_snapshot();
    let middle = snapshot.len() / 2;

    group.bench_function("get_tags_viewport", |b| {
        let viewport = SnapshotSpan::new(snapshot.clone(), Span::new(middle, 2_000));
        b.iter(|| std::hint::black_box(tagger.get_tags(std::slice::from_ref(&viewport))));
    });

    let stale = snapshot.clone();
    buffer.insert(0, "// header\n").unwrap();
    group.bench_function("get_tags_mapped", |b| {
        let viewport = SnapshotSpan::new(stale.clone(), Span::new(middle, 2_000));
        b.iter(|| std::hint::black_box(tagger.get_tags(std::slice::from_ref(&viewport))));
    });

    group.bench_function("create_context", |b| {
        let viewport = SnapshotSpan::new(stale.clone(), Span::new(middle, 2_000));
        let tags = tagger.get_tags(&[viewport]).unwrap();
        let block = tags.last().unwrap().tag.clone();
        b.iter(|| std::hint::black_box(create_context(&block)));
    });

    group.finish();
}

fn bench_rescan(c: &mut Criterion) {
    let mut group = c.benchmark_group("tagger_rescan");
    group.sample_size(10);

    let buffer = TextBuffer::new(&common::generate_source(200));
    let tagger = BlockTagger::new(buffer.clone());
    tagger.attach();
    assert!(tagger.wait_for_scan(Duration::from_secs(30)));

    group.bench_function("edit_and_wait", |b| {
        b.iter(|| {
            buffer.insert(0, " ").unwrap();
            std::hint::black_box(tagger.wait_for_scan(Duration::from_secs(30)));
        });
    });

    group.finish();
}

criterion_group!(benches, bench_queries, bench_rescan);
criterion_main!(benches);
