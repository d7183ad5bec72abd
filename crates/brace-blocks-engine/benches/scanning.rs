use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use brace_blocks_engine::parsing::parse;
use brace_blocks_engine::parsing::scanner::StatementScanner;
use brace_blocks_engine::{CancellationToken, TextBuffer};
mod common;

fn bench_scanner(c: &mut Criterion) {
    let mut group = c.benchmark_group("scanner");
    group.sample_size(10);

    for size in [10, 100, 1000] {
        let text = common::generate_source(size);
        group.bench_with_input(BenchmarkId::new("statement_scan", size), &text, |b, text| {
            b.iter(|| {
                let boundaries = StatementScanner::new(std::hint::black_box(text))
                    .filter(|c| c.end_of_statement)
                    .count();
                std::hint::black_box(boundaries);
            });
        });
    }

    group.finish();
}

fn bench_tree_building(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_building");
    group.sample_size(10);

    let token = CancellationToken::new();
    for size in [10, 100, 1000] {
        let snapshot = TextBuffer::new(&common::generate_source(size)).current_snapshot();
        group.bench_with_input(BenchmarkId::new("parse", size), &snapshot, |b, snapshot| {
            b.iter(|| std::hint::black_box(parse(std::hint::black_box(snapshot), &token)));
        });
    }

    let deep = TextBuffer::new(&common::generate_nested(500)).current_snapshot();
    group.bench_function("parse_deeply_nested", |b| {
        b.iter(|| std::hint::black_box(parse(std::hint::black_box(&deep), &token)));
    });

    group.finish();
}

criterion_group!(benches, bench_scanner, bench_tree_building);
criterion_main!(benches);
