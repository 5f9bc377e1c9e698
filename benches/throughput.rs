//! Throughput benchmarks
//!
//! 1. Lexer only - plain vs quoted-heavy documents (fast vs slow quote path)
//! 2. Full parse - strings vs dynamic typing (coercion cache)
//! 3. Streaming - same document fed in small vs large fragments
//!
//! Run with: cargo bench --bench throughput

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use delimit::engine::{Dialect, Lexer};
use delimit::{parse, DynamicTyping, ParseOptions, StreamingParser};

// ============================================================================
// Inputs
// ============================================================================

fn plain_document(rows: usize) -> String {
    let mut out = String::from("id,name,city,score,active\n");
    for i in 0..rows {
        out.push_str(&format!(
            "{},user{},city{},{}.5,{}\n",
            i,
            i,
            i % 50,
            i % 100,
            i % 2 == 0
        ));
    }
    out
}

fn quoted_document(rows: usize) -> String {
    let mut out = String::from("id,note,address\n");
    for i in 0..rows {
        out.push_str(&format!(
            "{},\"said \"\"hi\"\" {}\",\"{} Main St,\nSuite {}\"\n",
            i, i, i, i
        ));
    }
    out
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_lexer(c: &mut Criterion) {
    let dialect = Dialect::default();
    let mut group = c.benchmark_group("lexer");
    for (name, input) in [
        ("plain", plain_document(10_000)),
        ("quoted", quoted_document(10_000)),
    ] {
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &input, |b, input| {
            b.iter(|| {
                let fields: usize = Lexer::new(black_box(input), &dialect)
                    .map(|row| row.map(|r| r.len()).unwrap_or(0))
                    .sum();
                black_box(fields)
            })
        });
    }
    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let input = plain_document(10_000);
    let strings = ParseOptions::default();
    let typed = ParseOptions::default().with_dynamic_typing(DynamicTyping::All);

    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Bytes(input.len() as u64));
    group.bench_function("strings", |b| {
        b.iter(|| black_box(parse(black_box(&input), &strings).map(|o| o.rows.len())))
    });
    group.bench_function("typed", |b| {
        b.iter(|| black_box(parse(black_box(&input), &typed).map(|o| o.rows.len())))
    });
    group.finish();
}

fn bench_streaming(c: &mut Criterion) {
    let input = quoted_document(5_000).into_bytes();
    let mut group = c.benchmark_group("streaming");
    group.throughput(Throughput::Bytes(input.len() as u64));
    for size in [64usize, 4096, 65536] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let mut parser =
                    StreamingParser::new(ParseOptions::default(), Vec::new()).unwrap();
                for piece in input.chunks(size) {
                    parser.feed(piece).unwrap();
                }
                black_box(parser.end().unwrap().row_count)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_lexer, bench_parse, bench_streaming);
criterion_main!(benches);
