//! Lexer benchmarks: token throughput over a handful of representative
//! pattern shapes (plain literals, alternation, character classes, nested
//! quantifiers).

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use pcre2_lab::lexer::Lexer;

fn token_count(pattern: &str) -> usize {
    Lexer::new(pattern, false).filter(|t| t.is_ok()).count()
}

fn bench_lexer_literal(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer_literal");
    let pattern = "the quick brown fox jumps over the lazy dog";
    group.throughput(Throughput::Bytes(pattern.len() as u64));
    group.bench_function("plain_text", |b| b.iter(|| token_count(black_box(pattern))));
    group.finish();
}

fn bench_lexer_alternation(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer_alternation");
    let pattern = "cat|dog|bird|fish|horse|snake|lizard|turtle|rabbit|hamster";
    group.throughput(Throughput::Bytes(pattern.len() as u64));
    group.bench_function("ten_branches", |b| b.iter(|| token_count(black_box(pattern))));
    group.finish();
}

fn bench_lexer_char_classes(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer_char_classes");
    let pattern = r"[a-zA-Z0-9_][^\s]*\p{L}+[[:alpha:]]{2,5}";
    group.throughput(Throughput::Bytes(pattern.len() as u64));
    group.bench_function("mixed_classes", |b| b.iter(|| token_count(black_box(pattern))));
    group.finish();
}

fn bench_lexer_nested_groups(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer_nested_groups");
    let pattern = "(?:(?:(?:a+)?b*)?c+)?(?=d)(?<!e)\\1\\k<name>";
    group.throughput(Throughput::Bytes(pattern.len() as u64));
    group.bench_function("nested_constructs", |b| b.iter(|| token_count(black_box(pattern))));
    group.finish();
}

criterion_group!(
    benches,
    bench_lexer_literal,
    bench_lexer_alternation,
    bench_lexer_char_classes,
    bench_lexer_nested_groups
);
criterion_main!(benches);
