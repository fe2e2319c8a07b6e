//! Automata subsystem benchmarks: NFA construction, subset construction to a
//! DFA, minimization, and a product-construction equivalence check, over a
//! handful of pattern shapes that stress different parts of the pipeline.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pcre2_lab::automata::{compile_to_dfa, is_equivalent, MinimizationAlgorithm};
use pcre2_lab::parser::{parse_pattern, ParserLimits};

fn compile(pattern: &str) -> pcre2_lab::errors::Result<pcre2_lab::ast::Node> {
    parse_pattern(pattern, "", ParserLimits::default())
}

fn bench_dfa_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("automata_dfa_construction");
    let patterns = ["[a-z]+@[a-z]+\\.[a-z]{2,3}", "(foo|bar|baz){1,4}qux", "[0-9]{3}-[0-9]{3}-[0-9]{4}"];
    for pattern in patterns {
        let ast = compile(pattern).unwrap();
        group.bench_function(pattern, |b| {
            b.iter(|| compile_to_dfa(black_box(&ast), "", MinimizationAlgorithm::Hopcroft).unwrap())
        });
    }
    group.finish();
}

fn bench_minimization_algorithms(c: &mut Criterion) {
    let mut group = c.benchmark_group("automata_minimization");
    let ast = compile("(a|b|c|d|e){2,6}").unwrap();

    group.bench_function("hopcroft", |b| {
        b.iter(|| compile_to_dfa(black_box(&ast), "", MinimizationAlgorithm::Hopcroft).unwrap())
    });
    group.bench_function("moore", |b| {
        b.iter(|| compile_to_dfa(black_box(&ast), "", MinimizationAlgorithm::Moore).unwrap())
    });
    group.finish();
}

fn bench_equivalence_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("automata_equivalence");
    let a = compile("a|b").unwrap();
    let b = compile("[ab]").unwrap();
    let dfa_a = compile_to_dfa(&a, "", MinimizationAlgorithm::Hopcroft).unwrap();
    let dfa_b = compile_to_dfa(&b, "", MinimizationAlgorithm::Hopcroft).unwrap();

    group.bench_function("alternation_vs_char_class", |b| {
        b.iter(|| is_equivalent(black_box(&dfa_a), black_box(&dfa_b)))
    });
    group.finish();
}

criterion_group!(benches, bench_dfa_construction, bench_minimization_algorithms, bench_equivalence_check);
criterion_main!(benches);
