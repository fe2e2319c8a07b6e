//! Exercises the universal properties this toolkit is expected to hold
//! (round-trip, lint determinism, ReDoS monotonicity, resource limits, and
//! graceful handling of arbitrary byte input) over a fixed sample of
//! patterns rather than a property-testing harness.

use pcre2_lab::compiler::compile;
use pcre2_lab::errors::PcreError;
use pcre2_lab::parser::{parse_pattern, ParserLimits};
use pcre2_lab::redos::{self, Mode, RedosConfig};
use pcre2_lab::{linter, validator};

const SAMPLE_PATTERNS: &[&str] = &[
    "abc",
    "a+b*c?",
    "(a|b|c){2,5}",
    "[a-z0-9_]+",
    "(?:(?:a)?b)*c",
    "(?<name>a+)\\k<name>",
    "(?=foo)bar",
    "(?<!baz)qux",
    "a{3}",
    "\\p{L}+",
];

#[test]
fn round_trip_preserves_compiled_text() {
    for pattern in SAMPLE_PATTERNS {
        let ast = parse_pattern(pattern, "", ParserLimits::default()).unwrap();
        let text = compile(&ast);
        let reparsed = parse_pattern(&text, "", ParserLimits::default()).unwrap();
        assert_eq!(compile(&reparsed), text, "pattern {pattern:?} did not round-trip");
    }
}

#[test]
fn lint_is_deterministic() {
    for pattern in SAMPLE_PATTERNS {
        let ast = parse_pattern(pattern, "", ParserLimits::default()).unwrap();
        let first = linter::lint(&ast, "");
        let second = linter::lint(&ast, "");
        assert_eq!(first.issues.len(), second.issues.len());
        for (a, b) in first.issues.iter().zip(second.issues.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.byte_range, b.byte_range);
        }
    }
}

#[test]
fn validator_produces_well_formed_errors() {
    for pattern in SAMPLE_PATTERNS {
        let ast = parse_pattern(pattern, "", ParserLimits::default()).unwrap();
        let result = validator::validate(&ast, "", false);
        for error in &result.errors {
            assert!(!error.code.is_empty());
            assert!(!error.message.is_empty());
        }
    }
}

#[test]
fn redos_score_does_not_decrease_when_wrapped_in_another_unbounded_quantifier() {
    let config = RedosConfig { mode: Mode::Theoretical, threshold: 50, disable_jit: false };
    for pattern in SAMPLE_PATTERNS {
        let ast = parse_pattern(pattern, "", ParserLimits::default()).unwrap();
        let before = redos::analyze(&ast, "", &config);

        let wrapped_text = format!("(?:{})+", compile(&ast));
        let wrapped_ast = parse_pattern(&wrapped_text, "", ParserLimits::default()).unwrap();
        let after = redos::analyze(&wrapped_ast, "", &config);

        assert!(
            after.score >= before.score,
            "wrapping {pattern:?} in an extra unbounded quantifier lowered its score: {} -> {}",
            before.score,
            after.score
        );
    }
}

#[test]
fn pattern_length_over_the_limit_fails_closed() {
    let limits = ParserLimits { max_pattern_length: 8, max_recursion_depth: 200, max_nodes: 10_000 };
    let err = parse_pattern("aaaaaaaaaaaaaaaa", "", limits).unwrap_err();
    assert!(matches!(err, PcreError::ResourceLimitExceeded { .. }));
}

#[test]
fn recursion_depth_over_the_limit_fails_closed() {
    let limits = ParserLimits { max_pattern_length: 100_000, max_recursion_depth: 3, max_nodes: 10_000 };
    let deeply_nested = "(((((a)))))";
    let err = parse_pattern(deeply_nested, "", limits).unwrap_err();
    assert!(matches!(err, PcreError::ResourceLimitExceeded { .. }));
}

#[test]
fn lexer_and_parser_never_panic_on_arbitrary_bytes() {
    let inputs: &[&[u8]] = &[
        b"",
        b"\x00\x01\x02",
        b"(((((",
        b")))))",
        b"\\",
        b"[",
        b"\xff\xfe\xfd",
        b"(?<name",
        b"a{1,",
        b"\\p{",
    ];
    for bytes in inputs {
        if let Ok(text) = std::str::from_utf8(bytes) {
            let _ = parse_pattern(text, "", ParserLimits::default());
        }
    }
}
