//! End-to-end scenarios over the facade, one per row of the scenario table
//! this crate's design is checked against.

use pcre2_lab::config::Config;
use pcre2_lab::facade::{self, Pattern};
use pretty_assertions::assert_eq;

fn parse(pattern: &str, config: &Config) -> (pcre2_lab::Node, String) {
    let p = Pattern::parse_delimited(pattern).unwrap();
    let ast = facade::parse(&p.body, &p.flags, config).unwrap();
    (ast, p.flags)
}

#[test]
fn anchored_literal_with_digits_is_safe_and_round_trips() {
    let config = Config::default();
    let (ast, flags) = parse("/^user_\\d+$/", &config);

    assert!(facade::validate(&ast, &flags, &config).is_valid());

    let literals = facade::literals(&ast, &flags);
    assert_eq!(literals.prefixes, vec!["user_".to_string()]);

    let redos = facade::analyze(&ast, &flags, &config);
    assert_eq!(redos.severity, pcre2_lab::redos::Severity::Safe);

    assert_eq!(facade::compile(&ast), "^user_\\d+$");
}

#[test]
fn nested_unbounded_quantifier_is_critical_with_both_rewrites() {
    let config = Config::default();
    let (ast, flags) = parse("/(a+)+$/", &config);

    let redos = facade::analyze(&ast, &flags, &config);
    assert_eq!(redos.severity, pcre2_lab::redos::Severity::Critical);
    assert!(redos.trigger.unwrap().contains("(a+)+"));

    let rewrite = redos.suggested_rewrite.unwrap();
    assert!(rewrite.contains("(?>a+)+$"));
    assert!(rewrite.contains("(a++)+$"));
}

#[test]
fn suspicious_ascii_range_is_linted_not_silently_rewritten() {
    let config = Config::default();
    let (ast, flags) = parse("/[A-z]/", &config);

    let report = facade::lint(&ast, &flags);
    let issue = report
        .issues
        .iter()
        .find(|i| i.id == "regex.lint.range.suspicious_ascii")
        .expect("suspicious ASCII range should be flagged");
    assert!(issue.hint.as_ref().unwrap().contains("upper"));
    assert_eq!(issue.suggested_rewrite.as_deref(), Some("[A-Za-z]"));

    let optimized = facade::optimize(&ast, &flags, &config);
    assert_eq!(facade::compile(&optimized.optimized), "[A-z]");
}

#[test]
fn word_class_and_shorthand_are_equivalent() {
    let config = Config::default();
    let (left, left_flags) = parse("/[a-zA-Z0-9_]+/", &config);
    let (right, right_flags) = parse("/\\w+/", &config);

    let comparison = facade::compare(&left, &left_flags, &right, &right_flags, &config).unwrap();
    assert!(comparison.equivalent);
}

#[test]
fn unicode_mode_blocks_word_class_folding() {
    let mut config = Config::default();
    config.optimize.word = true;
    let (ast, flags) = parse("/[a-zA-Z0-9_]+/u", &config);

    let optimized = facade::optimize(&ast, &flags, &config);
    assert_eq!(facade::compile(&optimized.optimized), "[a-zA-Z0-9_]+");
    assert!(optimized.rewrites_applied.is_empty());
}

#[test]
fn named_backreference_replays_captured_text() {
    let config = Config::default();
    let (ast, flags) = parse("/(?<name>a)\\k<name>/", &config);

    assert!(facade::validate(&ast, &flags, &config).is_valid());

    let sample = facade::generate(&ast, &flags, &pcre2_lab::sample::SampleConfig::default()).unwrap();
    assert_eq!(sample, "aa");
}

#[test]
fn variable_length_lookbehind_is_rejected() {
    let config = Config::default();
    let (ast, flags) = parse("/(?<=a*)/", &config);

    let result = facade::validate(&ast, &flags, &config);
    let error = result
        .errors
        .iter()
        .find(|e| e.code == "LOOKBEHIND_VARIABLE_UNBOUNDED")
        .expect("variable-length lookbehind should be rejected");
    assert_eq!(error.offset, 5);
}

#[test]
fn branch_reset_group_round_trips_with_relaxed_duplicate_check() {
    let config = Config::default();
    let (ast, flags) = parse("/(?|(a)|(b))/", &config);

    assert!(facade::validate(&ast, &flags, &config).is_valid());
    assert_eq!(facade::compile(&ast), "(?|(a)|(b))");
}
