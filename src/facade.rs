//! Single entry point wiring the lexer/parser through every analysis (spec.md
//! §4.10): `parse`, `validate`, `compile`, `analyze` (redos), `lint`,
//! `optimize`, `explain`, `generate`, `literals`, `complexity`, and `compare`
//! (intersection/subset/equivalence over two patterns). Every operation is a
//! pure function of `(pattern, flags, config)` — no shared mutable state, so
//! callers may invoke them from multiple threads in parallel (spec.md §5).

use crate::ast::Node;
use crate::automata::{self, Dfa};
use crate::cache::cache_key;
use crate::compiler::compile as compile_ast;
use crate::complexity::{self, ComplexityReport};
use crate::config::{Config, MatchMode};
use crate::errors::{Diagnostic, PcreError, Result};
use crate::explain::{self, ExplainFormat};
use crate::highlight::{self, HighlightToken};
use crate::linter::{self, LintReport};
use crate::literals::{self, LiteralSet};
use crate::optimizer::{self, OptimizationResult};
use crate::parser::{parse_pattern, ParserLimits};
use crate::redos::{self, ReDoSAnalysis};
use crate::sample::{self, SampleConfig};
use crate::validator::{self, ValidationResult};

/// A parsed pattern ready for analysis: the triple spec.md §3.1 describes
/// (delimiter, body, flags), already split apart.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub body: String,
    pub flags: String,
}

const DELIMITER_PAIRS: &[(char, char)] = &[('(', ')'), ('{', '}'), ('[', ']'), ('<', '>')];
const TOLERATED_FLAGS: &str = "imsxuUJADXr";

impl Pattern {
    /// Parses a fully-delimited pattern string such as `/foo.*bar/i` or
    /// `{foo.*bar}msx`. The opening and closing delimiters may differ for
    /// the four bracket pairs; any other single byte outside
    /// `[a-zA-Z0-9\]` is used as both.
    pub fn parse_delimited(input: &str) -> Result<Pattern> {
        let mut chars = input.chars();
        let delimiter = chars.next().ok_or_else(|| PcreError::Parse {
            message: "empty input: no delimiter".to_string(),
            offset: 0,
        })?;
        if delimiter.is_ascii_alphanumeric() || delimiter == '\\' {
            return Err(PcreError::Parse {
                message: format!("'{delimiter}' is not a valid delimiter"),
                offset: 0,
            });
        }
        let closing = DELIMITER_PAIRS
            .iter()
            .find(|&&(open, _)| open == delimiter)
            .map(|&(_, close)| close)
            .unwrap_or(delimiter);

        let rest = &input[delimiter.len_utf8()..];
        let close_pos = rest.rfind(closing).ok_or_else(|| PcreError::Parse {
            message: format!("missing closing delimiter '{closing}'"),
            offset: input.len(),
        })?;
        let body = rest[..close_pos].to_string();
        let flags = &rest[close_pos + closing.len_utf8()..];
        for f in flags.chars() {
            if !TOLERATED_FLAGS.contains(f) {
                return Err(PcreError::Parse {
                    message: format!("unrecognized flag '{f}'"),
                    offset: delimiter.len_utf8() + close_pos + closing.len_utf8(),
                });
            }
        }
        Ok(Pattern { body, flags: flags.to_string() })
    }
}

/// Runs lint, redos, and validate together and merges their diagnostics into
/// one list ordered by source offset, the shape a host editor integration
/// consumes (SPEC_FULL.md §3).
#[derive(Debug, Clone)]
pub struct Diagnostics {
    pub validation: ValidationResult,
    pub lint: LintReport,
    pub redos: ReDoSAnalysis,
    pub ordered: Vec<Diagnostic>,
}

/// An adapter PCRE2-toolkit operations may consult to test a literal string
/// against an external matcher, for patterns whose semantics this crate
/// doesn't itself execute. Optional and best-effort — see `RegexAdapter`.
pub trait MatchAdapter {
    fn is_match(&self, pattern: &str, flags: &str, subject: &str) -> Result<bool>;
}

/// A `MatchAdapter` backed by the `regex` crate. `regex`'s own dialect is a
/// strict subset of PCRE2 (no backreferences, no lookaround, no possessive
/// quantifiers), so this is only correct for patterns that fall entirely
/// within that subset; other patterns return a `Complexity` error rather
/// than a wrong answer.
pub struct RegexAdapter;

impl MatchAdapter for RegexAdapter {
    fn is_match(&self, pattern: &str, flags: &str, subject: &str) -> Result<bool> {
        let mut builder = regex::RegexBuilder::new(pattern);
        builder.case_insensitive(flags.contains('i'));
        builder.multi_line(flags.contains('m'));
        builder.dot_matches_new_line(flags.contains('s'));
        builder.ignore_whitespace(flags.contains('x'));
        let re = builder.build().map_err(|e| PcreError::Complexity { reason: e.to_string() })?;
        Ok(re.is_match(subject))
    }
}

/// `parse` (spec.md §4.10): lex + parse the pattern body into an AST.
pub fn parse(body: &str, flags: &str, config: &Config) -> Result<Node> {
    let limits: ParserLimits = config.parser_limits();
    parse_pattern(body, flags, limits)
}

pub fn validate(ast: &Node, flags: &str, config: &Config) -> ValidationResult {
    validator::validate(ast, flags, config.strict_flag_validation)
}

pub fn compile(ast: &Node) -> String {
    compile_ast(ast)
}

pub fn lint(ast: &Node, flags: &str) -> LintReport {
    linter::lint(ast, flags)
}

pub fn optimize(ast: &Node, flags: &str, config: &Config) -> OptimizationResult {
    optimizer::optimize(ast, flags, &config.optimize_config())
}

/// `analyze` (spec.md §4.10): runs the ReDoS analyzer.
pub fn analyze(ast: &Node, flags: &str, config: &Config) -> ReDoSAnalysis {
    redos::analyze(ast, flags, &config.redos_config())
}

pub fn explain(ast: &Node, format: ExplainFormat) -> String {
    explain::explain(ast, format)
}

pub fn highlight(ast: &Node) -> Vec<HighlightToken> {
    highlight::highlight(ast)
}

pub fn generate(ast: &Node, flags: &str, sample_config: &SampleConfig) -> Result<String> {
    sample::generate(ast, flags, sample_config)
}

pub fn literals(ast: &Node, flags: &str) -> LiteralSet {
    literals::extract(ast, flags)
}

pub fn complexity(ast: &Node) -> ComplexityReport {
    complexity::analyze(ast)
}

/// `compare` (spec.md §4.11): relates two patterns as formal languages.
/// Both are compiled through the automata subsystem, so constructs outside
/// the regular subset (lookaround, `\K`, unbounded backreferences,
/// conditionals, recursion) surface as a `Complexity` error the caller
/// handles by downgrading to theoretical analysis.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub intersection_empty: bool,
    pub left_subset_of_right: bool,
    pub right_subset_of_left: bool,
    pub equivalent: bool,
    pub left_only_witness: Option<String>,
    pub right_only_witness: Option<String>,
}

pub fn compare(
    left: &Node,
    left_flags: &str,
    right: &Node,
    right_flags: &str,
    config: &Config,
) -> Result<Comparison> {
    let algorithm = config.minimization.into();
    let a = automata::compile_to_dfa(left, left_flags, algorithm)?;
    let b = automata::compile_to_dfa(right, right_flags, algorithm)?;

    let intersection = automata::intersect(&a, &b);
    let left_only = automata::difference(&a, &b);
    let right_only = automata::difference(&b, &a);

    Ok(Comparison {
        intersection_empty: automata::is_empty(&intersection),
        left_subset_of_right: automata::is_subset(&a, &b),
        right_subset_of_left: automata::is_subset(&b, &a),
        equivalent: automata::is_equivalent(&a, &b),
        left_only_witness: automata::shortest_witness(&left_only),
        right_only_witness: automata::shortest_witness(&right_only),
    })
}

/// `compare` variant when only the DFAs (not the source ASTs) are in hand —
/// useful for the optimizer's own equivalence verification pass.
pub fn compare_dfas(a: &Dfa, b: &Dfa) -> Comparison {
    let intersection = automata::intersect(a, b);
    let left_only = automata::difference(a, b);
    let right_only = automata::difference(b, a);
    Comparison {
        intersection_empty: automata::is_empty(&intersection),
        left_subset_of_right: automata::is_subset(a, b),
        right_subset_of_left: automata::is_subset(b, a),
        equivalent: automata::is_equivalent(a, b),
        left_only_witness: automata::shortest_witness(&left_only),
        right_only_witness: automata::shortest_witness(&right_only),
    }
}

/// Runs lint, redos, and validate and merges them into one list of
/// `Diagnostic`s ordered by source offset.
pub fn diagnostics(ast: &Node, flags: &str, config: &Config) -> Diagnostics {
    let validation = validate(ast, flags, config);
    let lint = lint(ast, flags);
    let redos = analyze(ast, flags, config);

    let mut ordered: Vec<Diagnostic> = Vec::new();
    ordered.extend(validation.errors.iter().map(|e| Diagnostic {
        code: e.code.clone(),
        message: e.message.clone(),
        offset: e.offset,
    }));
    ordered.extend(lint.issues.iter().map(|i| Diagnostic {
        code: i.id.to_string(),
        message: i.message.clone(),
        offset: i.byte_range.0,
    }));
    if redos.score > 0 {
        ordered.push(Diagnostic {
            code: format!("REDOS_{:?}", redos.severity).to_uppercase(),
            message: redos.trigger.clone().unwrap_or_else(|| "potential ReDoS".to_string()),
            offset: 0,
        });
    }
    ordered.sort_by_key(|d| d.offset);
    Diagnostics { validation, lint, redos, ordered }
}

/// Derives a cache key over `(body, flags, config)` suitable for memoizing
/// any of the above operations.
pub fn pattern_cache_key(body: &str, flags: &str, config: &Config) -> String {
    cache_key(body, flags, config)
}

/// Whether `match_mode` asks for a full-string match rather than
/// search-anywhere; the automata-based operations above always treat
/// patterns as anchored, so this records the caller's intent for the parts
/// of the pipeline that care (e.g. a future matcher built on this crate).
pub fn requires_full_match(config: &Config) -> bool {
    matches!(config.match_mode, MatchMode::Full)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_delimited_splits_body_and_flags() {
        let p = Pattern::parse_delimited("/a.*b/im").unwrap();
        assert_eq!(p.body, "a.*b");
        assert_eq!(p.flags, "im");
    }

    #[test]
    fn parse_delimited_supports_bracket_pairs() {
        let p = Pattern::parse_delimited("{a+b}x").unwrap();
        assert_eq!(p.body, "a+b");
        assert_eq!(p.flags, "x");
    }

    #[test]
    fn parse_delimited_rejects_unknown_flags() {
        let err = Pattern::parse_delimited("/a/q");
        assert!(err.is_err());
    }

    #[test]
    fn end_to_end_parse_and_compile_round_trips() {
        let config = Config::default();
        let p = Pattern::parse_delimited("/a+b*/").unwrap();
        let ast = parse(&p.body, &p.flags, &config).unwrap();
        assert_eq!(compile(&ast), "a+b*");
    }

    #[test]
    fn diagnostics_merges_and_orders_by_offset() {
        let config = Config::default();
        let ast = parse("(?i)a", "", &config).unwrap();
        let report = diagnostics(&ast, "", &config);
        assert!(report.ordered.windows(2).all(|w| w[0].offset <= w[1].offset));
    }

    #[test]
    fn compare_detects_equivalent_patterns() {
        let config = Config::default();
        let a = parse("a|b", "", &config).unwrap();
        let b = parse("[ab]", "", &config).unwrap();
        let result = compare(&a, "", &b, "", &config).unwrap();
        assert!(result.equivalent);
    }

    #[test]
    fn compare_reports_witnesses_for_unrelated_patterns() {
        let config = Config::default();
        let a = parse("a", "", &config).unwrap();
        let b = parse("b", "", &config).unwrap();
        let result = compare(&a, "", &b, "", &config).unwrap();
        assert!(!result.equivalent);
        assert!(result.left_only_witness.is_some());
        assert!(result.right_only_witness.is_some());
    }

    #[test]
    fn cache_key_is_stable_for_identical_inputs() {
        let config = Config::default();
        assert_eq!(pattern_cache_key("a+", "i", &config), pattern_cache_key("a+", "i", &config));
    }
}
