//! Rule-based lint pass (spec.md §4.7). Every rule is a free function over
//! the AST producing zero or more [`Issue`]s; `lint` just runs them all and
//! tallies severities.

use crate::ast::*;
use crate::compiler::compile;
use crate::token::Span;
use crate::visitor::collect_where;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Style,
    Perf,
}

#[derive(Debug, Clone)]
pub struct Issue {
    pub id: &'static str,
    pub severity: Severity,
    pub message: String,
    pub hint: Option<String>,
    pub byte_range: (usize, usize),
    pub suggested_rewrite: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LintStats {
    pub errors: usize,
    pub warnings: usize,
    pub style: usize,
    pub perf: usize,
}

#[derive(Debug, Clone)]
pub struct LintReport {
    pub issues: Vec<Issue>,
    pub stats: LintStats,
}

pub fn lint(ast: &Node, flags: &str) -> LintReport {
    let mut issues = Vec::new();
    check_useless_flags(ast, flags, &mut issues);
    check_suspicious_ranges(ast, &mut issues);
    check_char_class_hygiene(ast, &mut issues);
    check_empty_alternatives(ast, &mut issues);
    check_redundant_quantifiers(ast, &mut issues);
    check_duplicate_branches(ast, &mut issues);
    check_useless_backrefs(ast, &mut issues);
    check_unbounded_alternation_overlap(ast, &mut issues);
    check_catastrophic_nesting(ast, &mut issues);

    let mut stats = LintStats::default();
    for issue in &issues {
        match issue.severity {
            Severity::Error => stats.errors += 1,
            Severity::Warning => stats.warnings += 1,
            Severity::Style => stats.style += 1,
            Severity::Perf => stats.perf += 1,
        }
    }
    LintReport { issues, stats }
}

fn span_range(s: Span) -> (usize, usize) {
    (s.start, s.end)
}

fn check_useless_flags(ast: &Node, flags: &str, issues: &mut Vec<Issue>) {
    let has_dot = !collect_where(ast, |n| matches!(n, Node::Dot(_))).is_empty();
    let has_line_anchor = !collect_where(ast, |n| {
        matches!(n, Node::Anchor(a) if matches!(a.kind, AnchorKind::Caret | AnchorKind::Dollar))
    })
    .is_empty();
    let has_case_bearing = !collect_where(ast, |n| match n {
        Node::Literal(l) => l.value.chars().any(|c| c.is_alphabetic()),
        Node::Range(r) => r.start.is_alphabetic() || r.end.is_alphabetic(),
        _ => false,
    })
    .is_empty();

    if flags.contains('s') && !has_dot {
        issues.push(Issue {
            id: "regex.lint.flags.useless_s",
            severity: Severity::Style,
            message: "the 's' flag has no effect: the pattern contains no '.'".into(),
            hint: Some("drop the 's' flag".into()),
            byte_range: span_range(ast.span()),
            suggested_rewrite: None,
        });
    }
    if flags.contains('m') && !has_line_anchor {
        issues.push(Issue {
            id: "regex.lint.flags.useless_m",
            severity: Severity::Style,
            message: "the 'm' flag has no effect: the pattern uses no '^' or '$'".into(),
            hint: Some("drop the 'm' flag".into()),
            byte_range: span_range(ast.span()),
            suggested_rewrite: None,
        });
    }
    if flags.contains('i') && !has_case_bearing {
        issues.push(Issue {
            id: "regex.lint.flags.useless_i",
            severity: Severity::Style,
            message: "the 'i' flag has no effect: the pattern has no case-bearing characters".into(),
            hint: Some("drop the 'i' flag".into()),
            byte_range: span_range(ast.span()),
            suggested_rewrite: None,
        });
    }
}

/// ASCII gaps between the letter blocks, whose inclusion in a range is
/// almost always an accident (`[A-z]` pulls in `[\]^_` `` ` ``).
const ASCII_GAPS: &[(u32, u32)] = &[
    (0x3A, 0x40), // '9'+1 .. 'A'-1 : ":;<=>?@"
    (0x5B, 0x60), // 'Z'+1 .. 'a'-1 : "[\]^_`"
];

fn check_suspicious_ranges(ast: &Node, issues: &mut Vec<Issue>) {
    // Ranges only ever appear as `ClassItem::Range` inside a `CharClass`; the
    // bare `Node::Range` variant exists for AST symmetry but the parser never
    // emits one outside a class, so classes are scanned directly here rather
    // than walked through `Node::children()`.
    for node in collect_where(ast, |n| matches!(n, Node::CharClass(_))) {
        let Node::CharClass(cc) = node else { continue };
        let ranges: Vec<&Range> = cc
            .items
            .iter()
            .filter_map(|item| if let ClassItem::Range(r) = item { Some(r) } else { None })
            .collect();
        for r in ranges {
            let (start, end) = (r.start as u32, r.end as u32);
            for &(gap_lo, gap_hi) in ASCII_GAPS {
                if start < gap_lo && end > gap_hi {
                    issues.push(Issue {
                        id: "regex.lint.range.suspicious_ascii",
                        severity: Severity::Warning,
                        message: format!(
                            "range '{}-{}' spans an ASCII punctuation gap and likely includes unintended characters",
                            r.start, r.end
                        ),
                        hint: Some("split into separate upper/lower-case ranges, e.g. [A-Za-z]".into()),
                        byte_range: span_range(r.span),
                        suggested_rewrite: Some("[A-Za-z]".into()),
                    });
                }
            }
            if start == end {
                issues.push(Issue {
                    id: "regex.lint.range.useless",
                    severity: Severity::Style,
                    message: format!("range '{}-{}' matches exactly one character", r.start, r.end),
                    hint: Some(format!("replace with the literal '{}'", r.start)),
                    byte_range: span_range(r.span),
                    suggested_rewrite: Some(r.start.to_string()),
                });
            }
        }
    }
}

fn check_char_class_hygiene(ast: &Node, issues: &mut Vec<Issue>) {
    for node in collect_where(ast, |n| matches!(n, Node::CharClass(_))) {
        let Node::CharClass(cc) = node else { continue };
        let mut seen = HashSet::new();
        for item in &cc.items {
            if let ClassItem::Literal(l) = item {
                if !seen.insert(l.value) {
                    issues.push(Issue {
                        id: "regex.lint.char_class.duplicate_member",
                        severity: Severity::Style,
                        message: format!("character '{}' appears more than once in this class", l.value),
                        hint: Some("remove the duplicate".into()),
                        byte_range: span_range(l.span),
                        suggested_rewrite: None,
                    });
                }
            }
        }
    }
}

fn check_empty_alternatives(ast: &Node, issues: &mut Vec<Issue>) {
    for node in collect_where(ast, |n| matches!(n, Node::Alternation(_))) {
        let Node::Alternation(a) = node else { continue };
        for branch in &a.branches {
            // An empty alternative parses to a zero-length literal, not an
            // empty `Sequence` — the parser never builds a `Sequence` with
            // fewer than two children (see `wrap_sequence`).
            let is_empty = matches!(branch, Node::Literal(l) if l.value.is_empty());
            if is_empty {
                issues.push(Issue {
                    id: "regex.lint.alternation.empty_branch",
                    severity: Severity::Warning,
                    message: "this alternative matches the empty string; it likely masks later branches".into(),
                    hint: Some("did you mean to make the whole group optional with '?' instead?".into()),
                    byte_range: span_range(a.span),
                    suggested_rewrite: None,
                });
            }
        }
    }
}

fn check_redundant_quantifiers(ast: &Node, issues: &mut Vec<Issue>) {
    for node in collect_where(ast, |n| matches!(n, Node::Quantifier(_))) {
        let Node::Quantifier(q) = node else { continue };
        if q.min == 1 && q.max == Some(1) {
            issues.push(Issue {
                id: "regex.lint.quantifier.redundant_one",
                severity: Severity::Style,
                message: "'{1}' repeats its atom exactly once and can be dropped".into(),
                hint: Some("remove the quantifier".into()),
                byte_range: span_range(q.span),
                suggested_rewrite: Some(compile(&q.child)),
            });
        }
        if q.min == 0 && q.max == Some(0) {
            issues.push(Issue {
                id: "regex.lint.quantifier.zero",
                severity: Severity::Warning,
                message: "'{0}' never matches its atom; the subpattern is dead code".into(),
                hint: Some("remove the atom entirely".into()),
                byte_range: span_range(q.span),
                suggested_rewrite: Some(String::new()),
            });
        }
    }
}

fn check_duplicate_branches(ast: &Node, issues: &mut Vec<Issue>) {
    for node in collect_where(ast, |n| matches!(n, Node::Alternation(_))) {
        let Node::Alternation(a) = node else { continue };
        let texts: Vec<String> = a.branches.iter().map(compile).collect();
        for i in 0..texts.len() {
            for j in (i + 1)..texts.len() {
                if texts[i] == texts[j] {
                    issues.push(Issue {
                        id: "regex.lint.alternation.duplicate_disjunction",
                        severity: Severity::Warning,
                        message: format!("alternative {} is a duplicate of alternative {}", j + 1, i + 1),
                        hint: Some("remove the redundant branch".into()),
                        byte_range: span_range(a.branches[j].span()),
                        suggested_rewrite: None,
                    });
                }
            }
        }
    }
}

fn check_useless_backrefs(ast: &Node, issues: &mut Vec<Issue>) {
    let mut referenced_indices: HashSet<u32> = HashSet::new();
    let mut referenced_names: HashSet<String> = HashSet::new();
    for node in collect_where(ast, |n| matches!(n, Node::Backref(_) | Node::Subroutine(_))) {
        match node {
            Node::Backref(b) => {
                if let Some(idx) = b.index {
                    if idx > 0 {
                        referenced_indices.insert(idx as u32);
                    }
                }
                if let Some(name) = &b.name {
                    referenced_names.insert(name.clone());
                }
            }
            Node::Subroutine(s) => match &s.reference {
                SubroutineRef::Numbered(n) if *n > 0 => {
                    referenced_indices.insert(*n as u32);
                }
                SubroutineRef::Named(name) => {
                    referenced_names.insert(name.clone());
                }
                _ => {}
            },
            _ => {}
        }
    }

    for node in collect_where(ast, |n| matches!(n, Node::Group(_))) {
        let Node::Group(g) = node else { continue };
        let (idx, name) = match &g.kind {
            GroupKind::Capturing { index } => (Some(*index), None),
            GroupKind::Named { index, name } => (Some(*index), Some(name.clone())),
            _ => continue,
        };
        let referenced = idx.is_some_and(|i| referenced_indices.contains(&i))
            || name.as_ref().is_some_and(|n| referenced_names.contains(n));
        if !referenced {
            issues.push(Issue {
                id: "regex.lint.group.never_referenced",
                severity: Severity::Perf,
                message: "this capturing group is never backreferenced and could be non-capturing".into(),
                hint: Some("rewrite as '(?:...)' if you don't need the captured text".into()),
                byte_range: span_range(g.span),
                suggested_rewrite: None,
            });
        }
    }
}

/// First-char set for the small family of atoms cheap enough to compute one
/// for; anything else returns `None` (treated as "unknown", never flagged).
fn first_set(node: &Node) -> Option<Vec<(u32, u32)>> {
    match node {
        Node::Literal(l) => l.value.chars().next().map(|c| vec![(c as u32, c as u32)]),
        Node::CharType(c) => Some(char_type_ranges(c.kind)),
        Node::CharClass(cc) if !cc.negated => {
            let mut ranges = Vec::new();
            for item in &cc.items {
                match item {
                    ClassItem::Literal(l) => ranges.push((l.value as u32, l.value as u32)),
                    ClassItem::Range(r) => ranges.push((r.start as u32, r.end as u32)),
                    ClassItem::CharType(c) => ranges.extend(char_type_ranges(c.kind)),
                    _ => return None,
                }
            }
            Some(ranges)
        }
        Node::Sequence(s) => s.children.first().and_then(first_set),
        _ => None,
    }
}

fn char_type_ranges(kind: CharTypeKind) -> Vec<(u32, u32)> {
    use CharTypeKind::*;
    match kind {
        Digit => vec![('0' as u32, '9' as u32)],
        Word => vec![
            ('a' as u32, 'z' as u32),
            ('A' as u32, 'Z' as u32),
            ('0' as u32, '9' as u32),
            ('_' as u32, '_' as u32),
        ],
        Space => vec![(' ' as u32, ' ' as u32), (0x09, 0x0D)],
        _ => vec![],
    }
}

fn intersects(a: &[(u32, u32)], b: &[(u32, u32)]) -> bool {
    a.iter().any(|&(s1, e1)| b.iter().any(|&(s2, e2)| s1 <= e2 && s2 <= e1))
}

fn check_unbounded_alternation_overlap(ast: &Node, issues: &mut Vec<Issue>) {
    for node in collect_where(ast, |n| matches!(n, Node::Quantifier(q) if q.max.is_none())) {
        let Node::Quantifier(q) = node else { continue };
        let Node::Alternation(a) = unwrap_single_group(&q.child) else { continue };
        let sets: Vec<Option<Vec<(u32, u32)>>> = a.branches.iter().map(first_set).collect();
        for i in 0..sets.len() {
            for j in (i + 1)..sets.len() {
                if let (Some(si), Some(sj)) = (&sets[i], &sets[j]) {
                    if intersects(si, sj) {
                        issues.push(Issue {
                            id: "regex.lint.alternation.unbounded_overlap",
                            severity: Severity::Perf,
                            message: "alternatives inside this unbounded repetition can both match the same character, a common source of catastrophic backtracking".into(),
                            hint: Some("defer to the ReDoS analyzer for a severity score".into()),
                            byte_range: span_range(a.span),
                            suggested_rewrite: None,
                        });
                    }
                }
            }
        }
    }
}

fn unwrap_single_group(node: &Node) -> &Node {
    match node {
        Node::Group(g) => unwrap_single_group(&g.child),
        Node::Sequence(s) if s.children.len() == 1 => unwrap_single_group(&s.children[0]),
        other => other,
    }
}

fn check_catastrophic_nesting(ast: &Node, issues: &mut Vec<Issue>) {
    for node in collect_where(ast, |n| matches!(n, Node::Quantifier(q) if q.max.is_none())) {
        let Node::Quantifier(q) = node else { continue };
        let inner = unwrap_single_group(&q.child);
        let has_nested_unbounded = !collect_where(inner, |n| matches!(n, Node::Quantifier(q) if q.max.is_none())).is_empty();
        if has_nested_unbounded {
            issues.push(Issue {
                id: "regex.lint.quantifier.catastrophic_nesting",
                severity: Severity::Perf,
                message: "an unbounded quantifier nests inside another unbounded quantifier".into(),
                hint: Some("run the ReDoS analyzer for a severity score and a witness input".into()),
                byte_range: span_range(q.span),
                suggested_rewrite: None,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_pattern, ParserLimits};

    fn lint_of(body: &str, flags: &str) -> LintReport {
        let ast = parse_pattern(body, flags, ParserLimits::default()).unwrap();
        lint(&ast, flags)
    }

    fn has(report: &LintReport, id: &str) -> bool {
        report.issues.iter().any(|i| i.id == id)
    }

    #[test]
    fn flags_useless_s() {
        let report = lint_of("abc", "s");
        assert!(has(&report, "regex.lint.flags.useless_s"));
    }

    #[test]
    fn suspicious_ascii_range() {
        let report = lint_of("[A-z]", "");
        assert!(has(&report, "regex.lint.range.suspicious_ascii"));
    }

    #[test]
    fn useless_range() {
        let report = lint_of("[a-a]", "");
        assert!(has(&report, "regex.lint.range.useless"));
    }

    #[test]
    fn duplicate_char_class_member() {
        let report = lint_of("[aa]", "");
        assert!(has(&report, "regex.lint.char_class.duplicate_member"));
    }

    #[test]
    fn redundant_and_zero_quantifiers() {
        let report = lint_of("a{1}b{0}", "");
        assert!(has(&report, "regex.lint.quantifier.redundant_one"));
        assert!(has(&report, "regex.lint.quantifier.zero"));
    }

    #[test]
    fn duplicate_alternation_branch() {
        let report = lint_of("cat|dog|cat", "");
        assert!(has(&report, "regex.lint.alternation.duplicate_disjunction"));
    }

    #[test]
    fn never_referenced_capture_group() {
        let report = lint_of("(abc)def", "");
        assert!(has(&report, "regex.lint.group.never_referenced"));
    }

    #[test]
    fn referenced_capture_group_is_not_flagged() {
        let report = lint_of("(a)\\1", "");
        assert!(!has(&report, "regex.lint.group.never_referenced"));
    }

    #[test]
    fn unbounded_alternation_overlap_flagged() {
        let report = lint_of("(?:a|ab)*", "");
        assert!(has(&report, "regex.lint.alternation.unbounded_overlap"));
    }

    #[test]
    fn catastrophic_nesting_flagged() {
        let report = lint_of("(a*)*", "");
        assert!(has(&report, "regex.lint.quantifier.catastrophic_nesting"));
    }

    #[test]
    fn empty_alternative_flagged() {
        let report = lint_of("a|", "");
        assert!(has(&report, "regex.lint.alternation.empty_branch"));
    }
}
