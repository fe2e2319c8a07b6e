//! ReDoS analysis (spec.md §4.8): two composable modes. Theoretical walks
//! the AST for the shape of catastrophic/quadratic backtracking; confirmed
//! builds the pattern's NFA and looks for a state reachable in a one-step
//! cycle with more than one live thread that can still reach acceptance —
//! the signature of pumpable ambiguity.

use crate::ast::*;
use crate::automata::dfa::effective_alphabet;
use crate::automata::nfa::{build_nfa, Label, Nfa};
use crate::compiler::compile;
use crate::token::Span;
use crate::visitor::collect_where;
use std::collections::{BTreeSet, HashMap, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Safe,
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Off,
    Theoretical,
    Confirmed,
    Both,
}

#[derive(Debug, Clone)]
pub struct RedosConfig {
    pub mode: Mode,
    pub threshold: u8,
    /// No real JIT backs this analyzer, so this only documents parity with
    /// the facade's configuration surface — confirmed-mode results are
    /// already deterministic and JIT-independent.
    pub disable_jit: bool,
}

impl Default for RedosConfig {
    fn default() -> Self {
        Self { mode: Mode::Theoretical, threshold: 50, disable_jit: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone)]
pub struct ReDoSAnalysis {
    pub severity: Severity,
    pub score: u8,
    pub trigger: Option<String>,
    pub confidence: Confidence,
    pub false_positive_risk: Option<String>,
    pub recommendations: Vec<String>,
    pub suggested_rewrite: Option<String>,
}

type Finding = (Severity, String, Vec<String>, Option<String>);

pub fn analyze(ast: &Node, flags: &str, config: &RedosConfig) -> ReDoSAnalysis {
    let mut best: Option<Finding> = None;

    if matches!(config.mode, Mode::Theoretical | Mode::Both) {
        for finding in theoretical_findings(ast) {
            if best.as_ref().map_or(true, |(b, _, _, _)| finding.0 > *b) {
                best = Some(finding);
            }
        }
    }

    let mut confidence = if matches!(config.mode, Mode::Theoretical) { Confidence::Medium } else { Confidence::Low };
    let mut false_positive_risk =
        Some("structural detectors flag suspicious shapes, not a proven backtracking blowup".to_string());

    if matches!(config.mode, Mode::Confirmed | Mode::Both) {
        match confirmed_witness(ast, flags) {
            Some(witness) => {
                confidence = Confidence::High;
                false_positive_risk = None;
                let finding: Finding = (
                    Severity::Critical,
                    format!("pumpable input around: {witness:?}"),
                    vec!["rewrite the ambiguous repetition so its branches or nested quantifier cannot both consume the same character".into()],
                    None,
                );
                if best.as_ref().map_or(true, |(b, _, _, _)| finding.0 >= *b) {
                    best = Some(finding);
                }
            }
            None if matches!(config.mode, Mode::Confirmed) => {
                confidence = Confidence::High;
            }
            None => {}
        }
    }

    let (severity, trigger, recommendations, suggested_rewrite) =
        best.unwrap_or((Severity::Safe, String::new(), Vec::new(), None));
    let score = severity_score(severity);
    ReDoSAnalysis {
        severity,
        score,
        trigger: if trigger.is_empty() { None } else { Some(trigger) },
        confidence,
        false_positive_risk,
        recommendations: recommendations.into_iter().take(3).collect(),
        suggested_rewrite,
    }
}

pub fn is_safe(analysis: &ReDoSAnalysis, threshold: u8) -> bool {
    analysis.score <= threshold
}

fn severity_score(s: Severity) -> u8 {
    match s {
        Severity::Safe => 0,
        Severity::Low => 20,
        Severity::Medium => 50,
        Severity::High => 75,
        Severity::Critical => 95,
    }
}

fn downgrade(sev: Severity) -> Severity {
    match sev {
        Severity::Critical => Severity::High,
        Severity::High => Severity::Medium,
        Severity::Medium => Severity::Low,
        Severity::Low | Severity::Safe => Severity::Safe,
    }
}

/// Possessive quantifiers forbid the backtracking overlap these detectors
/// look for, so a finding on the hot path is downgraded one tier rather than
/// dropped outright (the surrounding pattern may still combine badly with it).
fn dampen(sev: Severity, quantifiers: &[&Quantifier]) -> Severity {
    if quantifiers.iter().any(|q| q.mode == QuantifierMode::Possessive) {
        downgrade(sev)
    } else {
        sev
    }
}

/// `q` rewritten with `inner` (the capture/non-capture wrapper already
/// stripped off `q`'s child) wrapped in an atomic group instead, e.g. `a+`
/// inside `(a+)+` becomes `(?>a+)+` — forbids backtracking back into the
/// repetition once it has committed to a split. The rewritten quantifier is
/// substituted back into `root` (the whole pattern) before compiling, so
/// surrounding context such as a trailing `$` anchor survives.
fn atomic_wrap_suggestion(root: &Node, q: &Quantifier, inner: &Node) -> String {
    let wrapped = Node::Group(Group {
        span: q.span,
        kind: GroupKind::Atomic,
        child: Box::new(inner.clone()),
        name_syntax: None,
        flags_set: None,
        flags_unset: None,
    });
    let replacement = Node::Quantifier(Quantifier { child: Box::new(wrapped), ..q.clone() });
    compile(&substitute(root, q.span, &replacement))
}

/// `q` rewritten with `target`'s quantifier mode switched to possessive,
/// leaving the rest of the tree (including any group wrapper) untouched, then
/// substituted back into `root` so the full pattern — anchors included — is
/// what gets compiled.
fn possessive_inner_suggestion(root: &Node, q: &Quantifier, target: &Quantifier) -> String {
    let rewritten = make_possessive(&q.child, target.span);
    let replacement = Node::Quantifier(Quantifier { child: Box::new(rewritten), ..q.clone() });
    compile(&substitute(root, q.span, &replacement))
}

fn make_possessive(node: &Node, target: Span) -> Node {
    match node {
        Node::Quantifier(inner) if inner.span == target => {
            Node::Quantifier(Quantifier { mode: QuantifierMode::Possessive, ..inner.clone() })
        }
        Node::Quantifier(inner) => {
            Node::Quantifier(Quantifier { child: Box::new(make_possessive(&inner.child, target)), ..inner.clone() })
        }
        Node::Group(g) => Node::Group(Group { child: Box::new(make_possessive(&g.child, target)), ..g.clone() }),
        Node::Sequence(s) => Node::Sequence(Sequence {
            children: s.children.iter().map(|c| make_possessive(c, target)).collect(),
            ..s.clone()
        }),
        other => other.clone(),
    }
}

/// Replaces the subtree of `node` whose span equals `target` with
/// `replacement`, leaving everything else untouched. Used to splice a
/// rewritten quantifier back into the full regex AST so a suggested rewrite
/// keeps the pattern's surrounding anchors and literals instead of being
/// compiled in isolation.
fn substitute(node: &Node, target: Span, replacement: &Node) -> Node {
    if node.span() == target {
        return replacement.clone();
    }
    match node {
        Node::Regex(r) => Node::Regex(Regex {
            child: Box::new(substitute(&r.child, target, replacement)),
            ..r.clone()
        }),
        Node::Sequence(s) => Node::Sequence(Sequence {
            children: s.children.iter().map(|c| substitute(c, target, replacement)).collect(),
            ..s.clone()
        }),
        Node::Alternation(a) => Node::Alternation(Alternation {
            branches: a.branches.iter().map(|b| substitute(b, target, replacement)).collect(),
            ..a.clone()
        }),
        Node::Group(g) => Node::Group(Group { child: Box::new(substitute(&g.child, target, replacement)), ..g.clone() }),
        Node::Quantifier(q) => {
            Node::Quantifier(Quantifier { child: Box::new(substitute(&q.child, target, replacement)), ..q.clone() })
        }
        Node::Conditional(c) => Node::Conditional(Conditional {
            yes: Box::new(substitute(&c.yes, target, replacement)),
            no: c.no.as_ref().map(|n| Box::new(substitute(n, target, replacement))),
            ..c.clone()
        }),
        other => other.clone(),
    }
}

fn unwrap_single_group(node: &Node) -> &Node {
    match node {
        Node::Group(g) if !matches!(g.kind, GroupKind::Atomic) => unwrap_single_group(&g.child),
        other => other,
    }
}

fn is_on_atomic_path(node: &Node) -> bool {
    matches!(node, Node::Group(g) if matches!(g.kind, GroupKind::Atomic))
}

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
        Node::Quantifier(q) => first_set(&q.child),
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

fn theoretical_findings(ast: &Node) -> Vec<Finding> {
    let mut out = Vec::new();

    for node in collect_where(ast, |n| matches!(n, Node::Quantifier(q) if q.max.is_none())) {
        let Node::Quantifier(q) = node else { continue };
        let inner = unwrap_single_group(&q.child);
        let atomic = is_on_atomic_path(&q.child);

        if let Node::Quantifier(inner_q) = inner {
            if inner_q.min == 0 {
                let sev =
                    if atomic { downgrade(Severity::Critical) } else { dampen(Severity::Critical, &[q, inner_q]) };
                out.push((
                    sev,
                    compile(node),
                    vec![
                        "require the inner repetition to consume at least one character".into(),
                        "or collapse the nested repetition into a single bounded quantifier".into(),
                    ],
                    Some(format!(
                        "{} or {}",
                        atomic_wrap_suggestion(ast, q, inner),
                        possessive_inner_suggestion(ast, q, inner_q)
                    )),
                ));
                continue;
            }

            // The classic catastrophic shape: an unbounded quantifier directly
            // wrapping another unbounded quantifier whose first character can
            // recur, e.g. `(a+)+` — every extra repetition of the outer
            // quantifier can redistribute the same characters across the
            // inner one, multiplying the number of equivalent parses.
            if inner_q.max.is_none() && first_set(&inner_q.child).is_some_and(|s| !s.is_empty()) {
                let sev =
                    if atomic { downgrade(Severity::Critical) } else { dampen(Severity::Critical, &[q, inner_q]) };
                out.push((
                    sev,
                    compile(node),
                    vec!["make the inner or outer repetition possessive, or wrap the inner one in an atomic group".into()],
                    Some(format!(
                        "{} or {}",
                        atomic_wrap_suggestion(ast, q, inner),
                        possessive_inner_suggestion(ast, q, inner_q)
                    )),
                ));
                continue;
            }
        }

        for n2 in collect_where(inner, |n| matches!(n, Node::Quantifier(q2) if q2.max.is_none())) {
            let Node::Quantifier(q2) = n2 else { continue };
            if first_set(&q2.child).is_some_and(|s| !s.is_empty()) {
                let sev = if atomic { downgrade(Severity::High) } else { dampen(Severity::High, &[q, q2]) };
                out.push((
                    sev,
                    compile(node),
                    vec!["make the inner or outer repetition possessive/atomic to forbid the overlap".into()],
                    Some(format!(
                        "{} or {}",
                        atomic_wrap_suggestion(ast, q, inner),
                        possessive_inner_suggestion(ast, q, q2)
                    )),
                ));
            }
        }

        if let Node::Alternation(a) = inner {
            let sets: Vec<Option<Vec<(u32, u32)>>> = a.branches.iter().map(first_set).collect();
            for i in 0..sets.len() {
                for j in (i + 1)..sets.len() {
                    if let (Some(si), Some(sj)) = (&sets[i], &sets[j]) {
                        if intersects(si, sj) {
                            let sev = if atomic { downgrade(Severity::Medium) } else { dampen(Severity::Medium, &[q]) };
                            out.push((
                                sev,
                                compile(node),
                                vec!["make the alternatives mutually exclusive, or factor their shared prefix out of the repetition".into()],
                                Some(atomic_wrap_suggestion(ast, q, inner)),
                            ));
                        }
                    }
                }
            }
        }
    }

    for node in collect_where(ast, |n| matches!(n, Node::Sequence(_))) {
        let Node::Sequence(s) = node else { continue };
        for w in s.children.windows(2) {
            if let (Node::Quantifier(q1), Node::Quantifier(q2)) = (&w[0], &w[1]) {
                if q1.max.is_none() || q2.max.is_none() {
                    if let (Some(s1), Some(s2)) = (first_set(&q1.child), first_set(&q2.child)) {
                        if intersects(&s1, &s2) {
                            out.push((
                                Severity::Medium,
                                format!("{}{}", compile(&w[0]), compile(&w[1])),
                                vec!["merge the adjacent quantifiers into one bound, or make one possessive".into()],
                                None,
                            ));
                        }
                    }
                }
            }
        }
    }

    out
}

fn epsilon_closure(nfa: &Nfa, seeds: &[usize]) -> BTreeSet<usize> {
    let mut closure: BTreeSet<usize> = seeds.iter().copied().collect();
    let mut stack: Vec<usize> = seeds.to_vec();
    while let Some(s) = stack.pop() {
        for (label, to) in &nfa.states[s].transitions {
            if matches!(label, Label::Epsilon) && closure.insert(*to) {
                stack.push(*to);
            }
        }
    }
    closure
}

fn can_reach_accept(nfa: &Nfa, from: &BTreeSet<usize>) -> bool {
    let mut visited: BTreeSet<usize> = from.clone();
    let mut stack: Vec<usize> = from.iter().copied().collect();
    while let Some(s) = stack.pop() {
        if s == nfa.accept {
            return true;
        }
        for (_, to) in &nfa.states[s].transitions {
            if visited.insert(*to) {
                stack.push(*to);
            }
        }
    }
    false
}

const MAX_CONFIRMED_STATES: usize = 4096;

/// Runs subset construction by hand (rather than reusing `automata::dfa`,
/// which discards each state's originating NFA-state-set) looking for a
/// subset state reachable from itself in one alphabet step while holding
/// more than one live NFA thread and still able to reach acceptance — the
/// classic sufficient condition for exponential pumping. Only catches
/// single-step self-loops, not longer pumping cycles through intermediate
/// subset states; a clean pass is evidence of safety, not proof.
fn confirmed_witness(ast: &Node, flags: &str) -> Option<String> {
    let nfa = build_nfa(ast, flags).ok()?;
    let alphabet = effective_alphabet(&nfa);
    if alphabet.is_empty() {
        return None;
    }

    let start_set = epsilon_closure(&nfa, &[nfa.start]);
    let mut index_of: HashMap<BTreeSet<usize>, usize> = HashMap::new();
    let mut sets: Vec<BTreeSet<usize>> = Vec::new();
    index_of.insert(start_set.clone(), 0);
    sets.push(start_set);

    let mut queue: VecDeque<(usize, String)> = VecDeque::new();
    queue.push_back((0, String::new()));
    let mut seen_index: BTreeSet<usize> = BTreeSet::from([0]);

    while let Some((idx, path)) = queue.pop_front() {
        let set = sets[idx].clone();
        for &(lo, _) in &alphabet {
            let mut targets: BTreeSet<usize> = BTreeSet::new();
            for &s in &set {
                for (label, to) in &nfa.states[s].transitions {
                    if let Label::CharSet(cs) = label {
                        if cs.contains(lo) {
                            targets.insert(*to);
                        }
                    }
                }
            }
            if targets.is_empty() {
                continue;
            }
            let closure = epsilon_closure(&nfa, &targets.into_iter().collect::<Vec<_>>());

            let mut next_path = path.clone();
            if let Some(c) = char::from_u32(lo) {
                next_path.push(c);
            }

            if closure == set && set.len() > 1 && can_reach_accept(&nfa, &set) {
                return Some(next_path);
            }

            let next_idx = if let Some(&i) = index_of.get(&closure) {
                i
            } else {
                let i = sets.len();
                index_of.insert(closure.clone(), i);
                sets.push(closure);
                i
            };
            if seen_index.insert(next_idx) {
                queue.push_back((next_idx, next_path));
            }
        }
        if sets.len() > MAX_CONFIRMED_STATES {
            break;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_pattern, ParserLimits};

    fn analyze_body(body: &str, mode: Mode) -> ReDoSAnalysis {
        let ast = parse_pattern(body, "", ParserLimits::default()).unwrap();
        analyze(&ast, "", &RedosConfig { mode, threshold: 50, disable_jit: false })
    }

    #[test]
    fn flags_empty_match_repetition() {
        let result = analyze_body("(a*)*", Mode::Theoretical);
        assert_eq!(result.severity, Severity::Critical);
    }

    #[test]
    fn flags_nested_unbounded_quantifiers() {
        let result = analyze_body("(a+)+", Mode::Theoretical);
        assert!(result.severity >= Severity::High);
    }

    #[test]
    fn flags_overlapping_alternation() {
        let result = analyze_body("(?:a|ab)*", Mode::Theoretical);
        assert!(result.severity >= Severity::Medium);
    }

    #[test]
    fn safe_pattern_is_safe() {
        let result = analyze_body("abc", Mode::Theoretical);
        assert_eq!(result.severity, Severity::Safe);
        assert!(is_safe(&result, 10));
    }

    #[test]
    fn possessive_quantifier_is_dampened() {
        let nested = analyze_body("(a+)+", Mode::Theoretical);
        let possessive = analyze_body("(a++)+", Mode::Theoretical);
        assert!(possessive.severity < nested.severity);
    }

    #[test]
    fn confirmed_mode_finds_a_witness() {
        let result = analyze_body("(a+)+b", Mode::Confirmed);
        assert_eq!(result.severity, Severity::Critical);
        assert!(result.trigger.is_some());
    }

    #[test]
    fn confirmed_mode_clears_a_safe_pattern() {
        let result = analyze_body("abc", Mode::Confirmed);
        assert_eq!(result.severity, Severity::Safe);
    }

    #[test]
    fn nested_unbounded_quantifier_is_critical_with_a_rewrite() {
        let result = analyze_body("(a+)+", Mode::Theoretical);
        assert_eq!(result.severity, Severity::Critical);
        let rewrite = result.suggested_rewrite.unwrap();
        assert!(rewrite.contains("(?>a+)+"));
        assert!(rewrite.contains("(a++)+"));
    }
}
