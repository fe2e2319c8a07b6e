//! Semantics-preserving rewrites (spec.md §4.6). Each rule is independently
//! togglable via [`OptimizeConfig`]; when `verify_with_automata` is set the
//! whole rewritten tree is checked for language equivalence against the
//! original via the automata subsystem before being accepted.

use crate::ast::*;
use crate::automata;
use crate::compiler::compile;
use crate::token::Span;
use crate::unicode;
use crate::visitor::collect_where;

#[derive(Debug, Clone)]
pub struct OptimizeConfig {
    pub literal_coalescing: bool,
    pub flatten: bool,
    pub alternation_to_char_class: bool,
    pub canonicalize_char_classes: bool,
    pub digits: bool,
    pub word: bool,
    pub ranges: bool,
    pub quantifier_compaction: bool,
    pub min_quantifier_count: u32,
    pub auto_possessify: bool,
    pub flag_cleanup: bool,
    pub allow_alternation_factorization: bool,
    pub min_savings: usize,
    pub verify_with_automata: bool,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self {
            literal_coalescing: true,
            flatten: true,
            alternation_to_char_class: true,
            canonicalize_char_classes: true,
            digits: true,
            word: true,
            ranges: true,
            quantifier_compaction: true,
            min_quantifier_count: 3,
            auto_possessify: true,
            flag_cleanup: true,
            allow_alternation_factorization: false,
            min_savings: 1,
            verify_with_automata: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rewrite {
    pub rule: &'static str,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct OptimizationResult {
    pub original: Node,
    pub optimized: Node,
    /// The pattern's flags, possibly trimmed by `flag_cleanup`.
    pub flags: String,
    pub rewrites_applied: Vec<Rewrite>,
    /// Characters saved in the compiled pattern text (may be 0 or negative
    /// if a verification/threshold check reverted the rewrite).
    pub savings: i64,
}

/// Structural equality that ignores byte spans — two parses of the same
/// text at different offsets compile identically either way.
fn structurally_equal(a: &Node, b: &Node) -> bool {
    compile(a) == compile(b)
}

pub fn optimize(ast: &Node, flags: &str, config: &OptimizeConfig) -> OptimizationResult {
    let unicode_mode = flags.contains('u');
    let mut log = Vec::new();
    let optimized = rewrite(ast, config, unicode_mode, &mut log);

    let mut out_flags = flags.to_string();
    if config.flag_cleanup {
        let cleaned = clean_flags(ast, flags);
        if cleaned != flags {
            log.push(Rewrite {
                rule: "flag_cleanup",
                description: format!("flags '{flags}' -> '{cleaned}'"),
            });
            out_flags = cleaned;
        }
    }

    let reject = || OptimizationResult {
        original: ast.clone(),
        optimized: ast.clone(),
        flags: flags.to_string(),
        rewrites_applied: Vec::new(),
        savings: 0,
    };

    let original_text = compile(ast);
    let optimized_text = compile(&optimized);
    let savings = original_text.chars().count() as i64 - optimized_text.chars().count() as i64;

    if savings < config.min_savings as i64 && out_flags == flags && !log.is_empty() {
        return reject();
    }

    if config.verify_with_automata && !log.is_empty() {
        if let Some(false) = automata_equivalent(ast, &optimized, flags) {
            return reject();
        }
    }

    OptimizationResult { original: ast.clone(), optimized, flags: out_flags, rewrites_applied: log, savings }
}

fn automata_equivalent(a: &Node, b: &Node, flags: &str) -> Option<bool> {
    let nfa_a = automata::build_nfa(a, flags).ok()?;
    let nfa_b = automata::build_nfa(b, flags).ok()?;
    let dfa_a = automata::build_dfa(&nfa_a);
    let dfa_b = automata::build_dfa(&nfa_b);
    Some(automata::is_equivalent(&dfa_a, &dfa_b))
}

fn rewrite(node: &Node, cfg: &OptimizeConfig, unicode_mode: bool, log: &mut Vec<Rewrite>) -> Node {
    // Bottom-up: transform children first so outer rules see already-settled subtrees.
    let node = map_children(node, cfg, unicode_mode, log);
    let node = if cfg.flatten { flatten_node(&node, log) } else { node };
    match &node {
        Node::Sequence(_) => {
            let mut n = node;
            if cfg.flatten {
                n = flatten_sequences(&n);
            }
            if cfg.literal_coalescing {
                n = coalesce_literals(&n, log);
            }
            if cfg.quantifier_compaction {
                n = compact_quantifiers(&n, cfg, log);
            }
            if cfg.auto_possessify {
                n = auto_possessify(&n, log);
            }
            n
        }
        Node::Alternation(_) if cfg.alternation_to_char_class => alternation_to_char_class(&node, log),
        Node::CharClass(cc) if cfg.canonicalize_char_classes => {
            canonicalize_char_class(cc, &node, cfg, unicode_mode, log)
        }
        _ => node,
    }
}

fn map_children(node: &Node, cfg: &OptimizeConfig, unicode_mode: bool, log: &mut Vec<Rewrite>) -> Node {
    match node {
        Node::Regex(r) => {
            Node::Regex(Regex { child: Box::new(rewrite(&r.child, cfg, unicode_mode, log)), ..r.clone() })
        }
        Node::Sequence(s) => Node::Sequence(Sequence {
            children: s.children.iter().map(|c| rewrite(c, cfg, unicode_mode, log)).collect(),
            ..s.clone()
        }),
        Node::Alternation(a) => Node::Alternation(Alternation {
            branches: a.branches.iter().map(|c| rewrite(c, cfg, unicode_mode, log)).collect(),
            ..a.clone()
        }),
        Node::Group(g) => {
            Node::Group(Group { child: Box::new(rewrite(&g.child, cfg, unicode_mode, log)), ..g.clone() })
        }
        Node::Quantifier(q) => {
            Node::Quantifier(Quantifier { child: Box::new(rewrite(&q.child, cfg, unicode_mode, log)), ..q.clone() })
        }
        Node::Conditional(c) => Node::Conditional(Conditional {
            yes: Box::new(rewrite(&c.yes, cfg, unicode_mode, log)),
            no: c.no.as_ref().map(|n| Box::new(rewrite(n, cfg, unicode_mode, log))),
            ..c.clone()
        }),
        other => other.clone(),
    }
}

/// `(?:X)` where `X` is a single atom lifts to `X`. Only fires when `X`
/// needs no grouping of its own (not an alternation, not a multi-item
/// sequence) so the rewrite is safe in any surrounding context, including
/// under a quantifier.
fn flatten_node(node: &Node, log: &mut Vec<Rewrite>) -> Node {
    if let Node::Group(g) = node {
        if matches!(g.kind, GroupKind::NonCapturing) {
            let inner = single_atom(&g.child);
            if let Some(atom) = inner {
                log.push(Rewrite {
                    rule: "group_flattening",
                    description: "dropped a non-capturing group around a single atom".into(),
                });
                return atom.clone();
            }
        }
    }
    node.clone()
}

fn single_atom(node: &Node) -> Option<&Node> {
    match node {
        Node::Sequence(s) if s.children.len() == 1 => Some(&s.children[0]),
        Node::Alternation(_) | Node::Sequence(_) => None,
        other => Some(other),
    }
}

fn flatten_sequences(node: &Node) -> Node {
    if let Node::Sequence(s) = node {
        let mut children = Vec::with_capacity(s.children.len());
        for child in &s.children {
            if let Node::Sequence(inner) = child {
                children.extend(inner.children.iter().cloned());
            } else {
                children.push(child.clone());
            }
        }
        return Node::Sequence(Sequence { children, ..s.clone() });
    }
    node.clone()
}

fn coalesce_literals(node: &Node, log: &mut Vec<Rewrite>) -> Node {
    let Node::Sequence(s) = node else { return node.clone() };
    let mut children: Vec<Node> = Vec::with_capacity(s.children.len());
    for child in &s.children {
        match (children.last_mut(), child) {
            (Some(Node::Literal(prev)), Node::Literal(cur)) => {
                prev.value.push_str(&cur.value);
                prev.span = Span::new(prev.span.start, cur.span.end);
                log.push(Rewrite {
                    rule: "literal_coalescing",
                    description: "merged adjacent literals".into(),
                });
            }
            _ => children.push(child.clone()),
        }
    }
    Node::Sequence(Sequence { children, ..s.clone() })
}

fn compact_quantifiers(node: &Node, cfg: &OptimizeConfig, log: &mut Vec<Rewrite>) -> Node {
    let Node::Sequence(s) = node else { return node.clone() };
    let mut children: Vec<Node> = Vec::new();
    let mut i = 0;
    while i < s.children.len() {
        let mut run_len = 1;
        while i + run_len < s.children.len()
            && structurally_equal(&s.children[i], &s.children[i + run_len])
        {
            run_len += 1;
        }
        if run_len as u32 >= cfg.min_quantifier_count && !matches!(s.children[i], Node::Quantifier(_)) {
            let atom = s.children[i].clone();
            let span = Span::new(atom.span().start, s.children[i + run_len - 1].span().end);
            children.push(Node::Quantifier(Quantifier {
                span,
                min: run_len as u32,
                max: Some(run_len as u32),
                mode: QuantifierMode::Greedy,
                canonical_text: format!("{{{run_len}}}"),
                child: Box::new(atom),
            }));
            log.push(Rewrite {
                rule: "quantifier_compaction",
                description: format!("compacted {run_len} repeated atoms into {{{run_len}}}"),
            });
            i += run_len;
        } else {
            children.push(s.children[i].clone());
            i += 1;
        }
    }
    Node::Sequence(Sequence { children, ..s.clone() })
}

/// An approximate "first set" for the atom kinds common enough to make
/// auto-possessification worthwhile. `None` means unknown — treated as
/// non-disjoint, so the rewrite is skipped rather than risking backtracking
/// loss.
fn first_set(node: &Node) -> Option<Vec<(u32, u32)>> {
    match node {
        Node::Literal(l) => l.value.chars().next().map(|c| vec![(c as u32, c as u32)]),
        Node::Dot(_) => Some(vec![(0, unicode::MAX_CODE_POINT)]),
        Node::CharType(c) => Some(char_type_ranges(c.kind)),
        Node::CharClass(cc) => {
            let mut ranges = Vec::new();
            for item in &cc.items {
                match item {
                    ClassItem::Literal(l) => ranges.push((l.value as u32, l.value as u32)),
                    ClassItem::Range(r) => ranges.push((r.start as u32, r.end as u32)),
                    ClassItem::CharType(c) => ranges.extend(char_type_ranges(c.kind)),
                    _ => return None,
                }
            }
            if cc.negated {
                None
            } else {
                Some(ranges)
            }
        }
        _ => None,
    }
}

fn char_type_ranges(kind: CharTypeKind) -> Vec<(u32, u32)> {
    use CharTypeKind::*;
    match kind {
        Digit => vec![('0' as u32, '9' as u32)],
        Word => vec![('a' as u32, 'z' as u32), ('A' as u32, 'Z' as u32), ('0' as u32, '9' as u32), ('_' as u32, '_' as u32)],
        Space => vec![(' ' as u32, ' ' as u32), (0x09, 0x0D)],
        _ => vec![],
    }
}

fn disjoint(a: &[(u32, u32)], b: &[(u32, u32)]) -> bool {
    for &(s1, e1) in a {
        for &(s2, e2) in b {
            if s1 <= e2 && s2 <= e1 {
                return false;
            }
        }
    }
    true
}

fn auto_possessify(node: &Node, log: &mut Vec<Rewrite>) -> Node {
    let Node::Sequence(s) = node else { return node.clone() };
    let mut children = s.children.clone();
    for i in 0..children.len().saturating_sub(1) {
        if let Node::Quantifier(q) = &children[i] {
            if q.mode != QuantifierMode::Greedy {
                continue;
            }
            let (Some(atom_set), Some(next_set)) = (first_set(&q.child), first_set(&children[i + 1])) else {
                continue;
            };
            if disjoint(&atom_set, &next_set) {
                if let Node::Quantifier(q) = &mut children[i] {
                    q.mode = QuantifierMode::Possessive;
                    log.push(Rewrite {
                        rule: "auto_possessify",
                        description: "made a quantifier possessive: its atom cannot overlap what follows".into(),
                    });
                }
            }
        }
    }
    Node::Sequence(Sequence { children, ..s.clone() })
}

fn alternation_to_char_class(node: &Node, log: &mut Vec<Rewrite>) -> Node {
    let Node::Alternation(a) = node else { return node.clone() };
    let chars: Option<Vec<char>> = a
        .branches
        .iter()
        .map(|b| match b {
            Node::Literal(l) if l.value.chars().count() == 1 => l.value.chars().next(),
            _ => None,
        })
        .collect();
    let Some(chars) = chars else { return node.clone() };
    if chars.iter().any(|&c| c == '-') {
        // Hyphen-only alternatives are kept literal (ambiguous inside a class).
        return node.clone();
    }
    log.push(Rewrite {
        rule: "alternation_to_char_class",
        description: format!("folded {} single-character branches into a character class", chars.len()),
    });
    Node::CharClass(CharClass {
        span: a.span,
        negated: false,
        items: chars
            .into_iter()
            .map(|value| ClassItem::Literal(ClassLiteral { span: a.span, value }))
            .collect(),
    })
}

fn canonicalize_char_class(
    cc: &CharClass,
    node: &Node,
    cfg: &OptimizeConfig,
    unicode_mode: bool,
    log: &mut Vec<Rewrite>,
) -> Node {
    let mut simple: Vec<(u32, u32)> = Vec::new();
    let mut other: Vec<ClassItem> = Vec::new();
    for item in &cc.items {
        match item {
            ClassItem::Literal(l) => simple.push((l.value as u32, l.value as u32)),
            ClassItem::Range(r) => simple.push((r.start as u32, r.end as u32)),
            other_item => other.push(other_item.clone()),
        }
    }
    if simple.is_empty() {
        return node.clone();
    }
    let merged = if cfg.ranges {
        merge_ranges(simple)
    } else {
        simple
    };

    if !unicode_mode && other.is_empty() {
        let kind = if cfg.digits && merged == vec![('0' as u32, '9' as u32)] {
            Some((CharTypeKind::Digit, "\\d"))
        } else if cfg.word
            && merged
                == merge_ranges(vec![
                    ('a' as u32, 'z' as u32),
                    ('A' as u32, 'Z' as u32),
                    ('0' as u32, '9' as u32),
                    ('_' as u32, '_' as u32),
                ])
        {
            Some((CharTypeKind::Word, "\\w"))
        } else {
            None
        };
        if let Some((kind, letter)) = kind {
            let kind = if cc.negated { kind.negated() } else { kind };
            log.push(Rewrite {
                rule: "char_class_canonicalization",
                description: format!("folded character class into {letter}"),
            });
            return Node::CharType(CharType { span: cc.span, kind });
        }
    }

    let mut items: Vec<ClassItem> = merged
        .into_iter()
        .map(|(s, e)| {
            if s == e {
                ClassItem::Literal(ClassLiteral { span: cc.span, value: char::from_u32(s).unwrap_or('\0') })
            } else {
                ClassItem::Range(Range {
                    span: cc.span,
                    start: char::from_u32(s).unwrap_or('\0'),
                    end: char::from_u32(e).unwrap_or('\0'),
                    hyphenated: true,
                })
            }
        })
        .collect();
    items.extend(other);
    if items != cc.items {
        log.push(Rewrite { rule: "char_class_canonicalization", description: "sorted/merged class members".into() });
    }
    Node::CharClass(CharClass { items, ..cc.clone() })
}

fn merge_ranges(mut ranges: Vec<(u32, u32)>) -> Vec<(u32, u32)> {
    ranges.sort_unstable();
    let mut merged: Vec<(u32, u32)> = Vec::new();
    for (s, e) in ranges {
        if let Some(last) = merged.last_mut() {
            if s <= last.1.saturating_add(1) {
                last.1 = last.1.max(e);
                continue;
            }
        }
        merged.push((s, e));
    }
    merged
}

fn clean_flags(ast: &Node, flags: &str) -> String {
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

    flags
        .chars()
        .filter(|&c| match c {
            's' => has_dot,
            'm' => has_line_anchor,
            'i' => has_case_bearing,
            _ => true,
        })
        .collect()
}

/// `ab|ac` -> `a(?:b|c)` when every branch shares the same leading literal
/// character and none of them contain a backreference. Off by default.
pub fn factor_alternation(node: &Node) -> Option<Node> {
    let Node::Alternation(a) = node else { return None };
    if a.branches.len() < 2 {
        return None;
    }
    let heads: Option<Vec<(char, Node)>> = a
        .branches
        .iter()
        .map(|b| match b {
            Node::Sequence(s) if !s.children.is_empty() => match &s.children[0] {
                Node::Literal(l) if l.value.chars().count() >= 1 => {
                    let head = l.value.chars().next().unwrap();
                    let mut rest = s.clone();
                    if l.value.chars().count() == 1 {
                        rest.children.remove(0);
                    } else {
                        let mut trimmed = l.clone();
                        trimmed.value.remove(0);
                        rest.children[0] = Node::Literal(trimmed);
                    }
                    Some((head, Node::Sequence(rest)))
                }
                _ => None,
            },
            _ => None,
        })
        .collect();
    let heads = heads?;
    let first_head = heads[0].0;
    if !heads.iter().all(|(h, _)| *h == first_head) {
        return None;
    }
    if collect_where(node, |n| matches!(n, Node::Backref(_))).len() > 0 {
        return None;
    }
    let remainders: Vec<Node> = heads.into_iter().map(|(_, rest)| rest).collect();
    Some(Node::Sequence(Sequence {
        span: a.span,
        children: vec![
            Node::Literal(Literal { span: a.span, value: first_head.to_string() }),
            Node::Group(Group {
                span: a.span,
                kind: GroupKind::NonCapturing,
                child: Box::new(Node::Alternation(Alternation { span: a.span, branches: remainders })),
                name_syntax: None,
                flags_set: None,
                flags_unset: None,
            }),
        ],
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_pattern, ParserLimits};

    fn opt(body: &str, cfg: &OptimizeConfig) -> OptimizationResult {
        let ast = parse_pattern(body, "", ParserLimits::default()).unwrap();
        optimize(&ast, "", cfg)
    }

    #[test]
    fn coalesces_literals() {
        let result = opt("abc", &OptimizeConfig::default());
        assert_eq!(compile(&result.optimized), "abc");
    }

    #[test]
    fn folds_digit_class() {
        let result = opt("[0-9]", &OptimizeConfig::default());
        assert_eq!(compile(&result.optimized), "\\d");
    }

    #[test]
    fn folds_alternation_into_char_class() {
        let result = opt("a|b|c", &OptimizeConfig::default());
        assert_eq!(compile(&result.optimized), "[abc]");
    }

    #[test]
    fn compacts_repeated_atoms() {
        let mut cfg = OptimizeConfig::default();
        cfg.min_quantifier_count = 3;
        let result = opt("aaa", &cfg);
        assert_eq!(compile(&result.optimized), "a{3}");
    }

    #[test]
    fn flattens_noncapturing_single_atom_group() {
        let result = opt("(?:a)b", &OptimizeConfig::default());
        assert_eq!(compile(&result.optimized), "ab");
    }

    #[test]
    fn verification_rejects_nonequivalent_rewrite_inputs_are_still_equivalent() {
        let mut cfg = OptimizeConfig::default();
        cfg.verify_with_automata = true;
        let result = opt("[0-9]", &cfg);
        assert_eq!(compile(&result.optimized), "\\d");
    }

    #[test]
    fn factor_alternation_extracts_common_prefix() {
        let ast = parse_pattern("ab|ac", "", ParserLimits::default()).unwrap();
        let factored = factor_alternation(&ast).unwrap();
        assert_eq!(compile(&factored), "a(?:b|c)");
    }
}
