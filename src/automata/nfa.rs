//! AST → NFA construction (spec.md §4.11), Thompson-style. Supports the
//! regular subset of PCRE2: literals, `.`, character classes, concatenation,
//! alternation, quantifiers, the anchors, and backreferences/subroutines
//! that resolve to an already-defined group (inlined as a subroutine call
//! over that group's own subtree, not modeled as true backtracking
//! backreferences — those aren't regular).

use crate::ast::*;
use crate::errors::{PcreError, Result};
use crate::unicode;
use std::collections::HashMap;

pub const MAX_CODE_POINT: u32 = unicode::MAX_CODE_POINT;

/// A transition label: either a silent epsilon move or a set of codepoints.
#[derive(Debug, Clone)]
pub enum Label {
    Epsilon,
    CharSet(CharSet),
}

/// A sorted, non-overlapping set of inclusive codepoint ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharSet(pub Vec<(u32, u32)>);

impl CharSet {
    pub fn single(c: char) -> Self {
        CharSet(vec![(c as u32, c as u32)])
    }

    pub fn range(start: u32, end: u32) -> Self {
        CharSet(vec![(start, end)])
    }

    pub fn from_ranges(mut ranges: Vec<(u32, u32)>) -> Self {
        ranges.sort_unstable();
        let mut merged: Vec<(u32, u32)> = Vec::with_capacity(ranges.len());
        for (s, e) in ranges {
            if let Some(last) = merged.last_mut() {
                if s <= last.1.saturating_add(1) {
                    last.1 = last.1.max(e);
                    continue;
                }
            }
            merged.push((s, e));
        }
        CharSet(merged)
    }

    pub fn full(max: u32) -> Self {
        CharSet(vec![(0, max)])
    }

    pub fn contains(&self, cp: u32) -> bool {
        self.0.iter().any(|&(s, e)| cp >= s && cp <= e)
    }

    pub fn negate(&self, max: u32) -> CharSet {
        let mut out = Vec::new();
        let mut next = 0u32;
        for &(s, e) in &self.0 {
            if s > next {
                out.push((next, s - 1));
            }
            next = e.saturating_add(1);
        }
        if next <= max {
            out.push((next, max));
        }
        CharSet(out)
    }

    pub fn union(&self, other: &CharSet) -> CharSet {
        let mut ranges = self.0.clone();
        ranges.extend_from_slice(&other.0);
        CharSet::from_ranges(ranges)
    }
}

#[derive(Debug, Clone)]
pub struct State {
    pub transitions: Vec<(Label, usize)>,
}

#[derive(Debug, Clone)]
pub struct Nfa {
    pub states: Vec<State>,
    pub start: usize,
    pub accept: usize,
}

struct Builder<'a> {
    states: Vec<State>,
    dot_all: bool,
    unicode_mode: bool,
    group_bodies: HashMap<u32, &'a Node>,
    inline_depth: usize,
}

const MAX_INLINE_DEPTH: usize = 8;
const MAX_BOUNDED_EXPANSION: u32 = 64;

impl<'a> Builder<'a> {
    fn new_state(&mut self) -> usize {
        self.states.push(State { transitions: Vec::new() });
        self.states.len() - 1
    }

    fn link(&mut self, from: usize, label: Label, to: usize) {
        self.states[from].transitions.push((label, to));
    }

    fn alphabet_max(&self) -> u32 {
        if self.unicode_mode {
            MAX_CODE_POINT
        } else {
            0xFF
        }
    }

    /// Builds a fragment for `node`, returning its (start, accept) states.
    fn build(&mut self, node: &Node) -> Result<(usize, usize)> {
        match node {
            Node::Regex(r) => self.build(&r.child),
            Node::Sequence(s) => {
                if s.children.is_empty() {
                    let st = self.new_state();
                    return Ok((st, st));
                }
                let mut iter = s.children.iter();
                let (mut start, mut acc) = self.build(iter.next().unwrap())?;
                let first_start = start;
                for child in iter {
                    let (s2, a2) = self.build(child)?;
                    self.link(acc, Label::Epsilon, s2);
                    start = first_start;
                    acc = a2;
                }
                Ok((start, acc))
            }
            Node::Alternation(alt) => {
                let start = self.new_state();
                let accept = self.new_state();
                for branch in &alt.branches {
                    let (s, a) = self.build(branch)?;
                    self.link(start, Label::Epsilon, s);
                    self.link(a, Label::Epsilon, accept);
                }
                Ok((start, accept))
            }
            Node::Group(g) => match &g.kind {
                GroupKind::Lookahead { .. } | GroupKind::Lookbehind { .. } => {
                    Err(PcreError::Complexity { reason: "lookaround is not regular".into() })
                }
                _ => self.build(&g.child),
            },
            Node::Quantifier(q) => self.build_quantifier(q),
            Node::Conditional(_) => {
                Err(PcreError::Complexity { reason: "conditional is not regular".into() })
            }
            Node::Literal(l) => {
                let mut cps: Vec<u32> = l.value.chars().map(|c| c as u32).collect();
                if cps.is_empty() {
                    let st = self.new_state();
                    return Ok((st, st));
                }
                let first = cps.remove(0);
                let (mut start, mut acc) = self.literal_char(first);
                let first_start = start;
                for cp in cps {
                    let (s2, a2) = self.literal_char(cp);
                    self.link(acc, Label::Epsilon, s2);
                    start = first_start;
                    acc = a2;
                }
                Ok((start, acc))
            }
            Node::Dot(_) => {
                let max = self.alphabet_max();
                let set = if self.dot_all {
                    CharSet::full(max)
                } else {
                    CharSet::single('\n').negate(max)
                };
                Ok(self.char_transition(set))
            }
            Node::CharType(c) => {
                let set = char_type_set(c.kind, self.alphabet_max());
                Ok(self.char_transition(set))
            }
            Node::CharClass(cc) => {
                let set = self.char_class_set(cc)?;
                let set = if cc.negated { set.negate(self.alphabet_max()) } else { set };
                Ok(self.char_transition(set))
            }
            Node::Anchor(_) => {
                // Treated as a structural no-op: the automata subsystem models
                // whole-pattern matching, so `^`/`$`/`\A`/`\z` contribute no
                // character transitions.
                let st = self.new_state();
                Ok((st, st))
            }
            Node::Backref(b) => self.build_backref(b),
            Node::Subroutine(s) => self.build_subroutine(s),
            Node::Assertion(_) | Node::Keep(_) | Node::PcreVerb(_) => {
                Err(PcreError::Complexity { reason: format!("{} is not regular", node.label()) })
            }
            Node::UnicodeEscape(u) => {
                if !unicode::is_valid_code_point(u.code_point) {
                    return Err(PcreError::Complexity { reason: "invalid code point".into() });
                }
                Ok(self.char_transition(CharSet::single(
                    char::from_u32(u.code_point).unwrap_or('\u{FFFD}'),
                )))
            }
            Node::Octal(o) | Node::OctalLegacy(o) => {
                Ok(self.char_transition(CharSet::single(char::from_u32(o.value).unwrap_or('\0'))))
            }
            Node::UnicodeProp(u) => {
                let ranges = unicode::script_ranges(&u.property)
                    .or_else(|| unicode::category_ranges(&u.property))
                    .map(|r| r.to_vec())
                    .unwrap_or_else(|| vec![(0, self.alphabet_max())]);
                let set = CharSet::from_ranges(ranges);
                let set = if u.negated { set.negate(self.alphabet_max()) } else { set };
                Ok(self.char_transition(set))
            }
            Node::Comment(_) => {
                let st = self.new_state();
                Ok((st, st))
            }
            Node::Range(_) | Node::PosixClass(_) => {
                // Only ever reached nested inside `CharClass`, which is
                // handled by `char_class_set` directly.
                Err(PcreError::InternalInvariantViolated(
                    "Range/PosixClass built standalone".into(),
                ))
            }
        }
    }

    fn literal_char(&mut self, cp: u32) -> (usize, usize) {
        self.char_transition(CharSet::single(char::from_u32(cp).unwrap_or('\u{FFFD}')))
    }

    fn char_transition(&mut self, set: CharSet) -> (usize, usize) {
        let s = self.new_state();
        let a = self.new_state();
        self.link(s, Label::CharSet(set), a);
        (s, a)
    }

    fn char_class_set(&self, cc: &CharClass) -> Result<CharSet> {
        let max = self.alphabet_max();
        let mut ranges = Vec::new();
        for item in &cc.items {
            match item {
                ClassItem::Literal(l) => ranges.push((l.value as u32, l.value as u32)),
                ClassItem::Range(r) => ranges.push((r.start as u32, r.end as u32)),
                ClassItem::CharType(c) => ranges.extend(char_type_set(c.kind, max).0),
                ClassItem::Posix(p) => {
                    if !unicode::is_known_posix_class(&p.name) {
                        return Err(PcreError::Complexity {
                            reason: format!("unknown POSIX class {}", p.name),
                        });
                    }
                    ranges.extend(posix_ranges(&p.name));
                }
                ClassItem::UnicodeProp(u) => {
                    let r = unicode::script_ranges(&u.property)
                        .or_else(|| unicode::category_ranges(&u.property))
                        .map(|r| r.to_vec())
                        .unwrap_or_else(|| vec![(0, max)]);
                    let set = CharSet::from_ranges(r);
                    let set = if u.negated { set.negate(max) } else { set };
                    ranges.extend(set.0);
                }
                ClassItem::UnicodeEscape(u) => ranges.push((u.code_point, u.code_point)),
            }
        }
        Ok(CharSet::from_ranges(ranges))
    }

    /// `min` mandatory copies, chained, followed either by `max - min`
    /// optional copies (each skippable straight to `accept`) or, when
    /// unbounded, one more copy wrapped in a Kleene loop.
    fn build_quantifier(&mut self, q: &Quantifier) -> Result<(usize, usize)> {
        if q.min > MAX_BOUNDED_EXPANSION
            || q.max.is_some_and(|m| m - q.min > MAX_BOUNDED_EXPANSION)
        {
            return Err(PcreError::Complexity {
                reason: "quantifier bound too large to expand into an automaton".into(),
            });
        }
        let start = self.new_state();
        let mut cur = start;
        for _ in 0..q.min {
            let (s, a) = self.build(&q.child)?;
            self.link(cur, Label::Epsilon, s);
            cur = a;
        }
        let accept = self.new_state();
        match q.max {
            Some(m) => {
                let mut prev = cur;
                self.link(prev, Label::Epsilon, accept);
                for _ in 0..(m - q.min) {
                    let (s, a) = self.build(&q.child)?;
                    self.link(prev, Label::Epsilon, s);
                    self.link(a, Label::Epsilon, accept);
                    prev = a;
                }
            }
            None => {
                let (s, a) = self.build(&q.child)?;
                self.link(cur, Label::Epsilon, s);
                self.link(a, Label::Epsilon, s);
                self.link(a, Label::Epsilon, accept);
                self.link(cur, Label::Epsilon, accept);
            }
        }
        Ok((start, accept))
    }

    fn build_backref(&mut self, b: &Backref) -> Result<(usize, usize)> {
        let Some(index) = b.index else {
            return Err(PcreError::Complexity { reason: "named backref not resolved".into() });
        };
        if b.relative || index <= 0 {
            return Err(PcreError::Complexity {
                reason: "relative/non-positive backreferences are not regular".into(),
            });
        }
        let body = *self
            .group_bodies
            .get(&(index as u32))
            .ok_or(PcreError::Complexity { reason: "backreference to unknown group".into() })?;
        self.inline(body)
    }

    fn build_subroutine(&mut self, s: &Subroutine) -> Result<(usize, usize)> {
        let index = match &s.reference {
            SubroutineRef::Numbered(n) if *n > 0 => *n as u32,
            _ => {
                return Err(PcreError::Complexity {
                    reason: "whole-pattern/named recursion is not regular".into(),
                })
            }
        };
        let body = *self
            .group_bodies
            .get(&index)
            .ok_or(PcreError::Complexity { reason: "subroutine call to unknown group".into() })?;
        self.inline(body)
    }

    fn inline(&mut self, body: &Node) -> Result<(usize, usize)> {
        self.inline_depth += 1;
        if self.inline_depth > MAX_INLINE_DEPTH {
            self.inline_depth -= 1;
            return Err(PcreError::Complexity { reason: "subroutine inlining too deep".into() });
        }
        let result = self.build(body);
        self.inline_depth -= 1;
        result
    }
}

fn char_type_set(kind: CharTypeKind, max: u32) -> CharSet {
    use CharTypeKind::*;
    match kind {
        Digit => CharSet::range('0' as u32, '9' as u32),
        NotDigit => CharSet::range('0' as u32, '9' as u32).negate(max),
        Space => CharSet::from_ranges(vec![
            (' ' as u32, ' ' as u32),
            ('\t' as u32, '\t' as u32),
            ('\n' as u32, '\n' as u32),
            (0x0B, 0x0C),
            ('\r' as u32, '\r' as u32),
        ]),
        NotSpace => char_type_set(Space, max).negate(max),
        Word => CharSet::from_ranges(vec![
            ('a' as u32, 'z' as u32),
            ('A' as u32, 'Z' as u32),
            ('0' as u32, '9' as u32),
            ('_' as u32, '_' as u32),
        ]),
        NotWord => char_type_set(Word, max).negate(max),
        HorizSpace => CharSet::from_ranges(vec![(' ' as u32, ' ' as u32), ('\t' as u32, '\t' as u32)]),
        NotHorizSpace => char_type_set(HorizSpace, max).negate(max),
        VertSpace => CharSet::from_ranges(vec![('\n' as u32, '\r' as u32)]),
        NotVertSpace => char_type_set(VertSpace, max).negate(max),
        NewlineSeq => CharSet::from_ranges(vec![('\n' as u32, '\n' as u32), ('\r' as u32, '\r' as u32)]),
        NotNewline => CharSet::single('\n').negate(max),
    }
}

fn posix_ranges(name: &str) -> Vec<(u32, u32)> {
    match name {
        "alpha" => vec![('a' as u32, 'z' as u32), ('A' as u32, 'Z' as u32)],
        "digit" => vec![('0' as u32, '9' as u32)],
        "alnum" => vec![('a' as u32, 'z' as u32), ('A' as u32, 'Z' as u32), ('0' as u32, '9' as u32)],
        "upper" => vec![('A' as u32, 'Z' as u32)],
        "lower" => vec![('a' as u32, 'z' as u32)],
        "space" => vec![(' ' as u32, ' ' as u32), (0x09, 0x0D)],
        "punct" => vec![(0x21, 0x2F), (0x3A, 0x40), (0x5B, 0x60), (0x7B, 0x7E)],
        "cntrl" => vec![(0x00, 0x1F), (0x7F, 0x7F)],
        "graph" => vec![(0x21, 0x7E)],
        "print" => vec![(0x20, 0x7E)],
        "blank" => vec![(' ' as u32, ' ' as u32), ('\t' as u32, '\t' as u32)],
        "xdigit" => vec![('0' as u32, '9' as u32), ('a' as u32, 'f' as u32), ('A' as u32, 'F' as u32)],
        "word" => vec![('a' as u32, 'z' as u32), ('A' as u32, 'Z' as u32), ('0' as u32, '9' as u32), ('_' as u32, '_' as u32)],
        _ => Vec::new(),
    }
}

fn collect_group_bodies(node: &Node, out: &mut HashMap<u32, &Node>) {
    if let Node::Group(g) = node {
        match &g.kind {
            GroupKind::Capturing { index } | GroupKind::Named { index, .. } => {
                out.insert(*index, g.child.as_ref());
            }
            _ => {}
        }
    }
    for child in node.children() {
        collect_group_bodies(child, out);
    }
}

/// Builds an NFA from `ast` (the full `Node::Regex` or a bare pattern body).
/// `flags` is consulted for `s` (dot-all) and `u` (Unicode alphabet width).
pub fn build_nfa(ast: &Node, flags: &str) -> Result<Nfa> {
    let mut group_bodies = HashMap::new();
    collect_group_bodies(ast, &mut group_bodies);
    let mut builder = Builder {
        states: Vec::new(),
        dot_all: flags.contains('s'),
        unicode_mode: flags.contains('u'),
        group_bodies,
        inline_depth: 0,
    };
    let (start, accept) = builder.build(ast)?;
    Ok(Nfa { states: builder.states, start, accept })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_pattern, ParserLimits};

    fn nfa_of(body: &str, flags: &str) -> Nfa {
        let ast = parse_pattern(body, flags, ParserLimits::default()).unwrap();
        build_nfa(&ast, flags).unwrap()
    }

    #[test]
    fn builds_literal_chain() {
        let nfa = nfa_of("abc", "");
        assert!(nfa.states.len() >= 6);
    }

    #[test]
    fn rejects_lookaround() {
        let ast = parse_pattern("(?=a)", "", ParserLimits::default()).unwrap();
        assert!(build_nfa(&ast, "").is_err());
    }

    #[test]
    fn builds_star_and_class() {
        let nfa = nfa_of("[a-z]+", "");
        assert!(nfa.states.len() > 2);
    }

    #[test]
    fn inlines_backreference_to_earlier_group() {
        let nfa = nfa_of("(a)\\1", "");
        assert!(nfa.states.len() >= 4);
    }
}
