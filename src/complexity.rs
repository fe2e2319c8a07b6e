//! Complexity scoring (spec.md §4.9): a weighted node count meant to flag
//! patterns worth a closer ReDoS look, not a precise cost model.
//!
//! Weights: literal=1, dot=2, char-class=3, quantifier=k·inner,
//! alternation=Σ+2, lookaround=inner+5. Nested unbounded quantifiers
//! multiply instead of adding, since each extra layer of unbounded
//! repetition compounds the state space rather than extending it linearly.

use crate::ast::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Rating {
    Trivial,
    Moderate,
    Complex,
    Severe,
}

#[derive(Debug, Clone, Copy)]
pub struct ComplexityReport {
    pub score: u64,
    pub rating: Rating,
}

pub fn analyze(ast: &Node) -> ComplexityReport {
    let score = weight(ast);
    ComplexityReport { score, rating: rate(score) }
}

fn rate(score: u64) -> Rating {
    match score {
        0..=9 => Rating::Trivial,
        10..=49 => Rating::Moderate,
        50..=199 => Rating::Complex,
        _ => Rating::Severe,
    }
}

fn has_nested_unbounded(node: &Node) -> bool {
    match node {
        Node::Quantifier(q) => q.max.is_none(),
        Node::Group(g) => has_nested_unbounded(&g.child),
        Node::Sequence(s) => s.children.iter().any(has_nested_unbounded),
        Node::Alternation(a) => a.branches.iter().any(has_nested_unbounded),
        _ => false,
    }
}

fn weight(node: &Node) -> u64 {
    match node {
        Node::Regex(r) => weight(&r.child),
        Node::Sequence(s) => s.children.iter().map(weight).sum(),
        Node::Alternation(a) => a.branches.iter().map(weight).sum::<u64>() + 2,
        Node::Group(g) => match &g.kind {
            GroupKind::Lookahead { .. } | GroupKind::Lookbehind { .. } => weight(&g.child) + 5,
            _ => weight(&g.child),
        },
        Node::Quantifier(q) => {
            let inner = weight(&q.child);
            let k = match q.max {
                Some(m) => m.max(q.min).max(1) as u64,
                None => (q.min.max(1) as u64) * 2,
            };
            let mut total = k * inner.max(1);
            if q.max.is_none() && has_nested_unbounded(&q.child) {
                total *= 2;
            }
            total
        }
        Node::Conditional(c) => {
            let yes = weight(&c.yes);
            let no = c.no.as_ref().map(|n| weight(n)).unwrap_or(0);
            let condition = match &c.condition {
                Condition::Lookaround(n) => weight(n) + 5,
                _ => 1,
            };
            yes + no + condition + 2
        }
        Node::Literal(_) => 1,
        Node::Dot(_) => 2,
        Node::CharType(_) => 2,
        Node::CharClass(_) => 3,
        Node::Range(_) => 1,
        Node::PosixClass(_) => 2,
        Node::Anchor(_) | Node::Assertion(_) | Node::Keep(_) | Node::Comment(_) | Node::PcreVerb(_) => 0,
        Node::Backref(_) | Node::Subroutine(_) => 2,
        Node::UnicodeEscape(_) | Node::Octal(_) | Node::OctalLegacy(_) => 1,
        Node::UnicodeProp(_) => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_pattern, ParserLimits};

    fn analyze_body(body: &str) -> ComplexityReport {
        let ast = parse_pattern(body, "", ParserLimits::default()).unwrap();
        analyze(&ast)
    }

    #[test]
    fn plain_literal_is_trivial() {
        let report = analyze_body("abc");
        assert_eq!(report.rating, Rating::Trivial);
    }

    #[test]
    fn char_class_outweighs_literal() {
        let literal = analyze_body("a").score;
        let class = analyze_body("[abc]").score;
        assert!(class > literal);
    }

    #[test]
    fn nested_unbounded_quantifiers_multiply() {
        let flat = analyze_body("a+").score;
        let nested = analyze_body("(a+)+").score;
        assert!(nested > flat * 2);
    }

    #[test]
    fn lookaround_adds_fixed_cost() {
        let bare = analyze_body("abc").score;
        let lookahead = analyze_body("(?=abc)").score;
        assert_eq!(lookahead, bare + 5);
    }
}
