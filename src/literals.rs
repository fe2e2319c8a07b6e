//! Literal extraction (spec.md §4.9): required prefixes/suffixes, and full
//! enumeration when a pattern is equivalent to a finite union of strings.

use crate::ast::*;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LiteralSet {
    pub prefixes: Vec<String>,
    pub suffixes: Vec<String>,
    /// `true` when `prefixes` (equal to `suffixes` in that case) is the
    /// complete set of strings the pattern matches.
    pub complete: bool,
}

const MAX_ENUMERATED: usize = 256;
const MAX_BOUNDED_REPEAT: u32 = 8;

pub fn extract(ast: &Node, flags: &str) -> LiteralSet {
    let ci = flags.contains('i');
    if let Some(set) = enumerate(ast, ci) {
        return LiteralSet { prefixes: set.clone(), suffixes: set, complete: true };
    }
    LiteralSet {
        prefixes: branch_prefixes(ast, ci),
        suffixes: branch_suffixes(ast, ci),
        complete: false,
    }
}

fn fold_case(s: &str, ci: bool) -> Vec<String> {
    if !ci {
        return vec![s.to_string()];
    }
    let mut variants = vec![String::new()];
    for c in s.chars() {
        let alts: Vec<char> = if c.is_ascii_alphabetic() {
            vec![c.to_ascii_lowercase(), c.to_ascii_uppercase()]
        } else {
            vec![c]
        };
        let mut next = Vec::with_capacity(variants.len() * alts.len());
        for v in &variants {
            for a in &alts {
                next.push(format!("{v}{a}"));
            }
        }
        variants = next;
        if variants.len() > MAX_ENUMERATED {
            break;
        }
    }
    variants
}

fn is_zero_width(node: &Node) -> bool {
    matches!(node, Node::Anchor(_) | Node::Assertion(_) | Node::Keep(_) | Node::Comment(_))
}

/// Returns the finite set of complete matches for `node`, or `None` if the
/// pattern cannot be fully enumerated (an unbounded quantifier, a dot, an
/// unrestricted character class, a lookaround, a backreference, ...).
fn enumerate(node: &Node, ci: bool) -> Option<Vec<String>> {
    let set = match node {
        Node::Regex(r) => return enumerate(&r.child, ci),
        Node::Literal(l) => fold_case(&l.value, ci),
        Node::Sequence(s) => {
            let mut acc = vec![String::new()];
            for child in &s.children {
                let part = enumerate(child, ci)?;
                acc = cartesian(&acc, &part)?;
            }
            acc
        }
        Node::Alternation(a) => {
            let mut acc = Vec::new();
            for branch in &a.branches {
                acc.extend(enumerate(branch, ci)?);
                if acc.len() > MAX_ENUMERATED {
                    return None;
                }
            }
            acc
        }
        Node::Group(g) => match g.kind {
            GroupKind::Capturing { .. }
            | GroupKind::NonCapturing
            | GroupKind::Named { .. }
            | GroupKind::Atomic
            | GroupKind::BranchReset => enumerate(&g.child, ci)?,
            GroupKind::Lookahead { .. } | GroupKind::Lookbehind { .. } | GroupKind::InlineFlags { .. } => {
                return None
            }
        },
        Node::Quantifier(q) => {
            let (min, max) = (q.min, q.max?);
            if max - min > MAX_BOUNDED_REPEAT || max > MAX_BOUNDED_REPEAT {
                return None;
            }
            let part = enumerate(&q.child, ci)?;
            let mut acc = vec![String::new()];
            let mut out = Vec::new();
            for n in 0..=max {
                if n >= min {
                    out.extend(acc.iter().cloned());
                    if out.len() > MAX_ENUMERATED {
                        return None;
                    }
                }
                if n == max {
                    break;
                }
                acc = cartesian(&acc, &part)?;
            }
            out
        }
        Node::Anchor(_) | Node::Assertion(_) | Node::Keep(_) | Node::Comment(_) => vec![String::new()],
        _ => return None,
    };
    if set.len() > MAX_ENUMERATED {
        None
    } else {
        Some(set)
    }
}

fn cartesian(left: &[String], right: &[String]) -> Option<Vec<String>> {
    let mut out = Vec::with_capacity(left.len() * right.len());
    for l in left {
        for r in right {
            out.push(format!("{l}{r}"));
            if out.len() > MAX_ENUMERATED {
                return None;
            }
        }
    }
    Some(out)
}

fn literal_prefix(node: &Node, ci: bool) -> String {
    match node {
        Node::Regex(r) => literal_prefix(&r.child, ci),
        Node::Literal(l) => fold_one(&l.value, ci),
        Node::Sequence(s) => {
            let mut out = String::new();
            for child in &s.children {
                match child {
                    Node::Literal(l) => out.push_str(&fold_one(&l.value, ci)),
                    other if is_zero_width(other) => {}
                    _ => break,
                }
            }
            out
        }
        Node::Group(g) if matches!(g.kind, GroupKind::Capturing { .. } | GroupKind::NonCapturing | GroupKind::Named { .. } | GroupKind::Atomic) => {
            literal_prefix(&g.child, ci)
        }
        _ => String::new(),
    }
}

fn literal_suffix(node: &Node, ci: bool) -> String {
    match node {
        Node::Regex(r) => literal_suffix(&r.child, ci),
        Node::Literal(l) => fold_one(&l.value, ci),
        Node::Sequence(s) => {
            let mut parts: Vec<String> = Vec::new();
            for child in s.children.iter().rev() {
                match child {
                    Node::Literal(l) => parts.push(fold_one(&l.value, ci)),
                    other if is_zero_width(other) => {}
                    _ => break,
                }
            }
            parts.reverse();
            parts.concat()
        }
        Node::Group(g) if matches!(g.kind, GroupKind::Capturing { .. } | GroupKind::NonCapturing | GroupKind::Named { .. } | GroupKind::Atomic) => {
            literal_suffix(&g.child, ci)
        }
        _ => String::new(),
    }
}

fn fold_one(s: &str, ci: bool) -> String {
    if ci {
        s.to_ascii_lowercase()
    } else {
        s.to_string()
    }
}

fn branch_prefixes(node: &Node, ci: bool) -> Vec<String> {
    let list = match node {
        Node::Regex(r) => return branch_prefixes(&r.child, ci),
        Node::Alternation(a) => a.branches.iter().map(|b| literal_prefix(b, ci)).collect(),
        other => vec![literal_prefix(other, ci)],
    };
    dedup_nonempty(list)
}

fn branch_suffixes(node: &Node, ci: bool) -> Vec<String> {
    let list = match node {
        Node::Regex(r) => return branch_suffixes(&r.child, ci),
        Node::Alternation(a) => a.branches.iter().map(|b| literal_suffix(b, ci)).collect(),
        other => vec![literal_suffix(other, ci)],
    };
    dedup_nonempty(list)
}

fn dedup_nonempty(mut list: Vec<String>) -> Vec<String> {
    list.retain(|s| !s.is_empty());
    list.sort();
    list.dedup();
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_pattern, ParserLimits};

    fn extract_body(body: &str, flags: &str) -> LiteralSet {
        let ast = parse_pattern(body, flags, ParserLimits::default()).unwrap();
        extract(&ast, flags)
    }

    #[test]
    fn pure_literal_is_complete() {
        let set = extract_body("abc", "");
        assert!(set.complete);
        assert_eq!(set.prefixes, vec!["abc".to_string()]);
    }

    #[test]
    fn small_alternation_is_complete() {
        let mut set = extract_body("cat|dog", "");
        set.prefixes.sort();
        assert!(set.complete);
        assert_eq!(set.prefixes, vec!["cat".to_string(), "dog".to_string()]);
    }

    #[test]
    fn case_insensitive_expands_alternation() {
        let set = extract_body("(?i)ab", "i");
        assert!(set.complete);
        assert_eq!(set.prefixes.len(), 4);
    }

    #[test]
    fn unbounded_quantifier_is_incomplete_but_has_prefix() {
        let set = extract_body("abc.*xyz", "");
        assert!(!set.complete);
        assert_eq!(set.prefixes, vec!["abc".to_string()]);
        assert_eq!(set.suffixes, vec!["xyz".to_string()]);
    }

    #[test]
    fn alternation_with_wildcard_has_per_branch_prefixes() {
        let mut set = extract_body("cat.*|dog.*", "");
        set.prefixes.sort();
        assert!(!set.complete);
        assert_eq!(set.prefixes, vec!["cat".to_string(), "dog".to_string()]);
    }
}
