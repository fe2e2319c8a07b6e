//! Sample generation (spec.md §4.9): produces one string the pattern
//! matches, using a seedable PRNG so results are reproducible. Backrefs
//! replay the text their group generated; subroutines are refused (no
//! in-tree recursion model); negated classes over an effectively unbounded
//! alphabet fall back to a deterministic safe character rather than
//! enumerating the true complement.

use crate::ast::*;
use crate::errors::{PcreError, Result};
use crate::unicode;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub seed: u64,
    /// Extra repetitions an unbounded quantifier may add past its minimum.
    pub max_extra_repeats: u32,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self { seed: 0, max_extra_repeats: 4 }
    }
}

struct State {
    rng: StdRng,
    by_index: HashMap<i32, String>,
    by_name: HashMap<String, String>,
    max_extra_repeats: u32,
    case_insensitive: bool,
}

pub fn generate(ast: &Node, flags: &str, config: &SampleConfig) -> Result<String> {
    let mut state = State {
        rng: StdRng::seed_from_u64(config.seed),
        by_index: HashMap::new(),
        by_name: HashMap::new(),
        max_extra_repeats: config.max_extra_repeats,
        case_insensitive: flags.contains('i'),
    };
    let mut out = String::new();
    gen(ast, &mut state, &mut out)?;
    Ok(out)
}

fn gen(node: &Node, state: &mut State, out: &mut String) -> Result<()> {
    match node {
        Node::Regex(r) => gen(&r.child, state, out),
        Node::Sequence(s) => {
            for child in &s.children {
                gen(child, state, out)?;
            }
            Ok(())
        }
        Node::Alternation(a) => {
            let pick = state.rng.gen_range(0..a.branches.len());
            gen(&a.branches[pick], state, out)
        }
        Node::Group(g) => gen_group(g, state, out),
        Node::Quantifier(q) => {
            let max = q.max.unwrap_or(q.min.max(1) + state.max_extra_repeats);
            let extra = if max > q.min { state.rng.gen_range(0..=(max - q.min)) } else { 0 };
            let n = q.min + extra;
            for _ in 0..n {
                gen(&q.child, state, out)?;
            }
            Ok(())
        }
        Node::Conditional(c) => gen_conditional(c, state, out),
        Node::Literal(l) => {
            if state.case_insensitive {
                for c in l.value.chars() {
                    let folded = if c.is_ascii_alphabetic() && state.rng.gen_bool(0.5) {
                        if c.is_ascii_lowercase() {
                            c.to_ascii_uppercase()
                        } else {
                            c.to_ascii_lowercase()
                        }
                    } else {
                        c
                    };
                    out.push(folded);
                }
            } else {
                out.push_str(&l.value);
            }
            Ok(())
        }
        Node::Dot(_) => {
            out.push('x');
            Ok(())
        }
        Node::CharType(c) => {
            out.push(sample_char_type(c.kind));
            Ok(())
        }
        Node::CharClass(cc) => {
            out.push(sample_char_class(cc, &mut state.rng));
            Ok(())
        }
        Node::Range(r) => {
            out.push(r.start);
            Ok(())
        }
        Node::PosixClass(p) => {
            out.push(if p.negated { 'z' } else { unicode::posix_representative(&p.name) });
            Ok(())
        }
        Node::Anchor(_) | Node::Assertion(_) | Node::Keep(_) | Node::Comment(_) | Node::PcreVerb(_) => Ok(()),
        Node::Backref(b) => {
            let text = match (&b.name, b.index) {
                (Some(name), _) => state.by_name.get(name).cloned(),
                (None, Some(index)) => state.by_index.get(&index).cloned(),
                (None, None) => None,
            };
            out.push_str(&text.unwrap_or_default());
            Ok(())
        }
        Node::Subroutine(_) => Err(PcreError::Complexity {
            reason: "the sample generator does not model subroutine recursion".to_string(),
        }),
        Node::UnicodeEscape(u) => {
            out.push(char::from_u32(u.code_point).unwrap_or('?'));
            Ok(())
        }
        Node::UnicodeProp(u) => {
            out.push(if u.negated { 'x' } else { unicode::representative_char(&u.property) });
            Ok(())
        }
        Node::Octal(o) => {
            out.push(char::from_u32(o.value).unwrap_or('?'));
            Ok(())
        }
        Node::OctalLegacy(o) => {
            out.push(char::from_u32(o.value).unwrap_or('?'));
            Ok(())
        }
    }
}

fn gen_group(g: &Group, state: &mut State, out: &mut String) -> Result<()> {
    match &g.kind {
        GroupKind::Capturing { index } => {
            let start = out.len();
            gen(&g.child, state, out)?;
            state.by_index.insert(*index as i32, out[start..].to_string());
            Ok(())
        }
        GroupKind::Named { index, name } => {
            let start = out.len();
            gen(&g.child, state, out)?;
            let text = out[start..].to_string();
            state.by_index.insert(*index as i32, text.clone());
            state.by_name.insert(name.clone(), text);
            Ok(())
        }
        GroupKind::NonCapturing | GroupKind::Atomic | GroupKind::BranchReset | GroupKind::InlineFlags { .. } => {
            gen(&g.child, state, out)
        }
        GroupKind::Lookahead { .. } | GroupKind::Lookbehind { .. } => Ok(()),
    }
}

/// Conditions aren't evaluated against an actual match attempt here, so the
/// "yes"/"no" choice is made by coin flip (Open Question #5: an absent "no"
/// branch is treated as an equally-weighted empty alternative).
fn gen_conditional(c: &Conditional, state: &mut State, out: &mut String) -> Result<()> {
    if matches!(c.condition, Condition::Define) {
        return Ok(());
    }
    if state.rng.gen_bool(0.5) {
        gen(&c.yes, state, out)
    } else if let Some(no) = &c.no {
        gen(no, state, out)
    } else {
        Ok(())
    }
}

fn sample_char_type(kind: CharTypeKind) -> char {
    use CharTypeKind::*;
    match kind {
        Digit => '5',
        NotDigit => 'x',
        Space => ' ',
        NotSpace => 'x',
        Word => 'a',
        NotWord => '!',
        HorizSpace => '\t',
        NotHorizSpace => 'a',
        VertSpace => '\n',
        NotVertSpace => 'a',
        NewlineSeq => '\n',
        NotNewline => 'a',
    }
}

/// Weighted by range size so `[a-z]` samples across the whole alphabet
/// rather than always returning `a`.
fn sample_char_class(cc: &CharClass, rng: &mut StdRng) -> char {
    let mut ranges: Vec<(u32, u32)> = Vec::new();
    let mut singles: Vec<char> = Vec::new();
    for item in &cc.items {
        match item {
            ClassItem::Literal(l) => singles.push(l.value),
            ClassItem::Range(r) => ranges.push((r.start as u32, r.end as u32)),
            ClassItem::CharType(c) => singles.push(sample_char_type(c.kind)),
            ClassItem::Posix(p) => singles.push(unicode::posix_representative(&p.name)),
            ClassItem::UnicodeProp(u) => singles.push(unicode::representative_char(&u.property)),
            ClassItem::UnicodeEscape(u) => {
                if let Some(c) = char::from_u32(u.code_point) {
                    singles.push(c);
                }
            }
        }
    }
    if cc.negated {
        let excluded: Vec<char> = singles
            .iter()
            .copied()
            .chain(ranges.iter().filter_map(|&(s, e)| char::from_u32(s).filter(|_| s == e)))
            .collect();
        for fallback in ['z', 'Z', '9', '_', ' '] {
            if !excluded.contains(&fallback) && !ranges.iter().any(|&(s, e)| (fallback as u32) >= s && (fallback as u32) <= e) {
                return fallback;
            }
        }
        return 'z';
    }

    ranges.extend(singles.iter().map(|&c| (c as u32, c as u32)));
    let total: u64 = ranges.iter().map(|&(s, e)| e.saturating_sub(s) as u64 + 1).sum();
    if total == 0 {
        return 'x';
    }
    let mut offset = rng.gen_range(0..total);
    for (s, e) in ranges {
        let size = e.saturating_sub(s) as u64 + 1;
        if offset < size {
            return char::from_u32(s + offset as u32).unwrap_or('x');
        }
        offset -= size;
    }
    'x'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_pattern, ParserLimits};
    use crate::validator::validate;

    fn generate_body(body: &str, flags: &str, seed: u64) -> String {
        let ast = parse_pattern(body, flags, ParserLimits::default()).unwrap();
        generate(&ast, flags, &SampleConfig { seed, max_extra_repeats: 4 }).unwrap()
    }

    #[test]
    fn generates_literal_text() {
        assert_eq!(generate_body("abc", "", 1), "abc");
    }

    #[test]
    fn is_deterministic_for_a_given_seed() {
        let a = generate_body("[a-z]{5}", "", 42);
        let b = generate_body("[a-z]{5}", "", 42);
        assert_eq!(a, b);
    }

    #[test]
    fn backreference_replays_captured_text() {
        let sample = generate_body("(ab)\\1", "", 7);
        assert_eq!(sample, "abab");
    }

    #[test]
    fn subroutine_is_refused() {
        let ast = parse_pattern("(?<x>a)(?&x)", "", ParserLimits::default()).unwrap();
        assert!(validate(&ast, "", false).errors.is_empty());
        let err = generate(&ast, "", &SampleConfig::default());
        assert!(err.is_err());
    }

    #[test]
    fn quantified_output_has_plausible_length() {
        let sample = generate_body("a{2,6}", "", 3);
        assert!(sample.len() >= 2 && sample.len() <= 6);
        assert!(sample.chars().all(|c| c == 'a'));
    }

    #[test]
    fn negated_class_uses_a_deterministic_fallback() {
        let sample = generate_body("[^a-y]", "", 9);
        assert_eq!(sample, "z");
    }
}
