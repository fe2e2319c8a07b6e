//! Product construction and language queries over DFAs (spec.md §4.11):
//! intersection, subset, equivalence, and shortest-witness BFS search.

use super::dfa::{complete, Dfa, DfaState};
use std::collections::{HashMap, VecDeque};

/// Merges two DFAs onto a shared effective alphabet by re-deriving class
/// boundaries from the union of both alphabets, then remapping each DFA's
/// transition table onto the merged classes.
fn unify_alphabets(a: &Dfa, b: &Dfa) -> (Dfa, Dfa, Vec<(u32, u32)>) {
    let mut boundaries: Vec<u32> = Vec::new();
    for &(s, e) in a.alphabet.iter().chain(b.alphabet.iter()) {
        boundaries.push(s);
        boundaries.push(e.saturating_add(1));
    }
    boundaries.sort_unstable();
    boundaries.dedup();
    let merged: Vec<(u32, u32)> = boundaries
        .windows(2)
        .filter(|w| w[1] > w[0])
        .map(|w| (w[0], w[1] - 1))
        .collect();

    (remap(a, &merged), remap(b, &merged), merged)
}

fn remap(dfa: &Dfa, merged: &[(u32, u32)]) -> Dfa {
    let states = dfa
        .states
        .iter()
        .map(|s| {
            let transitions = merged
                .iter()
                .map(|&(lo, _)| {
                    dfa.alphabet
                        .iter()
                        .position(|&(s0, e0)| lo >= s0 && lo <= e0)
                        .and_then(|class| s.transitions.get(class).copied().flatten())
                })
                .collect();
            DfaState { accept: s.accept, transitions }
        })
        .collect();
    Dfa { states, start: dfa.start, alphabet: merged.to_vec() }
}

/// Product construction over a shared alphabet, combining per-state accept
/// flags with `combine`.
fn product(a: &Dfa, b: &Dfa, combine: impl Fn(bool, bool) -> bool) -> Dfa {
    let (a, b, alphabet) = unify_alphabets(a, b);
    let mut a = a;
    let mut b = b;
    let dead_a = complete(&mut a);
    let dead_b = complete(&mut b);
    let _ = (dead_a, dead_b);

    let mut states: Vec<DfaState> = Vec::new();
    let mut index_of: HashMap<(usize, usize), usize> = HashMap::new();
    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();

    let start_pair = (a.start, b.start);
    index_of.insert(start_pair, 0);
    states.push(DfaState {
        accept: combine(a.states[a.start].accept, b.states[b.start].accept),
        transitions: Vec::new(),
    });
    queue.push_back(start_pair);

    while let Some((sa, sb)) = queue.pop_front() {
        let idx = index_of[&(sa, sb)];
        let mut transitions = vec![None; alphabet.len()];
        for class in 0..alphabet.len() {
            let ta = a.states[sa].transitions.get(class).copied().flatten();
            let tb = b.states[sb].transitions.get(class).copied().flatten();
            if let (Some(ta), Some(tb)) = (ta, tb) {
                let next_idx = *index_of.entry((ta, tb)).or_insert_with(|| {
                    states.push(DfaState {
                        accept: combine(a.states[ta].accept, b.states[tb].accept),
                        transitions: Vec::new(),
                    });
                    queue.push_back((ta, tb));
                    states.len() - 1
                });
                transitions[class] = Some(next_idx);
            }
        }
        states[idx].transitions = transitions;
    }

    Dfa { states, start: 0, alphabet }
}

pub fn intersect(a: &Dfa, b: &Dfa) -> Dfa {
    product(a, b, |x, y| x && y)
}

pub fn union(a: &Dfa, b: &Dfa) -> Dfa {
    product(a, b, |x, y| x || y)
}

pub fn difference(a: &Dfa, b: &Dfa) -> Dfa {
    product(a, b, |x, y| x && !y)
}

pub fn is_empty(dfa: &Dfa) -> bool {
    shortest_witness(dfa).is_none()
}

pub fn is_subset(a: &Dfa, b: &Dfa) -> bool {
    is_empty(&difference(a, b))
}

pub fn is_equivalent(a: &Dfa, b: &Dfa) -> bool {
    is_subset(a, b) && is_subset(b, a)
}

/// BFS for the shortest input accepted by `dfa`, using one representative
/// codepoint per alphabet class. `None` means the language is empty.
pub fn shortest_witness(dfa: &Dfa) -> Option<String> {
    if dfa.states.is_empty() {
        return None;
    }
    let mut visited = vec![false; dfa.states.len()];
    let mut queue: VecDeque<(usize, String)> = VecDeque::new();
    visited[dfa.start] = true;
    queue.push_back((dfa.start, String::new()));

    while let Some((state, path)) = queue.pop_front() {
        if dfa.states[state].accept {
            return Some(path);
        }
        for (class, target) in dfa.states[state].transitions.iter().enumerate() {
            let Some(target) = target else { continue };
            if visited[*target] {
                continue;
            }
            visited[*target] = true;
            let mut next_path = path.clone();
            if let Some(c) = dfa.representative(class) {
                next_path.push(c);
            }
            queue.push_back((*target, next_path));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automata::dfa::build_dfa;
    use crate::automata::nfa::build_nfa;
    use crate::parser::{parse_pattern, ParserLimits};

    fn dfa_of(body: &str) -> Dfa {
        let ast = parse_pattern(body, "", ParserLimits::default()).unwrap();
        let nfa = build_nfa(&ast, "").unwrap();
        build_dfa(&nfa)
    }

    #[test]
    fn equivalent_patterns_are_equivalent() {
        let a = dfa_of("ab|ac");
        let b = dfa_of("a(b|c)");
        assert!(is_equivalent(&a, &b));
    }

    #[test]
    fn different_patterns_are_not_equivalent() {
        let a = dfa_of("ab");
        let b = dfa_of("ac");
        assert!(!is_equivalent(&a, &b));
    }

    #[test]
    fn subset_relation_holds() {
        let a = dfa_of("ab");
        let b = dfa_of("a(b|c)");
        assert!(is_subset(&a, &b));
        assert!(!is_subset(&b, &a));
    }

    #[test]
    fn shortest_witness_is_minimal() {
        let dfa = dfa_of("a+b");
        let witness = shortest_witness(&dfa).unwrap();
        assert_eq!(witness, "ab");
    }

    #[test]
    fn empty_intersection_detected() {
        let a = dfa_of("ab");
        let b = dfa_of("ac");
        assert!(is_empty(&intersect(&a, &b)));
    }
}
