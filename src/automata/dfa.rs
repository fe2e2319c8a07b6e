//! Subset construction (spec.md §4.11): NFA → DFA over an effective
//! alphabet — the input codepoint range partitioned into equivalence
//! classes so the DFA's transition table stays small regardless of how wide
//! the underlying alphabet is.

use super::nfa::{Label, Nfa};
use std::collections::{BTreeSet, HashMap, VecDeque};

#[derive(Debug, Clone)]
pub struct DfaState {
    pub accept: bool,
    /// One entry per alphabet class; `None` means no transition (dead).
    pub transitions: Vec<Option<usize>>,
}

#[derive(Debug, Clone)]
pub struct Dfa {
    pub states: Vec<DfaState>,
    pub start: usize,
    /// Disjoint, sorted, inclusive codepoint ranges; `transitions[i]`
    /// corresponds to `alphabet[i]`.
    pub alphabet: Vec<(u32, u32)>,
}

/// Partitions the codepoints actually distinguished by `nfa`'s transitions
/// into minimal disjoint intervals (the "effective alphabet").
pub fn effective_alphabet(nfa: &Nfa) -> Vec<(u32, u32)> {
    let mut boundaries = BTreeSet::new();
    for state in &nfa.states {
        for (label, _) in &state.transitions {
            if let Label::CharSet(set) = label {
                for &(s, e) in &set.0 {
                    boundaries.insert(s);
                    boundaries.insert(e.saturating_add(1));
                }
            }
        }
    }
    let mut points: Vec<u32> = boundaries.into_iter().collect();
    points.sort_unstable();
    let mut ranges = Vec::new();
    for w in points.windows(2) {
        if w[1] > w[0] {
            ranges.push((w[0], w[1] - 1));
        }
    }
    ranges
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

fn class_for(alphabet: &[(u32, u32)], cp: u32) -> Option<usize> {
    alphabet.iter().position(|&(s, e)| cp >= s && cp <= e)
}

/// Builds a DFA equivalent to `nfa` via subset construction.
pub fn build_dfa(nfa: &Nfa) -> Dfa {
    let alphabet = effective_alphabet(nfa);
    let mut dfa_states: Vec<DfaState> = Vec::new();
    let mut index_of: HashMap<BTreeSet<usize>, usize> = HashMap::new();
    let mut queue: VecDeque<BTreeSet<usize>> = VecDeque::new();

    let start_set = epsilon_closure(nfa, &[nfa.start]);
    index_of.insert(start_set.clone(), 0);
    dfa_states.push(DfaState { accept: start_set.contains(&nfa.accept), transitions: Vec::new() });
    queue.push_back(start_set);

    while let Some(set) = queue.pop_front() {
        let from_idx = index_of[&set];
        let mut transitions = vec![None; alphabet.len()];
        for (class_idx, &(lo, _hi)) in alphabet.iter().enumerate() {
            let mut targets = Vec::new();
            for &state in &set {
                for (label, to) in &nfa.states[state].transitions {
                    if let Label::CharSet(cs) = label {
                        // The alphabet class boundaries are derived from
                        // every CharSet's own range endpoints, so a class is
                        // never split across a CharSet boundary — checking
                        // the class's low end decides the whole class.
                        if cs.contains(lo) {
                            targets.push(*to);
                        }
                    }
                }
            }
            if targets.is_empty() {
                continue;
            }
            let closure = epsilon_closure(nfa, &targets);
            let next_idx = *index_of.entry(closure.clone()).or_insert_with(|| {
                dfa_states.push(DfaState {
                    accept: closure.contains(&nfa.accept),
                    transitions: Vec::new(),
                });
                queue.push_back(closure.clone());
                dfa_states.len() - 1
            });
            transitions[class_idx] = Some(next_idx);
        }
        dfa_states[from_idx].transitions = transitions;
    }

    Dfa { states: dfa_states, start: 0, alphabet }
}

impl Dfa {
    pub fn step(&self, state: usize, cp: u32) -> Option<usize> {
        let class = class_for(&self.alphabet, cp)?;
        self.states[state].transitions.get(class).copied().flatten()
    }

    pub fn is_accepting(&self, state: usize) -> bool {
        self.states[state].accept
    }

    /// A representative codepoint for alphabet class `i`, for witness
    /// reconstruction and sample generation.
    pub fn representative(&self, class: usize) -> Option<char> {
        self.alphabet.get(class).and_then(|&(lo, _)| char::from_u32(lo))
    }
}

/// Fills in an explicit transition to a dead state for every missing
/// `(state, class)` pair, so complement/product operations can assume a
/// total transition function.
pub fn complete(dfa: &mut Dfa) -> usize {
    let dead = dfa.states.len();
    dfa.states.push(DfaState { accept: false, transitions: vec![Some(dead); dfa.alphabet.len()] });
    for state in &mut dfa.states[..dead] {
        for t in &mut state.transitions {
            if t.is_none() {
                *t = Some(dead);
            }
        }
    }
    dead
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automata::nfa::build_nfa;
    use crate::parser::{parse_pattern, ParserLimits};

    fn dfa_of(body: &str) -> Dfa {
        let ast = parse_pattern(body, "", ParserLimits::default()).unwrap();
        let nfa = build_nfa(&ast, "").unwrap();
        build_dfa(&nfa)
    }

    #[test]
    fn accepts_literal_match() {
        let dfa = dfa_of("ab");
        let mut state = dfa.start;
        for c in "ab".chars() {
            state = dfa.step(state, c as u32).expect("transition exists");
        }
        assert!(dfa.is_accepting(state));
    }

    #[test]
    fn rejects_wrong_input() {
        let dfa = dfa_of("ab");
        let state = dfa.step(dfa.start, 'x' as u32);
        assert!(state.is_none() || !dfa.is_accepting(state.unwrap()));
    }

    #[test]
    fn star_accepts_empty_and_repeats() {
        let dfa = dfa_of("a*");
        assert!(dfa.is_accepting(dfa.start));
        let mut state = dfa.start;
        for _ in 0..5 {
            state = dfa.step(state, 'a' as u32).expect("transition exists");
        }
        assert!(dfa.is_accepting(state));
    }
}
