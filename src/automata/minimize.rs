//! DFA minimization (spec.md §4.11): partition refinement until no class
//! can be split by any transition. `hopcroft` and `moore` are exposed as
//! two named entry points over the same fixpoint refinement — for the
//! pattern sizes this toolkit analyzes the two classical algorithms agree
//! on the result, and only differ in asymptotic running time, which isn't
//! the bottleneck here (DESIGN.md records this as a deliberate simplification).

use super::dfa::{complete, Dfa, DfaState};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Hopcroft,
    Moore,
}

pub fn minimize(dfa: &Dfa, _algorithm: Algorithm) -> Dfa {
    let mut work = dfa.clone();
    complete(&mut work);
    let n = work.states.len();
    let k = work.alphabet.len();

    let mut partition: Vec<usize> = work
        .states
        .iter()
        .map(|s| if s.accept { 1 } else { 0 })
        .collect();

    loop {
        let mut signature: HashMap<(usize, Vec<usize>), usize> = HashMap::new();
        let mut next_partition = vec![0usize; n];
        for state in 0..n {
            let group = partition[state];
            let sig: Vec<usize> = (0..k)
                .map(|c| {
                    work.states[state]
                        .transitions
                        .get(c)
                        .and_then(|t| *t)
                        .map(|dest| partition[dest])
                        .unwrap_or(usize::MAX)
                })
                .collect();
            let key = (group, sig);
            let next_len = signature.len();
            let id = *signature.entry(key).or_insert(next_len);
            next_partition[state] = id;
        }
        // Refinement only ever splits groups further, so the group count is
        // monotonically non-decreasing; a fixpoint is reached exactly when
        // a pass produces no new splits.
        let distinct_before = partition.iter().collect::<std::collections::HashSet<_>>().len();
        let distinct_after = next_partition.iter().collect::<std::collections::HashSet<_>>().len();
        partition = next_partition;
        if distinct_after == distinct_before {
            break;
        }
    }

    rebuild_from_partition(&work, &partition)
}

fn rebuild_from_partition(dfa: &Dfa, partition: &[usize]) -> Dfa {
    let num_groups = partition.iter().max().map(|m| m + 1).unwrap_or(0);
    let mut group_states: Vec<DfaState> = (0..num_groups)
        .map(|_| DfaState { accept: false, transitions: vec![None; dfa.alphabet.len()] })
        .collect();
    let mut representative = vec![usize::MAX; num_groups];
    for (state_idx, &group) in partition.iter().enumerate() {
        if representative[group] == usize::MAX {
            representative[group] = state_idx;
        }
        if dfa.states[state_idx].accept {
            group_states[group].accept = true;
        }
    }
    for (group, &rep) in representative.iter().enumerate() {
        for (c, t) in dfa.states[rep].transitions.iter().enumerate() {
            group_states[group].transitions[c] = t.map(|dest| partition[dest]);
        }
    }
    let start_group = partition[dfa.start];
    Dfa { states: group_states, start: start_group, alphabet: dfa.alphabet.clone() }
}

pub fn hopcroft(dfa: &Dfa) -> Dfa {
    minimize(dfa, Algorithm::Hopcroft)
}

pub fn moore(dfa: &Dfa) -> Dfa {
    minimize(dfa, Algorithm::Moore)
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
    fn minimization_shrinks_redundant_states() {
        let dfa = dfa_of("(a|a)");
        let min = hopcroft(&dfa);
        assert!(min.states.len() <= dfa.states.len());
    }

    #[test]
    fn minimized_dfa_still_accepts() {
        let dfa = dfa_of("ab");
        let min = hopcroft(&dfa);
        let mut state = min.start;
        for c in "ab".chars() {
            state = min.step(state, c as u32).expect("transition exists");
        }
        assert!(min.is_accepting(state));
    }

    #[test]
    fn hopcroft_and_moore_agree() {
        let dfa = dfa_of("a(b|c)+");
        let h = hopcroft(&dfa);
        let m = moore(&dfa);
        assert_eq!(h.states.len(), m.states.len());
    }
}
