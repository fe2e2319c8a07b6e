//! AST → NFA → DFA construction, minimization, and product operations
//! (spec.md §4.11). This is the regular-subset backend shared by the
//! optimizer's verification mode and the ReDoS analyzer's confirmed mode.

pub mod dfa;
pub mod minimize;
pub mod nfa;
pub mod ops;

pub use dfa::{build_dfa, Dfa};
pub use minimize::{hopcroft, moore, Algorithm as MinimizationAlgorithm};
pub use nfa::{build_nfa, Nfa};
pub use ops::{difference, intersect, is_empty, is_equivalent, is_subset, shortest_witness, union};

use crate::ast::Node;
use crate::errors::Result;

/// Builds a minimized DFA straight from an AST, the common case for
/// equivalence checks and confirmed-mode ReDoS analysis.
pub fn compile_to_dfa(ast: &Node, flags: &str, algorithm: MinimizationAlgorithm) -> Result<Dfa> {
    let nfa = build_nfa(ast, flags)?;
    let dfa = build_dfa(&nfa);
    Ok(minimize::minimize(&dfa, algorithm))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_pattern, ParserLimits};

    #[test]
    fn compiles_and_minimizes_end_to_end() {
        let ast = parse_pattern("(a|b)+c", "", ParserLimits::default()).unwrap();
        let dfa = compile_to_dfa(&ast, "", MinimizationAlgorithm::Hopcroft).unwrap();
        assert!(!is_empty(&dfa));
    }
}
