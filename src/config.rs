//! A single, strongly-typed configuration surface for the whole pipeline
//! (spec.md §4.10), replacing any notion of stringly-typed options.
//!
//! `Config` nests the per-component configs each module already defines
//! (`ParserLimits`, `OptimizeConfig`, `RedosConfig`) plus two enums the
//! facade needs that don't belong to any single module. Deserializing a
//! `Config` from external JSON rejects unknown fields, so a typo in a
//! config file surfaces immediately instead of silently no-opping.

use crate::automata::MinimizationAlgorithm;
use crate::optimizer::OptimizeConfig;
use crate::parser::ParserLimits;
use crate::redos::RedosConfig;
use serde::{Deserialize, Serialize};

/// Which DFA minimization algorithm the automata subsystem should run.
///
/// Mirrors `automata::MinimizationAlgorithm`; kept as its own serde-derived
/// enum here so `Config` doesn't require `automata`'s internals to derive
/// `Serialize`/`Deserialize` themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Minimization {
    Hopcroft,
    Moore,
}

impl From<Minimization> for MinimizationAlgorithm {
    fn from(m: Minimization) -> Self {
        match m {
            Minimization::Hopcroft => MinimizationAlgorithm::Hopcroft,
            Minimization::Moore => MinimizationAlgorithm::Moore,
        }
    }
}

/// Whether automata comparisons (optimizer verification, equivalence
/// checks) treat the pattern as anchored full-string matching or as
/// search-anywhere matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    Full,
    Search,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParserLimitsConfig {
    pub max_pattern_length: usize,
    pub max_recursion_depth: usize,
    pub max_nodes: usize,
}

impl Default for ParserLimitsConfig {
    fn default() -> Self {
        let limits = ParserLimits::default();
        Self {
            max_pattern_length: limits.max_pattern_length,
            max_recursion_depth: limits.max_recursion_depth,
            max_nodes: limits.max_nodes,
        }
    }
}

impl From<&ParserLimitsConfig> for ParserLimits {
    fn from(c: &ParserLimitsConfig) -> Self {
        ParserLimits {
            max_pattern_length: c.max_pattern_length,
            max_recursion_depth: c.max_recursion_depth,
            max_nodes: c.max_nodes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptimizeConfigSection {
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

impl Default for OptimizeConfigSection {
    fn default() -> Self {
        let o = OptimizeConfig::default();
        Self {
            literal_coalescing: o.literal_coalescing,
            flatten: o.flatten,
            alternation_to_char_class: o.alternation_to_char_class,
            canonicalize_char_classes: o.canonicalize_char_classes,
            digits: o.digits,
            word: o.word,
            ranges: o.ranges,
            quantifier_compaction: o.quantifier_compaction,
            min_quantifier_count: o.min_quantifier_count,
            auto_possessify: o.auto_possessify,
            flag_cleanup: o.flag_cleanup,
            allow_alternation_factorization: o.allow_alternation_factorization,
            min_savings: o.min_savings,
            verify_with_automata: o.verify_with_automata,
        }
    }
}

impl From<&OptimizeConfigSection> for OptimizeConfig {
    fn from(c: &OptimizeConfigSection) -> Self {
        OptimizeConfig {
            literal_coalescing: c.literal_coalescing,
            flatten: c.flatten,
            alternation_to_char_class: c.alternation_to_char_class,
            canonicalize_char_classes: c.canonicalize_char_classes,
            digits: c.digits,
            word: c.word,
            ranges: c.ranges,
            quantifier_compaction: c.quantifier_compaction,
            min_quantifier_count: c.min_quantifier_count,
            auto_possessify: c.auto_possessify,
            flag_cleanup: c.flag_cleanup,
            allow_alternation_factorization: c.allow_alternation_factorization,
            min_savings: c.min_savings,
            verify_with_automata: c.verify_with_automata,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedosConfigSection {
    pub mode: RedosMode,
    pub threshold: u8,
    pub disable_jit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedosMode {
    Off,
    Theoretical,
    Confirmed,
    Both,
}

impl Default for RedosConfigSection {
    fn default() -> Self {
        let r = RedosConfig::default();
        Self { mode: r.mode.into(), threshold: r.threshold, disable_jit: r.disable_jit }
    }
}

impl From<crate::redos::Mode> for RedosMode {
    fn from(m: crate::redos::Mode) -> Self {
        match m {
            crate::redos::Mode::Off => RedosMode::Off,
            crate::redos::Mode::Theoretical => RedosMode::Theoretical,
            crate::redos::Mode::Confirmed => RedosMode::Confirmed,
            crate::redos::Mode::Both => RedosMode::Both,
        }
    }
}

impl From<RedosMode> for crate::redos::Mode {
    fn from(m: RedosMode) -> Self {
        match m {
            RedosMode::Off => crate::redos::Mode::Off,
            RedosMode::Theoretical => crate::redos::Mode::Theoretical,
            RedosMode::Confirmed => crate::redos::Mode::Confirmed,
            RedosMode::Both => crate::redos::Mode::Both,
        }
    }
}

impl From<&RedosConfigSection> for RedosConfig {
    fn from(c: &RedosConfigSection) -> Self {
        RedosConfig { mode: c.mode.into(), threshold: c.threshold, disable_jit: c.disable_jit }
    }
}

/// The single configuration surface threaded through the facade.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub parser_limits: ParserLimitsConfig,
    pub optimize: OptimizeConfigSection,
    pub redos: RedosConfigSection,
    pub minimization: Minimization,
    pub match_mode: MatchMode,
    /// Recognize and validate all flags known to this toolkit, rather than
    /// only the commonly-used subset; see SPEC_FULL.md §5 item 1.
    pub strict_flag_validation: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            parser_limits: ParserLimitsConfig::default(),
            optimize: OptimizeConfigSection::default(),
            redos: RedosConfigSection::default(),
            minimization: Minimization::Hopcroft,
            match_mode: MatchMode::Full,
            strict_flag_validation: false,
        }
    }
}

impl Config {
    pub fn parser_limits(&self) -> ParserLimits {
        (&self.parser_limits).into()
    }

    pub fn optimize_config(&self) -> OptimizeConfig {
        (&self.optimize).into()
    }

    pub fn redos_config(&self) -> RedosConfig {
        (&self.redos).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_json() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.redos.threshold, config.redos.threshold);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let json = r#"{"parser_limits":{"max_pattern_length":1,"max_recursion_depth":1,"max_nodes":1},
            "optimize":{"literal_coalescing":true,"flatten":true,"alternation_to_char_class":true,
            "canonicalize_char_classes":true,"digits":true,"word":true,"ranges":true,
            "quantifier_compaction":true,"min_quantifier_count":3,"auto_possessify":true,
            "flag_cleanup":true,"allow_alternation_factorization":false,"min_savings":1,
            "verify_with_automata":false},
            "redos":{"mode":"theoretical","threshold":50,"disable_jit":false},
            "minimization":"hopcroft","match_mode":"full","strict_flag_validation":false,
            "bogus_field":true}"#;
        assert!(serde_json::from_str::<Config>(json).is_err());
    }

    #[test]
    fn converts_into_component_configs() {
        let config = Config::default();
        assert_eq!(config.parser_limits().max_nodes, ParserLimits::default().max_nodes);
        assert_eq!(config.redos_config().threshold, RedosConfig::default().threshold);
    }
}
