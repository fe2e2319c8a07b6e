//! Cache-key derivation and a narrow storage port (spec.md §4.10).
//!
//! This crate never ships a concrete on-disk cache (out of scope, see
//! SPEC_FULL.md §1); it only provides the pieces a host would wire one up
//! with: a stable key derived from the pattern, flags, and the config that
//! shaped the analysis, plus a `KeyValueStore` trait a host implements
//! against whatever backing store it already has.

use crate::config::Config;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// A storage port for cached analysis results, keyed by `cache_key`.
///
/// No concrete filesystem or database adapter ships with this crate; hosts
/// implement this against their own storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&mut self, key: &str, value: String);
}

/// A stable key over `(pattern, flags, config)`, suitable for memoizing any
/// analysis result that depends only on those three inputs.
///
/// The config is serialized canonically (`serde_json`'s deterministic field
/// order for a fixed struct shape) before hashing, so two `Config` values
/// that are `==` always produce the same key regardless of how they were
/// constructed.
pub fn cache_key(pattern: &str, flags: &str, config: &Config) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pattern.as_bytes());
    hasher.update(b"\0");
    hasher.update(flags.as_bytes());
    hasher.update(b"\0");
    let config_json = serde_json::to_string(config).unwrap_or_default();
    hasher.update(config_json.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// An in-memory `KeyValueStore`, provided for tests and as a usage example.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn put(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_produce_the_same_key() {
        let config = Config::default();
        let a = cache_key("a+b*", "i", &config);
        let b = cache_key("a+b*", "i", &config);
        assert_eq!(a, b);
    }

    #[test]
    fn different_flags_produce_different_keys() {
        let config = Config::default();
        let a = cache_key("a+b*", "i", &config);
        let b = cache_key("a+b*", "", &config);
        assert_ne!(a, b);
    }

    #[test]
    fn different_config_produces_different_keys() {
        let mut other = Config::default();
        other.redos.threshold = 10;
        let a = cache_key("a+", "", &Config::default());
        let b = cache_key("a+", "", &other);
        assert_ne!(a, b);
    }

    #[test]
    fn memory_store_round_trips() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("k"), None);
        store.put("k".to_string(), "v".to_string());
        assert_eq!(store.get("k"), Some("v".to_string()));
    }
}
