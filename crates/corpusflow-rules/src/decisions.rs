//! Persisted ambiguity decisions (§4.D, §6 "Persisted state", §9 Open
//! Questions): when a conflict group has two rules with the same `order`,
//! interactive arbitration picks a winner, and that choice is remembered
//! under the corpus directory so later runs don't re-ask.
//!
//! Keyed by `(corpus id, output key)`; a decision also carries the
//! registry fingerprint it was made against, so a processor upgrade (a
//! changed descriptor, not just a config edit) invalidates the memory
//! instead of silently reusing a stale pick — this resolves §9's "the
//! persistence format for remembered decisions is not fully specified"
//! open question in favour of the stricter choice.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub chosen_rule_id: String,
    pub registry_fingerprint: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecisionStore {
    decisions: BTreeMap<String, Decision>,
}

impl DecisionStore {
    pub fn load(path: &Path) -> Self {
        std::fs::read_to_string(path).ok().and_then(|text| serde_json::from_str(&text).ok()).unwrap_or_default()
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    fn key(corpus_id: &str, output_key: &str) -> String {
        format!("{corpus_id}::{output_key}")
    }

    /// The remembered producer for this conflict, if the registry hasn't
    /// changed shape since the decision was made.
    pub fn get(&self, corpus_id: &str, output_key: &str, registry_fingerprint: &str) -> Option<&str> {
        let decision = self.decisions.get(&Self::key(corpus_id, output_key))?;
        (decision.registry_fingerprint == registry_fingerprint).then_some(decision.chosen_rule_id.as_str())
    }

    pub fn remember(&mut self, corpus_id: &str, output_key: &str, chosen_rule_id: String, registry_fingerprint: String) {
        self.decisions.insert(Self::key(corpus_id, output_key), Decision { chosen_rule_id, registry_fingerprint });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn remembered_decision_is_invalidated_by_a_fingerprint_change() {
        let mut store = DecisionStore::default();
        store.remember("mycorpus", "segment.token", "seg:a".into(), "fp1".into());
        assert_eq!(store.get("mycorpus", "segment.token", "fp1"), Some("seg:a"));
        assert_eq!(store.get("mycorpus", "segment.token", "fp2"), None);
    }

    #[test]
    fn round_trips_through_disk() {
        let td = tempdir().unwrap();
        let path = td.path().join("state").join("decisions.json");
        let mut store = DecisionStore::default();
        store.remember("mycorpus", "segment.token", "seg:a".into(), "fp1".into());
        store.save(&path).unwrap();

        let loaded = DecisionStore::load(&path);
        assert_eq!(loaded.get("mycorpus", "segment.token", "fp1"), Some("seg:a"));
    }

    #[test]
    fn load_of_missing_file_is_an_empty_store() {
        let td = tempdir().unwrap();
        let loaded = DecisionStore::load(&td.path().join("missing.json"));
        assert_eq!(loaded.get("mycorpus", "segment.token", "fp1"), None);
    }
}
