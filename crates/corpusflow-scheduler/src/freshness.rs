//! Persisted content keys (§4.E.3, §6 "work/.content-keys"): the record of
//! what content key produced each job's outputs last time it ran, so a
//! rerun can skip jobs whose inputs, bindings, and config sensitivity
//! haven't changed.

use std::collections::BTreeMap;
use std::path::Path;

use corpusflow_types::ContentKey;

#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct ContentKeyStore {
    entries: BTreeMap<String, ContentKey>,
}

impl ContentKeyStore {
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

    /// A job is fresh when its previously recorded key matches `current`
    /// *and* every one of its declared outputs still exists on disk — a
    /// matching key with a manually deleted output must still re-run.
    pub fn is_fresh(&self, job_id: &str, current: &ContentKey, outputs: &[std::path::PathBuf]) -> bool {
        self.entries.get(job_id) == Some(current) && outputs.iter().all(|p| p.exists())
    }

    pub fn record(&mut self, job_id: &str, key: ContentKey) {
        self.entries.insert(job_id.to_string(), key);
    }

    pub fn forget(&mut self, job_id: &str) {
        self.entries.remove(job_id);
    }
}
