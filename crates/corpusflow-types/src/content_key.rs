//! Content keys: the digest the scheduler uses to decide whether a rule's
//! output is still fresh.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A digest capturing a rule's identity, its resolved parameter
/// bindings, the modification times/sizes of its inputs, and the
/// configuration subtree it declared sensitivity to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentKey(pub String);

impl ContentKey {
    /// Builds a key from its ordered components. Callers must present
    /// components in a stable order (e.g. inputs sorted by path) — this
    /// function does no reordering of its own, so that a caller which
    /// deliberately wants order-sensitivity (it normally should not) is
    /// free to request it.
    pub fn compute<'a>(components: impl IntoIterator<Item = &'a str>) -> Self {
        let mut hasher = Sha256::new();
        for c in components {
            hasher.update(c.as_bytes());
            hasher.update(b"\0");
        }
        Self(hex::encode(hasher.finalize()))
    }
}

impl std::fmt::Display for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
