//! The statically-shaped outer sections of a corpus config: `metadata`,
//! `import` and `export`. Unlike per-module config keys (dynamic, declared
//! by whichever processors a registry discovers), these sections have a
//! fixed shape, so they're expressed as ordinary Rust types and get their
//! schema for free from `schemars`'s derive.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CorpusMetadata {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub variety: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ImportSection {
    pub importer: Option<String>,
    #[serde(default)]
    pub source_dir: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ExportSection {
    #[serde(default)]
    pub exporters: Vec<String>,
    #[serde(default)]
    pub export_dir: Option<String>,
}

/// Schema for the fixed envelope, to be merged alongside the dynamic
/// per-module properties produced by [`crate::build::build_document`].
pub fn envelope_schema() -> schemars::Schema {
    schemars::schema_for!(CorpusEnvelope)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CorpusEnvelope {
    #[serde(default)]
    pub metadata: CorpusMetadata,
    #[serde(default)]
    pub import: ImportSection,
    #[serde(default)]
    pub export: ExportSection,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub presets: Vec<String>,
    #[serde(default)]
    pub classes: std::collections::BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_schema_includes_metadata_language() {
        let schema = envelope_schema();
        let value = serde_json::to_value(schema).unwrap();
        assert!(value["properties"]["metadata"].is_object());
    }
}
