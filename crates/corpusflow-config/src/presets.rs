//! Preset expansion (§4.A `apply_presets`): replaces preset identifiers
//! inside annotation lists (e.g. `export.annotations`) with their
//! expansion, honouring `not <ref>` exclusions and the `...` "everything
//! else" token.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::ConfigError;

/// One parsed entry of an annotation list or a preset's own body.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum PresetEntry {
    /// A concrete annotation reference (or, before expansion, the name of
    /// another preset — resolved recursively by [`apply_presets`]).
    Ref(String),
    /// `not <ref>`: removes `ref` from the accumulated set so far.
    Not(String),
    /// `...`: "everything else the corpus produces". Left unresolved
    /// here — which references count as "everything else" depends on the
    /// full rule set, so the rule compiler is what turns this into
    /// concrete refs once it knows what's producible.
    Ellipsis,
}

impl PresetEntry {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed == "..." {
            PresetEntry::Ellipsis
        } else if let Some(rest) = trimmed.strip_prefix("not ") {
            PresetEntry::Not(rest.trim().to_string())
        } else {
            PresetEntry::Ref(trimmed.to_string())
        }
    }
}

/// A map from preset identifier (e.g. `SWE_DEFAULT.saldo`) to its raw
/// body entries, which may themselves name other presets.
#[derive(Debug, Clone, Default)]
pub struct PresetLibrary {
    presets: BTreeMap<String, Vec<String>>,
}

impl PresetLibrary {
    pub fn new() -> Self {
        Self { presets: BTreeMap::new() }
    }

    pub fn insert(&mut self, name: impl Into<String>, entries: Vec<String>) {
        self.presets.insert(name.into(), entries);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.presets.contains_key(name)
    }
}

/// Expands every preset identifier appearing in `entries` against
/// `library`, recursively, preserving order, applying `not` exclusions as
/// they're encountered (an exclusion only removes refs already
/// accumulated — it does not suppress a later re-addition of the same
/// ref, matching list semantics rather than set semantics read
/// backwards).
pub fn apply_presets(entries: &[String], library: &PresetLibrary) -> Result<Vec<PresetEntry>, ConfigError> {
    let mut out = Vec::new();
    let mut excluded = BTreeSet::new();
    let mut stack = Vec::new();
    expand_into(entries, library, &mut out, &mut excluded, &mut stack)?;
    Ok(out.into_iter().filter(|e| !matches!(e, PresetEntry::Ref(r) if excluded.contains(r))).collect())
}

fn expand_into(
    entries: &[String],
    library: &PresetLibrary,
    out: &mut Vec<PresetEntry>,
    excluded: &mut BTreeSet<String>,
    stack: &mut Vec<String>,
) -> Result<(), ConfigError> {
    for raw in entries {
        let entry = PresetEntry::parse(raw);
        match entry {
            PresetEntry::Not(ref r) => {
                excluded.insert(r.clone());
                out.push(PresetEntry::Not(r.clone()));
            }
            PresetEntry::Ellipsis => out.push(PresetEntry::Ellipsis),
            PresetEntry::Ref(ref name) => {
                if let Some(body) = library_lookup(library, name) {
                    if stack.contains(name) {
                        return Err(ConfigError::Invalid(format!(
                            "preset {name:?} is cyclic: {} -> {name}",
                            stack.join(" -> ")
                        )));
                    }
                    stack.push(name.clone());
                    expand_into(body, library, out, excluded, stack)?;
                    stack.pop();
                } else {
                    out.push(PresetEntry::Ref(name.clone()));
                }
            }
        }
    }
    Ok(())
}

fn library_lookup<'a>(library: &'a PresetLibrary, name: &str) -> Option<&'a Vec<String>> {
    library.presets.get(name)
}

impl PresetLibrary {
    /// Every preset identifier this library can expand, for the
    /// `presets` CLI verb's listing.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }

    pub fn entries(&self, name: &str) -> Option<&[String]> {
        self.presets.get(name).map(Vec::as_slice)
    }
}

/// Loads the preset library from `<data_dir>/presets.yaml`, a flat map of
/// preset identifier to its raw body entries. Missing or unreadable files
/// yield an empty library rather than an error — a corpus with no presets
/// configured shouldn't have to ship a `presets.yaml` just to run.
pub fn load_preset_library(data_dir: &std::path::Path) -> PresetLibrary {
    let path = data_dir.join("presets.yaml");
    let Ok(text) = std::fs::read_to_string(&path) else {
        return PresetLibrary::new();
    };
    let Ok(raw) = serde_yaml::from_str::<BTreeMap<String, Vec<String>>>(&text) else {
        return PresetLibrary::new();
    };
    let mut library = PresetLibrary::new();
    for (name, entries) in raw {
        library.insert(name, entries);
    }
    library
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_refs_pass_through_unchanged() {
        let lib = PresetLibrary::new();
        let out = apply_presets(&["<sentence>".into(), "<token>".into()], &lib).unwrap();
        assert_eq!(out, vec![PresetEntry::Ref("<sentence>".into()), PresetEntry::Ref("<token>".into())]);
    }

    #[test]
    fn expands_preset_identifier_to_its_body() {
        let mut lib = PresetLibrary::new();
        lib.insert("SWE_DEFAULT.saldo", vec!["<token>:saldo.sense".into(), "<token>:saldo.baseform".into()]);
        let out = apply_presets(&["SWE_DEFAULT.saldo".into()], &lib).unwrap();
        assert_eq!(
            out,
            vec![
                PresetEntry::Ref("<token>:saldo.sense".into()),
                PresetEntry::Ref("<token>:saldo.baseform".into()),
            ]
        );
    }

    #[test]
    fn not_exclusion_removes_earlier_ref() {
        let mut lib = PresetLibrary::new();
        lib.insert("P", vec!["<token>:a".into(), "<token>:b".into()]);
        let out = apply_presets(&["P".into(), "not <token>:b".into()], &lib).unwrap();
        assert_eq!(out, vec![PresetEntry::Ref("<token>:a".into())]);
    }

    #[test]
    fn ellipsis_is_preserved_unresolved() {
        let lib = PresetLibrary::new();
        let out = apply_presets(&["<token>".into(), "...".into()], &lib).unwrap();
        assert_eq!(out, vec![PresetEntry::Ref("<token>".into()), PresetEntry::Ellipsis]);
    }

    #[test]
    fn nested_presets_expand_recursively() {
        let mut lib = PresetLibrary::new();
        lib.insert("INNER", vec!["<token>:x".into()]);
        lib.insert("OUTER", vec!["INNER".into(), "<token>:y".into()]);
        let out = apply_presets(&["OUTER".into()], &lib).unwrap();
        assert_eq!(out, vec![PresetEntry::Ref("<token>:x".into()), PresetEntry::Ref("<token>:y".into())]);
    }

    #[test]
    fn cyclic_presets_are_rejected() {
        let mut lib = PresetLibrary::new();
        lib.insert("A", vec!["B".into()]);
        lib.insert("B", vec!["A".into()]);
        let err = apply_presets(&["A".into()], &lib).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn load_preset_library_reads_flat_yaml_map() {
        let td = tempfile::tempdir().unwrap();
        std::fs::write(
            td.path().join("presets.yaml"),
            "SWE_DEFAULT.saldo:\n  - <token>:saldo.sense\n  - <token>:saldo.baseform\n",
        )
        .unwrap();

        let lib = load_preset_library(td.path());
        assert!(lib.contains("SWE_DEFAULT.saldo"));
        assert_eq!(lib.entries("SWE_DEFAULT.saldo").unwrap().len(), 2);
    }

    #[test]
    fn load_preset_library_tolerates_missing_file() {
        let td = tempfile::tempdir().unwrap();
        let lib = load_preset_library(td.path());
        assert_eq!(lib.names().count(), 0);
    }
}
