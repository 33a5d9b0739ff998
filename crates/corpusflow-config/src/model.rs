//! The corpus configuration tree: loading, parent-chain merging, dotted
//! lookup, and `import`/`export` section inheritance (§3 "Configuration",
//! §4.A).

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::ConfigError;

const CORPUS_CONFIG_FILENAME: &str = "config.yaml";

/// A loaded, merged, frozen corpus configuration.
///
/// Internally this is a `serde_json::Value::Object` tree (config arrives
/// as YAML but is converted once at load time, since every downstream
/// consumer — schema validation, dotted lookup, preset expansion — wants
/// JSON-shaped values, not YAML's looser type model).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    root: Value,
}

impl Config {
    pub fn empty() -> Self {
        Self { root: Value::Object(Map::new()) }
    }

    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }

    /// Looks up a dotted-path key, e.g. `"wsd.sense_model"`, walking
    /// nested objects. Does not apply `import`/`export` inheritance — use
    /// [`Config::get_inherited`] for module config sections, which are
    /// the only sections §3 says inherit.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut cur = &self.root;
        for part in key.split('.') {
            cur = cur.as_object()?.get(part)?;
        }
        Some(cur)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a Value) -> &'a Value {
        self.get(key).unwrap_or(default)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_str()
    }

    /// §3: "`import` and `export` sections additionally serve as
    /// inheritance roots: keys under those sections are inherited by
    /// every importer/exporter module's own section when not explicitly
    /// overridden."
    ///
    /// `module` is the owning processor's module name (e.g. `xml_import`),
    /// `section` is `"import"` or `"export"`, `key` is the bare config
    /// name (e.g. `"encoding"`). Looks up `<module>.<key>` first, then
    /// falls back to `<section>.<key>`.
    pub fn get_inherited(&self, section: &str, module: &str, key: &str) -> Option<&Value> {
        self.get(&format!("{module}.{key}")).or_else(|| self.get(&format!("{section}.{key}")))
    }

    /// Sets a dotted-path key, creating intermediate objects as needed.
    /// Used internally during parent-chain merging.
    pub fn set(&mut self, key: &str, value: Value) {
        let parts: Vec<&str> = key.split('.').collect();
        set_path(&mut self.root, &parts, value);
    }

    /// Deep-merges `other` under `self`: any key `self` doesn't already
    /// define is filled in from `other`. Existing keys in `self` are
    /// never overwritten — this is how a corpus config "overrides" a
    /// parent rather than the parent overriding it.
    pub fn fill_from(&mut self, other: &Config) {
        fill_object(&mut self.root, &other.root);
    }
}

fn set_path(root: &mut Value, parts: &[&str], value: Value) {
    if parts.is_empty() {
        return;
    }
    if !root.is_object() {
        *root = Value::Object(Map::new());
    }
    let obj = root.as_object_mut().unwrap();
    if parts.len() == 1 {
        obj.insert(parts[0].to_string(), value);
        return;
    }
    let entry = obj.entry(parts[0].to_string()).or_insert_with(|| Value::Object(Map::new()));
    set_path(entry, &parts[1..], value);
}

fn fill_object(into: &mut Value, from: &Value) {
    let (Value::Object(into_map), Value::Object(from_map)) = (into, from) else {
        return;
    };
    for (k, v) in from_map {
        match into_map.get_mut(k) {
            Some(existing) if existing.is_object() && v.is_object() => fill_object(existing, v),
            Some(_) => {}
            None => {
                into_map.insert(k.clone(), v.clone());
            }
        }
    }
}

/// Loads and merges a corpus's configuration, walking its `parent:` chain
/// depth-first. Later parents override earlier ones; the corpus's own
/// config overrides all parents. `corpus_root` is the directory holding
/// `config.yaml`.
pub fn load_corpus_config(corpus_root: &Path) -> Result<Config, ConfigError> {
    let mut visited = BTreeSet::new();
    load_chain(corpus_root, &mut visited)
}

fn load_chain(corpus_root: &Path, visited: &mut BTreeSet<PathBuf>) -> Result<Config, ConfigError> {
    let canon = corpus_root.canonicalize().unwrap_or_else(|_| corpus_root.to_path_buf());
    if !visited.insert(canon.clone()) {
        return Err(ConfigError::Cycle(canon.display().to_string()));
    }

    let config_path = corpus_root.join(CORPUS_CONFIG_FILENAME);
    let text = std::fs::read_to_string(&config_path)
        .map_err(|_| ConfigError::NotFound(config_path.clone()))?;
    let yaml: Value = serde_yaml::from_str(&text)
        .map_err(|source| ConfigError::Parse { path: config_path.clone(), source })?;
    let mut own = Config::from_value(yaml);

    let parent_refs = parent_chain(&own);
    for parent_ref in parent_refs.into_iter().rev() {
        let parent_dir = resolve_parent_path(corpus_root, &parent_ref)
            .ok_or_else(|| ConfigError::ParentNotFound(parent_ref.clone()))?;
        let parent_cfg = load_chain(&parent_dir, visited)?;
        own.fill_from(&parent_cfg);
    }

    Ok(own)
}

/// A corpus may declare a single `parent: name` or a `parent: [a, b]`
/// chain; normalise to a list, preserving declaration order. Per §4.A a
/// *later* parent in the list overrides an earlier one, so `load_chain`
/// merges this list back-to-front: the last parent is filled in first
/// (winning every key it defines), then earlier parents only fill the
/// gaps still left open.
fn parent_chain(config: &Config) -> Vec<String> {
    match config.get("parent") {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
        _ => Vec::new(),
    }
}

/// Resolves a `parent:` reference to a directory: first as a path
/// relative to the corpus root, then as a sibling directory (a corpus
/// identified by name under the same parent-of-corpora directory).
fn resolve_parent_path(corpus_root: &Path, parent_ref: &str) -> Option<PathBuf> {
    let as_path = corpus_root.join(parent_ref);
    if as_path.join(CORPUS_CONFIG_FILENAME).is_file() {
        return Some(as_path);
    }
    let sibling = corpus_root.parent()?.join(parent_ref);
    if sibling.join(CORPUS_CONFIG_FILENAME).is_file() {
        return Some(sibling);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn write_config(dir: &Path, yaml: &str) {
        std::fs::write(dir.join(CORPUS_CONFIG_FILENAME), yaml).unwrap();
    }

    #[test]
    fn dotted_get_walks_nested_objects() {
        let cfg = Config::from_value(json!({"wsd": {"sense_model": "saldo"}}));
        assert_eq!(cfg.get("wsd.sense_model").unwrap(), "saldo");
        assert!(cfg.get("wsd.missing").is_none());
    }

    #[test]
    fn get_inherited_prefers_module_section_over_import() {
        let cfg = Config::from_value(json!({
            "import": {"encoding": "utf-8"},
            "xml_import": {"encoding": "latin-1"},
        }));
        assert_eq!(cfg.get_inherited("import", "xml_import", "encoding").unwrap(), "latin-1");
    }

    #[test]
    fn get_inherited_falls_back_to_section_default() {
        let cfg = Config::from_value(json!({"import": {"encoding": "utf-8"}}));
        assert_eq!(cfg.get_inherited("import", "xml_import", "encoding").unwrap(), "utf-8");
    }

    #[test]
    fn fill_from_never_overwrites_existing_keys() {
        let mut child = Config::from_value(json!({"metadata": {"language": "swe"}}));
        let parent = Config::from_value(json!({"metadata": {"language": "eng", "variety": "1800"}}));
        child.fill_from(&parent);
        assert_eq!(child.get("metadata.language").unwrap(), "swe");
        assert_eq!(child.get("metadata.variety").unwrap(), "1800");
    }

    #[test]
    fn set_creates_intermediate_objects() {
        let mut cfg = Config::empty();
        cfg.set("wsd.sense_model", json!("saldo"));
        assert_eq!(cfg.get("wsd.sense_model").unwrap(), "saldo");
    }

    #[test]
    fn load_corpus_config_merges_single_parent_chain() {
        let td = tempdir().unwrap();
        let base = td.path().join("base");
        let child = td.path().join("child");
        std::fs::create_dir_all(&base).unwrap();
        std::fs::create_dir_all(&child).unwrap();

        write_config(&base, "metadata:\n  language: swe\nimport:\n  encoding: utf-8\n");
        write_config(&child, "parent: ../base\nmetadata:\n  name: mycorpus\n");

        let cfg = load_corpus_config(&child).unwrap();
        assert_eq!(cfg.get("metadata.language").unwrap(), "swe");
        assert_eq!(cfg.get("metadata.name").unwrap(), "mycorpus");
        assert_eq!(cfg.get("import.encoding").unwrap(), "utf-8");
    }

    #[test]
    fn load_corpus_config_prefers_the_later_parent_in_a_multi_parent_chain() {
        let td = tempdir().unwrap();
        let base1 = td.path().join("base1");
        let base2 = td.path().join("base2");
        let child = td.path().join("child");
        std::fs::create_dir_all(&base1).unwrap();
        std::fs::create_dir_all(&base2).unwrap();
        std::fs::create_dir_all(&child).unwrap();

        write_config(&base1, "metadata:\n  language: swe\n  variety: old\n");
        write_config(&base2, "metadata:\n  language: eng\n");
        write_config(&child, "parent: [../base1, ../base2]\n");

        let cfg = load_corpus_config(&child).unwrap();
        assert_eq!(cfg.get("metadata.language").unwrap(), "eng");
        assert_eq!(cfg.get("metadata.variety").unwrap(), "old");
    }

    #[test]
    fn load_corpus_config_detects_cycle() {
        let td = tempdir().unwrap();
        let a = td.path().join("a");
        let b = td.path().join("b");
        std::fs::create_dir_all(&a).unwrap();
        std::fs::create_dir_all(&b).unwrap();
        write_config(&a, "parent: ../b\n");
        write_config(&b, "parent: ../a\n");

        let err = load_corpus_config(&a).unwrap_err();
        assert!(matches!(err, ConfigError::Cycle(_)));
    }

    #[test]
    fn load_corpus_config_reports_missing_parent() {
        let td = tempdir().unwrap();
        let child = td.path().join("child");
        std::fs::create_dir_all(&child).unwrap();
        write_config(&child, "parent: nonexistent\n");

        let err = load_corpus_config(&child).unwrap_err();
        assert!(matches!(err, ConfigError::ParentNotFound(_)));
    }

    #[test]
    fn load_corpus_config_reports_missing_config_file() {
        let td = tempdir().unwrap();
        let err = load_corpus_config(td.path()).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn get_inherited_section_snapshot() {
        let cfg = Config::from_value(json!({
            "import": {"encoding": "utf-8", "skip_blank_lines": true},
            "xml_import": {"encoding": "latin-1"},
        }));
        let rendered = format!(
            "encoding = {:?}\nskip_blank_lines = {:?}",
            cfg.get_inherited("import", "xml_import", "encoding"),
            cfg.get_inherited("import", "xml_import", "skip_blank_lines"),
        );
        insta::assert_snapshot!(rendered, @r###"
        encoding = Some(String("latin-1"))
        skip_blank_lines = Some(Bool(true))
        "###);
    }

    fn arb_leaf() -> impl proptest::strategy::Strategy<Value = Value> {
        use proptest::prelude::*;
        prop_oneof![
            any::<bool>().prop_map(Value::Bool),
            "[a-z]{1,8}".prop_map(Value::String),
        ]
    }

    proptest::proptest! {
        /// `fill_from` never overwrites a key `self` already defines,
        /// regardless of what value the parent carries for that key —
        /// the "child overrides parent" half of §4.A merging.
        #[test]
        fn fill_from_preserves_every_existing_leaf(child_value in arb_leaf(), parent_value in arb_leaf()) {
            let mut child = Config::from_value(json!({"k": child_value}));
            let parent = Config::from_value(json!({"k": parent_value}));
            child.fill_from(&parent);
            prop_assert_eq!(child.get("k").unwrap(), &child_value);
        }

        /// A key only the parent defines always comes through untouched.
        #[test]
        fn fill_from_adopts_parent_only_keys(parent_value in arb_leaf()) {
            let mut child = Config::empty();
            let parent = Config::from_value(json!({"only_parent": parent_value}));
            child.fill_from(&parent);
            prop_assert_eq!(child.get("only_parent").unwrap(), &parent_value);
        }
    }
}
