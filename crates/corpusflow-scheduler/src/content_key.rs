//! Content-key computation (§4.E.3): a digest of a job's rule identity,
//! resolved bindings, input file stats, and the configuration subtree it
//! declared sensitivity to.
//!
//! Per §9's open question ("whether the content key should include the
//! compiled registry's hash... implementers should choose to include
//! it"), the registry fingerprint is folded in, so upgrading a processor
//! invalidates every job it could have touched even if the corpus config
//! didn't change.

use std::collections::BTreeSet;
use std::path::Path;

use corpusflow_config::Config;
use corpusflow_types::{ContentKey, ParamBinding};

/// Computes the content key for one instantiated job. `job_id` already
/// encodes the rule and, for per-file jobs, the source file, so it stands
/// in for "rule identity" here.
pub fn compute_content_key(
    job_id: &str,
    bindings: &[(String, ParamBinding)],
    config_sensitivity: &BTreeSet<String>,
    config: &Config,
    registry_fingerprint: &str,
) -> ContentKey {
    let mut components = vec![format!("job:{job_id}"), format!("registry:{registry_fingerprint}")];

    let mut sorted_bindings: Vec<&(String, ParamBinding)> = bindings.iter().collect();
    sorted_bindings.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, binding) in sorted_bindings {
        let rendered = match binding {
            ParamBinding::Path(path) => render_path_stat(path),
            ParamBinding::Immediate(value) => value.to_string(),
        };
        components.push(format!("bind:{name}={rendered}"));
    }

    let mut keys: Vec<&String> = config_sensitivity.iter().collect();
    keys.sort();
    for key in keys {
        let value = config.get(key).cloned().unwrap_or(serde_json::Value::Null);
        components.push(format!("config:{key}={value}"));
    }

    ContentKey::compute(components.iter().map(String::as_str))
}

fn render_path_stat(path: &Path) -> String {
    match std::fs::metadata(path) {
        Ok(meta) => format!("{}@{}:{}", path.display(), mtime_secs(&meta), meta.len()),
        Err(_) => format!("{}@missing", path.display()),
    }
}

fn mtime_secs(meta: &std::fs::Metadata) -> u64 {
    meta.modified().ok().and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok()).map(|d| d.as_secs()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sensitivity(keys: &[&str]) -> BTreeSet<String> {
        keys.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn same_inputs_produce_the_same_key() {
        let td = tempdir().unwrap();
        let input = td.path().join("doc.xml");
        std::fs::write(&input, "hello").unwrap();
        let bindings = vec![("text".to_string(), ParamBinding::Path(input.clone()))];
        let config = Config::empty();

        let a = compute_content_key("segment:token@doc", &bindings, &sensitivity(&[]), &config, "fp1");
        let b = compute_content_key("segment:token@doc", &bindings, &sensitivity(&[]), &config, "fp1");
        assert_eq!(a, b);
    }

    #[test]
    fn touching_an_input_changes_the_key() {
        let td = tempdir().unwrap();
        let input = td.path().join("doc.xml");
        std::fs::write(&input, "hello").unwrap();
        let bindings = vec![("text".to_string(), ParamBinding::Path(input.clone()))];
        let config = Config::empty();
        let before = compute_content_key("segment:token@doc", &bindings, &sensitivity(&[]), &config, "fp1");

        std::thread::sleep(std::time::Duration::from_millis(10));
        std::fs::write(&input, "hello world").unwrap();
        let after = compute_content_key("segment:token@doc", &bindings, &sensitivity(&[]), &config, "fp1");
        assert_ne!(before, after);
    }

    #[test]
    fn sensitivity_listed_config_key_changes_the_key() {
        let bindings = vec![];
        let sens = sensitivity(&["wsd.threshold"]);
        let before = compute_content_key("wsd:tag@doc", &bindings, &sens, &Config::empty(), "fp1");
        let after = compute_content_key(
            "wsd:tag@doc",
            &bindings,
            &sens,
            &Config::from_value(serde_json::json!({"wsd": {"threshold": 0.9}})),
            "fp1",
        );
        assert_ne!(before, after);
    }

    #[test]
    fn registry_fingerprint_change_invalidates_the_key() {
        let bindings = vec![];
        let config = Config::empty();
        let a = compute_content_key("segment:token@doc", &bindings, &sensitivity(&[]), &config, "fp1");
        let b = compute_content_key("segment:token@doc", &bindings, &sensitivity(&[]), &config, "fp2");
        assert_ne!(a, b);
    }

    proptest::proptest! {
        /// Bindings are sorted by name before digesting, so the order a
        /// caller happens to build the binding list in never affects the
        /// resulting key.
        #[test]
        fn key_is_independent_of_binding_declaration_order(
            a_value in proptest::prelude::any::<i64>(),
            b_value in proptest::prelude::any::<i64>(),
        ) {
            let config = Config::empty();
            let forward = vec![
                ("alpha".to_string(), ParamBinding::Immediate(serde_json::json!(a_value))),
                ("beta".to_string(), ParamBinding::Immediate(serde_json::json!(b_value))),
            ];
            let reversed = vec![
                ("beta".to_string(), ParamBinding::Immediate(serde_json::json!(b_value))),
                ("alpha".to_string(), ParamBinding::Immediate(serde_json::json!(a_value))),
            ];
            let key_forward = compute_content_key("wsd:tag@doc", &forward, &sensitivity(&[]), &config, "fp1");
            let key_reversed = compute_content_key("wsd:tag@doc", &reversed, &sensitivity(&[]), &config, "fp1");
            proptest::prop_assert_eq!(key_forward, key_reversed);
        }
    }
}
