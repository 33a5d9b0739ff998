//! `validate(config, schema)` (§4.A): checks every declared config key
//! present in the effective config against the constraints its owning
//! processor declared, delegating the per-value check to
//! `corpusflow-schema`.

use std::collections::BTreeMap;

use corpusflow_schema::ValidationError;
use corpusflow_types::ConfigParamSpec;

use crate::model::Config;

/// Validates every key in `specs` (dotted path -> spec) that has an
/// effective value in `config`, returning every violation found (not just
/// the first), so a single `corpusflow config` run surfaces all problems
/// at once.
pub fn validate_config(config: &Config, specs: &BTreeMap<String, ConfigParamSpec>) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for (key, spec) in specs {
        if let Some(value) = config.get(key) {
            if let Err(e) = corpusflow_schema::validate(key, value, spec) {
                errors.push(e);
            }
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(name: &str, default: serde_json::Value, min: Option<f64>, max: Option<f64>) -> ConfigParamSpec {
        ConfigParamSpec { name: name.into(), default: Some(default), description: String::new(), choices: Vec::new(), min, max, pattern: None }
    }

    #[test]
    fn reports_violations_across_multiple_keys() {
        let config = Config::from_value(json!({"wsd": {"threshold": 2.0}, "segment": {"token_regex": 5}}));
        let mut specs = BTreeMap::new();
        specs.insert("wsd.threshold".to_string(), spec("threshold", json!(0.5), Some(0.0), Some(1.0)));
        specs.insert("segment.token_regex".to_string(), spec("token_regex", json!("x"), None, None));

        let errors = validate_config(&config, &specs);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn keys_absent_from_config_are_not_validated() {
        let config = Config::empty();
        let mut specs = BTreeMap::new();
        specs.insert("wsd.threshold".to_string(), spec("threshold", json!(0.5), Some(0.0), Some(1.0)));
        assert!(validate_config(&config, &specs).is_empty());
    }
}
