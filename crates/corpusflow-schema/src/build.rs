//! Builds a JSON Schema document from the [`ConfigParamSpec`]s a registry
//! collects across all discovered processors, grouped by module.
//!
//! Processors declare their config surface at runtime (there is no static
//! Rust type for "the corpus config"), so this walks the dynamic spec list
//! rather than using `schemars`' derive machinery — `schemars` is used
//! instead for the handful of config sections that *are* statically typed
//! (see [`crate::envelope`]).

use std::collections::BTreeMap;

use corpusflow_types::ConfigParamSpec;
use serde_json::{json, Map, Value};

/// Builds a JSON Schema `object` describing one module's config keys, e.g.
/// the `segment` entry nested under `properties` for key `segment.token`.
pub fn module_property_schema(spec: &ConfigParamSpec) -> Value {
    let mut prop = Map::new();
    if let Some(default) = &spec.default {
        infer_type(default, &mut prop);
    }
    if !spec.choices.is_empty() {
        prop.insert("enum".into(), Value::Array(spec.choices.clone()));
    }
    if let Some(min) = spec.min {
        prop.insert("minimum".into(), json!(min));
    }
    if let Some(max) = spec.max {
        prop.insert("maximum".into(), json!(max));
    }
    if let Some(pattern) = &spec.pattern {
        prop.insert("pattern".into(), json!(pattern));
    }
    if !spec.description.is_empty() {
        prop.insert("description".into(), json!(spec.description));
    }
    if let Some(default) = &spec.default {
        prop.insert("default".into(), default.clone());
    }
    Value::Object(prop)
}

fn infer_type(default: &Value, prop: &mut Map<String, Value>) {
    let ty = match default {
        Value::String(_) => "string",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
        Value::Null => return,
    };
    prop.insert("type".into(), json!(ty));
}

/// Assembles a full draft-07-flavored schema document for a corpus config,
/// keyed by `<module>.<name>` dotted paths grouped into nested `properties`
/// objects one level deep (mirroring how config keys are addressed
/// elsewhere in the pipeline).
pub fn build_document(specs: impl IntoIterator<Item = (String, ConfigParamSpec)>) -> Value {
    let mut modules: BTreeMap<String, Map<String, Value>> = BTreeMap::new();
    for (module, spec) in specs {
        modules.entry(module).or_default().insert(spec.name.clone(), module_property_schema(&spec));
    }
    let properties: Map<String, Value> = modules
        .into_iter()
        .map(|(module, props)| {
            (
                module,
                json!({
                    "type": "object",
                    "properties": Value::Object(props),
                }),
            )
        })
        .collect();
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "properties": Value::Object(properties),
    })
}
