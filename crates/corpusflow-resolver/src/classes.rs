//! Class bindings (§3 "Class registry", §4.C.2).
//!
//! A class (`token`, `sentence`, ...) is bound to a concrete annotation
//! reference either explicitly, through the `classes` config section, or
//! implicitly, when exactly one discovered processor declares itself the
//! canonical producer of that class via a `cls=` tag on one of its
//! outputs.

use std::collections::BTreeMap;

use corpusflow_config::Config;
use corpusflow_registry::Registry;
use corpusflow_types::AnnotationRef;

use crate::error::ResolverError;

pub struct ClassBindings {
    explicit: BTreeMap<String, AnnotationRef>,
    candidates: BTreeMap<String, Vec<(AnnotationRef, String)>>,
}

impl ClassBindings {
    pub fn build(config: &Config, registry: &Registry) -> Self {
        let mut explicit = BTreeMap::new();
        if let Some(serde_json::Value::Object(map)) = config.get("classes") {
            for (class, value) in map {
                if let Some(text) = value.as_str() {
                    if let Ok(reference) = AnnotationRef::parse(text) {
                        explicit.insert(class.clone(), reference);
                    }
                }
            }
        }

        let mut candidates: BTreeMap<String, Vec<(AnnotationRef, String)>> = BTreeMap::new();
        for (class, reference, processor_id) in registry.class_producers() {
            candidates.entry(class).or_default().push((reference, processor_id));
        }

        Self { explicit, candidates }
    }

    /// Resolves one class to a concrete reference. `Ok(None)` means the
    /// class is unbound with no candidate producer — the caller suppresses
    /// whatever reference this class appeared in, per §4.C.1's "not an
    /// error" rule for undefined placeholders. `Err(ClassAmbiguous)` means
    /// more than one candidate exists and none has been chosen explicitly.
    pub fn resolve(&self, class: &str) -> Result<Option<AnnotationRef>, ResolverError> {
        if let Some(bound) = self.explicit.get(class) {
            return Ok(Some(bound.clone()));
        }
        match self.candidates.get(class) {
            None => Ok(None),
            Some(v) if v.is_empty() => Ok(None),
            Some(v) if v.len() == 1 => Ok(Some(v[0].0.clone())),
            Some(v) => Err(ResolverError::ClassAmbiguous {
                class: class.to_string(),
                candidates: v.iter().map(|(_, id)| id.clone()).collect(),
            }),
        }
    }
}
