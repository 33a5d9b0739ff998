//! The reference resolver (§4.C): the facade the rule compiler and
//! scheduler call through to turn a processor's declared parameter
//! defaults into concrete file paths.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use corpusflow_config::Config;
use corpusflow_registry::Registry;
use corpusflow_types::AnnotationRef;

use crate::classes::ClassBindings;
use crate::error::ResolverError;
use crate::paths;
use crate::placeholders::{expand_classes, substitute_config_placeholders, substitute_wildcards, unify_wildcards};

/// Config and registry are frozen inputs (§9 "Global state"); a resolver
/// borrows both and is itself cheap to construct — the expensive part,
/// producer lookup, is memoized internally.
pub struct Resolver<'a> {
    config: &'a Config,
    registry: &'a Registry,
    bindings: ClassBindings,
    producer_cache: RefCell<BTreeMap<AnnotationRef, Vec<String>>>,
}

impl<'a> Resolver<'a> {
    pub fn new(config: &'a Config, registry: &'a Registry) -> Self {
        Self { config, registry, bindings: ClassBindings::build(config, registry), producer_cache: RefCell::new(BTreeMap::new()) }
    }

    /// Stages 1-2 of §4.C: config-placeholder substitution, then class
    /// expansion. `Ok(None)` means the reference is unresolvable and the
    /// rule that carries it should be silently suppressed rather than
    /// failing the run.
    pub fn resolve_literal(&self, reference: &AnnotationRef) -> Result<Option<AnnotationRef>, ResolverError> {
        let Some(span) = self.expand_segment(&reference.span)? else {
            return Ok(None);
        };
        let attr = match &reference.attr {
            None => None,
            Some(raw) => match self.expand_segment(raw)? {
                Some(expanded) => Some(expanded),
                None => return Ok(None),
            },
        };
        Ok(Some(AnnotationRef { span, attr }))
    }

    /// Same as [`Resolver::resolve_literal`], but turns suppression into a
    /// hard [`ResolverError::ReferenceUnresolved`] — for callers (the rule
    /// compiler, compiling a rule input that must exist) where an
    /// unresolved reference means the whole rule is invalid rather than
    /// quietly absent.
    pub fn resolve_required(&self, reference: &AnnotationRef) -> Result<AnnotationRef, ResolverError> {
        self.resolve_literal(reference)?.ok_or_else(|| ResolverError::ReferenceUnresolved(reference.to_string()))
    }

    fn expand_segment(&self, segment: &str) -> Result<Option<String>, ResolverError> {
        let Some(after_config) = substitute_config_placeholders(segment, self.config) else {
            return Ok(None);
        };
        expand_classes(&after_config, &self.bindings)
    }

    /// §4.C.3: unifies a rule's output pattern against a concretely
    /// requested output, returning the wildcard bindings to apply to the
    /// rule's other inputs/outputs.
    pub fn unify(&self, pattern: &AnnotationRef, concrete: &AnnotationRef) -> Option<BTreeMap<String, String>> {
        let span_bindings = unify_wildcards(&pattern.span, &concrete.span)?;
        match (&pattern.attr, &concrete.attr) {
            (None, None) => Some(span_bindings),
            (Some(p), Some(c)) => {
                let attr_bindings = unify_wildcards(p, c)?;
                let mut merged = span_bindings;
                for (k, v) in attr_bindings {
                    match merged.get(&k) {
                        Some(existing) if *existing != v => return None,
                        _ => {
                            merged.insert(k, v);
                        }
                    }
                }
                Some(merged)
            }
            _ => None,
        }
    }

    /// Substitutes a set of already-unified wildcard bindings into a
    /// reference that still carries `{wildcard}` tokens (typically one of
    /// the rule's other inputs/outputs, after [`Resolver::unify`] forced
    /// them to the requested output's values).
    pub fn substitute(&self, reference: &AnnotationRef, bindings: &BTreeMap<String, String>) -> Option<AnnotationRef> {
        let span = substitute_wildcards(&reference.span, bindings)?;
        let attr = match &reference.attr {
            None => None,
            Some(raw) => Some(substitute_wildcards(raw, bindings)?),
        };
        Some(AnnotationRef { span, attr })
    }

    /// §4.C.4: maps a fully resolved reference to its work-directory path.
    pub fn file_path(&self, work_dir: &Path, file: Option<&str>, reference: &AnnotationRef) -> PathBuf {
        paths::resolve_path(work_dir, file, reference)
    }

    /// "Who produces this reference?" (§4.C, final paragraph) — computed
    /// once per target and memoized for the lifetime of this resolver,
    /// which lives for a single engine run.
    pub fn producers_of(&self, target: &AnnotationRef) -> Vec<String> {
        if let Some(cached) = self.producer_cache.borrow().get(target) {
            return cached.clone();
        }

        let mut found = Vec::new();
        for processor in self.registry.all() {
            for (output, _cls) in processor.descriptor().annotation_outputs() {
                if let Ok(Some(resolved)) = self.resolve_literal(output) {
                    if &resolved == target {
                        found.push(processor.descriptor().id.clone());
                    }
                }
            }
        }

        self.producer_cache.borrow_mut().insert(target.clone(), found.clone());
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corpusflow_registry::{JobContext, Processor, ProcessorSource, StaticProcessorSource};
    use corpusflow_types::{ParamRole, ProcessorDescriptor, ProcessorKind};
    use serde_json::json;
    use std::sync::Arc;

    struct Noop(ProcessorDescriptor);
    impl Processor for Noop {
        fn descriptor(&self) -> &ProcessorDescriptor {
            &self.0
        }
        fn run(&self, _ctx: &JobContext) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn registry_with_token_producer() -> Registry {
        let descriptor = ProcessorDescriptor::builder("segment:token", ProcessorKind::Annotator, "tokenizer")
            .param(
                "out",
                ParamRole::AnnotationOutput { default: AnnotationRef::parse("segment.token").unwrap(), cls: Some("token".into()) },
            )
            .build();
        let source = StaticProcessorSource::new(vec![Arc::new(Noop(descriptor)) as Arc<dyn Processor>]);
        Registry::discover(vec![Box::new(source) as Box<dyn ProcessorSource>]).unwrap()
    }

    #[test]
    fn resolves_class_placeholder_end_to_end() {
        let config = Config::empty();
        let registry = registry_with_token_producer();
        let resolver = Resolver::new(&config, &registry);
        let resolved = resolver.resolve_literal(&AnnotationRef::parse("<token>").unwrap()).unwrap().unwrap();
        assert_eq!(resolved.span, "segment.token");
    }

    #[test]
    fn resolves_config_placeholder_inside_attr() {
        let config = Config::from_value(json!({"wsd": {"sense_model": "saldo"}}));
        let registry = Registry::discover(vec![]).unwrap();
        let resolver = Resolver::new(&config, &registry);
        let resolved = resolver
            .resolve_literal(&AnnotationRef::parse("segment.token:[wsd.sense_model].sense").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(resolved.attr.as_deref(), Some("saldo.sense"));
    }

    #[test]
    fn suppresses_undefined_config_placeholder() {
        let config = Config::empty();
        let registry = Registry::discover(vec![]).unwrap();
        let resolver = Resolver::new(&config, &registry);
        let resolved = resolver.resolve_literal(&AnnotationRef::parse("[wsd.sense_model].sense").unwrap()).unwrap();
        assert_eq!(resolved, None);
    }

    #[test]
    fn file_path_maps_span_and_attr_references() {
        let config = Config::empty();
        let registry = Registry::discover(vec![]).unwrap();
        let resolver = Resolver::new(&config, &registry);
        let reference = AnnotationRef::parse("segment.token").unwrap();
        let path = resolver.file_path(Path::new("work"), Some("doc"), &reference);
        assert_eq!(path, PathBuf::from("work/doc/segment.token/_span"));
    }

    #[test]
    fn unify_then_substitute_round_trips_wildcard_binding() {
        let config = Config::empty();
        let registry = Registry::discover(vec![]).unwrap();
        let resolver = Resolver::new(&config, &registry);

        let pattern = AnnotationRef::parse("{annotation}:misc.number_position").unwrap();
        let concrete = AnnotationRef::parse("sentence:misc.number_position").unwrap();
        let bindings = resolver.unify(&pattern, &concrete).unwrap();

        let input_pattern = AnnotationRef::parse("{annotation}").unwrap();
        let substituted = resolver.substitute(&input_pattern, &bindings).unwrap();
        assert_eq!(substituted.span, "sentence");
    }

    #[test]
    fn producers_of_is_memoized_and_finds_the_right_processor() {
        let config = Config::empty();
        let registry = registry_with_token_producer();
        let resolver = Resolver::new(&config, &registry);
        let target = AnnotationRef::parse("segment.token").unwrap();
        assert_eq!(resolver.producers_of(&target), vec!["segment:token".to_string()]);
        assert_eq!(resolver.producers_of(&target), vec!["segment:token".to_string()]);
    }
}
