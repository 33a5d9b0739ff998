//! Rule compilation (§4.D): one rule per processor (plus custom-annotation
//! and wildcard-pattern variants), the language filter, and conflict
//! grouping.

use std::collections::BTreeSet;

use corpusflow_config::{Config, EngineDirs};
use corpusflow_registry::Registry;
use corpusflow_resolver::Resolver;
use corpusflow_types::{AnnotationRef, ConflictSet, ParamRole, ProcessorDescriptor, Rule, RuleScope};
use serde::Deserialize;

use crate::bind::{bind_param, BindContext};
use crate::conflicts::group_conflicts;
use crate::decisions::DecisionStore;
use crate::error::RulesError;

/// Everything the compiler needs: the frozen registry/config/resolver for
/// this run, the corpus identity, and the corpus's declared language.
pub struct CompileContext<'a> {
    pub registry: &'a Registry,
    pub resolver: &'a Resolver<'a>,
    pub config: &'a Config,
    pub dirs: &'a EngineDirs,
    pub corpus_id: &'a str,
    pub language: &'a str,
    pub variety: Option<&'a str>,
}

/// The result of one compilation pass: concrete rules grouped into
/// conflict sets ready for the scheduler, wildcard-pattern rules the
/// scheduler instantiates on demand, and rules excluded by the language
/// filter (kept around so a `NoProducer` error can name what was excluded
/// rather than just say nothing produces a file).
pub struct CompiledRuleSet {
    pub conflicts: Vec<ConflictSet>,
    pub wildcard_patterns: Vec<Rule>,
    pub inactive_by_language: Vec<Rule>,
}

#[derive(Debug, Deserialize)]
struct CustomAnnotationEntry {
    processor: String,
    suffix: String,
}

pub fn compile_rules(ctx: &CompileContext, decisions: &DecisionStore) -> Result<CompiledRuleSet, RulesError> {
    let mut active = Vec::new();
    let mut wildcard_patterns = Vec::new();
    let mut inactive_by_language = Vec::new();

    let custom_entries = custom_annotation_entries(ctx.config);

    for processor in ctx.registry.all() {
        let desc = processor.descriptor();
        let is_active_language = desc.languages.is_empty() || desc.languages.iter().any(|l| l.matches(ctx.language, ctx.variety));

        if let Some(rule) = compile_one(desc, desc.id.clone(), None, ctx)? {
            file_bucket(rule, is_active_language, &mut active, &mut wildcard_patterns, &mut inactive_by_language);
        }

        for entry in custom_entries.iter().filter(|e| e.processor == desc.id) {
            let rule_id = format!("{}#{}", desc.id, entry.suffix);
            if let Some(rule) = compile_one(desc, rule_id, Some(&entry.suffix), ctx)? {
                file_bucket(rule, is_active_language, &mut active, &mut wildcard_patterns, &mut inactive_by_language);
            }
        }
    }

    let registry_fingerprint = ctx.registry.fingerprint();
    let conflicts = group_conflicts(active, ctx.corpus_id, &registry_fingerprint, decisions)?;

    Ok(CompiledRuleSet { conflicts, wildcard_patterns, inactive_by_language })
}

fn file_bucket(rule: Rule, is_active_language: bool, active: &mut Vec<Rule>, wildcard_patterns: &mut Vec<Rule>, inactive: &mut Vec<Rule>) {
    if !is_active_language {
        inactive.push(rule);
    } else if rule.is_wildcard_pattern() {
        wildcard_patterns.push(rule);
    } else {
        active.push(rule);
    }
}

fn custom_annotation_entries(config: &Config) -> Vec<CustomAnnotationEntry> {
    config
        .get("custom_annotations")
        .and_then(|v| serde_json::from_value::<Vec<CustomAnnotationEntry>>(v.clone()).ok())
        .unwrap_or_default()
}

/// §9 "per-file vs. corpus-level flag": a processor that injects the
/// current source file (a `SourceFileHandle` parameter) operates per
/// file; one with no such parameter operates on the corpus as a whole.
fn scope_of(desc: &ProcessorDescriptor) -> RuleScope {
    let has_file_handle = desc.params.iter().any(|p| matches!(p.role, ParamRole::SourceFileHandle));
    if has_file_handle { RuleScope::PerFile } else { RuleScope::CorpusLevel }
}

/// Appends a custom-annotation suffix to a reference so its path does not
/// collide with the base rule's output (§4.D).
fn suffixed(reference: &AnnotationRef, suffix: &str) -> AnnotationRef {
    match &reference.attr {
        Some(attr) => AnnotationRef { span: reference.span.clone(), attr: Some(format!("{attr}__{suffix}")) },
        None => AnnotationRef { span: format!("{}__{suffix}", reference.span), attr: None },
    }
}

fn compile_one(desc: &ProcessorDescriptor, rule_id: String, suffix: Option<&str>, ctx: &CompileContext) -> Result<Option<Rule>, RulesError> {
    let scope = scope_of(desc);
    let file = match scope {
        RuleScope::PerFile => Some("{file}"),
        RuleScope::CorpusLevel => None,
    };
    let bind_ctx = BindContext { config: ctx.config, resolver: ctx.resolver, registry: ctx.registry, dirs: ctx.dirs, corpus_id: ctx.corpus_id, file };

    let mut inputs = Vec::new();
    let mut outputs = Vec::new();
    let mut bindings = Vec::new();
    let mut config_sensitivity = BTreeSet::new();

    for param in &desc.params {
        if let ParamRole::Config { key } = &param.role {
            config_sensitivity.insert(key.clone());
        }

        let literal = match &param.role {
            ParamRole::AnnotationInput { default } => Some(default.clone()),
            ParamRole::AnnotationOutput { default, .. } => {
                Some(if let Some(suffix) = suffix { suffixed(default, suffix) } else { default.clone() })
            }
            _ => None,
        };

        if let Some(literal) = literal {
            let Some(resolved) = ctx.resolver.resolve_literal(&literal)? else {
                return Ok(None);
            };
            match &param.role {
                ParamRole::AnnotationInput { .. } => inputs.push(resolved.clone()),
                ParamRole::AnnotationOutput { .. } => outputs.push(resolved.clone()),
                _ => unreachable!("literal is only set for annotation roles"),
            }
            let path = ctx.resolver.file_path(&ctx.dirs.work, file, &resolved);
            bindings.push((param.name.clone(), corpusflow_types::ParamBinding::Path(path)));
            continue;
        }

        let Some(binding) = bind_param(param, &bind_ctx)? else {
            return Ok(None);
        };
        bindings.push((param.name.clone(), binding));
    }

    Ok(Some(Rule {
        id: rule_id,
        processor_id: desc.id.clone(),
        inputs,
        outputs,
        bindings,
        scope,
        order: desc.order,
        priority: desc.priority,
        preloader_target: desc.preloader.as_ref().map(|p| p.preload_target.clone()),
        config_sensitivity,
        max_threads: None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use corpusflow_registry::{JobContext, Processor, ProcessorSource, StaticProcessorSource};
    use corpusflow_types::{Param, ProcessorKind};
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

    fn registry_with(descriptors: Vec<ProcessorDescriptor>) -> Registry {
        let processors = descriptors.into_iter().map(|d| Arc::new(Noop(d)) as Arc<dyn Processor>).collect();
        let source = StaticProcessorSource::new(processors);
        Registry::discover(vec![Box::new(source) as Box<dyn ProcessorSource>]).unwrap()
    }

    fn tokenizer_descriptor() -> ProcessorDescriptor {
        ProcessorDescriptor::builder("segment:token", ProcessorKind::Annotator, "tokenizer")
            .param("file", ParamRole::SourceFileHandle)
            .param(
                "out",
                ParamRole::AnnotationOutput { default: AnnotationRef::parse("segment.token").unwrap(), cls: Some("token".into()) },
            )
            .build()
    }

    #[test]
    fn compiles_one_rule_per_processor() {
        let registry = registry_with(vec![tokenizer_descriptor()]);
        let config = Config::empty();
        let resolver = Resolver::new(&config, &registry);
        let dirs = EngineDirs::for_corpus("/corpora/mycorpus", "/data");
        let ctx = CompileContext { registry: &registry, resolver: &resolver, config: &config, dirs: &dirs, corpus_id: "mycorpus", language: "swe", variety: None };
        let decisions = DecisionStore::default();

        let compiled = compile_rules(&ctx, &decisions).unwrap();
        assert_eq!(compiled.conflicts.len(), 1);
        assert_eq!(compiled.conflicts[0].preferred().unwrap().processor_id, "segment:token");
    }

    #[test]
    fn language_filter_excludes_non_matching_processors() {
        let mut desc = tokenizer_descriptor();
        desc.languages.push(corpusflow_types::LanguageCode::new("eng"));
        let registry = registry_with(vec![desc]);
        let config = Config::empty();
        let resolver = Resolver::new(&config, &registry);
        let dirs = EngineDirs::for_corpus("/corpora/mycorpus", "/data");
        let ctx = CompileContext { registry: &registry, resolver: &resolver, config: &config, dirs: &dirs, corpus_id: "mycorpus", language: "swe", variety: None };
        let decisions = DecisionStore::default();

        let compiled = compile_rules(&ctx, &decisions).unwrap();
        assert!(compiled.conflicts.is_empty());
        assert_eq!(compiled.inactive_by_language.len(), 1);
    }

    #[test]
    fn custom_annotation_entry_produces_a_suffixed_rule() {
        let registry = registry_with(vec![tokenizer_descriptor()]);
        let config = Config::from_value(json!({
            "custom_annotations": [{"processor": "segment:token", "suffix": "extra"}],
        }));
        let resolver = Resolver::new(&config, &registry);
        let dirs = EngineDirs::for_corpus("/corpora/mycorpus", "/data");
        let ctx = CompileContext { registry: &registry, resolver: &resolver, config: &config, dirs: &dirs, corpus_id: "mycorpus", language: "swe", variety: None };
        let decisions = DecisionStore::default();

        let compiled = compile_rules(&ctx, &decisions).unwrap();
        assert_eq!(compiled.conflicts.len(), 2);
        let ids: BTreeSet<_> = compiled.conflicts.iter().map(|c| c.preferred().unwrap().id.clone()).collect();
        assert!(ids.contains("segment:token#extra"));
    }

    #[test]
    fn wildcard_processor_compiles_to_a_pattern_not_a_conflict() {
        let desc = ProcessorDescriptor::builder("misc:number_position", ProcessorKind::Annotator, "numbers")
            .param("file", ParamRole::SourceFileHandle)
            .param(
                "span",
                ParamRole::AnnotationInput { default: AnnotationRef::parse("{annotation}").unwrap() },
            )
            .param(
                "out",
                ParamRole::AnnotationOutput {
                    default: AnnotationRef::parse("{annotation}:misc.number_position").unwrap(),
                    cls: None,
                },
            )
            .build();
        let registry = registry_with(vec![desc]);
        let config = Config::empty();
        let resolver = Resolver::new(&config, &registry);
        let dirs = EngineDirs::for_corpus("/corpora/mycorpus", "/data");
        let ctx = CompileContext { registry: &registry, resolver: &resolver, config: &config, dirs: &dirs, corpus_id: "mycorpus", language: "swe", variety: None };
        let decisions = DecisionStore::default();

        let compiled = compile_rules(&ctx, &decisions).unwrap();
        assert!(compiled.conflicts.is_empty());
        assert_eq!(compiled.wildcard_patterns.len(), 1);
    }
}
