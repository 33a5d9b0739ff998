//! Processor metadata: the descriptor a registry discovers for each
//! importer, annotator, exporter, installer, uninstaller or modelbuilder.
//!
//! Real systems decorate a function and introspect its signature to build
//! this; here the descriptor is an explicit record a processor author
//! constructs (see [`crate::ProcessorDescriptor::builder`]), which keeps
//! the rule compiler's handling of each parameter role statically
//! exhaustive instead of reflection-based.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::AnnotationRef;

/// One of the six kinds of processor the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorKind {
    Importer,
    Annotator,
    Exporter,
    Installer,
    Uninstaller,
    Modelbuilder,
}

impl ProcessorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessorKind::Importer => "importer",
            ProcessorKind::Annotator => "annotator",
            ProcessorKind::Exporter => "exporter",
            ProcessorKind::Installer => "installer",
            ProcessorKind::Uninstaller => "uninstaller",
            ProcessorKind::Modelbuilder => "modelbuilder",
        }
    }
}

/// The role a formal parameter plays in the pipeline. Every parameter a
/// processor declares carries exactly one of these; the rule compiler
/// branches on this tag rather than on the parameter's Rust type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ParamRole {
    /// An annotation this processor reads. Carries the default reference,
    /// e.g. `Annotation("<token:word>")`.
    AnnotationInput { default: AnnotationRef },
    /// An annotation this processor writes. May carry a `cls` tag marking
    /// it as the canonical producer of a class.
    AnnotationOutput {
        default: AnnotationRef,
        #[serde(skip_serializing_if = "Option::is_none")]
        cls: Option<String>,
    },
    /// A configuration value, looked up by dotted key at resolution time.
    Config { key: String },
    /// A path to a model file under the data directory.
    Model { default: String },
    /// A path to an external binary, resolved through `PATH` then
    /// `<datadir>/bin`.
    Binary { default: String },
    /// The current source file's name, injected by the scheduler.
    SourceFileHandle,
    /// The corpus identifier, injected by the scheduler.
    CorpusId,
    /// A concrete path under the export directory this exporter writes to.
    ExportOutput { default: String },
    /// A zero-length sentinel file an installer/uninstaller writes/checks.
    Marker { default: String },
    /// An opaque scalar with no pipeline-level meaning (e.g. an integer
    /// tuning knob passed straight through).
    Scalar,
}

/// A formal parameter of a processor function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub role: ParamRole,
}

/// An ISO 639-3 language code with an optional variety suffix, e.g.
/// `swe` or `swe-1800`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LanguageCode {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variety: Option<String>,
}

impl LanguageCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into(), variety: None }
    }

    pub fn with_variety(code: impl Into<String>, variety: impl Into<String>) -> Self {
        Self { code: code.into(), variety: Some(variety.into()) }
    }

    /// Whether this code matches a corpus's declared `(language, variety)`.
    /// A processor entry with no variety matches any variety of the same
    /// base language.
    pub fn matches(&self, corpus_language: &str, corpus_variety: Option<&str>) -> bool {
        if self.code != corpus_language {
            return false;
        }
        match &self.variety {
            None => true,
            Some(v) => Some(v.as_str()) == corpus_variety,
        }
    }
}

/// A configuration parameter a processor declares, with its default and
/// validation constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigParamSpec {
    pub name: String,
    pub default: Option<serde_json::Value>,
    pub description: String,
    #[serde(default)]
    pub choices: Vec<serde_json::Value>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub pattern: Option<String>,
}

/// A wildcard a processor declares, with the type tag governing what kind
/// of reference it may be unified with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WildcardSpec {
    pub name: String,
    pub type_tag: String,
}

/// Preloader binding: which preloader slot this processor's preload hook
/// target and cleanup hook target are, plus whether warm state is shared
/// across that processor's workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreloaderSpec {
    pub preload_target: String,
    #[serde(default)]
    pub cleanup_target: Option<String>,
    #[serde(default)]
    pub shared: bool,
    /// Names of config parameters passed to the preload hook; the hash of
    /// their resolved values is the preloader's config fingerprint.
    pub preloader_params: Vec<String>,
}

/// A processor's complete, read-only, discovery-time metadata record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorDescriptor {
    /// `<module>:<function>`.
    pub id: String,
    pub kind: ProcessorKind,
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    pub params: Vec<Param>,
    #[serde(default)]
    pub languages: Vec<LanguageCode>,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub config: Vec<ConfigParamSpec>,
    #[serde(default)]
    pub wildcards: Vec<WildcardSpec>,
    #[serde(default)]
    pub preloader: Option<PreloaderSpec>,
    /// Importer-only: the annotation references this importer guarantees
    /// to have produced once it runs, independent of its formal outputs
    /// (e.g. the text itself).
    #[serde(default)]
    pub outputs: Vec<AnnotationRef>,
}

impl ProcessorDescriptor {
    pub fn builder(id: impl Into<String>, kind: ProcessorKind, summary: impl Into<String>) -> ProcessorDescriptorBuilder {
        ProcessorDescriptorBuilder::new(id, kind, summary)
    }

    pub fn module(&self) -> &str {
        self.id.split(':').next().unwrap_or(&self.id)
    }

    pub fn annotation_outputs(&self) -> impl Iterator<Item = (&AnnotationRef, Option<&str>)> {
        self.params.iter().filter_map(|p| match &p.role {
            ParamRole::AnnotationOutput { default, cls } => Some((default, cls.as_deref())),
            _ => None,
        })
    }

    pub fn annotation_inputs(&self) -> impl Iterator<Item = &AnnotationRef> {
        self.params.iter().filter_map(|p| match &p.role {
            ParamRole::AnnotationInput { default } => Some(default),
            _ => None,
        })
    }

    pub fn config_keys(&self) -> BTreeMap<String, Option<serde_json::Value>> {
        self.config
            .iter()
            .map(|c| (format!("{}.{}", self.module(), c.name), c.default.clone()))
            .collect()
    }
}

/// Builder for [`ProcessorDescriptor`], mirroring the declarative style a
/// decorator-based registration would read as.
#[derive(Debug, Clone)]
pub struct ProcessorDescriptorBuilder {
    inner: ProcessorDescriptor,
}

impl ProcessorDescriptorBuilder {
    pub fn new(id: impl Into<String>, kind: ProcessorKind, summary: impl Into<String>) -> Self {
        Self {
            inner: ProcessorDescriptor {
                id: id.into(),
                kind,
                summary: summary.into(),
                description: None,
                params: Vec::new(),
                languages: Vec::new(),
                order: None,
                priority: 0,
                config: Vec::new(),
                wildcards: Vec::new(),
                preloader: None,
                outputs: Vec::new(),
            },
        }
    }

    pub fn description(mut self, d: impl Into<String>) -> Self {
        self.inner.description = Some(d.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>, role: ParamRole) -> Self {
        self.inner.params.push(Param { name: name.into(), role });
        self
    }

    pub fn language(mut self, lang: LanguageCode) -> Self {
        self.inner.languages.push(lang);
        self
    }

    pub fn order(mut self, order: i64) -> Self {
        self.inner.order = Some(order);
        self
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.inner.priority = priority;
        self
    }

    pub fn config(mut self, spec: ConfigParamSpec) -> Self {
        self.inner.config.push(spec);
        self
    }

    pub fn wildcard(mut self, spec: WildcardSpec) -> Self {
        self.inner.wildcards.push(spec);
        self
    }

    pub fn preloader(mut self, spec: PreloaderSpec) -> Self {
        self.inner.preloader = Some(spec);
        self
    }

    pub fn importer_output(mut self, r: AnnotationRef) -> Self {
        self.inner.outputs.push(r);
        self
    }

    pub fn build(self) -> ProcessorDescriptor {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_code_matches_any_variety_when_unset() {
        let l = LanguageCode::new("swe");
        assert!(l.matches("swe", Some("1800")));
        assert!(l.matches("swe", None));
        assert!(!l.matches("eng", None));
    }

    #[test]
    fn language_code_with_variety_requires_exact_match() {
        let l = LanguageCode::with_variety("swe", "1800");
        assert!(l.matches("swe", Some("1800")));
        assert!(!l.matches("swe", Some("modern")));
        assert!(!l.matches("swe", None));
    }

    #[test]
    fn builder_collects_annotation_io() {
        let desc = ProcessorDescriptor::builder("segment:token", ProcessorKind::Annotator, "tokenize")
            .param(
                "out",
                ParamRole::AnnotationOutput {
                    default: AnnotationRef::parse("segment.token").unwrap(),
                    cls: Some("token".into()),
                },
            )
            .param(
                "text",
                ParamRole::AnnotationInput { default: AnnotationRef::parse("text").unwrap() },
            )
            .build();

        assert_eq!(desc.annotation_outputs().count(), 1);
        assert_eq!(desc.annotation_inputs().count(), 1);
        assert_eq!(desc.module(), "segment");
    }

    #[test]
    fn config_keys_snapshot() {
        let desc = ProcessorDescriptor::builder("wsd:tag", ProcessorKind::Annotator, "word sense disambiguation")
            .config(ConfigParamSpec {
                name: "sense_model".to_string(),
                default: Some(serde_json::json!("saldo")),
                description: "which sense inventory to tag against".to_string(),
                choices: vec![],
                min: None,
                max: None,
                pattern: None,
            })
            .config(ConfigParamSpec {
                name: "threshold".to_string(),
                default: Some(serde_json::json!(0.5)),
                description: "minimum confidence to keep a sense tag".to_string(),
                choices: vec![],
                min: Some(0.0),
                max: Some(1.0),
                pattern: None,
            })
            .build();

        let rendered = desc
            .config_keys()
            .iter()
            .map(|(key, default)| format!("{key} = {}", default.as_ref().map_or("<none>".to_string(), |v| v.to_string())))
            .collect::<Vec<_>>()
            .join("\n");

        insta::assert_snapshot!(rendered, @r###"
        wsd.sense_model = "saldo"
        wsd.threshold = 0.5
        "###);
    }
}
