//! Compiled rules: a processor's fully resolved inputs, outputs, and
//! parameter bindings, ready for the scheduler to instantiate per file.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::AnnotationRef;

/// A parameter, bound to either an immediate value or a file path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamBinding {
    /// A scalar, config, or model-path value substituted directly.
    Immediate(serde_json::Value),
    /// A file path, either still symbolic (`{file}` left unexpanded) or
    /// already rooted for a concrete source file.
    Path(PathBuf),
}

/// Whether a rule's inputs/outputs are scoped to one source file or to
/// the corpus as a whole (no `<file>` path segment).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleScope {
    PerFile,
    CorpusLevel,
}

/// A compiled, ready-to-schedule realisation of a processor.
///
/// `outputs`/`inputs` may still contain a symbolic `{file}` segment for
/// per-file rules — the scheduler substitutes a concrete source file name
/// when it instantiates the rule against a requested target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Stable identifier: the owning processor id, plus a `#<suffix>` for
    /// custom-annotation rule instances.
    pub id: String,
    pub processor_id: String,
    pub inputs: Vec<AnnotationRef>,
    pub outputs: Vec<AnnotationRef>,
    pub bindings: Vec<(String, ParamBinding)>,
    pub scope: RuleScope,
    pub order: Option<i64>,
    pub priority: i64,
    #[serde(default)]
    pub preloader_target: Option<String>,
    /// Configuration keys this rule is sensitive to, for content-key
    /// computation and freshness invalidation.
    pub config_sensitivity: BTreeSet<String>,
    #[serde(default)]
    pub max_threads: Option<usize>,
}

impl Rule {
    /// Whether any output reference still carries an unresolved wildcard
    /// token (`{name}`), i.e. this rule is a pattern instantiated on
    /// demand rather than a concrete, schedulable rule.
    pub fn is_wildcard_pattern(&self) -> bool {
        self.outputs.iter().any(|o| o.span.contains('{') || o.attr.as_deref().is_some_and(|a| a.contains('{')))
    }
}

/// A group of rules whose normalised output sets collide, ordered
/// ascending by `order` (absent = infinite / last resort).
#[derive(Debug, Clone, Default)]
pub struct ConflictSet {
    pub output_key: String,
    pub rules: Vec<Rule>,
}

impl ConflictSet {
    /// Sorts rules ascending by `order`, breaking ties by id for
    /// determinism. Returns `Err` with the two clashing rule ids if two
    /// rules share both output and a defined, equal `order`.
    pub fn resolve(mut rules: Vec<Rule>, output_key: impl Into<String>) -> Result<Self, (String, String)> {
        rules.sort_by(|a, b| {
            let ao = a.order.unwrap_or(i64::MAX);
            let bo = b.order.unwrap_or(i64::MAX);
            ao.cmp(&bo).then_with(|| a.id.cmp(&b.id))
        });

        for w in rules.windows(2) {
            if let [a, b] = w {
                if a.order.is_some() && a.order == b.order {
                    return Err((a.id.clone(), b.id.clone()));
                }
            }
        }

        Ok(Self { output_key: output_key.into(), rules })
    }

    /// The preferred producer: the first rule after ordering.
    pub fn preferred(&self) -> Option<&Rule> {
        self.rules.first()
    }

    /// Backoff producers, in the order they should be tried.
    pub fn backoffs(&self) -> &[Rule] {
        self.rules.get(1..).unwrap_or(&[])
    }
}
