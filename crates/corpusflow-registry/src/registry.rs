//! Discovery and storage of processor metadata (§4.B).
//!
//! Discovery is pure with respect to config — no pipeline work happens
//! here, only validation of each descriptor's shape and cross-processor
//! checks (duplicate ids, incompatible config-key redeclarations, exporter
//! `order` with no conflict peer, cyclic preloader bindings).

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use corpusflow_types::{AnnotationRef, ConfigParamSpec, LanguageCode, ProcessorDescriptor, ProcessorKind};
use sha2::{Digest, Sha256};

use crate::error::RegistryError;
use crate::processor::Processor;

/// The read-only, discovery-time table of every processor the engine
/// knows about, indexed by id and by kind.
pub struct Registry {
    processors: BTreeMap<String, Arc<dyn Processor>>,
    by_kind: BTreeMap<ProcessorKind, Vec<String>>,
    config_keys: BTreeMap<String, ConfigParamSpec>,
}

impl Registry {
    /// Discovers processors from every source in turn (built-in
    /// registrations, installed plugins, `custom.<file>` user scripts —
    /// §4.B's three discovery channels, each represented as a
    /// [`crate::source::ProcessorSource`] implementation), validates each
    /// descriptor, and builds the cross-processor indices.
    pub fn discover(sources: Vec<Box<dyn crate::source::ProcessorSource>>) -> Result<Self, RegistryError> {
        let mut processors: BTreeMap<String, Arc<dyn Processor>> = BTreeMap::new();
        let mut by_kind: BTreeMap<ProcessorKind, Vec<String>> = BTreeMap::new();
        let mut config_keys: BTreeMap<String, ConfigParamSpec> = BTreeMap::new();

        for source in &sources {
            for proc in source.discover() {
                let desc = proc.descriptor().clone();
                validate_descriptor(&desc)?;

                if processors.contains_key(&desc.id) {
                    return Err(RegistryError::DuplicateProcessor(desc.id.clone()));
                }

                for (key, default) in desc.config_keys() {
                    merge_config_key(&mut config_keys, &key, &desc, default)?;
                }

                by_kind.entry(desc.kind).or_default().push(desc.id.clone());
                processors.insert(desc.id.clone(), proc);
            }
        }

        check_exporter_order_has_conflict_peer(&processors)?;
        check_preloader_cycles(&processors)?;

        Ok(Self { processors, by_kind, config_keys })
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Processor>> {
        self.processors.get(id)
    }

    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn Processor>> {
        self.processors.values()
    }

    pub fn of_kind(&self, kind: ProcessorKind) -> impl Iterator<Item = &Arc<dyn Processor>> {
        self.by_kind.get(&kind).into_iter().flatten().filter_map(|id| self.processors.get(id))
    }

    pub fn config_keys(&self) -> &BTreeMap<String, ConfigParamSpec> {
        &self.config_keys
    }

    /// Every language code any discovered processor declares, for the
    /// `languages` CLI verb.
    pub fn languages(&self) -> BTreeSet<LanguageCode> {
        self.processors.values().flat_map(|p| p.descriptor().languages.clone()).collect()
    }

    /// Canonical class producers: every `(class, annotation_ref,
    /// processor_id)` triple declared via a `cls=` tag, for the
    /// `classes` CLI verb and the resolver's implicit-binding inference.
    pub fn class_producers(&self) -> Vec<(String, AnnotationRef, String)> {
        let mut out = Vec::new();
        for p in self.processors.values() {
            for (reference, cls) in p.descriptor().annotation_outputs() {
                if let Some(cls) = cls {
                    out.push((cls.to_string(), reference.clone(), p.descriptor().id.clone()));
                }
            }
        }
        out
    }

    /// A stable digest of every discovered processor's id and shape,
    /// used to invalidate persisted ambiguity decisions and (per §9's
    /// open question, resolved in favour of inclusion) content keys when
    /// the registry itself changes.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (id, proc) in &self.processors {
            hasher.update(id.as_bytes());
            hasher.update(b"\0");
            let desc_json = serde_json::to_vec(proc.descriptor()).unwrap_or_default();
            hasher.update(&desc_json);
            hasher.update(b"\0");
        }
        hex::encode(hasher.finalize())
    }
}

fn validate_descriptor(desc: &ProcessorDescriptor) -> Result<(), RegistryError> {
    if desc.summary.trim().is_empty() {
        return Err(RegistryError::InvalidProcessor { id: desc.id.clone(), reason: "missing description".into() });
    }
    for (reference, _) in desc.annotation_outputs() {
        if !reference_well_formed(reference) {
            return Err(RegistryError::InvalidProcessor {
                id: desc.id.clone(),
                reason: format!("output reference {reference} is not well-formed"),
            });
        }
    }
    Ok(())
}

/// §3: base/attr identifiers are over `[a-z0-9_-]`, except where a
/// segment is itself a placeholder (`<...>`, `{...}`, `[...]`), which is
/// resolved later and not checked here.
fn reference_well_formed(reference: &AnnotationRef) -> bool {
    segment_well_formed(&reference.span) && reference.attr.as_deref().is_none_or(segment_well_formed)
}

fn segment_well_formed(segment: &str) -> bool {
    if segment.contains(['<', '{', '[']) {
        return true;
    }
    !segment.is_empty()
        && segment.split('.').all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-'))
}

fn merge_config_key(
    keys: &mut BTreeMap<String, ConfigParamSpec>,
    key: &str,
    desc: &ProcessorDescriptor,
    spec: Option<serde_json::Value>,
) -> Result<(), RegistryError> {
    let full_spec = desc.config.iter().find(|c| format!("{}.{}", desc.module(), c.name) == key);
    let Some(full_spec) = full_spec else {
        return Ok(());
    };
    match keys.get(key) {
        None => {
            keys.insert(key.to_string(), full_spec.clone());
        }
        Some(existing) if existing.default == spec => {}
        Some(existing) => {
            return Err(RegistryError::ConfigKeyConflict {
                key: key.to_string(),
                detail: format!("{:?} redeclares default {:?} (already {:?})", desc.id, spec, existing.default),
            });
        }
    }
    Ok(())
}

/// §4.B: "`order` declared by an exporter not having any conflict peer"
/// is invalid — `order` only means something when there's another rule
/// to be preferred over.
fn check_exporter_order_has_conflict_peer(processors: &BTreeMap<String, Arc<dyn Processor>>) -> Result<(), RegistryError> {
    let exporters: Vec<_> = processors.values().filter(|p| p.descriptor().kind == ProcessorKind::Exporter).collect();
    for p in &exporters {
        let desc = p.descriptor();
        if desc.order.is_none() {
            continue;
        }
        let my_outputs: BTreeSet<_> = desc.annotation_outputs().map(|(r, _)| r.clone()).collect();
        let has_peer = processors.values().any(|other| {
            other.descriptor().id != desc.id
                && other.descriptor().annotation_outputs().any(|(r, _)| my_outputs.contains(r))
        });
        if !has_peer {
            return Err(RegistryError::InvalidProcessor {
                id: desc.id.clone(),
                reason: "declares `order` but has no conflicting producer".into(),
            });
        }
    }
    Ok(())
}

/// §4.B: "cyclic preloader target bindings". A processor's preload
/// target names the processor id whose warm state it shares/feeds into;
/// this walks that graph looking for a cycle.
fn check_preloader_cycles(processors: &BTreeMap<String, Arc<dyn Processor>>) -> Result<(), RegistryError> {
    for start in processors.keys() {
        let mut seen = BTreeSet::new();
        let mut cur = start.clone();
        loop {
            let Some(desc) = processors.get(&cur).map(|p| p.descriptor()) else { break };
            let Some(preloader) = &desc.preloader else { break };
            if preloader.preload_target == cur {
                break;
            }
            if !seen.insert(cur.clone()) {
                return Err(RegistryError::InvalidProcessor {
                    id: start.clone(),
                    reason: format!("cyclic preloader target binding via {cur:?}"),
                });
            }
            if !processors.contains_key(&preloader.preload_target) {
                break;
            }
            cur = preloader.preload_target.clone();
        }
    }
    Ok(())
}
