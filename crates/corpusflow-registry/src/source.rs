//! Processor discovery channels (§4.B): a configured search path of
//! built-in/plugin processors, and user-local `custom.<file>` scripts
//! living in the corpus directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use corpusflow_types::{LanguageCode, Param, ParamRole, ProcessorDescriptor, ProcessorKind};

use crate::processor::{JobContext, Processor};

/// A channel the registry asks for processors during discovery. Each
/// source is queried once; discovery itself never touches config or runs
/// pipeline work (§4.B "Processor discovery must be pure with respect to
/// config"). Processors are handed back as `Arc` since a single plugin
/// source may be asked to contribute to more than one registry build
/// (e.g. the CLI's `modules` introspection vs. an actual `run`).
pub trait ProcessorSource {
    fn discover(&self) -> Vec<Arc<dyn Processor>>;
}

/// Built-in processors and processors registered through the
/// `"engine.plugin"` entry-point mechanism — in a language with dynamic
/// decoration this is populated by scanning installed packages; here,
/// where registration is an explicit metadata descriptor rather than a
/// decorator (§9 "Dynamic decoration"), a plugin crate simply constructs
/// one of these with the processors it implements.
pub struct StaticProcessorSource {
    processors: Vec<Arc<dyn Processor>>,
}

impl StaticProcessorSource {
    pub fn new(processors: Vec<Arc<dyn Processor>>) -> Self {
        Self { processors }
    }
}

impl ProcessorSource for StaticProcessorSource {
    fn discover(&self) -> Vec<Arc<dyn Processor>> {
        self.processors.clone()
    }
}

#[derive(Debug, serde::Deserialize)]
struct CustomManifest {
    kind: ProcessorKind,
    summary: String,
    #[serde(default)]
    description: Option<String>,
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    inputs: Vec<String>,
    #[serde(default)]
    outputs: Vec<(String, Option<String>)>,
    #[serde(default)]
    languages: Vec<String>,
}

/// A processor backed by an external command, described by a JSON
/// manifest rather than Rust source — the `custom.<file>` namespace's
/// escape hatch for corpus-local scripts that aren't part of the engine's
/// own plugin set.
pub struct CustomScriptProcessor {
    descriptor: ProcessorDescriptor,
    command: String,
    args: Vec<String>,
}

impl Processor for CustomScriptProcessor {
    fn descriptor(&self) -> &ProcessorDescriptor {
        &self.descriptor
    }

    fn run(&self, ctx: &JobContext) -> anyhow::Result<()> {
        use std::process::Command;
        let mut cmd = Command::new(&self.command);
        for arg in &self.args {
            cmd.arg(arg);
        }
        if let Some(file) = &ctx.source_file {
            cmd.env("ENGINE_SOURCE_FILE", file);
        }
        cmd.env("ENGINE_CORPUS_ID", &ctx.corpus_id);
        let status = cmd.status().map_err(|e| anyhow::anyhow!("failed to spawn {}: {e}", self.command))?;
        anyhow::ensure!(status.success(), "{} exited with {status}", self.command);
        Ok(())
    }
}

/// Scans `<corpus>/custom/*.manifest.json` for custom-processor
/// declarations, namespacing each under `custom.<file stem>` per §4.B.
pub struct CustomScriptSource {
    dir: PathBuf,
}

impl CustomScriptSource {
    pub fn new(corpus_dir: impl Into<PathBuf>) -> Self {
        Self { dir: corpus_dir.into().join("custom") }
    }
}

impl ProcessorSource for CustomScriptSource {
    fn discover(&self) -> Vec<Arc<dyn Processor>> {
        discover_manifests(&self.dir, "custom")
    }
}

/// Scans `<data_dir>/plugins/*.manifest.json` for processors installed
/// through the `"engine.plugin"` entry-point mechanism (§4.B) — a second,
/// data-dir-scoped discovery channel distinct from [`CustomScriptSource`]'s
/// corpus-local `custom/` directory, namespaced under `plugin.<stem>` so
/// an installed plugin and a corpus-local script may share a stem without
/// colliding on processor id.
pub struct PluginSource {
    dir: PathBuf,
}

impl PluginSource {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { dir: data_dir.into().join("plugins") }
    }
}

impl ProcessorSource for PluginSource {
    fn discover(&self) -> Vec<Arc<dyn Processor>> {
        discover_manifests(&self.dir, "plugin")
    }
}

fn discover_manifests(dir: &Path, namespace: &str) -> Vec<Arc<dyn Processor>> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut out: Vec<Arc<dyn Processor>> = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(stem) = file_stem_before_manifest(&path) else { continue };
        let Ok(text) = std::fs::read_to_string(&path) else { continue };
        let Ok(manifest) = serde_json::from_str::<CustomManifest>(&text) else { continue };
        out.push(Arc::new(build_custom_processor(namespace, &stem, manifest)));
    }
    out
}

fn file_stem_before_manifest(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    name.strip_suffix(".manifest.json").map(str::to_string)
}

fn build_custom_processor(namespace: &str, stem: &str, manifest: CustomManifest) -> CustomScriptProcessor {
    let id = format!("{namespace}.{stem}:run");
    let mut params = Vec::new();
    for (i, input) in manifest.inputs.iter().enumerate() {
        if let Ok(reference) = input.parse() {
            params.push(Param { name: format!("in{i}"), role: ParamRole::AnnotationInput { default: reference } });
        }
    }
    for (i, (output, cls)) in manifest.outputs.iter().enumerate() {
        if let Ok(reference) = output.parse() {
            params.push(Param {
                name: format!("out{i}"),
                role: ParamRole::AnnotationOutput { default: reference, cls: cls.clone() },
            });
        }
    }

    let mut builder = ProcessorDescriptor::builder(id, manifest.kind, manifest.summary.clone());
    if let Some(desc) = &manifest.description {
        builder = builder.description(desc.clone());
    }
    for lang in &manifest.languages {
        builder = builder.language(LanguageCode::new(lang.clone()));
    }
    for p in params {
        builder = builder.param(p.name, p.role);
    }
    let descriptor = builder.build();

    CustomScriptProcessor { descriptor, command: manifest.command, args: manifest.args }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn custom_script_source_discovers_manifest_files() {
        let td = tempdir().unwrap();
        let custom_dir = td.path().join("custom");
        std::fs::create_dir_all(&custom_dir).unwrap();
        std::fs::write(
            custom_dir.join("my_tagger.manifest.json"),
            r#"{
                "kind": "annotator",
                "summary": "tags tokens with a custom script",
                "command": "/usr/bin/true",
                "args": [],
                "inputs": ["<token>"],
                "outputs": [["<token>:custom.tag", null]],
                "languages": ["swe"]
            }"#,
        )
        .unwrap();

        let source = CustomScriptSource::new(td.path());
        let discovered = source.discover();
        assert_eq!(discovered.len(), 1);
        assert_eq!(discovered[0].descriptor().id, "custom.my_tagger:run");
        assert_eq!(discovered[0].descriptor().kind, ProcessorKind::Annotator);
    }

    #[test]
    fn custom_script_source_ignores_non_manifest_files() {
        let td = tempdir().unwrap();
        let custom_dir = td.path().join("custom");
        std::fs::create_dir_all(&custom_dir).unwrap();
        std::fs::write(custom_dir.join("readme.txt"), "hello").unwrap();

        let source = CustomScriptSource::new(td.path());
        assert!(source.discover().is_empty());
    }

    #[test]
    fn custom_script_source_tolerates_missing_directory() {
        let td = tempdir().unwrap();
        let source = CustomScriptSource::new(td.path());
        assert!(source.discover().is_empty());
    }

    #[test]
    fn plugin_source_namespaces_under_plugin_not_custom() {
        let td = tempdir().unwrap();
        let plugins_dir = td.path().join("plugins");
        std::fs::create_dir_all(&plugins_dir).unwrap();
        std::fs::write(
            plugins_dir.join("my_tagger.manifest.json"),
            r#"{
                "kind": "annotator",
                "summary": "a plugin-installed tagger",
                "command": "/usr/bin/true",
                "args": [],
                "inputs": [],
                "outputs": [],
                "languages": []
            }"#,
        )
        .unwrap();

        let source = PluginSource::new(td.path());
        let discovered = source.discover();
        assert_eq!(discovered.len(), 1);
        assert_eq!(discovered[0].descriptor().id, "plugin.my_tagger:run");
    }

    #[test]
    fn plugin_source_tolerates_missing_directory() {
        let td = tempdir().unwrap();
        let source = PluginSource::new(td.path());
        assert!(source.discover().is_empty());
    }
}
