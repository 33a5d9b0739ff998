//! Parameter binding: turns one formal [`Param`] into a [`ParamBinding`],
//! branching exhaustively over [`ParamRole`] (§9 "Parameter role
//! polymorphism").

use corpusflow_config::{Config, EngineDirs};
use corpusflow_registry::Registry;
use corpusflow_resolver::Resolver;
use corpusflow_types::{Param, ParamBinding, ParamRole};

use crate::error::RulesError;

/// Everything [`bind_param`] needs besides the parameter itself. `file` is
/// the literal string `"{file}"` for a per-file rule (left symbolic for
/// the scheduler to substitute) or `None` for a corpus-level rule.
pub struct BindContext<'a> {
    pub config: &'a Config,
    pub resolver: &'a Resolver<'a>,
    pub registry: &'a Registry,
    pub dirs: &'a EngineDirs,
    pub corpus_id: &'a str,
    pub file: Option<&'a str>,
}

/// Binds one parameter. `Ok(None)` for an annotation role means the
/// reference was suppressed (§4.C.1) and the whole rule must be dropped.
pub fn bind_param(param: &Param, ctx: &BindContext) -> Result<Option<ParamBinding>, RulesError> {
    match &param.role {
        ParamRole::AnnotationInput { default } | ParamRole::AnnotationOutput { default, .. } => {
            let Some(resolved) = ctx.resolver.resolve_literal(default)? else {
                return Ok(None);
            };
            let path = ctx.resolver.file_path(&ctx.dirs.work, ctx.file, &resolved);
            Ok(Some(ParamBinding::Path(path)))
        }
        ParamRole::Config { key } => {
            let value = ctx
                .config
                .get(key)
                .cloned()
                .or_else(|| ctx.registry.config_keys().get(key).and_then(|spec| spec.default.clone()))
                .unwrap_or(serde_json::Value::Null);
            Ok(Some(ParamBinding::Immediate(value)))
        }
        ParamRole::Model { default } => Ok(Some(ParamBinding::Path(ctx.dirs.models_dir().join(default)))),
        // Resolved through PATH-then-datadir/bin at run time by the
        // processor body via `corpusflow_environment::resolve_binary`;
        // the rule only carries the declared logical name, since the
        // data directory may not be populated yet at compile time.
        ParamRole::Binary { default } => Ok(Some(ParamBinding::Immediate(serde_json::Value::String(default.clone())))),
        ParamRole::SourceFileHandle => {
            Ok(Some(ParamBinding::Immediate(serde_json::Value::String(ctx.file.unwrap_or_default().to_string()))))
        }
        ParamRole::CorpusId => Ok(Some(ParamBinding::Immediate(serde_json::Value::String(ctx.corpus_id.to_string())))),
        ParamRole::ExportOutput { default } => Ok(Some(ParamBinding::Path(ctx.dirs.export.join(default)))),
        ParamRole::Marker { default } => Ok(Some(ParamBinding::Path(ctx.dirs.state_dir().join(default)))),
        ParamRole::Scalar => Ok(Some(ParamBinding::Immediate(serde_json::Value::Null))),
    }
}
