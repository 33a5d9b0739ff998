//! The engine's user-facing error taxonomy (spec §7).
//!
//! Every microcrate raises its own typed error (`ConfigError`,
//! `RegistryError`, `ResolverError`, `RulesError`, `SchedulerError`,
//! `PreloaderError`); at the point an error becomes visible to a user —
//! a CLI exit, a run summary — it is mapped onto one of the variants
//! below so exit codes and messages are driven off a `match`, never off
//! string sniffing.

use corpusflow_config::ConfigError;
use corpusflow_preloader::PreloaderError;
use corpusflow_registry::RegistryError;
use corpusflow_resolver::ResolverError;
use corpusflow_rules::RulesError;
use corpusflow_scheduler::SchedulerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),
    #[error("required config key {0:?} has no value anywhere in the hierarchy")]
    ConfigMissing(String),
    #[error("parent config chain is cyclic: {0}")]
    ConfigCycle(String),
    #[error("config not found: {0}")]
    ConfigNotFound(String),
    #[error("processor {0:?} is invalid: {1}")]
    ProcessorInvalid(String, String),
    #[error("reference could not be resolved: {0}")]
    ReferenceUnresolved(String),
    #[error("class {class:?} has more than one candidate producer: {candidates:?}")]
    ClassAmbiguous { class: String, candidates: Vec<String> },
    #[error("producer conflict on {output:?}: {a} vs {b} declare the same order")]
    ProducerConflict { output: String, a: String, b: String },
    #[error("no producer for {0:?}")]
    NoProducer(String),
    #[error("no active rule for language {0:?}")]
    LanguageUnsupported(String),
    #[error("rule {rule_id} failed: {reason}")]
    RuleFailed { rule_id: String, reason: String },
    #[error("preloader socket error: {0}")]
    SocketError(String),
    #[error("{0}")]
    UserError(String),
}

impl EngineError {
    /// Exit code per spec §6 — 1 for errors a user can act on by fixing
    /// their corpus/config/invocation, 2 for errors that indicate a
    /// broken processor or a failed subprocess/socket.
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::ProcessorInvalid(..) | EngineError::RuleFailed { .. } | EngineError::SocketError(_) => 2,
            _ => 1,
        }
    }

    pub fn user_error(msg: impl Into<String>) -> Self {
        EngineError::UserError(msg.into())
    }
}

impl From<ConfigError> for EngineError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NotFound(path) => EngineError::ConfigNotFound(path.display().to_string()),
            ConfigError::Cycle(chain) => EngineError::ConfigCycle(chain),
            ConfigError::ParentNotFound(parent) => EngineError::ConfigNotFound(parent),
            ConfigError::Parse { path, source } => {
                EngineError::ConfigInvalid(format!("{}: {source}", path.display()))
            }
            ConfigError::Invalid(detail) => EngineError::ConfigInvalid(detail),
            ConfigError::Missing(key) => EngineError::ConfigMissing(key),
        }
    }
}

impl From<RegistryError> for EngineError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DuplicateProcessor(id) => {
                EngineError::ProcessorInvalid(id, "declared more than once".to_string())
            }
            RegistryError::InvalidProcessor { id, reason } => EngineError::ProcessorInvalid(id, reason),
            RegistryError::ConfigKeyConflict { key, detail } => {
                EngineError::ConfigInvalid(format!("config key {key:?}: {detail}"))
            }
        }
    }
}

impl From<ResolverError> for EngineError {
    fn from(err: ResolverError) -> Self {
        match err {
            ResolverError::ReferenceUnresolved(reference) => EngineError::ReferenceUnresolved(reference),
            ResolverError::ClassAmbiguous { class, candidates } => {
                EngineError::ClassAmbiguous { class, candidates }
            }
            ResolverError::UnboundWildcard { wildcard, output } => {
                EngineError::ReferenceUnresolved(format!("wildcard {wildcard:?} in {output}"))
            }
        }
    }
}

impl From<RulesError> for EngineError {
    fn from(err: RulesError) -> Self {
        match err {
            RulesError::Reference(resolver_err) => resolver_err.into(),
            RulesError::ConfigMissing(module, key) => EngineError::ConfigMissing(format!("{module}.{key}")),
            RulesError::ProducerConflict { output, a, b } => EngineError::ProducerConflict { output, a, b },
            RulesError::NoProducer(target) => EngineError::NoProducer(target),
        }
    }
}

impl From<SchedulerError> for EngineError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::NoProducer(target) => EngineError::NoProducer(target),
            SchedulerError::RuleFailed { rule_id, reason } => EngineError::RuleFailed { rule_id, reason },
        }
    }
}

impl From<PreloaderError> for EngineError {
    fn from(err: PreloaderError) -> Self {
        EngineError::SocketError(err.to_string())
    }
}
