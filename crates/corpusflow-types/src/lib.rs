//! # corpusflow-types
//!
//! Core domain types shared across the corpusflow workspace: annotation
//! references ([`AnnotationRef`]), processor metadata
//! ([`ProcessorDescriptor`] and friends), compiled rules ([`Rule`],
//! [`ConflictSet`]), and content keys ([`ContentKey`]).
//!
//! These types carry no I/O and no pipeline logic of their own — they are
//! the vocabulary the registry, resolver, rule compiler and scheduler
//! crates share.

mod content_key;
mod processor;
mod reference;
mod rule;

pub use content_key::ContentKey;
pub use processor::{
    ConfigParamSpec, LanguageCode, Param, ParamRole, PreloaderSpec, ProcessorDescriptor,
    ProcessorDescriptorBuilder, ProcessorKind, WildcardSpec,
};
pub use reference::{AnnotationRef, RefParseError};
pub use rule::{ConflictSet, ParamBinding, Rule, RuleScope};
