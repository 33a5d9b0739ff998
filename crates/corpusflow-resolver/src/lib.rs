//! Reference resolution (§4.C): expands class placeholders, configuration
//! placeholders, and wildcards inside annotation-reference literals into
//! concrete file paths, and answers "who produces this reference?"
//! queries for the rule compiler and scheduler.

mod classes;
mod error;
mod paths;
mod placeholders;
mod resolver;

pub use classes::ClassBindings;
pub use error::ResolverError;
pub use placeholders::{expand_classes, substitute_config_placeholders, substitute_wildcards, unify_wildcards};
pub use resolver::Resolver;
