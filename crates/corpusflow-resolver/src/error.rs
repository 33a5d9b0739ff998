//! Resolution-time error taxonomy (§4.C, §7).

use corpusflow_types::AnnotationRef;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolverError {
    #[error("reference {0} could not be resolved")]
    ReferenceUnresolved(String),
    #[error("class {class:?} has more than one candidate producer and no binding was chosen: {candidates:?}")]
    ClassAmbiguous { class: String, candidates: Vec<String> },
    #[error("wildcard {wildcard:?} in output {output} has no matching input to unify against")]
    UnboundWildcard { wildcard: String, output: AnnotationRef },
}
