//! The rule compiler (§4.D): turns each discovered processor into zero or
//! more compiled [`corpusflow_types::Rule`]s, applies the language filter,
//! and groups concrete rules into conflict sets the scheduler consumes.

mod bind;
mod compile;
mod conflicts;
mod decisions;
mod error;

pub use bind::{bind_param, BindContext};
pub use compile::{compile_rules, CompileContext, CompiledRuleSet};
pub use conflicts::{group_conflicts, output_key};
pub use decisions::{Decision, DecisionStore};
pub use error::RulesError;
