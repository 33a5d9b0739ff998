//! Conflict grouping (§4.D "Conflict resolution"): rules are grouped by
//! normalised output set, sorted ascending by `order`, and an unresolvable
//! tie is either settled by a remembered decision or surfaced as
//! [`RulesError::ProducerConflict`].

use std::collections::BTreeMap;

use corpusflow_types::{ConflictSet, Rule};

use crate::decisions::DecisionStore;
use crate::error::RulesError;

/// The normalised key a conflict group is identified by: every output
/// reference's display form, sorted so input ordering doesn't matter.
pub fn output_key(rule: &Rule) -> String {
    let mut outputs: Vec<String> = rule.outputs.iter().map(ToString::to_string).collect();
    outputs.sort();
    outputs.join(",")
}

pub fn group_conflicts(
    rules: Vec<Rule>,
    corpus_id: &str,
    registry_fingerprint: &str,
    decisions: &DecisionStore,
) -> Result<Vec<ConflictSet>, RulesError> {
    let mut groups: BTreeMap<String, Vec<Rule>> = BTreeMap::new();
    for rule in rules {
        groups.entry(output_key(&rule)).or_default().push(rule);
    }

    let mut sets = Vec::with_capacity(groups.len());
    for (key, group_rules) in groups {
        match ConflictSet::resolve(group_rules.clone(), key.clone()) {
            Ok(set) => sets.push(set),
            Err((a, b)) => match decisions.get(corpus_id, &key, registry_fingerprint) {
                Some(chosen) => sets.push(resolve_with_decision(group_rules, key, chosen)),
                None => return Err(RulesError::ProducerConflict { output: key, a, b }),
            },
        }
    }
    Ok(sets)
}

/// Builds a conflict set whose preferred producer is the remembered
/// choice, with the remaining rules as backoffs in declaration order.
fn resolve_with_decision(mut rules: Vec<Rule>, output_key: String, chosen_rule_id: &str) -> ConflictSet {
    rules.sort_by_key(|r| if r.id == chosen_rule_id { 0 } else { 1 });
    ConflictSet { output_key, rules }
}
