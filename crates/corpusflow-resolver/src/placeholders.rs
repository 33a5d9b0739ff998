//! Token substitution for the three placeholder kinds a reference literal
//! may carry (§3, §4.C.1-3): `[config.key]`, `<class>`/`<class:attr>`, and
//! `{wildcard}`.

use std::collections::BTreeMap;

use serde_json::Value;

use corpusflow_config::Config;

use crate::classes::ClassBindings;
use crate::error::ResolverError;

/// Replaces every `[dotted.key]` in `text` with the string form of the
/// looked-up config value. Returns `None` (not an error) the moment any
/// key is undefined — per §4.C.1, an undefined placeholder suppresses the
/// whole reference rather than failing the run.
pub fn substitute_config_placeholders(text: &str, config: &Config) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'[' {
            let end = text[i..].find(']').map(|offset| i + offset)?;
            let key = &text[i + 1..end];
            let value = config.get(key)?;
            out.push_str(&value_to_literal(value));
            i = end + 1;
        } else {
            let ch = text[i..].chars().next().expect("i < len implies a char");
            out.push(ch);
            i += ch.len_utf8();
        }
    }
    Some(out)
}

fn value_to_literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Replaces every `<class>` or `<class:attr>` token with the bound
/// reference's string form. Returns `Ok(None)` if a class is unbound with
/// no candidate producer (suppression, not an error); returns
/// `Err(ClassAmbiguous)` if a class has multiple candidates and none has
/// been chosen explicitly.
pub fn expand_classes(text: &str, bindings: &ClassBindings) -> Result<Option<String>, ResolverError> {
    let mut out = String::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'<' {
            let Some(end) = text[i..].find('>').map(|offset| i + offset) else {
                return Err(ResolverError::ReferenceUnresolved(text.to_string()));
            };
            let token = &text[i + 1..end];
            let (class, attr_override) = match token.split_once(':') {
                Some((c, a)) => (c, Some(a)),
                None => (token, None),
            };
            let Some(bound) = bindings.resolve(class)? else {
                return Ok(None);
            };
            match (attr_override, &bound.attr) {
                (Some(a), None) => out.push_str(&format!("{}:{a}", bound.span)),
                _ => out.push_str(&bound.to_string()),
            }
            i = end + 1;
        } else {
            let ch = text[i..].chars().next().expect("i < len implies a char");
            out.push(ch);
            i += ch.len_utf8();
        }
    }
    Ok(Some(out))
}

/// Splits a reference-literal segment into its dot/colon-delimited tokens,
/// the unit a `{wildcard}` unifies against.
fn tokenize(segment: &str) -> Vec<String> {
    segment.split(['.', ':']).map(str::to_string).collect()
}

/// Unifies a rule's output pattern (which may contain `{wildcard}` tokens)
/// against a concrete requested literal, returning the wildcard bindings
/// if the shapes match. `None` means the pattern cannot produce that
/// concrete output at all.
pub fn unify_wildcards(pattern: &str, concrete: &str) -> Option<BTreeMap<String, String>> {
    let pattern_tokens = tokenize(pattern);
    let concrete_tokens = tokenize(concrete);
    if pattern_tokens.len() != concrete_tokens.len() {
        return None;
    }

    let mut bindings = BTreeMap::new();
    for (p, c) in pattern_tokens.iter().zip(concrete_tokens.iter()) {
        if let Some(name) = p.strip_prefix('{').and_then(|rest| rest.strip_suffix('}')) {
            match bindings.get(name) {
                Some(existing) if existing != c => return None,
                _ => {
                    bindings.insert(name.to_string(), c.clone());
                }
            }
        } else if p != c {
            return None;
        }
    }
    Some(bindings)
}

/// Replaces every `{wildcard}` in `text` with its bound value. `None` if
/// any wildcard in `text` has no binding — an input-only wildcard the
/// rule compiler must have already forced to the output's value before
/// calling this.
pub fn substitute_wildcards(text: &str, bindings: &BTreeMap<String, String>) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            let end = text[i..].find('}').map(|offset| i + offset)?;
            let name = &text[i + 1..end];
            out.push_str(bindings.get(name)?);
            i = end + 1;
        } else {
            let ch = text[i..].chars().next().expect("i < len implies a char");
            out.push(ch);
            i += ch.len_utf8();
        }
    }
    Some(out)
}
