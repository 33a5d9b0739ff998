//! Annotation references: the textual names processors use to describe
//! the files they read and write, before resolution (see `corpusflow-resolver`).
//!
//! A reference has the grammar `<prefix.base>[:<prefix.attr>]`, optionally
//! wrapped with class placeholders (`<token>`), wildcards (`{annotation}`),
//! and configuration placeholders (`[wsd.sense_model]`). This module only
//! parses the textual shape; expanding placeholders is the resolver's job.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A parsed, but not yet resolved, annotation reference.
///
/// `span` is the `<module>.<base>` part; `attr` is the optional
/// `<module>.<attr>` part after the colon. Either half may still contain
/// `<class>`, `{wildcard}`, or `[config.key]` tokens — resolution replaces
/// those before the reference is turned into a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnnotationRef {
    pub span: String,
    pub attr: Option<String>,
}

/// Errors raised while parsing the textual shape of a reference.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RefParseError {
    #[error("empty annotation reference")]
    Empty,
    #[error("reference {0:?} has more than one ':' separator")]
    MultipleColons(String),
    #[error("reference {0:?} has unbalanced brackets")]
    UnbalancedBrackets(String),
}

impl AnnotationRef {
    /// Parses `text` into span/attr halves. Does not validate that
    /// placeholder tokens inside are well-formed identifiers — that's
    /// checked lazily, per-token, during resolution, since a reference
    /// may legitimately contain literal `<`/`>`/`{`/`}`/`[`/`]` characters
    /// as part of an already-resolved concrete path segment.
    pub fn parse(text: &str) -> Result<Self, RefParseError> {
        if text.is_empty() {
            return Err(RefParseError::Empty);
        }
        check_balanced(text)?;

        let mut parts = text.splitn(3, ':');
        let span = parts.next().unwrap_or_default().to_string();
        let attr = parts.next().map(|s| s.to_string());
        if parts.next().is_some() {
            return Err(RefParseError::MultipleColons(text.to_string()));
        }
        Ok(Self { span, attr })
    }

    /// Whether this is a span reference (no attribute half).
    pub fn is_span(&self) -> bool {
        self.attr.is_none()
    }

    /// True if any half still carries an unresolved `<class>`, `{wildcard}`,
    /// or `[config]` placeholder.
    pub fn has_placeholders(&self) -> bool {
        has_placeholder(&self.span) || self.attr.as_deref().is_some_and(has_placeholder)
    }
}

fn has_placeholder(s: &str) -> bool {
    s.contains('<') || s.contains('{') || s.contains('[')
}

fn check_balanced(text: &str) -> Result<(), RefParseError> {
    let mut depth = [0i32; 3]; // angle, curly, square
    for ch in text.chars() {
        match ch {
            '<' => depth[0] += 1,
            '>' => depth[0] -= 1,
            '{' => depth[1] += 1,
            '}' => depth[1] -= 1,
            '[' => depth[2] += 1,
            ']' => depth[2] -= 1,
            _ => {}
        }
        if depth.iter().any(|d| *d < 0) {
            return Err(RefParseError::UnbalancedBrackets(text.to_string()));
        }
    }
    if depth.iter().any(|d| *d != 0) {
        return Err(RefParseError::UnbalancedBrackets(text.to_string()));
    }
    Ok(())
}

impl fmt::Display for AnnotationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.attr {
            Some(attr) => write!(f, "{}:{}", self.span, attr),
            None => write!(f, "{}", self.span),
        }
    }
}

impl std::str::FromStr for AnnotationRef {
    type Err = RefParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_span_reference() {
        let r = AnnotationRef::parse("segment.token").unwrap();
        assert_eq!(r.span, "segment.token");
        assert!(r.attr.is_none());
        assert!(r.is_span());
    }

    #[test]
    fn parses_attribute_reference() {
        let r = AnnotationRef::parse("segment.token:saldo.sense").unwrap();
        assert_eq!(r.span, "segment.token");
        assert_eq!(r.attr.as_deref(), Some("saldo.sense"));
        assert!(!r.is_span());
    }

    #[test]
    fn detects_class_and_wildcard_placeholders() {
        assert!(AnnotationRef::parse("<token>").unwrap().has_placeholders());
        assert!(
            AnnotationRef::parse("{annotation}:misc.number_position")
                .unwrap()
                .has_placeholders()
        );
        assert!(!AnnotationRef::parse("segment.token").unwrap().has_placeholders());
    }

    #[test]
    fn rejects_multiple_colons() {
        assert_eq!(
            AnnotationRef::parse("a:b:c").unwrap_err(),
            RefParseError::MultipleColons("a:b:c".to_string())
        );
    }

    #[test]
    fn rejects_unbalanced_brackets() {
        assert!(matches!(
            AnnotationRef::parse("<token"),
            Err(RefParseError::UnbalancedBrackets(_))
        ));
    }

    #[test]
    fn roundtrips_through_display() {
        let r = AnnotationRef::parse("segment.token:saldo.sense").unwrap();
        assert_eq!(r.to_string(), "segment.token:saldo.sense");
    }

    fn ref_segment_strategy() -> impl proptest::strategy::Strategy<Value = String> {
        "[a-z][a-z0-9_]{0,9}(\\.[a-z][a-z0-9_]{0,9}){0,2}"
    }

    proptest::proptest! {
        /// Any span-only reference built from well-formed segments parses
        /// back to the same span with no attribute half, and round-trips
        /// through `Display` unchanged.
        #[test]
        fn span_only_reference_roundtrips(span in ref_segment_strategy()) {
            let r = AnnotationRef::parse(&span).unwrap();
            prop_assert_eq!(&r.span, &span);
            prop_assert!(r.attr.is_none());
            prop_assert_eq!(r.to_string(), span);
        }

        /// A `span:attr` reference always parses both halves back out
        /// and reassembles to the same text through `Display`.
        #[test]
        fn span_attr_reference_roundtrips(span in ref_segment_strategy(), attr in ref_segment_strategy()) {
            let text = format!("{span}:{attr}");
            let r = AnnotationRef::parse(&text).unwrap();
            prop_assert_eq!(&r.span, &span);
            prop_assert_eq!(r.attr.as_deref(), Some(attr.as_str()));
            prop_assert_eq!(r.to_string(), text);
        }
    }
}
