//! Placeholder parsing
//!
//! A raw value may contain any number of `${env:NAME}` references. `NAME`
//! runs up to the first `}` after the prefix, so `${env:a{b}c}` names `a{b`
//! and leaves `c}` as literal text. An unterminated `${env:` never matches
//! and is copied through unchanged.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

/// The placeholder pattern, non-greedy and newline-tolerant
const REFERENCE_PATTERN: &str = r"(?s)\$\{env:(.*?)\}";

fn reference_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(REFERENCE_PATTERN).expect("reference pattern is valid"))
}

/// A `${env:NAME}` occurrence inside a raw value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// The referenced variable name
    pub name: String,
    /// Byte range of the whole placeholder in the raw value
    pub span: Range<usize>,
}

/// A piece of a parsed raw value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text copied through as-is
    Literal(String),
    /// A reference to be substituted
    Reference(String),
}

/// Find every reference in `input`, left to right, non-overlapping
pub fn references(input: &str) -> Vec<Reference> {
    reference_regex()
        .captures_iter(input)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            Some(Reference {
                name: name.as_str().to_string(),
                span: whole.range(),
            })
        })
        .collect()
}

/// Split `input` into literal and reference segments
///
/// Empty literals between adjacent references are omitted.
pub fn parse(input: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last_end = 0;

    for reference in references(input) {
        if reference.span.start > last_end {
            segments.push(Segment::Literal(
                input[last_end..reference.span.start].to_string(),
            ));
        }
        segments.push(Segment::Reference(reference.name));
        last_end = reference.span.end;
    }

    if last_end < input.len() {
        segments.push(Segment::Literal(input[last_end..].to_string()));
    }

    segments
}

/// Check if a string contains at least one reference
pub fn contains_reference(input: &str) -> bool {
    reference_regex().is_match(input)
}

/// Check if `input` references `name` anywhere
pub fn references_name(input: &str, name: &str) -> bool {
    reference_regex()
        .captures_iter(input)
        .any(|caps| caps.get(1).is_some_and(|m| m.as_str() == name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_literal() {
        assert_eq!(
            parse("hello world"),
            vec![Segment::Literal("hello world".into())]
        );
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse("").is_empty());
    }

    #[test]
    fn test_parse_single_reference() {
        assert_eq!(parse("${env:HOME}"), vec![Segment::Reference("HOME".into())]);
    }

    #[test]
    fn test_parse_concatenation() {
        assert_eq!(
            parse("${env:HOME}/bin:${env:PATH}"),
            vec![
                Segment::Reference("HOME".into()),
                Segment::Literal("/bin:".into()),
                Segment::Reference("PATH".into()),
            ]
        );
    }

    #[test]
    fn test_parse_adjacent_references() {
        assert_eq!(
            parse("${env:A}${env:B}"),
            vec![Segment::Reference("A".into()), Segment::Reference("B".into())]
        );
    }

    #[test]
    fn test_unterminated_reference_is_literal() {
        assert_eq!(
            parse("prefix ${env:HOME"),
            vec![Segment::Literal("prefix ${env:HOME".into())]
        );
        assert!(!contains_reference("${env:HOME"));
    }

    #[test]
    fn test_first_closing_brace_wins() {
        assert_eq!(
            parse("${env:a{b}c}"),
            vec![Segment::Reference("a{b".into()), Segment::Literal("c}".into())]
        );
    }

    #[test]
    fn test_nested_placeholder_uses_first_brace() {
        // The inner `${env:` is part of the captured name
        let refs = references("${env:${env:X}}");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name, "${env:X");
        assert_eq!(refs[0].span, 0..14);
    }

    #[test]
    fn test_other_resolvers_are_literal() {
        assert!(!contains_reference("${HOME}"));
        assert!(!contains_reference("${file:./x}"));
        assert!(!contains_reference("$env:HOME"));
    }

    #[test]
    fn test_empty_name() {
        assert_eq!(parse("${env:}"), vec![Segment::Reference("".into())]);
    }

    #[test]
    fn test_name_may_span_lines() {
        assert_eq!(
            parse("${env:A\nB}"),
            vec![Segment::Reference("A\nB".into())]
        );
    }

    #[test]
    fn test_reference_spans() {
        let input = "x=${env:A};y=${env:B}";
        let refs = references(input);

        assert_eq!(refs.len(), 2);
        assert_eq!(&input[refs[0].span.clone()], "${env:A}");
        assert_eq!(&input[refs[1].span.clone()], "${env:B}");
    }

    #[test]
    fn test_references_name() {
        assert!(references_name("a${env:B}c", "B"));
        assert!(!references_name("a${env:BB}c", "B"));
        assert!(!references_name("plain", "B"));
    }

    #[test]
    fn test_unicode_literals() {
        assert_eq!(
            parse("héllo ${env:Ü} wörld"),
            vec![
                Segment::Literal("héllo ".into()),
                Segment::Reference("Ü".into()),
                Segment::Literal(" wörld".into()),
            ]
        );
    }
}
