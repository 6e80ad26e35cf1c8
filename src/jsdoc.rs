//! JSDoc payload parsing.
//!
//! The tokenizer hands over the raw body of a `/** ... */` comment; this
//! module splits it into a free-text description and a map of `@tag`
//! values. Tags the emitter understands are listed in
//! [`RECOGNIZED_TAGS`]; unknown tags are kept in the map so callers can
//! inspect them, but emission ignores them.

use indexmap::IndexMap;
use serde::Serialize;

/// Tags that influence emission. Everything else is carried but unused.
pub const RECOGNIZED_TAGS: &[&str] = &[
    "minimum",
    "maximum",
    "minLength",
    "maxLength",
    "pattern",
    "format",
    "default",
    "example",
    "examples",
    "deprecated",
    "title",
    "additionalProperties",
    "multipleOf",
];

/// A parsed doc comment: leading description plus `@tag value` pairs in
/// source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JsDoc {
    pub description: String,
    pub tags: IndexMap<String, String>,
}

impl JsDoc {
    /// Parse the raw inner body of a `/** ... */` comment.
    ///
    /// Leading `*` decoration is stripped per line. Everything before
    /// the first tag is the description; each `@name` introduces a tag
    /// whose raw value runs until the next tag or the end of the body.
    /// Several tags may share one line (`@minimum 1 @maximum 50`); an
    /// `@` only starts a tag when it begins a word.
    pub fn parse(body: &str) -> Self {
        let mut text = String::new();
        for line in body.lines() {
            let stripped = line
                .trim_start()
                .trim_start_matches('*')
                .trim_start_matches(' ');
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(stripped);
        }

        let mut doc = JsDoc::default();
        let mut current_tag: Option<String> = None;
        let mut current_value = String::new();
        let mut description = String::new();

        for segment in split_inclusive_whitespace(&text) {
            let word = segment.trim_matches(|c: char| c.is_whitespace());
            let is_tag_start = word.starts_with('@')
                && word.len() > 1
                && word[1..].chars().all(|c| c.is_alphanumeric() || c == '_');
            if is_tag_start {
                flush_tag(&mut doc, &mut current_tag, &mut current_value);
                current_tag = Some(word[1..].to_string());
            } else if current_tag.is_some() {
                current_value.push_str(segment);
            } else {
                description.push_str(segment);
            }
        }
        flush_tag(&mut doc, &mut current_tag, &mut current_value);
        doc.description = description.trim().to_string();
        doc
    }

    /// Look up a tag ignoring ASCII case, for tags like
    /// `@additionalProperties` that users spell inconsistently.
    pub fn tag_ignore_case(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

fn flush_tag(doc: &mut JsDoc, tag: &mut Option<String>, value: &mut String) {
    if let Some(name) = tag.take() {
        doc.tags.insert(name, value.trim().to_string());
        value.clear();
    }
}

/// Split text into alternating word / whitespace segments so that tag
/// values keep their internal spacing.
fn split_inclusive_whitespace(text: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut in_space = None;
    for (index, c) in text.char_indices() {
        let is_space = c.is_whitespace();
        match in_space {
            None => in_space = Some(is_space),
            Some(prev) if prev != is_space => {
                segments.push(&text[start..index]);
                start = index;
                in_space = Some(is_space);
            }
            _ => {}
        }
    }
    if start < text.len() {
        segments.push(&text[start..]);
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_only() {
        let doc = JsDoc::parse("A user of the system.");
        assert_eq!(doc.description, "A user of the system.");
        assert!(doc.tags.is_empty());
    }

    #[test]
    fn strips_star_decoration() {
        let doc = JsDoc::parse("*\n * First line.\n * Second line.\n ");
        assert_eq!(doc.description, "First line.\nSecond line.");
    }

    #[test]
    fn single_tag_with_value() {
        let doc = JsDoc::parse("The count.\n@minimum 1");
        assert_eq!(doc.description, "The count.");
        assert_eq!(doc.tags.get("minimum").map(String::as_str), Some("1"));
    }

    #[test]
    fn several_tags_on_one_line() {
        let doc = JsDoc::parse("@minimum 1 @maximum 50 @default 10");
        assert_eq!(doc.tags.get("minimum").map(String::as_str), Some("1"));
        assert_eq!(doc.tags.get("maximum").map(String::as_str), Some("50"));
        assert_eq!(doc.tags.get("default").map(String::as_str), Some("10"));
    }

    #[test]
    fn valueless_tag() {
        let doc = JsDoc::parse("@deprecated");
        assert_eq!(doc.tags.get("deprecated").map(String::as_str), Some(""));
    }

    #[test]
    fn pattern_value_containing_at_sign() {
        let doc = JsDoc::parse("@pattern ^[a-z]+@[a-z]+$");
        assert_eq!(
            doc.tags.get("pattern").map(String::as_str),
            Some("^[a-z]+@[a-z]+$")
        );
    }

    #[test]
    fn unknown_tags_are_preserved() {
        let doc = JsDoc::parse("@internal keep me");
        assert_eq!(doc.tags.get("internal").map(String::as_str), Some("keep me"));
    }

    #[test]
    fn case_insensitive_lookup() {
        let doc = JsDoc::parse("@AdditionalProperties false");
        assert_eq!(doc.tag_ignore_case("additionalProperties"), Some("false"));
    }
}
