//! Field annotation parsing.
//!
//! Annotations use the struct-tag convention of space separated `key:"value"`
//! pairs, e.g. `fig:"ports,default=[80,443]"` or
//! `fig:"host" validate:"required"`. The configured tag key carries the
//! alternate name plus an optional `required`, `squash` or `default=` marker;
//! the `validate` and `default` keys are accepted as standalone spellings.

use thiserror::Error;

/// Marker for required fields in the tag value.
const REQUIRED_KEY: &str = "required";
/// Marker for squashed records in the tag value.
const SQUASH_KEY: &str = "squash";
/// Prefix introducing a default literal in the tag value.
const DEFAULT_PREFIX: &str = "default=";
/// Standalone key holding validation rules.
const VALIDATE_TAG: &str = "validate";
/// Standalone key holding a default literal.
const DEFAULT_TAG: &str = "default";

/// Malformed annotation, reported against the field that carries it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("invalid tag value {0:?}")]
    InvalidValue(String),
    #[error("too many values in tag")]
    TooManyValues,
    #[error("default value is empty")]
    EmptyDefault,
    #[error("default value given both inline and as a separate key")]
    DuplicateDefault,
}

/// Parsed annotation of one field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tag {
    /// Alternate name; empty means the declared field name is used.
    pub name: String,
    pub required: bool,
    /// Default literal, parsed per field type when applied.
    pub default: Option<String>,
    /// Omit this field's own name from the paths of its descendants.
    pub squash: bool,
    /// Set when the annotation was malformed; other attributes are then partial.
    pub error: Option<TagError>,
}

impl Tag {
    /// Parse the annotation `raw` using `key` as the naming tag key.
    pub fn parse(raw: &str, key: &str) -> Tag {
        let mut tag = lookup(raw, key)
            .map(|value| parse_value(&value))
            .unwrap_or_default();
        if tag.error.is_some() {
            return tag;
        }

        if let Some(rule) = lookup(raw, VALIDATE_TAG) {
            if rule == REQUIRED_KEY {
                tag.required = true;
            } else {
                tag.error = Some(TagError::InvalidValue(rule));
                return tag;
            }
        }

        if let Some(default) = lookup(raw, DEFAULT_TAG) {
            if default.is_empty() {
                tag.error = Some(TagError::EmptyDefault);
            } else if tag.default.is_some() {
                tag.error = Some(TagError::DuplicateDefault);
            } else {
                tag.default = Some(default);
            }
        }

        tag
    }

    /// Whether a default literal is present.
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

/// Parse the value stored under the naming key, e.g. `host,required`.
fn parse_value(value: &str) -> Tag {
    let segments = split_tag(value);
    let mut tag = Tag::default();
    let Some((name, rest)) = segments.split_first() else {
        return tag;
    };
    tag.name = name.trim().to_string();

    match rest {
        [] => {}
        [marker] if *marker == REQUIRED_KEY => tag.required = true,
        [marker] if *marker == SQUASH_KEY => tag.squash = true,
        [marker] => match marker.strip_prefix(DEFAULT_PREFIX) {
            Some("") => tag.error = Some(TagError::EmptyDefault),
            Some(default) => tag.default = Some(default.to_string()),
            None => tag.error = Some(TagError::InvalidValue(marker.to_string())),
        },
        _ => tag.error = Some(TagError::TooManyValues),
    }
    tag
}

/// Split on commas, except commas between `[` and `]`.
///
/// `"ports,default=[80,443]"` gives `["ports", "default=[80,443]"]`. Bracket
/// tracking is a single in/out flag, so nested brackets split unpredictably.
/// A trailing empty segment is dropped.
pub fn split_tag(tag: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut in_brackets = false;

    for (idx, byte) in tag.bytes().enumerate() {
        match byte {
            b',' if !in_brackets => {
                segments.push(&tag[start..idx]);
                start = idx + 1;
            }
            b'[' => in_brackets = true,
            b']' => in_brackets = false,
            _ => {}
        }
    }

    if start < tag.len() {
        segments.push(&tag[start..]);
    }
    segments
}

/// Look up `key` in a struct-tag string of `key:"value"` pairs.
///
/// Values are double-quoted; `\"` and `\\` escapes are honored. Returns
/// `None` when the key is absent or the tag is malformed before it.
pub fn lookup(tag: &str, key: &str) -> Option<String> {
    let mut rest = tag;
    loop {
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            return None;
        }

        let name_end = rest
            .find(|c: char| c <= ' ' || c == ':' || c == '"')
            .unwrap_or(rest.len());
        if name_end == 0 || !rest[name_end..].starts_with(":\"") {
            return None;
        }
        let name = &rest[..name_end];
        rest = &rest[name_end + 2..];

        let mut value = String::new();
        let mut chars = rest.char_indices();
        let mut closed_at = None;
        while let Some((idx, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, escaped)) => value.push(escaped),
                    None => return None,
                },
                '"' => {
                    closed_at = Some(idx);
                    break;
                }
                _ => value.push(c),
            }
        }
        let closed_at = closed_at?;
        rest = &rest[closed_at + 1..];

        if name == key {
            return Some(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Bracketed commas stay inside their segment.
    #[test]
    fn split_tag_cases() {
        let cases: &[(&str, &[&str])] = &[
            ("", &[]),
            ("a", &["a"]),
            (",a", &["", "a"]),
            ("a,", &["a"]),
            ("a,,b", &["a", "", "b"]),
            ("[a,b,c]", &["[a,b,c]"]),
            ("a,b,[c,d],e", &["a", "b", "[c,d]", "e"]),
            ("ports,default=[80,443]", &["ports", "default=[80,443]"]),
            (",default=[go,rust],x", &["", "default=[go,rust]", "x"]),
        ];
        for (input, want) in cases {
            assert_eq!(split_tag(input), want.to_vec(), "input {input:?}");
        }
    }

    /// Struct-tag lookup finds keys anywhere in the string.
    #[test]
    fn lookup_keys() {
        let raw = r#"fig:"host" validate:"required" default:"a \"b\"""#;
        assert_eq!(lookup(raw, "fig").as_deref(), Some("host"));
        assert_eq!(lookup(raw, "validate").as_deref(), Some("required"));
        assert_eq!(lookup(raw, "default").as_deref(), Some("a \"b\""));
        assert_eq!(lookup(raw, "yaml"), None);
        assert_eq!(lookup("", "fig"), None);
        assert_eq!(lookup("fig", "fig"), None);
        assert_eq!(lookup(r#"fig:"unterminated"#, "fig"), None);
    }

    #[test]
    fn parse_empty() {
        assert_eq!(Tag::parse("", "fig"), Tag::default());
        assert_eq!(Tag::parse(r#"fig:"""#, "fig"), Tag::default());
    }

    #[test]
    fn parse_name_only() {
        let tag = Tag::parse(r#"fig:" host ""#, "fig");
        assert_eq!(tag.name, "host");
        assert!(!tag.required);
        assert_eq!(tag.default, None);
        assert_eq!(tag.error, None);
    }

    #[test]
    fn parse_required_marker() {
        let tag = Tag::parse(r#"fig:"host,required""#, "fig");
        assert_eq!(tag.name, "host");
        assert!(tag.required);
        assert_eq!(tag.error, None);
    }

    /// Default literals keep bracket-protected commas.
    #[test]
    fn parse_default_marker() {
        let tag = Tag::parse(r#"fig:",default=[1,2,3]""#, "fig");
        assert_eq!(tag.name, "");
        assert_eq!(tag.default.as_deref(), Some("[1,2,3]"));

        let tag = Tag::parse(r#"fig:"b,default=go""#, "fig");
        assert_eq!(tag.name, "b");
        assert_eq!(tag.default.as_deref(), Some("go"));
    }

    #[test]
    fn parse_squash_marker() {
        let tag = Tag::parse(r#"fig:",squash""#, "fig");
        assert!(tag.squash);
        assert_eq!(tag.error, None);
    }

    /// Unknown markers are parse errors rather than silently ignored.
    #[test]
    fn parse_rejects_unknown_marker() {
        let tag = Tag::parse(r#"fig:"host,requird""#, "fig");
        assert_eq!(
            tag.error,
            Some(TagError::InvalidValue("requird".to_string()))
        );
    }

    #[test]
    fn parse_rejects_too_many_values() {
        let tag = Tag::parse(r#"fig:"host,required,default=x""#, "fig");
        assert_eq!(tag.error, Some(TagError::TooManyValues));
    }

    #[test]
    fn parse_rejects_empty_default() {
        let tag = Tag::parse(r#"fig:"host,default=""#, "fig");
        assert_eq!(tag.error, Some(TagError::EmptyDefault));
        let tag = Tag::parse(r#"default:"""#, "fig");
        assert_eq!(tag.error, Some(TagError::EmptyDefault));
    }

    /// Standalone `validate` and `default` keys combine with the naming key.
    #[test]
    fn parse_standalone_keys() {
        let tag = Tag::parse(r#"fig:"level" default:"info""#, "fig");
        assert_eq!(tag.name, "level");
        assert_eq!(tag.default.as_deref(), Some("info"));

        let tag = Tag::parse(r#"validate:"required""#, "fig");
        assert!(tag.required);

        let tag = Tag::parse(r#"fig:"x" validate:"min=3""#, "fig");
        assert_eq!(tag.error, Some(TagError::InvalidValue("min=3".to_string())));
    }

    /// A default may come from the naming key or the `default` key, not both.
    #[test]
    fn parse_rejects_duplicate_default() {
        let tag = Tag::parse(r#"fig:"a,default=x" default:"y""#, "fig");
        assert_eq!(tag.error, Some(TagError::DuplicateDefault));
        assert_eq!(tag.default.as_deref(), Some("x"));
    }

    /// Both markers are kept so the engine can report the conflict.
    #[test]
    fn parse_keeps_required_and_default() {
        let tag = Tag::parse(r#"fig:"x,required" default:"5""#, "fig");
        assert!(tag.required);
        assert!(tag.has_default());
        assert_eq!(tag.error, None);
    }

    /// The naming key is configurable.
    #[test]
    fn parse_custom_key() {
        let raw = r#"fig:"ignored" yaml:"level,default=warn""#;
        let tag = Tag::parse(raw, "yaml");
        assert_eq!(tag.name, "level");
        assert_eq!(tag.default.as_deref(), Some("warn"));
    }
}
