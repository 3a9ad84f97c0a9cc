//! JSON pointer parsing, escaping and navigation.
//!
//! A pointer is stored as a list of decoded segments. Decoding replaces
//! `~1` with `/` and then `~0` with `~`; encoding does the inverse in the
//! opposite order, so a pointer read with [`JsonPointer::parse`] prints back
//! to the same text.
//!
//! # Examples
//!
//! ```
//! use openapi_merge_core::JsonPointer;
//!
//! let pointer = JsonPointer::parse("/paths/~1users~1{id}/get").unwrap();
//! assert_eq!(pointer.segments(), ["paths", "/users/{id}", "get"]);
//! assert_eq!(pointer.to_string(), "/paths/~1users~1{id}/get");
//! ```

use std::fmt;

use serde_yaml::Value;

use crate::error::ReferenceError;
use crate::value::lookup;

/// A parsed, decoded JSON pointer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct JsonPointer {
    segments: Vec<String>,
}

impl JsonPointer {
    /// The pointer to the whole document.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses the fragment part of a reference (the text after `#`).
    ///
    /// A missing leading `/` is tolerated and empty segments are skipped,
    /// so `""`, `"/"` and `"//"` all denote the document root.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError::Malformed`] when a `~` is not followed by
    /// `0` or `1`.
    pub fn parse(fragment: &str) -> Result<Self, ReferenceError> {
        let mut segments = Vec::new();
        for raw in fragment.split('/') {
            if raw.is_empty() {
                continue;
            }
            if has_invalid_escape(raw) {
                return Err(ReferenceError::Malformed {
                    reference: fragment.to_string(),
                    reason: "'~' must be followed by '0' or '1'",
                });
            }
            segments.push(decode_segment(raw));
        }
        Ok(Self { segments })
    }

    /// Decoded segments, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns `true` for the document-root pointer.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Appends a decoded segment.
    pub fn push(&mut self, segment: impl Into<String>) {
        self.segments.push(segment.into());
    }

    /// Removes the last segment.
    pub fn pop(&mut self) -> Option<String> {
        self.segments.pop()
    }

    /// Follows the pointer through `value`.
    ///
    /// Mapping keys are matched by their textual form, so a segment `200`
    /// finds both `"200":` and `200:`. Sequences are indexed by position.
    ///
    /// # Errors
    ///
    /// [`ReferenceError::MissingSegment`] names the first segment that is
    /// absent; [`ReferenceError::NotAContainer`] is returned when a scalar
    /// sits where a mapping was expected.
    pub fn resolve<'a>(&self, value: &'a Value) -> Result<&'a Value, ReferenceError> {
        let mut current = value;
        for (depth, segment) in self.segments.iter().enumerate() {
            let walked = || self.prefix(depth).to_string();
            let container = match current {
                Value::Tagged(tagged) => &tagged.value,
                other => other,
            };
            current = match container {
                Value::Mapping(map) => {
                    lookup(map, segment).ok_or_else(|| ReferenceError::MissingSegment {
                        segment: segment.clone(),
                        pointer: walked(),
                    })?
                }
                Value::Sequence(items) => segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| items.get(index))
                    .ok_or_else(|| ReferenceError::MissingSegment {
                        segment: segment.clone(),
                        pointer: walked(),
                    })?,
                _ => {
                    return Err(ReferenceError::NotAContainer {
                        segment: segment.clone(),
                        pointer: walked(),
                    });
                }
            };
        }
        Ok(current)
    }

    fn prefix(&self, len: usize) -> JsonPointer {
        JsonPointer {
            segments: self.segments[..len].to_vec(),
        }
    }
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{}", encode_segment(segment))?;
        }
        Ok(())
    }
}

/// Decodes one pointer segment (`~1` -> `/`, then `~0` -> `~`).
pub fn decode_segment(raw: &str) -> String {
    raw.replace("~1", "/").replace("~0", "~")
}

/// Encodes one pointer segment (`~` -> `~0`, then `/` -> `~1`).
pub fn encode_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn has_invalid_escape(raw: &str) -> bool {
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '~' && !matches!(chars.next(), Some('0' | '1')) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_decode_order_matches_rfc() {
        assert_eq!(decode_segment("a~1b"), "a/b");
        assert_eq!(decode_segment("m~0n"), "m~n");
        // `~01` is an escaped tilde followed by a literal `1`.
        assert_eq!(decode_segment("~01"), "~1");
    }

    #[test]
    fn test_escaping_round_trips() {
        for raw in ["/a~1b/m~0n", "/~01/~10", "/paths/~1pets~1{petId}"] {
            let pointer = JsonPointer::parse(raw).unwrap();
            assert_eq!(pointer.to_string(), raw);
        }
        assert_eq!(encode_segment(&decode_segment("x~0~1y")), "x~0~1y");
    }

    #[test]
    fn test_root_forms() {
        assert!(JsonPointer::parse("").unwrap().is_root());
        assert!(JsonPointer::parse("/").unwrap().is_root());
        assert_eq!(JsonPointer::root().to_string(), "");
    }

    #[test]
    fn test_missing_leading_slash_is_tolerated() {
        let pointer = JsonPointer::parse("components/schemas/Pet").unwrap();
        assert_eq!(pointer.to_string(), "/components/schemas/Pet");
    }

    #[test]
    fn test_invalid_escape_rejected() {
        assert!(matches!(
            JsonPointer::parse("/a~2b"),
            Err(ReferenceError::Malformed { .. })
        ));
        assert!(JsonPointer::parse("/trailing~").is_err());
    }

    #[test]
    fn test_resolve_nested_and_escaped_keys() {
        let value = doc("paths:\n  /pets/{id}:\n    get:\n      summary: one\n");
        let pointer = JsonPointer::parse("/paths/~1pets~1{id}/get/summary").unwrap();
        assert_eq!(pointer.resolve(&value).unwrap(), &Value::from("one"));
    }

    #[test]
    fn test_resolve_numeric_key_and_index() {
        let value = doc("responses:\n  200:\n    description: ok\nlist:\n  - a\n  - b\n");
        let ok = JsonPointer::parse("/responses/200/description").unwrap();
        assert_eq!(ok.resolve(&value).unwrap(), &Value::from("ok"));
        let second = JsonPointer::parse("/list/1").unwrap();
        assert_eq!(second.resolve(&value).unwrap(), &Value::from("b"));
    }

    #[test]
    fn test_resolve_reports_missing_segment() {
        let value = doc("components:\n  pathItems:\n    A: {}\n");
        let pointer = JsonPointer::parse("/components/pathItems/Missing").unwrap();
        let err = pointer.resolve(&value).unwrap_err();
        assert_eq!(
            err,
            ReferenceError::MissingSegment {
                segment: "Missing".into(),
                pointer: "/components/pathItems".into(),
            }
        );
    }

    #[test]
    fn test_resolve_through_scalar_fails() {
        let value = doc("info:\n  title: x\n");
        let pointer = JsonPointer::parse("/info/title/deeper").unwrap();
        assert!(matches!(
            pointer.resolve(&value),
            Err(ReferenceError::NotAContainer { .. })
        ));
    }
}
