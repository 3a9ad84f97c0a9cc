//! `$ref` values: internal pointers and external file references.
//!
//! A reference is split on its first `#`. Text before it names a file,
//! text after it is a [`JsonPointer`] into that file. A reference with no
//! `#` at all points to the whole external file.

use std::fmt;

use crate::error::ReferenceError;
use crate::pointer::JsonPointer;

/// A parsed `$ref` value.
///
/// # Examples
///
/// ```
/// use openapi_merge_core::Reference;
///
/// let r = Reference::parse("common/a.yaml#/components/schemas/A").unwrap();
/// assert_eq!(r.file(), Some("common/a.yaml"));
/// assert_eq!(r.to_internal().as_deref(), Some("#/components/schemas/A"));
///
/// let whole = Reference::parse("paths/users.yaml").unwrap();
/// assert!(whole.is_whole_file());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// `#/pointer` into the document being built.
    Internal(JsonPointer),
    /// `file` or `file#/pointer`.
    External {
        file: String,
        /// `None` when the reference has no fragment.
        pointer: Option<JsonPointer>,
    },
}

impl Reference {
    /// Parses a raw `$ref` string.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError::Malformed`] for the empty string, for an
    /// external reference whose file part is blank, and for fragments with
    /// invalid `~` escapes.
    pub fn parse(raw: &str) -> Result<Self, ReferenceError> {
        let malformed = |reason| ReferenceError::Malformed {
            reference: raw.to_string(),
            reason,
        };
        if raw.trim().is_empty() {
            return Err(malformed("reference is empty"));
        }
        match raw.split_once('#') {
            Some(("", fragment)) => Ok(Self::Internal(parse_fragment(raw, fragment)?)),
            Some((file, fragment)) => {
                if file.trim().is_empty() {
                    return Err(malformed("file part is blank"));
                }
                let pointer = if fragment.is_empty() {
                    None
                } else {
                    Some(parse_fragment(raw, fragment)?)
                };
                Ok(Self::External {
                    file: file.to_string(),
                    pointer,
                })
            }
            None => Ok(Self::External {
                file: raw.to_string(),
                pointer: None,
            }),
        }
    }

    /// Returns `true` when the raw text is already an internal pointer.
    pub fn is_internal_str(raw: &str) -> bool {
        raw.starts_with('#')
    }

    /// The file part of an external reference.
    pub fn file(&self) -> Option<&str> {
        match self {
            Self::Internal(_) => None,
            Self::External { file, .. } => Some(file),
        }
    }

    /// Whether this reference denotes an entire external file.
    pub fn is_whole_file(&self) -> bool {
        matches!(self, Self::External { pointer: None, .. })
    }

    /// The pointer part, if any.
    pub fn pointer(&self) -> Option<&JsonPointer> {
        match self {
            Self::Internal(pointer) => Some(pointer),
            Self::External { pointer, .. } => pointer.as_ref(),
        }
    }

    /// The `#`-prefixed form that keeps only the fragment.
    ///
    /// Whole-file references have no internal form.
    pub fn to_internal(&self) -> Option<String> {
        self.pointer().map(|pointer| format!("#{pointer}"))
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal(pointer) => write!(f, "#{pointer}"),
            Self::External { file, pointer: None } => f.write_str(file),
            Self::External {
                file,
                pointer: Some(pointer),
            } => write!(f, "{file}#{pointer}"),
        }
    }
}

fn parse_fragment(raw: &str, fragment: &str) -> Result<JsonPointer, ReferenceError> {
    JsonPointer::parse(fragment).map_err(|_| ReferenceError::Malformed {
        reference: raw.to_string(),
        reason: "'~' must be followed by '0' or '1'",
    })
}
