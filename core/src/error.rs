//! Error types shared by pointer navigation, registration and encoding.
//!
//! None of these carry a file path: the I/O layer wraps them together with
//! the file that produced them.

use thiserror::Error;

use crate::registry::ComponentKind;

/// Failures while parsing or following a `$ref`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    /// The reference text cannot be split into a file and a fragment.
    #[error("malformed reference '{reference}': {reason}")]
    Malformed {
        reference: String,
        reason: &'static str,
    },

    /// A pointer segment does not exist in the target.
    #[error("key '{segment}' not found at '{pointer}'")]
    MissingSegment { segment: String, pointer: String },

    /// A pointer segment tries to descend into a scalar value.
    #[error("expected a mapping at '{pointer}' while looking up '{segment}'")]
    NotAContainer { segment: String, pointer: String },

    /// The pointer target exists but cannot be inlined.
    #[error("expected a mapping as the target of '{pointer}'")]
    TargetNotMapping { pointer: String },

    /// Inlining revisited a `(file, pointer)` pair already being inlined.
    #[error("reference cycle detected: {chain}")]
    Cycle { chain: String },

    /// Inlining went deeper than the configured limit.
    #[error("reference chain exceeds the maximum depth of {limit}")]
    DepthExceeded { limit: u32 },
}

/// A value has the wrong shape for where it appears.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// A `$ref` whose value is not a string.
    #[error("reference at '{location}' is not a string")]
    NonStringReference { location: String },

    /// A component category that is not a mapping of names to definitions.
    #[error("component category '{category}' is not a mapping")]
    CategoryNotMapping { category: String },

    /// A top-level section with the wrong node kind.
    #[error("section '{section}' must be a {expected}")]
    Section {
        section: &'static str,
        expected: &'static str,
    },

    /// A mapping key that has no textual form (a mapping or sequence key).
    #[error("unsupported mapping key at '{location}'")]
    UnsupportedKey { location: String },
}

/// Two definitions with the same name disagree and the policy forbids it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("component '{name}' in '{}' is defined more than once with different bodies", .kind.key())]
pub struct ConflictError {
    pub kind: ComponentKind,
    pub name: String,
}
