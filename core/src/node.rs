//! Ordered output tree handed to the emitter.

use serde_yaml::Number;

/// How a string scalar should be written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScalarStyle {
    /// Plain when unambiguous, quoted or block style otherwise.
    #[default]
    Auto,
    /// Always single-quoted.
    SingleQuoted,
}

/// One node of the encoded document.
///
/// Mappings keep their entries in the order the encoder chose.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Number(Number),
    String { value: String, style: ScalarStyle },
    Sequence(Vec<Node>),
    Mapping(Vec<(String, Node)>),
    Tagged { tag: String, value: Box<Node> },
}

impl Node {
    /// A string scalar with [`ScalarStyle::Auto`].
    pub fn string(value: impl Into<String>) -> Self {
        Node::String {
            value: value.into(),
            style: ScalarStyle::Auto,
        }
    }

    /// A string scalar that is always quoted.
    pub fn quoted(value: impl Into<String>) -> Self {
        Node::String {
            value: value.into(),
            style: ScalarStyle::SingleQuoted,
        }
    }

    /// Keys of a mapping node, in order. Empty for other kinds.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Node::Mapping(entries) => entries.iter().map(|(k, _)| k.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// Looks up a direct child of a mapping node.
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Mapping(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}
