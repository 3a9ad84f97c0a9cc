//! Block-style YAML text for an encoded [`Node`] tree.
//!
//! Output uses two-space indentation, sequences indented under their key,
//! `{}` and `[]` for empty collections, and literal blocks for multi-line
//! text. Strings stay plain unless a YAML parser would read them as
//! something else.

use std::sync::LazyLock;

use regex::Regex;

use crate::node::{Node, ScalarStyle};

const INDENT: usize = 2;

/// Plain scalars that a YAML 1.1 or 1.2 parser would not read as text.
static NON_STRING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:",
        r"(?i:~|null|true|false|yes|no|y|n|on|off)",
        r"|[-+]?(?:[0-9][0-9_]*(?:\.[0-9_]*)?|\.[0-9_]+)(?:[eE][-+]?[0-9]+)?",
        r"|[-+]?0[xX][0-9a-fA-F_]+",
        r"|[-+]?0[oO][0-7_]+",
        r"|[-+]?0[bB][01_]+",
        r"|[-+]?\.(?i:inf)",
        r"|\.(?i:nan)",
        r"|[-+]?[0-9][0-9_]*(?::[0-5]?[0-9])+(?:\.[0-9_]*)?",
        r"|[0-9]{4}-[0-9]{1,2}-[0-9]{1,2}(?:[Tt ].*)?",
        r")$",
    ))
    .expect("static regex must compile")
});

/// Renders `node` as a YAML document terminated by a newline.
///
/// # Examples
///
/// ```
/// use openapi_merge_core::{Node, to_yaml_string};
///
/// let node = Node::Mapping(vec![
///     ("openapi".into(), Node::string("3.0.3")),
///     ("tags".into(), Node::Sequence(vec![Node::string("pets")])),
///     ("paths".into(), Node::Mapping(vec![])),
/// ]);
/// assert_eq!(
///     to_yaml_string(&node),
///     "openapi: 3.0.3\ntags:\n  - pets\npaths: {}\n"
/// );
/// ```
pub fn to_yaml_string(node: &Node) -> String {
    let mut emitter = Emitter::default();
    match node {
        Node::Mapping(entries) if !entries.is_empty() => emitter.mapping(entries, 0, false),
        Node::Sequence(items) if !items.is_empty() => emitter.sequence(items, 0, false),
        other => {
            emitter.value(other, 0);
            emitter.out.remove(0);
        }
    }
    emitter.out
}

#[derive(Default)]
struct Emitter {
    out: String,
}

impl Emitter {
    fn pad(&mut self, indent: usize) {
        self.out.extend(std::iter::repeat_n(' ', indent));
    }

    fn mapping(&mut self, entries: &[(String, Node)], indent: usize, inline_first: bool) {
        for (i, (key, value)) in entries.iter().enumerate() {
            if i > 0 || !inline_first {
                self.pad(indent);
            }
            self.out.push_str(&inline_scalar(key, ScalarStyle::Auto));
            self.out.push(':');
            self.value(value, indent);
        }
    }

    fn sequence(&mut self, items: &[Node], indent: usize, inline_first: bool) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 || !inline_first {
                self.pad(indent);
            }
            self.out.push('-');
            self.item(item, indent);
        }
    }

    /// Writes a value after `key:`, where `indent` is the key's column.
    fn value(&mut self, node: &Node, indent: usize) {
        match node {
            Node::Mapping(entries) if entries.is_empty() => self.out.push_str(" {}\n"),
            Node::Mapping(entries) => {
                self.out.push('\n');
                self.mapping(entries, indent + INDENT, false);
            }
            Node::Sequence(items) if items.is_empty() => self.out.push_str(" []\n"),
            Node::Sequence(items) => {
                self.out.push('\n');
                self.sequence(items, indent + INDENT, false);
            }
            Node::Tagged { tag, value } => {
                self.tag(tag);
                self.value(value, indent);
            }
            scalar => self.scalar(scalar, indent),
        }
    }

    /// Writes a sequence item after `-`, where `indent` is the dash's column.
    fn item(&mut self, node: &Node, indent: usize) {
        match node {
            Node::Mapping(entries) if !entries.is_empty() => {
                self.out.push(' ');
                self.mapping(entries, indent + INDENT, true);
            }
            Node::Sequence(items) if !items.is_empty() => {
                self.out.push(' ');
                self.sequence(items, indent + INDENT, true);
            }
            other => self.value(other, indent),
        }
    }

    fn tag(&mut self, tag: &str) {
        self.out.push(' ');
        if !tag.starts_with('!') {
            self.out.push('!');
        }
        self.out.push_str(tag);
    }

    fn scalar(&mut self, node: &Node, indent: usize) {
        self.out.push(' ');
        match node {
            Node::Null => self.out.push_str("null"),
            Node::Bool(b) => self.out.push_str(if *b { "true" } else { "false" }),
            Node::Number(n) => self.out.push_str(&n.to_string()),
            Node::String {
                value,
                style: ScalarStyle::Auto,
            } if literal_block_fits(value) => {
                self.literal_block(value, indent + INDENT);
                return;
            }
            Node::String { value, style } => self.out.push_str(&inline_scalar(value, *style)),
            _ => {}
        }
        self.out.push('\n');
    }

    fn literal_block(&mut self, value: &str, indent: usize) {
        let body = match value.strip_suffix('\n') {
            Some(body) => {
                self.out.push_str("|\n");
                body
            }
            None => {
                self.out.push_str("|-\n");
                value
            }
        };
        for line in body.split('\n') {
            if !line.is_empty() {
                self.pad(indent);
                self.out.push_str(line);
            }
            self.out.push('\n');
        }
    }
}

/// Text that can be written as a literal block and read back unchanged.
fn literal_block_fits(value: &str) -> bool {
    if !value.contains('\n') || value.ends_with("\n\n") {
        return false;
    }
    if value.starts_with([' ', '\t', '\n']) {
        return false;
    }
    if value.chars().any(|c| c != '\n' && needs_escape(c)) {
        return false;
    }
    value
        .split('\n')
        .all(|line| line.is_empty() || !line.trim().is_empty())
        && !value.split('\n').any(|line| line.ends_with([' ', '\t']))
}

fn inline_scalar(value: &str, style: ScalarStyle) -> String {
    match style {
        ScalarStyle::SingleQuoted if !value.chars().any(needs_escape) => {
            format!("'{}'", value.replace('\'', "''"))
        }
        ScalarStyle::SingleQuoted => double_quoted(value),
        ScalarStyle::Auto if plain_is_safe(value) => value.to_string(),
        ScalarStyle::Auto => double_quoted(value),
    }
}

/// Whether `value` reads back as the same string when written plain.
fn plain_is_safe(value: &str) -> bool {
    let Some(first) = value.chars().next() else {
        return false;
    };
    if "-?:,[]{}#&*!|>'\"%@`".contains(first) {
        return false;
    }
    if value.starts_with(char::is_whitespace) || value.ends_with(char::is_whitespace) {
        return false;
    }
    if value.ends_with(':') || value.contains(": ") || value.contains(" #") {
        return false;
    }
    // Document markers at column 0.
    if value.starts_with("---") || value.starts_with("...") {
        return false;
    }
    if value.chars().any(needs_escape) || value == "<<" {
        return false;
    }
    !NON_STRING_RE.is_match(value)
}

fn needs_escape(c: char) -> bool {
    c.is_control() || matches!(c, '\u{2028}' | '\u{2029}' | '\u{feff}')
}

fn double_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            c if needs_escape(c) => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: Vec<(&str, Node)>) -> Node {
        Node::Mapping(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    #[test]
    fn test_nested_mappings_and_sequences() {
        let node = map(vec![
            (
                "paths",
                map(vec![(
                    "/pets",
                    map(vec![(
                        "get",
                        map(vec![(
                            "parameters",
                            Node::Sequence(vec![map(vec![
                                ("name", Node::string("limit")),
                                ("in", Node::string("query")),
                            ])]),
                        )]),
                    )]),
                )]),
            ),
            ("security", Node::Sequence(vec![map(vec![("api_key", Node::Sequence(vec![]))])])),
        ]);
        let expected = "\
paths:
  /pets:
    get:
      parameters:
        - name: limit
          in: query
security:
  - api_key: []
";
        assert_eq!(to_yaml_string(&node), expected);
    }

    #[test]
    fn test_ambiguous_strings_are_quoted() {
        for text in ["200", "3.0", "true", "No", "null", "~", "0x1F", "1e3", ".inf", "2024-01-01", "12:30"] {
            assert_eq!(inline_scalar(text, ScalarStyle::Auto), format!("\"{text}\""), "{text}");
        }
        for text in ["", " lead", "trail ", "a: b", "a #b", "key:", "#x", "*alias", "- item", "<<"] {
            assert!(inline_scalar(text, ScalarStyle::Auto).starts_with('"'), "{text}");
        }
    }

    #[test]
    fn test_plain_strings_stay_plain() {
        for text in ["3.0.3", "/pets/{id}", "application/json", "a:b", "v1", "Pet name"] {
            assert_eq!(inline_scalar(text, ScalarStyle::Auto), text);
        }
        assert_eq!(
            inline_scalar("#/components/schemas/Pet", ScalarStyle::Auto),
            "\"#/components/schemas/Pet\""
        );
    }

    #[test]
    fn test_single_quoted_style() {
        assert_eq!(inline_scalar("a.yaml#/B", ScalarStyle::SingleQuoted), "'a.yaml#/B'");
        assert_eq!(inline_scalar("it's", ScalarStyle::SingleQuoted), "'it''s'");
        assert_eq!(inline_scalar("a\tb", ScalarStyle::SingleQuoted), "\"a\\tb\"");
    }

    #[test]
    fn test_literal_blocks() {
        let node = map(vec![
            ("kept", Node::string("line one\nline two\n")),
            ("stripped", Node::string("a\n\nb")),
            ("escaped", Node::string("ends\n\n")),
        ]);
        let expected = "\
kept: |
  line one
  line two
stripped: |-
  a

  b
escaped: \"ends\\n\\n\"
";
        assert_eq!(to_yaml_string(&node), expected);
    }

    #[test]
    fn test_literal_block_inside_sequence_item() {
        let node = map(vec![(
            "tags",
            Node::Sequence(vec![map(vec![
                ("name", Node::string("pets")),
                ("description", Node::string("first\nsecond")),
            ])]),
        )]);
        let expected = "\
tags:
  - name: pets
    description: |-
      first
      second
";
        assert_eq!(to_yaml_string(&node), expected);
    }

    #[test]
    fn test_scalars_and_tags() {
        let node = map(vec![
            ("nothing", Node::Null),
            ("flag", Node::Bool(false)),
            ("count", Node::Number(serde_yaml::Number::from(3u64))),
            (
                "tagged",
                Node::Tagged {
                    tag: "!custom".into(),
                    value: Box::new(Node::string("x")),
                },
            ),
            ("200", Node::string("ok")),
        ]);
        assert_eq!(
            to_yaml_string(&node),
            "nothing: null\nflag: false\ncount: 3\ntagged: !custom x\n\"200\": ok\n"
        );
    }

    #[test]
    fn test_document_markers_are_quoted() {
        for text in ["... a", "...", "--- b", "---"] {
            assert!(inline_scalar(text, ScalarStyle::Auto).starts_with('"'), "{text}");
        }
        assert_eq!(inline_scalar("a ... b", ScalarStyle::Auto), "a ... b");

        let node = map(vec![("... a", Node::string("v")), ("--- b", Node::string("w"))]);
        let parsed: serde_yaml::Value = serde_yaml::from_str(&to_yaml_string(&node)).unwrap();
        assert_eq!(parsed["... a"], serde_yaml::Value::from("v"));
        assert_eq!(parsed["--- b"], serde_yaml::Value::from("w"));
    }

    #[test]
    fn test_output_parses_back() {
        let node = map(vec![
            ("a", Node::string("yes")),
            ("b", Node::string("multi\nline\n")),
            ("c", Node::quoted("x.yaml#/A")),
            ("d", Node::string("quote \" and \\ slash")),
        ]);
        let parsed: serde_yaml::Value = serde_yaml::from_str(&to_yaml_string(&node)).unwrap();
        assert_eq!(parsed["a"], serde_yaml::Value::from("yes"));
        assert_eq!(parsed["b"], serde_yaml::Value::from("multi\nline\n"));
        assert_eq!(parsed["c"], serde_yaml::Value::from("x.yaml#/A"));
        assert_eq!(parsed["d"], serde_yaml::Value::from("quote \" and \\ slash"));
    }
}
