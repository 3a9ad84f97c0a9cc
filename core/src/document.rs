//! Typed view of an OpenAPI document and the aggregate built during a merge.

use serde_yaml::{Mapping, Value};

use crate::error::TypeError;
use crate::registry::ComponentRegistry;

/// The sections of an OpenAPI document the merger understands.
///
/// Unknown top-level keys (`externalDocs`, `x-*`, ...) are kept in
/// [`extra`](OpenApiDocument::extra) in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpenApiDocument {
    pub openapi: Option<String>,
    pub info: Option<Value>,
    pub servers: Option<Vec<Value>>,
    pub paths: Option<Mapping>,
    pub components: Option<Mapping>,
    pub security: Option<Vec<Value>>,
    pub tags: Option<Vec<Value>>,
    pub extra: Mapping,
}

impl OpenApiDocument {
    /// Decodes a parsed root value section by section.
    ///
    /// An empty document decodes to an empty [`OpenApiDocument`].
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::Section`] when the root is not a mapping or a
    /// known section has the wrong node kind.
    ///
    /// # Examples
    ///
    /// ```
    /// use openapi_merge_core::OpenApiDocument;
    ///
    /// let value = serde_yaml::from_str("openapi: 3.1\npaths: {}\n").unwrap();
    /// let doc = OpenApiDocument::from_value(value).unwrap();
    /// assert_eq!(doc.openapi.as_deref(), Some("3.1"));
    /// ```
    pub fn from_value(value: Value) -> Result<Self, TypeError> {
        let mut root = match value {
            Value::Mapping(map) => map,
            Value::Null => Mapping::new(),
            _ => {
                return Err(TypeError::Section {
                    section: "document",
                    expected: "mapping",
                });
            }
        };

        let openapi = match root.shift_remove("openapi") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(_) => {
                return Err(TypeError::Section {
                    section: "openapi",
                    expected: "string",
                });
            }
        };

        Ok(Self {
            openapi,
            info: take(&mut root, "info"),
            servers: take_sequence(&mut root, "servers")?,
            paths: take_mapping(&mut root, "paths")?,
            components: take_mapping(&mut root, "components")?,
            security: take_sequence(&mut root, "security")?,
            tags: take_sequence(&mut root, "tags")?,
            extra: root,
        })
    }
}

fn take(root: &mut Mapping, section: &'static str) -> Option<Value> {
    root.shift_remove(section).filter(|value| !value.is_null())
}

fn take_mapping(root: &mut Mapping, section: &'static str) -> Result<Option<Mapping>, TypeError> {
    match take(root, section) {
        None => Ok(None),
        Some(Value::Mapping(map)) => Ok(Some(map)),
        Some(_) => Err(TypeError::Section {
            section,
            expected: "mapping",
        }),
    }
}

fn take_sequence(
    root: &mut Mapping,
    section: &'static str,
) -> Result<Option<Vec<Value>>, TypeError> {
    match take(root, section) {
        None => Ok(None),
        Some(Value::Sequence(items)) => Ok(Some(items)),
        Some(_) => Err(TypeError::Section {
            section,
            expected: "sequence",
        }),
    }
}

/// The working document of one merge call.
///
/// Created from the root file, then completed by the resolver (path table)
/// and the harvester (component registry).
#[derive(Debug, Clone, Default)]
pub struct Specification {
    pub version: Option<String>,
    pub info: Option<Value>,
    pub servers: Option<Vec<Value>>,
    /// Path string to path item, in root-document order.
    pub paths: Mapping,
    pub components: ComponentRegistry,
    pub security: Option<Vec<Value>>,
    pub tags: Option<Vec<Value>>,
    /// Other top-level keys of the root document.
    pub extra: Mapping,
}

impl Specification {
    /// Splits a decoded root document into an aggregate with an empty
    /// registry and the root's own `components` section.
    pub fn from_document(document: OpenApiDocument) -> (Self, Option<Mapping>) {
        let spec = Self {
            version: document.openapi,
            info: document.info,
            servers: document.servers,
            paths: document.paths.unwrap_or_default(),
            components: ComponentRegistry::new(),
            security: document.security,
            tags: document.tags,
            extra: document.extra,
        };
        (spec, document.components)
    }
}
