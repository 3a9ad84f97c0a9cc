//! Canonical field ordering for the merged document.
//!
//! Mappings are sorted into one of five structural kinds, each with a fixed
//! field order. Context decides the kind where it is known (a value under
//! `paths` is a path item, a value under `get` inside a path item is an
//! operation, a definition under `components/schemas` is a schema);
//! everywhere else [`ObjectKind::classify`] guesses from the keys present.
//! Fields absent from a kind's table follow in [`RemainderOrder`].
//!
//! # Example
//!
//! ```
//! use openapi_merge_core::{Encoder, Node, ObjectKind};
//!
//! let schema = serde_yaml::from_str(
//!     "required: [id]\nproperties:\n  id: {type: string}\ntype: object\n",
//! ).unwrap();
//! assert_eq!(ObjectKind::classify(&schema), Some(ObjectKind::Schema));
//!
//! let node = Encoder::default().encode_value(&serde_yaml::Value::Mapping(schema)).unwrap();
//! assert_eq!(node.keys(), ["type", "required", "properties"]);
//! ```

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::document::Specification;
use crate::error::TypeError;
use crate::node::Node;
use crate::registry::ComponentKind;
use crate::value::{REF_KEY, entries};

/// HTTP methods of a path item, in output order.
pub const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

const SCHEMA_FIELDS: &[&str] = &[
    "type",
    "format",
    "title",
    "description",
    "default",
    "multipleOf",
    "maximum",
    "exclusiveMaximum",
    "minimum",
    "exclusiveMinimum",
    "maxLength",
    "minLength",
    "pattern",
    "maxItems",
    "minItems",
    "uniqueItems",
    "maxProperties",
    "minProperties",
    "required",
    "enum",
    "properties",
    "items",
    "allOf",
    "oneOf",
    "anyOf",
    "not",
    "additionalProperties",
    "nullable",
    "discriminator",
    "readOnly",
    "writeOnly",
    "xml",
    "externalDocs",
    "example",
    "deprecated",
];

const PARAMETER_FIELDS: &[&str] = &[
    "name",
    "in",
    "description",
    "required",
    "deprecated",
    "allowEmptyValue",
    "style",
    "explode",
    "allowReserved",
    "schema",
    "example",
    "examples",
    "content",
];

const RESPONSE_FIELDS: &[&str] = &["description", "headers", "content", "links"];

const PATH_ITEM_FIELDS: &[&str] = &[
    "$ref",
    "get",
    "put",
    "post",
    "delete",
    "options",
    "head",
    "patch",
    "trace",
    "summary",
    "description",
    "servers",
    "parameters",
];

const OPERATION_FIELDS: &[&str] = &[
    "tags",
    "summary",
    "description",
    "externalDocs",
    "operationId",
    "parameters",
    "requestBody",
    "responses",
    "callbacks",
    "deprecated",
    "security",
    "servers",
];

/// Property names placed first inside a schema's `properties`.
pub const PREFERRED_PROPERTIES: &[&str] = &[
    "id",
    "name",
    "title",
    "description",
    "type",
    "format",
    "username",
    "email",
    "password",
    "firstName",
    "lastName",
    "createdAt",
    "updatedAt",
    "deletedAt",
];

/// Status codes placed first inside an operation's `responses`.
pub const PREFERRED_STATUS_CODES: &[&str] = &[
    "default", "200", "201", "202", "204", "400", "401", "403", "404", "405", "409", "422", "500",
    "501", "503",
];

/// Structural kind of an OpenAPI object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Schema,
    Parameter,
    Response,
    PathItem,
    Operation,
}

impl ObjectKind {
    /// Guesses the kind of `map` from the keys it contains.
    ///
    /// Checks run in this order: schema, parameter, response, path item,
    /// operation. `None` means the mapping keeps its source order.
    pub fn classify(map: &Mapping) -> Option<Self> {
        let has = |key: &str| map.contains_key(key);
        if ["type", "properties", "items", "required", "format"]
            .into_iter()
            .any(has)
        {
            Some(ObjectKind::Schema)
        } else if Self::is_parameter(map) {
            Some(ObjectKind::Parameter)
        } else if has("description") || has("content") {
            Some(ObjectKind::Response)
        } else if HTTP_METHODS.into_iter().any(has) || has("parameters") || has(REF_KEY) {
            Some(ObjectKind::PathItem)
        } else if [
            "summary",
            "description",
            "operationId",
            "responses",
            "parameters",
            "requestBody",
        ]
        .into_iter()
        .any(has)
        {
            Some(ObjectKind::Operation)
        } else {
            None
        }
    }

    /// A parameter has both `name` and `in`.
    pub fn is_parameter(map: &Mapping) -> bool {
        map.contains_key("name") && map.contains_key("in")
    }

    /// Known fields of this kind, in output order.
    pub fn field_order(self) -> &'static [&'static str] {
        match self {
            ObjectKind::Schema => SCHEMA_FIELDS,
            ObjectKind::Parameter => PARAMETER_FIELDS,
            ObjectKind::Response => RESPONSE_FIELDS,
            ObjectKind::PathItem => PATH_ITEM_FIELDS,
            ObjectKind::Operation => OPERATION_FIELDS,
        }
    }

    /// The kind of definitions stored under a component category, when it
    /// has a fixed one.
    pub fn for_component(kind: ComponentKind) -> Option<Self> {
        match kind {
            ComponentKind::Schemas => Some(ObjectKind::Schema),
            ComponentKind::Parameters => Some(ObjectKind::Parameter),
            ComponentKind::Responses => Some(ObjectKind::Response),
            _ => None,
        }
    }
}

/// Order of fields that a kind's table does not list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemainderOrder {
    /// Sorted by key.
    #[default]
    Lexicographic,
    /// As they appear in the source document.
    Source,
}

/// Converts the merged aggregate into an ordered [`Node`] tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct Encoder {
    remainder: RemainderOrder,
}

impl Encoder {
    pub fn new(remainder: RemainderOrder) -> Self {
        Self { remainder }
    }

    /// Encodes the whole document.
    ///
    /// Sections come out as `openapi`, `info`, `servers`, `paths`,
    /// `components`, `security`, `tags`, then other root keys. Absent
    /// sections are omitted.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::UnsupportedKey`] for mapping or sequence keys.
    pub fn encode(&self, spec: &Specification) -> Result<Node, TypeError> {
        let mut out = Vec::new();
        if let Some(version) = &spec.version {
            out.push(("openapi".to_string(), Node::string(version.clone())));
        }
        if let Some(info) = &spec.info {
            let node = match info {
                Value::Mapping(map) => self.source_order(map, "/info")?,
                other => self.value(other, "/info")?,
            };
            out.push(("info".to_string(), node));
        }
        if let Some(servers) = &spec.servers {
            out.push(("servers".to_string(), self.sequence(servers, "/servers")?));
        }
        if !spec.paths.is_empty() {
            out.push(("paths".to_string(), self.paths(&spec.paths)?));
        }
        if !spec.components.is_empty() {
            out.push(("components".to_string(), self.components(spec)?));
        }
        if let Some(security) = &spec.security {
            out.push(("security".to_string(), self.sequence(security, "/security")?));
        }
        if let Some(tags) = &spec.tags {
            out.push(("tags".to_string(), self.sequence(tags, "/tags")?));
        }
        for (key, value) in self.remainder_entries(entries(&spec.extra, "")?) {
            let node = self.field(None, &key, value, "")?;
            out.push((key, node));
        }
        Ok(Node::Mapping(out))
    }

    /// Encodes a free-standing value with the structural heuristic.
    pub fn encode_value(&self, value: &Value) -> Result<Node, TypeError> {
        self.value(value, "")
    }

    fn paths(&self, paths: &Mapping) -> Result<Node, TypeError> {
        let mut out = Vec::new();
        for (path, item) in entries(paths, "/paths")? {
            let node = match item {
                Value::Mapping(map) => self.ordered(ObjectKind::PathItem, map, "/paths")?,
                other => self.value(other, "/paths")?,
            };
            out.push((path, node));
        }
        Ok(Node::Mapping(out))
    }

    fn components(&self, spec: &Specification) -> Result<Node, TypeError> {
        let registry = &spec.components;
        let mut out = Vec::new();
        for kind in ComponentKind::ALL {
            let Some(category) = registry.category(kind) else {
                continue;
            };
            let location = format!("/components/{}", kind.key());
            let mut definitions = Vec::new();
            for (name, definition) in entries(category, &location)? {
                let node = match (definition, ObjectKind::for_component(kind)) {
                    (Value::Mapping(map), Some(hint)) => self.ordered(hint, map, &location)?,
                    (other, _) => self.value(other, &location)?,
                };
                definitions.push((name, node));
            }
            out.push((kind.key().to_string(), Node::Mapping(definitions)));
        }
        for (key, value) in entries(registry.extras(), "/components")? {
            let node = self.value(value, "/components")?;
            out.push((key, node));
        }
        Ok(Node::Mapping(out))
    }

    fn value(&self, value: &Value, location: &str) -> Result<Node, TypeError> {
        Ok(match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(*b),
            Value::Number(n) => Node::Number(n.clone()),
            Value::String(s) => Node::string(s.clone()),
            Value::Sequence(items) => self.sequence(items, location)?,
            Value::Mapping(map) => match ObjectKind::classify(map) {
                Some(kind) => self.ordered(kind, map, location)?,
                None => self.source_order(map, location)?,
            },
            Value::Tagged(tagged) => Node::Tagged {
                tag: tagged.tag.to_string(),
                value: Box::new(self.value(&tagged.value, location)?),
            },
        })
    }

    /// Mapping items of a plain sequence keep their source order.
    fn sequence(&self, items: &[Value], location: &str) -> Result<Node, TypeError> {
        items
            .iter()
            .map(|item| match item {
                Value::Mapping(map) => self.source_order(map, location),
                other => self.value(other, location),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Node::Sequence)
    }

    fn source_order(&self, map: &Mapping, location: &str) -> Result<Node, TypeError> {
        let mut out = Vec::new();
        for (key, value) in entries(map, location)? {
            let node = self.field(None, &key, value, location)?;
            out.push((key, node));
        }
        Ok(Node::Mapping(out))
    }

    fn ordered(&self, kind: ObjectKind, map: &Mapping, location: &str) -> Result<Node, TypeError> {
        let mut pending = entries(map, location)?;
        let mut out = Vec::with_capacity(pending.len());
        for field in kind.field_order() {
            if let Some(index) = pending.iter().position(|(key, _)| key == field) {
                let (key, value) = pending.remove(index);
                let node = self.field(Some(kind), &key, value, location)?;
                out.push((key, node));
            }
        }
        for (key, value) in self.remainder_entries(pending) {
            let node = self.field(Some(kind), &key, value, location)?;
            out.push((key, node));
        }
        Ok(Node::Mapping(out))
    }

    /// Encodes the value stored under `key` inside an object of `parent` kind.
    fn field(
        &self,
        parent: Option<ObjectKind>,
        key: &str,
        value: &Value,
        location: &str,
    ) -> Result<Node, TypeError> {
        match (parent, key, value) {
            (Some(ObjectKind::Schema), "properties", Value::Mapping(map)) => {
                self.preferred(map, PREFERRED_PROPERTIES, None, location)
            }
            (Some(ObjectKind::Operation), "responses", Value::Mapping(map)) => self.preferred(
                map,
                PREFERRED_STATUS_CODES,
                Some(ObjectKind::Response),
                location,
            ),
            (Some(ObjectKind::PathItem), method, Value::Mapping(map))
                if HTTP_METHODS.contains(&method) =>
            {
                self.ordered(ObjectKind::Operation, map, location)
            }
            (_, "required", Value::Sequence(items)) => Ok(Node::Sequence(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(Node::string)
                    .collect(),
            )),
            (_, "parameters", Value::Sequence(items)) => items
                .iter()
                .map(|item| match item {
                    Value::Mapping(map) if ObjectKind::is_parameter(map) => {
                        self.ordered(ObjectKind::Parameter, map, location)
                    }
                    Value::Mapping(map) => self.source_order(map, location),
                    other => self.value(other, location),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Node::Sequence),
            (_, REF_KEY, Value::String(raw)) if !raw.starts_with('#') => Ok(Node::quoted(raw.clone())),
            (_, "path", Value::String(raw)) => Ok(Node::quoted(raw.clone())),
            _ => self.value(value, location),
        }
    }

    /// Entries named in `preferred` first, in that order, then the rest.
    fn preferred(
        &self,
        map: &Mapping,
        preferred: &[&str],
        hint: Option<ObjectKind>,
        location: &str,
    ) -> Result<Node, TypeError> {
        let mut pending = entries(map, location)?;
        let mut ordered = Vec::with_capacity(pending.len());
        for name in preferred {
            if let Some(index) = pending.iter().position(|(key, _)| key == name) {
                ordered.push(pending.remove(index));
            }
        }
        ordered.extend(self.remainder_entries(pending));

        let mut out = Vec::with_capacity(ordered.len());
        for (key, value) in ordered {
            let node = match (value, hint) {
                (Value::Mapping(child), Some(kind)) => self.ordered(kind, child, location)?,
                (other, _) => self.value(other, location)?,
            };
            out.push((key, node));
        }
        Ok(Node::Mapping(out))
    }

    fn remainder_entries<'a>(&self, mut pending: Vec<(String, &'a Value)>) -> Vec<(String, &'a Value)> {
        if self.remainder == RemainderOrder::Lexicographic {
            pending.sort_by(|(a, _), (b, _)| a.cmp(b));
        }
        pending
    }
}
