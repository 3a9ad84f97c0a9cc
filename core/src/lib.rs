//! Core types for merging multi-file OpenAPI documents.
//!
//! This crate holds everything that does not touch the filesystem:
//!
//! - [`JsonPointer`] and [`Reference`] - parsing `$ref` values into a file
//!   part and a fragment, and walking a parsed YAML tree along a pointer.
//! - [`OpenApiDocument`] - the top-level sections of one input file.
//! - [`ComponentRegistry`] - named definitions collected from every file,
//!   with duplicates resolved by a [`ConflictPolicy`].
//! - [`Specification`] - the aggregate a merge builds up.
//! - [`Encoder`] and [`to_yaml_string`] - canonical field ordering and the
//!   block-style YAML text of the result.
//!
//! The resolver that loads files and follows external references lives in
//! `openapi-merge-resolve`.
//!
//! # Example
//!
//! ```
//! use openapi_merge_core::*;
//!
//! let root = serde_yaml::from_str(
//!     "openapi: 3.0.3\ninfo: {title: Pets, version: '1'}\npaths:\n  /pets: {get: {responses: {}}}\n",
//! ).unwrap();
//! let (mut spec, _) = Specification::from_document(OpenApiDocument::from_value(root).unwrap());
//!
//! let pet = serde_yaml::from_str("properties: {id: {type: integer}}\ntype: object\n").unwrap();
//! spec.components
//!     .register(ComponentKind::Schemas, "Pet", pet, ConflictPolicy::FirstWins)
//!     .unwrap();
//!
//! let text = to_yaml_string(&Encoder::default().encode(&spec).unwrap());
//! assert!(text.starts_with("openapi: 3.0.3\ninfo:\n  title: Pets\n"));
//! assert!(text.contains("    Pet:\n      type: object\n      properties:\n"));
//! ```

mod document;
mod emit;
mod encode;
mod error;
mod node;
mod pointer;
mod reference;
mod registry;
mod value;

pub use document::{OpenApiDocument, Specification};
pub use emit::to_yaml_string;
pub use encode::{
    Encoder, HTTP_METHODS, ObjectKind, PREFERRED_PROPERTIES, PREFERRED_STATUS_CODES,
    RemainderOrder,
};
pub use error::{ConflictError, ReferenceError, TypeError};
pub use node::{Node, ScalarStyle};
pub use pointer::{JsonPointer, decode_segment, encode_segment};
pub use reference::Reference;
pub use registry::{ComponentKind, ComponentRegistry, ConflictPolicy, Registration};
pub use value::{REF_KEY, entries, external_references, key_text, lookup, reference_of};
