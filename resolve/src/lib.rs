//! Merge an OpenAPI description split across many files into one document.
//!
//! A root file may point into other files with `$ref: other.yaml#/pointer`.
//! [`merge_files`] follows every such reference, relative to the file that
//! contains it:
//!
//! - path items that are external references are replaced by their target,
//! - every other external reference is rewritten to its `#/pointer` part,
//! - the named components of every file reached this way are collected into
//!   the output's `components` section.
//!
//! The output carries no external references and is written with a fixed
//! field order, so merging it again produces the same bytes.
//!
//! # Quick start
//!
//! ```no_run
//! use openapi_merge_core::ConflictPolicy;
//! use openapi_merge_resolve::{MergeConfig, merge_files, merge_files_with};
//!
//! // Default settings: the first definition of a component name wins.
//! let report = merge_files("api/openapi.yaml", "dist/openapi.yaml").unwrap();
//! println!("merged {} paths", report.paths);
//!
//! // Fail instead when two files disagree on a component.
//! let config = MergeConfig {
//!     on_conflict: ConflictPolicy::Error,
//!     ..Default::default()
//! };
//! merge_files_with("api/openapi.yaml", "dist/openapi.yaml", &config).unwrap();
//! ```

mod config;
mod error;
mod harvest;
mod loader;
mod merge;
mod resolver;

pub use config::{DEFAULT_MAX_DEPTH, INDENT, MergeConfig};
pub use error::{MergeError, Result};
pub use harvest::{DroppedComponent, Harvester};
pub use loader::{Document, DocumentLoader, normalize, resolve_relative};
pub use merge::{
    MergeOutput, MergeReport, merge, merge_files, merge_files_with, merge_source, merge_to_string,
};
pub use resolver::{PendingFiles, Resolver};
