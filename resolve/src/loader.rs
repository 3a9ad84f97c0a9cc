//! Reading and caching input documents.
//!
//! Each file is parsed once per merge. Paths are made absolute and
//! normalized lexically before they are used as cache keys, so
//! `specs/./a.yaml` and `specs/shared/../a.yaml` share one entry.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use openapi_merge_core::JsonPointer;
use serde_yaml::Value;
use tracing::debug;

use crate::error::{MergeError, Result};

/// One parsed input file.
#[derive(Debug, Clone)]
pub struct Document {
    path: PathBuf,
    root: Value,
}

impl Document {
    /// Reads and parses `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|source| MergeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_source(path.to_path_buf(), &source)
    }

    /// Parses YAML text that stands for the contents of `path`.
    pub fn from_source(path: PathBuf, source: &str) -> Result<Self> {
        let root = serde_yaml::from_str(source).map_err(|source| MergeError::Parse {
            path: path.clone(),
            source,
        })?;
        Ok(Self { path, root })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Follows `pointer` from the document root.
    pub fn resolve(&self, pointer: &JsonPointer) -> Result<&Value> {
        pointer
            .resolve(&self.root)
            .map_err(|source| MergeError::reference(&self.path, source))
    }
}

/// Per-merge cache of parsed documents keyed by normalized path.
#[derive(Debug, Default)]
pub struct DocumentLoader {
    cache: HashMap<PathBuf, Document>,
}

impl DocumentLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the document at `path`, reading it on first use.
    ///
    /// `path` must already be normalized with [`normalize`].
    pub fn load(&mut self, path: &Path) -> Result<&Document> {
        if !self.cache.contains_key(path) {
            let document = Document::load(path)?;
            debug!(file = %path.display(), "Loaded document");
            self.cache.insert(path.to_path_buf(), document);
        }
        Ok(&self.cache[path])
    }

    /// Adds a document that was parsed elsewhere.
    pub fn insert(&mut self, document: Document) {
        self.cache.insert(document.path.clone(), document);
    }

    /// Number of distinct files read so far.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// Makes `path` absolute and removes `.` and `..` segments without
/// touching the filesystem.
pub fn normalize(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path).map_err(|source| MergeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

/// Resolves the file part of a reference found in `from`.
///
/// Relative files are taken from the directory of `from`; absolute files
/// are used as-is.
pub fn resolve_relative(from: &Path, file: &str) -> Result<PathBuf> {
    let target = Path::new(file);
    if target.is_absolute() {
        return normalize(target);
    }
    let base = from.parent().unwrap_or_else(|| Path::new(""));
    normalize(&base.join(target))
}
