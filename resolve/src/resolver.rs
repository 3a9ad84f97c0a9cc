//! Following external `$ref` values.
//!
//! Resolution has two steps. Path substitution replaces a path item that
//! is an external reference with the mapping it points to. The rewrite
//! then walks a tree and turns every remaining `file#/pointer` into
//! `#/pointer`, recording `file` so its components can be harvested.
//! References without a fragment are inlined in both steps.
//!
//! Relative file parts are resolved against the file that contains the
//! reference, which is what makes chains across directories work.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use openapi_merge_core::{
    ComponentKind, JsonPointer, REF_KEY, Reference, ReferenceError, TypeError, key_text,
    reference_of,
};
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::error::{MergeError, Result};
use crate::loader::{DocumentLoader, resolve_relative};

/// Files discovered during resolution, in order of first discovery.
#[derive(Debug, Clone, Default)]
pub struct PendingFiles {
    order: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
}

impl PendingFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `path`; returns `false` if it was already known.
    pub fn insert(&mut self, path: PathBuf) -> bool {
        if self.seen.contains(&path) {
            return false;
        }
        self.seen.insert(path.clone());
        self.order.push(path);
        true
    }

    /// Marks `path` as known without scheduling it.
    pub fn exclude(&mut self, path: PathBuf) {
        self.seen.insert(path);
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.seen.contains(path)
    }

    /// The file discovered `index`-th.
    pub fn get(&self, index: usize) -> Option<&Path> {
        self.order.get(index).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.order.iter().map(PathBuf::as_path)
    }
}

/// One inlining step currently in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Frame {
    file: PathBuf,
    pointer: String,
}

impl Frame {
    fn label(&self) -> String {
        format!("{}#{}", self.file.display(), self.pointer)
    }
}

/// Resolves external references for one merge.
#[derive(Debug)]
pub struct Resolver {
    loader: DocumentLoader,
    pending: PendingFiles,
    max_depth: u32,
    stack: Vec<Frame>,
}

impl Resolver {
    /// Creates a resolver for a merge rooted at `root`.
    ///
    /// The root file is never scheduled for harvesting; its components are
    /// registered separately.
    pub fn new(loader: DocumentLoader, root: &Path, max_depth: u32) -> Self {
        let mut pending = PendingFiles::new();
        pending.exclude(root.to_path_buf());
        Self {
            loader,
            pending,
            max_depth,
            stack: Vec::new(),
        }
    }

    pub fn loader(&mut self) -> &mut DocumentLoader {
        &mut self.loader
    }

    pub fn pending(&self) -> &PendingFiles {
        &self.pending
    }

    /// Inlines externally referenced path items and rewrites the rest.
    ///
    /// Non-string path keys are replaced by their text.
    pub fn substitute_paths(&mut self, paths: &mut Mapping, root: &Path) -> Result<()> {
        for (key, mut item) in std::mem::take(paths) {
            let path = key_text(&key).ok_or_else(|| {
                MergeError::type_error(
                    root,
                    TypeError::UnsupportedKey {
                        location: "/paths".into(),
                    },
                )
            })?;
            let mut location = JsonPointer::root();
            location.push("paths");
            location.push(path.clone());

            match self.external_target(&item, root, &location)? {
                Some((file, pointer)) => {
                    item = self.inline(file, pointer)?;
                    debug!(path = %path, "Inlined path item");
                }
                None => self.rewrite(&mut item, root, &mut location)?,
            }
            paths.insert(Value::String(path), item);
        }
        Ok(())
    }

    /// Rewrites every external reference under `value`, found in `file`.
    ///
    /// `location` is the pointer of `value` inside `file`, used in errors.
    pub fn rewrite(
        &mut self,
        value: &mut Value,
        file: &Path,
        location: &mut JsonPointer,
    ) -> Result<()> {
        if let Some((target, pointer)) = self.external_target(value, file, location)? {
            match pointer {
                None => {
                    *value = self.inline(target, None)?;
                    debug!(file = %file.display(), at = %location, "Inlined whole file");
                    return Ok(());
                }
                Some(pointer) => {
                    self.loader.load(&target)?.resolve(&pointer)?;
                    let internal = internal_reference(&pointer);
                    debug!(file = %file.display(), at = %location, reference = %internal, "Rewrote reference");
                    if let Value::Mapping(map) = value {
                        map.insert(Value::from(REF_KEY), Value::String(internal));
                    }
                    self.pending.insert(target);
                }
            }
        }

        match value {
            Value::Mapping(map) => self.rewrite_mapping(map, file, location),
            Value::Sequence(items) => {
                for (index, item) in items.iter_mut().enumerate() {
                    location.push(index.to_string());
                    self.rewrite(item, file, location)?;
                    location.pop();
                }
                Ok(())
            }
            Value::Tagged(tagged) => self.rewrite(&mut tagged.value, file, location),
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => Ok(()),
        }
    }

    /// Rewrites the values of `map`; the mapping itself is not a reference.
    pub fn rewrite_mapping(
        &mut self,
        map: &mut Mapping,
        file: &Path,
        location: &mut JsonPointer,
    ) -> Result<()> {
        for (key, child) in map.iter_mut() {
            let segment = key_text(key).ok_or_else(|| {
                MergeError::type_error(
                    file,
                    TypeError::UnsupportedKey {
                        location: location.to_string(),
                    },
                )
            })?;
            location.push(segment);
            self.rewrite(child, file, location)?;
            location.pop();
        }
        Ok(())
    }

    /// Returns the target of `value` when it is an external `$ref` mapping.
    ///
    /// A fragment of `/` is treated like no fragment at all.
    fn external_target(
        &self,
        value: &Value,
        file: &Path,
        location: &JsonPointer,
    ) -> Result<Option<(PathBuf, Option<JsonPointer>)>> {
        let raw = reference_of(value, &location.to_string())
            .map_err(|source| MergeError::type_error(file, source))?;
        let Some(raw) = raw.filter(|raw| !Reference::is_internal_str(raw)) else {
            return Ok(None);
        };
        match Reference::parse(raw).map_err(|source| MergeError::reference(file, source))? {
            Reference::Internal(_) => Ok(None),
            Reference::External { file: target, pointer } => {
                let target = resolve_relative(file, &target)?;
                Ok(Some((target, pointer.filter(|p| !p.is_root()))))
            }
        }
    }

    /// Returns a copy of the mapping at `pointer` in `file`, with its own
    /// references resolved relative to `file`.
    fn inline(&mut self, file: PathBuf, pointer: Option<JsonPointer>) -> Result<Value> {
        let frame = Frame {
            file,
            pointer: pointer.as_ref().map(ToString::to_string).unwrap_or_default(),
        };
        if self.stack.contains(&frame) {
            let chain = self
                .stack
                .iter()
                .chain(std::iter::once(&frame))
                .map(Frame::label)
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(MergeError::reference(frame.file, ReferenceError::Cycle { chain }));
        }
        if self.stack.len() >= self.max_depth as usize {
            return Err(MergeError::reference(
                frame.file,
                ReferenceError::DepthExceeded {
                    limit: self.max_depth,
                },
            ));
        }

        let document = self.loader.load(&frame.file)?;
        let target = match &pointer {
            Some(pointer) => document.resolve(pointer)?,
            None => document.root(),
        };
        let mut value = match target {
            Value::Tagged(tagged) => tagged.value.clone(),
            other => other.clone(),
        };
        if !value.is_mapping() {
            let pointer = if frame.pointer.is_empty() {
                "/".to_string()
            } else {
                frame.pointer.clone()
            };
            return Err(MergeError::reference(
                frame.file,
                ReferenceError::TargetNotMapping { pointer },
            ));
        }
        self.pending.insert(frame.file.clone());

        let file = frame.file.clone();
        let mut location = pointer.unwrap_or_else(JsonPointer::root);
        self.stack.push(frame);
        let result = match self.external_target(&value, &file, &location) {
            Ok(Some((next, next_pointer))) => self.inline(next, next_pointer).map(|next| {
                value = next;
            }),
            // An internal reference here points into the target file, not the root.
            Ok(None) => match local_target(&value, &file, &location) {
                Ok(Some(next_pointer)) => {
                    self.inline(file.clone(), Some(next_pointer)).map(|next| {
                        value = next;
                    })
                }
                Ok(None) => self.rewrite(&mut value, &file, &mut location),
                Err(err) => Err(err),
            },
            Err(err) => Err(err),
        };
        self.stack.pop();
        result.map(|()| value)
    }
}

/// Returns the pointer of `value` when it is an internal `$ref` mapping.
fn local_target(value: &Value, file: &Path, location: &JsonPointer) -> Result<Option<JsonPointer>> {
    let raw = reference_of(value, &location.to_string())
        .map_err(|source| MergeError::type_error(file, source))?;
    let Some(raw) = raw.filter(|raw| Reference::is_internal_str(raw)) else {
        return Ok(None);
    };
    match Reference::parse(raw).map_err(|source| MergeError::reference(file, source))? {
        Reference::Internal(pointer) if !pointer.is_root() => Ok(Some(pointer)),
        _ => Ok(None),
    }
}

/// The internal form of a pointer into another file.
///
/// Pointers into a file that keeps its categories at the top level
/// (`schemas:` rather than `components: {schemas: ...}`) are moved under
/// `components`, where the harvester registers those definitions.
fn internal_reference(pointer: &JsonPointer) -> String {
    match pointer.segments().first() {
        Some(first) if ComponentKind::from_key(first).is_some() => {
            format!("#/components{pointer}")
        }
        _ => format!("#{pointer}"),
    }
}

/// Moves internal references of a top-level library file under
/// `components`, matching where its definitions are registered.
pub(crate) fn lift_library_references(value: &mut Value) {
    match value {
        Value::Mapping(map) => {
            if let Some(Value::String(raw)) = map.get_mut(REF_KEY)
                && let Ok(Reference::Internal(pointer)) = Reference::parse(raw)
            {
                *raw = internal_reference(&pointer);
            }
            for (_, child) in map.iter_mut() {
                lift_library_references(child);
            }
        }
        Value::Sequence(items) => items.iter_mut().for_each(lift_library_references),
        Value::Tagged(tagged) => lift_library_references(&mut tagged.value),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::normalize;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new(files: &[(&str, &str)]) -> Self {
            let dir = TempDir::new().unwrap();
            for (name, contents) in files {
                let path = dir.path().join(name);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(path, contents).unwrap();
            }
            Self { dir }
        }

        fn path(&self, name: &str) -> PathBuf {
            normalize(&self.dir.path().join(name)).unwrap()
        }

        fn resolver(&self) -> Resolver {
            Resolver::new(DocumentLoader::new(), &self.path("openapi.yaml"), 64)
        }
    }

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_pending_files_keep_discovery_order() {
        let mut pending = PendingFiles::new();
        assert!(pending.insert(PathBuf::from("/b.yaml")));
        assert!(pending.insert(PathBuf::from("/a.yaml")));
        assert!(!pending.insert(PathBuf::from("/b.yaml")));
        pending.exclude(PathBuf::from("/root.yaml"));
        assert!(!pending.insert(PathBuf::from("/root.yaml")));
        let order: Vec<_> = pending.iter().collect();
        assert_eq!(order, [Path::new("/b.yaml"), Path::new("/a.yaml")]);
    }

    #[test]
    fn test_internal_reference_forms() {
        let nested = JsonPointer::parse("/components/schemas/Pet").unwrap();
        assert_eq!(internal_reference(&nested), "#/components/schemas/Pet");
        let library = JsonPointer::parse("/schemas/Pet").unwrap();
        assert_eq!(internal_reference(&library), "#/components/schemas/Pet");
        let other = JsonPointer::parse("/definitions/Pet").unwrap();
        assert_eq!(internal_reference(&other), "#/definitions/Pet");
    }

    #[test]
    fn test_library_references_move_under_components() {
        let mut value = yaml(
            "properties:\n  owner: {$ref: '#/schemas/Owner'}\n  list:\n    - {$ref: '#/components/schemas/A'}\n    - {$ref: '#/definitions/B'}\n",
        );
        lift_library_references(&mut value);
        assert_eq!(
            value["properties"]["owner"]["$ref"],
            Value::from("#/components/schemas/Owner")
        );
        let list = &value["properties"]["list"];
        assert_eq!(list[0]["$ref"], Value::from("#/components/schemas/A"));
        assert_eq!(list[1]["$ref"], Value::from("#/definitions/B"));
    }

    #[test]
    fn test_substitute_inlines_path_item() {
        let fixture = Fixture::new(&[(
            "paths/pets.yaml",
            "components:\n  pathItems:\n    Pets:\n      get:\n        responses:\n          '200':\n            $ref: '../common.yaml#/components/responses/Ok'\n",
        ), ("common.yaml", "components:\n  responses:\n    Ok: {description: ok}\n")]);
        let root = fixture.path("openapi.yaml");
        let mut paths = yaml("/pets:\n  $ref: paths/pets.yaml#/components/pathItems/Pets\n")
            .as_mapping()
            .cloned()
            .unwrap();

        let mut resolver = fixture.resolver();
        resolver.substitute_paths(&mut paths, &root).unwrap();

        let expected = yaml("get:\n  responses:\n    '200':\n      $ref: '#/components/responses/Ok'\n");
        assert_eq!(paths.get("/pets"), Some(&expected));
        let pending: Vec<_> = resolver.pending().iter().map(Path::to_path_buf).collect();
        assert_eq!(pending, [fixture.path("paths/pets.yaml"), fixture.path("common.yaml")]);
    }

    #[test]
    fn test_substitute_follows_chains() {
        let fixture = Fixture::new(&[
            ("a.yaml", "A:\n  $ref: 'nested/b.yaml#/B'\n"),
            ("nested/b.yaml", "B:\n  get: {summary: from b}\n"),
        ]);
        let root = fixture.path("openapi.yaml");
        let mut paths = yaml("/x: {$ref: 'a.yaml#/A'}\n").as_mapping().cloned().unwrap();
        fixture.resolver().substitute_paths(&mut paths, &root).unwrap();
        assert_eq!(paths.get("/x"), Some(&yaml("get: {summary: from b}\n")));
    }

    #[test]
    fn test_substitute_follows_internal_hops_in_target_file() {
        let fixture = Fixture::new(&[(
            "a.yaml",
            "components:\n  pathItems:\n    A: {$ref: '#/components/pathItems/B'}\n    B:\n      get: {summary: b}\n",
        )]);
        let root = fixture.path("openapi.yaml");
        let mut paths: Mapping =
            serde_yaml::from_str("/a: {$ref: 'a.yaml#/components/pathItems/A'}\n").unwrap();
        fixture.resolver().substitute_paths(&mut paths, &root).unwrap();
        assert_eq!(paths.get("/a"), Some(&yaml("get: {summary: b}\n")));
    }

    #[test]
    fn test_whole_file_references_are_inlined() {
        let fixture = Fixture::new(&[
            ("users.yaml", "get:\n  responses:\n    default: {$ref: 'errors.yaml'}\n"),
            ("errors.yaml", "description: failure\n"),
        ]);
        let root = fixture.path("openapi.yaml");
        let mut paths = yaml("/users: {$ref: users.yaml}\n").as_mapping().cloned().unwrap();
        fixture.resolver().substitute_paths(&mut paths, &root).unwrap();
        assert_eq!(
            paths.get("/users"),
            Some(&yaml("get:\n  responses:\n    default: {description: failure}\n"))
        );
    }

    #[test]
    fn test_numeric_path_keys_become_text() {
        let fixture = Fixture::new(&[]);
        let root = fixture.path("openapi.yaml");
        let mut paths = yaml("404: {get: {summary: odd}}\n").as_mapping().cloned().unwrap();
        fixture.resolver().substitute_paths(&mut paths, &root).unwrap();
        assert!(paths.keys().all(Value::is_string));
        assert!(paths.contains_key("404"));
    }

    #[test]
    fn test_missing_segment_names_file() {
        let fixture = Fixture::new(&[("a.yaml", "components:\n  pathItems:\n    A: {get: {}}\n")]);
        let root = fixture.path("openapi.yaml");
        let mut paths = yaml("/a: {$ref: 'a.yaml#/components/pathItems/Missing'}\n")
            .as_mapping()
            .cloned()
            .unwrap();
        let err = fixture
            .resolver()
            .substitute_paths(&mut paths, &root)
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Missing"), "{message}");
        assert!(message.contains("a.yaml"), "{message}");
        assert!(matches!(
            err,
            MergeError::Reference {
                source: ReferenceError::MissingSegment { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_non_mapping_target() {
        let fixture = Fixture::new(&[("a.yaml", "A: just text\n")]);
        let root = fixture.path("openapi.yaml");
        let mut paths = yaml("/a: {$ref: 'a.yaml#/A'}\n").as_mapping().cloned().unwrap();
        let err = fixture
            .resolver()
            .substitute_paths(&mut paths, &root)
            .unwrap_err();
        assert!(matches!(
            err,
            MergeError::Reference {
                source: ReferenceError::TargetNotMapping { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_cycles_are_reported() {
        let fixture = Fixture::new(&[
            ("a.yaml", "A: {$ref: 'b.yaml#/B'}\n"),
            ("b.yaml", "B: {$ref: 'a.yaml#/A'}\n"),
        ]);
        let root = fixture.path("openapi.yaml");
        let mut paths = yaml("/loop: {$ref: 'a.yaml#/A'}\n").as_mapping().cloned().unwrap();
        let err = fixture
            .resolver()
            .substitute_paths(&mut paths, &root)
            .unwrap_err();
        let MergeError::Reference {
            source: ReferenceError::Cycle { chain },
            ..
        } = err
        else {
            panic!("expected a cycle, got {err:?}");
        };
        assert!(chain.contains("a.yaml#/A -> "));
        assert!(chain.ends_with("a.yaml#/A"));
    }

    #[test]
    fn test_depth_limit() {
        let fixture = Fixture::new(&[
            ("a.yaml", "A: {$ref: 'b.yaml#/B'}\n"),
            ("b.yaml", "B: {$ref: 'c.yaml#/C'}\n"),
            ("c.yaml", "C: {get: {}}\n"),
        ]);
        let root = fixture.path("openapi.yaml");
        let mut paths = yaml("/deep: {$ref: 'a.yaml#/A'}\n").as_mapping().cloned().unwrap();
        let mut resolver = Resolver::new(DocumentLoader::new(), &root, 2);
        let err = resolver.substitute_paths(&mut paths, &root).unwrap_err();
        assert!(matches!(
            err,
            MergeError::Reference {
                source: ReferenceError::DepthExceeded { limit: 2 },
                ..
            }
        ));
    }

    #[test]
    fn test_rewrite_keeps_internal_references() {
        let fixture = Fixture::new(&[("s.yaml", "schemas:\n  Pet: {type: object}\n")]);
        let root = fixture.path("openapi.yaml");
        let mut value = yaml(
            "a: {$ref: '#/components/schemas/Local'}\nb:\n  - $ref: s.yaml#/schemas/Pet\n",
        );
        let mut resolver = fixture.resolver();
        resolver
            .rewrite(&mut value, &root, &mut JsonPointer::root())
            .unwrap();
        assert_eq!(
            value,
            yaml("a: {$ref: '#/components/schemas/Local'}\nb:\n  - $ref: '#/components/schemas/Pet'\n")
        );
        assert!(resolver.pending().contains(&fixture.path("s.yaml")));
    }

    #[test]
    fn test_non_string_reference_is_type_error() {
        let fixture = Fixture::new(&[]);
        let root = fixture.path("openapi.yaml");
        let mut value = yaml("schema: {$ref: 7}\n");
        let err = fixture
            .resolver()
            .rewrite(&mut value, &root, &mut JsonPointer::root())
            .unwrap_err();
        assert!(matches!(
            err,
            MergeError::Type {
                source: TypeError::NonStringReference { ref location },
                ..
            } if location == "/schema"
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let fixture = Fixture::new(&[]);
        let root = fixture.path("openapi.yaml");
        let mut value = yaml("schema: {$ref: 'absent.yaml#/A'}\n");
        let err = fixture
            .resolver()
            .rewrite(&mut value, &root, &mut JsonPointer::root())
            .unwrap_err();
        assert!(matches!(err, MergeError::Io { .. }));
    }
}
