//! Collecting named components from every discovered file.

use std::path::{Path, PathBuf};

use openapi_merge_core::{
    ComponentKind, ComponentRegistry, ConflictPolicy, JsonPointer, Registration, TypeError,
    key_text,
};
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::error::{MergeError, Result};
use crate::resolver::{Resolver, lift_library_references};

/// A definition discarded because its name was already registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedComponent {
    pub kind: ComponentKind,
    pub name: String,
    pub file: PathBuf,
}

/// Registers component definitions into a [`ComponentRegistry`].
#[derive(Debug)]
pub struct Harvester {
    policy: ConflictPolicy,
    harvested: Vec<PathBuf>,
    dropped: Vec<DroppedComponent>,
}

impl Harvester {
    pub fn new(policy: ConflictPolicy) -> Self {
        Self {
            policy,
            harvested: Vec::new(),
            dropped: Vec::new(),
        }
    }

    /// Registers the root document's own `components`.
    ///
    /// Keys other than the nine categories are kept as extras.
    pub fn harvest_root(
        &mut self,
        resolver: &mut Resolver,
        registry: &mut ComponentRegistry,
        components: Mapping,
        root: &Path,
    ) -> Result<()> {
        let mut location = JsonPointer::root();
        location.push("components");
        self.harvest_section(resolver, registry, components, root, location, true)
    }

    /// Harvests every pending file, including files discovered while
    /// harvesting, in discovery order.
    pub fn harvest_pending(
        &mut self,
        resolver: &mut Resolver,
        registry: &mut ComponentRegistry,
    ) -> Result<()> {
        let mut next = 0;
        while let Some(file) = resolver.pending().get(next).map(Path::to_path_buf) {
            next += 1;
            let root = resolver.loader().load(&file)?.root().clone();
            if let Some((section, location)) = component_section(root, &file)? {
                self.harvest_section(resolver, registry, section, &file, location, false)?;
            }
            self.harvested.push(file);
        }
        Ok(())
    }

    /// Harvested files and dropped definitions, both in order.
    pub fn into_parts(self) -> (Vec<PathBuf>, Vec<DroppedComponent>) {
        (self.harvested, self.dropped)
    }

    fn harvest_section(
        &mut self,
        resolver: &mut Resolver,
        registry: &mut ComponentRegistry,
        section: Mapping,
        file: &Path,
        mut location: JsonPointer,
        include_extras: bool,
    ) -> Result<()> {
        for (key, value) in section {
            let Some(category) = key_text(&key) else {
                return Err(MergeError::type_error(
                    file,
                    TypeError::UnsupportedKey {
                        location: location.to_string(),
                    },
                ));
            };
            location.push(category.clone());

            match ComponentKind::from_key(&category) {
                Some(kind) => {
                    let Value::Mapping(definitions) = value else {
                        return Err(MergeError::type_error(
                            file,
                            TypeError::CategoryNotMapping { category },
                        ));
                    };
                    self.register_all(resolver, registry, kind, definitions, file, &mut location)?;
                }
                None if include_extras => {
                    let mut value = value;
                    resolver.rewrite(&mut value, file, &mut location)?;
                    registry.register_extra(&category, value);
                }
                None => {}
            }
            location.pop();
        }
        Ok(())
    }

    fn register_all(
        &mut self,
        resolver: &mut Resolver,
        registry: &mut ComponentRegistry,
        kind: ComponentKind,
        definitions: Mapping,
        file: &Path,
        location: &mut JsonPointer,
    ) -> Result<()> {
        // A category directly under the file root belongs to a library file.
        let library = location.segments().len() == 1;
        for (key, mut definition) in definitions {
            let name = key_text(&key).ok_or_else(|| {
                MergeError::type_error(
                    file,
                    TypeError::UnsupportedKey {
                        location: location.to_string(),
                    },
                )
            })?;
            location.push(name.clone());
            resolver.rewrite(&mut definition, file, location)?;
            if library {
                lift_library_references(&mut definition);
            }
            location.pop();

            let outcome = registry
                .register(kind, &name, definition, self.policy)
                .map_err(|source| MergeError::Conflict {
                    file: file.to_path_buf(),
                    source,
                })?;
            match outcome {
                Registration::Dropped => {
                    debug!(category = kind.key(), name = %name, file = %file.display(), "Dropped duplicate component");
                    self.dropped.push(DroppedComponent {
                        kind,
                        name,
                        file: file.to_path_buf(),
                    });
                }
                Registration::Replaced => {
                    debug!(category = kind.key(), name = %name, file = %file.display(), "Replaced component");
                }
                Registration::Inserted | Registration::Unchanged => {}
            }
        }
        Ok(())
    }
}

/// Locates the definitions of a non-root file.
///
/// A `components` mapping wins. Without one, category keys at the top level
/// whose values are mappings form the section.
fn component_section(root: Value, file: &Path) -> Result<Option<(Mapping, JsonPointer)>> {
    let root = match root {
        Value::Tagged(tagged) => tagged.value,
        other => other,
    };
    let Value::Mapping(mut root) = root else {
        return Ok(None);
    };

    match root.shift_remove("components") {
        Some(Value::Mapping(components)) => {
            let mut location = JsonPointer::root();
            location.push("components");
            Ok(Some((components, location)))
        }
        Some(Value::Null) | None => {
            let library: Mapping = root
                .into_iter()
                .filter(|(key, value)| {
                    value.is_mapping()
                        && key.as_str().and_then(ComponentKind::from_key).is_some()
                })
                .collect();
            Ok((!library.is_empty()).then(|| (library, JsonPointer::root())))
        }
        Some(_) => Err(MergeError::type_error(
            file,
            TypeError::Section {
                section: "components",
                expected: "mapping",
            },
        )),
    }
}
