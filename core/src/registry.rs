//! Component categories and the shared registry of named definitions.
//!
//! Every file visited during a merge contributes its reusable definitions
//! to one [`ComponentRegistry`]. What happens when two files define the same
//! name is decided by a [`ConflictPolicy`].
//!
//! # Example
//!
//! ```
//! use openapi_merge_core::*;
//! use serde_yaml::Value;
//!
//! let mut registry = ComponentRegistry::new();
//! let first = registry
//!     .register(ComponentKind::Schemas, "Error", Value::from("a"), ConflictPolicy::FirstWins)
//!     .unwrap();
//! let second = registry
//!     .register(ComponentKind::Schemas, "Error", Value::from("b"), ConflictPolicy::FirstWins)
//!     .unwrap();
//! assert_eq!(first, Registration::Inserted);
//! assert_eq!(second, Registration::Dropped);
//! assert_eq!(registry.get(ComponentKind::Schemas, "Error"), Some(&Value::from("a")));
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::error::ConflictError;

/// Category of a reusable component, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComponentKind {
    Schemas,
    Responses,
    Parameters,
    Examples,
    RequestBodies,
    Headers,
    SecuritySchemes,
    Links,
    Callbacks,
}

impl ComponentKind {
    /// All categories in output order.
    pub const ALL: [ComponentKind; 9] = [
        ComponentKind::Schemas,
        ComponentKind::Responses,
        ComponentKind::Parameters,
        ComponentKind::Examples,
        ComponentKind::RequestBodies,
        ComponentKind::Headers,
        ComponentKind::SecuritySchemes,
        ComponentKind::Links,
        ComponentKind::Callbacks,
    ];

    /// Key of this category inside a `components` section.
    pub fn key(self) -> &'static str {
        match self {
            ComponentKind::Schemas => "schemas",
            ComponentKind::Responses => "responses",
            ComponentKind::Parameters => "parameters",
            ComponentKind::Examples => "examples",
            ComponentKind::RequestBodies => "requestBodies",
            ComponentKind::Headers => "headers",
            ComponentKind::SecuritySchemes => "securitySchemes",
            ComponentKind::Links => "links",
            ComponentKind::Callbacks => "callbacks",
        }
    }

    /// Maps a `components` key back to its category.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }
}

/// Behavior when a name is registered twice in the same category.
///
/// # Examples
///
/// ```
/// use openapi_merge_core::ConflictPolicy;
///
/// assert_eq!(ConflictPolicy::default(), ConflictPolicy::FirstWins);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Keep the definition registered first; drop later ones silently.
    #[default]
    FirstWins,
    /// Replace the registered definition with the later one.
    LastWins,
    /// Fail when a later definition differs from the registered one.
    Error,
}

/// Outcome of a single [`ComponentRegistry::register`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The name was new.
    Inserted,
    /// The name existed and its definition was replaced.
    Replaced,
    /// The name existed with an identical definition.
    Unchanged,
    /// The name existed and the incoming definition was discarded.
    Dropped,
}

/// Named definitions by category, in registration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentRegistry {
    categories: BTreeMap<ComponentKind, Mapping>,
    extra: Mapping,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `definition` under `name`, resolving duplicates by `policy`.
    ///
    /// # Errors
    ///
    /// Returns [`ConflictError`] only under [`ConflictPolicy::Error`] when the
    /// name already holds a different definition.
    pub fn register(
        &mut self,
        kind: ComponentKind,
        name: &str,
        definition: Value,
        policy: ConflictPolicy,
    ) -> Result<Registration, ConflictError> {
        let category = self.categories.entry(kind).or_default();
        let Some(existing) = category.get_mut(name) else {
            category.insert(Value::from(name), definition);
            return Ok(Registration::Inserted);
        };
        if *existing == definition {
            return Ok(Registration::Unchanged);
        }
        match policy {
            ConflictPolicy::FirstWins => Ok(Registration::Dropped),
            ConflictPolicy::LastWins => {
                *existing = definition;
                Ok(Registration::Replaced)
            }
            ConflictPolicy::Error => Err(ConflictError {
                kind,
                name: name.to_string(),
            }),
        }
    }

    /// Carries a non-category `components` entry (e.g. `pathItems`, `x-*`).
    ///
    /// The first value registered for a key is kept.
    pub fn register_extra(&mut self, key: &str, value: Value) -> bool {
        if self.extra.contains_key(key) {
            return false;
        }
        self.extra.insert(Value::from(key), value);
        true
    }

    /// Looks up a registered definition.
    pub fn get(&self, kind: ComponentKind, name: &str) -> Option<&Value> {
        self.categories.get(&kind).and_then(|category| category.get(name))
    }

    /// All definitions of one category, in registration order.
    pub fn category(&self, kind: ComponentKind) -> Option<&Mapping> {
        self.categories.get(&kind).filter(|category| !category.is_empty())
    }

    /// Non-category entries, in registration order.
    pub fn extras(&self) -> &Mapping {
        &self.extra
    }

    /// Number of definitions in one category.
    pub fn len(&self, kind: ComponentKind) -> usize {
        self.categories.get(&kind).map_or(0, Mapping::len)
    }

    /// Returns `true` when nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.extra.is_empty() && self.categories.values().all(Mapping::is_empty)
    }

    /// Definition counts keyed by category name, for reporting.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        ComponentKind::ALL
            .into_iter()
            .filter(|kind| self.len(*kind) > 0)
            .map(|kind| (kind.key().to_string(), self.len(kind)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(title: &str) -> Value {
        serde_yaml::from_str(&format!("type: object\ntitle: {title}\n")).unwrap()
    }

    #[test]
    fn test_kind_keys_round_trip() {
        for kind in ComponentKind::ALL {
            assert_eq!(ComponentKind::from_key(kind.key()), Some(kind));
        }
        assert_eq!(ComponentKind::from_key("pathItems"), None);
    }

    #[test]
    fn test_first_wins_keeps_original() {
        let mut registry = ComponentRegistry::new();
        registry
            .register(ComponentKind::Schemas, "Error", schema("first"), ConflictPolicy::FirstWins)
            .unwrap();
        let outcome = registry
            .register(ComponentKind::Schemas, "Error", schema("second"), ConflictPolicy::FirstWins)
            .unwrap();
        assert_eq!(outcome, Registration::Dropped);
        assert_eq!(registry.get(ComponentKind::Schemas, "Error"), Some(&schema("first")));
        assert_eq!(registry.len(ComponentKind::Schemas), 1);
    }

    #[test]
    fn test_last_wins_replaces_in_place() {
        let mut registry = ComponentRegistry::new();
        for name in ["A", "Error", "B"] {
            registry
                .register(ComponentKind::Schemas, name, schema(name), ConflictPolicy::LastWins)
                .unwrap();
        }
        let outcome = registry
            .register(ComponentKind::Schemas, "Error", schema("later"), ConflictPolicy::LastWins)
            .unwrap();
        assert_eq!(outcome, Registration::Replaced);
        let names: Vec<_> = registry
            .category(ComponentKind::Schemas)
            .unwrap()
            .keys()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(names, ["A", "Error", "B"]);
        assert_eq!(registry.get(ComponentKind::Schemas, "Error"), Some(&schema("later")));
    }

    #[test]
    fn test_error_policy_allows_identical_bodies() {
        let mut registry = ComponentRegistry::new();
        registry
            .register(ComponentKind::Responses, "NotFound", schema("x"), ConflictPolicy::Error)
            .unwrap();
        assert_eq!(
            registry
                .register(ComponentKind::Responses, "NotFound", schema("x"), ConflictPolicy::Error)
                .unwrap(),
            Registration::Unchanged
        );
        let err = registry
            .register(ComponentKind::Responses, "NotFound", schema("y"), ConflictPolicy::Error)
            .unwrap_err();
        assert_eq!(err.name, "NotFound");
        assert_eq!(err.kind, ComponentKind::Responses);
    }

    #[test]
    fn test_categories_are_independent() {
        let mut registry = ComponentRegistry::new();
        registry
            .register(ComponentKind::Schemas, "Pet", schema("s"), ConflictPolicy::FirstWins)
            .unwrap();
        registry
            .register(ComponentKind::Examples, "Pet", schema("e"), ConflictPolicy::FirstWins)
            .unwrap();
        assert_eq!(registry.get(ComponentKind::Schemas, "Pet"), Some(&schema("s")));
        assert_eq!(registry.get(ComponentKind::Examples, "Pet"), Some(&schema("e")));
        assert_eq!(registry.get(ComponentKind::Headers, "Pet"), None);
        assert_eq!(registry.counts().len(), 2);
    }

    #[test]
    fn test_extras_are_first_wins() {
        let mut registry = ComponentRegistry::new();
        assert!(registry.register_extra("pathItems", Value::from("a")));
        assert!(!registry.register_extra("pathItems", Value::from("b")));
        assert_eq!(registry.extras().get("pathItems"), Some(&Value::from("a")));
        assert!(!registry.is_empty());
    }
}
