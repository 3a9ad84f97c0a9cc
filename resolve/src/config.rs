//! Merge configuration.
//!
//! Every field has a default, so an empty file is a valid configuration.
//!
//! # Example YAML
//!
//! ```yaml
//! on_conflict: error
//! remainder_order: source
//! max_depth: 32
//! indent: 2
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use openapi_merge_core::{ConflictPolicy, RemainderOrder};
use serde::{Deserialize, Serialize};

use crate::error::{MergeError, Result};

/// Default bound on nested inlining.
pub const DEFAULT_MAX_DEPTH: u32 = 64;

/// The only supported output indentation.
pub const INDENT: usize = 2;

/// Settings for one merge.
///
/// # Examples
///
/// ```
/// use openapi_merge_core::ConflictPolicy;
/// use openapi_merge_resolve::MergeConfig;
///
/// let config: MergeConfig = serde_yaml::from_str("on_conflict: last-wins\n").unwrap();
/// assert_eq!(config.on_conflict, ConflictPolicy::LastWins);
/// assert_eq!(config.max_depth, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// How duplicate component names across files are resolved.
    pub on_conflict: ConflictPolicy,
    /// Order of fields that have no fixed position.
    pub remainder_order: RemainderOrder,
    /// Maximum number of nested inlined references.
    pub max_depth: u32,
    /// Output indentation; must be 2.
    pub indent: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            on_conflict: ConflictPolicy::default(),
            remainder_order: RemainderOrder::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            indent: INDENT,
        }
    }
}

impl MergeConfig {
    /// Loads and validates configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::Io`] if the file cannot be read,
    /// [`MergeError::Parse`] if it is not valid YAML, and
    /// [`MergeError::Config`] if a value is out of range.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| MergeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = BufReader::new(file);
        let config: Self = serde_yaml::from_reader(reader).map_err(|source| MergeError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path).map_err(|source| MergeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self).map_err(|source| MergeError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Checks values that the type system does not constrain.
    pub fn validate(&self) -> Result<()> {
        if self.indent != INDENT {
            return Err(MergeError::Config(format!(
                "indent must be {INDENT}, got {}",
                self.indent
            )));
        }
        if self.max_depth == 0 {
            return Err(MergeError::Config("max_depth must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_deserialize_complete() {
        let yaml = "on_conflict: error\nremainder_order: source\nmax_depth: 8\nindent: 2\n";
        let config: MergeConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.on_conflict, ConflictPolicy::Error);
        assert_eq!(config.remainder_order, RemainderOrder::Source);
        assert_eq!(config.max_depth, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: MergeConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, MergeConfig::default());
        assert_eq!(config.on_conflict, ConflictPolicy::FirstWins);
        assert_eq!(config.remainder_order, RemainderOrder::Lexicographic);
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        assert!(serde_yaml::from_str::<MergeConfig>("on_conflict: newest\n").is_err());
    }

    #[test]
    fn test_validate_rejects_other_indents() {
        let config = MergeConfig {
            indent: 4,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(MergeError::Config(_))));

        let config = MergeConfig {
            max_depth: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("merge.yml");

        let original = MergeConfig {
            on_conflict: ConflictPolicy::LastWins,
            remainder_order: RemainderOrder::Source,
            max_depth: 10,
            indent: 2,
        };
        original.save(&path).unwrap();
        assert_eq!(MergeConfig::load(&path).unwrap(), original);
    }

    #[test]
    fn test_load_validates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("merge.yml");
        std::fs::write(&path, "indent: 4\n").unwrap();
        assert!(matches!(MergeConfig::load(&path), Err(MergeError::Config(_))));
    }
}
