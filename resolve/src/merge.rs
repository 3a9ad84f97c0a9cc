//! One merge call: load, resolve, harvest, encode, write.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use openapi_merge_core::{
    Encoder, JsonPointer, OpenApiDocument, Specification, to_yaml_string,
};
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::info;

use crate::config::MergeConfig;
use crate::error::{MergeError, Result};
use crate::harvest::{DroppedComponent, Harvester};
use crate::loader::{Document, DocumentLoader, normalize};
use crate::resolver::Resolver;

/// Summary of a successful merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub input: PathBuf,
    /// `None` when the result was not written to a file.
    pub output: Option<PathBuf>,
    /// Files harvested for components, in discovery order.
    pub files: Vec<PathBuf>,
    pub paths: usize,
    /// Definitions per category.
    pub components: BTreeMap<String, usize>,
    pub dropped: Vec<DroppedComponent>,
}

/// Encoded text of a merge together with its report.
#[derive(Debug, Clone)]
pub struct MergeOutput {
    pub text: String,
    pub report: MergeReport,
}

/// Merges `input` and writes the result to `output` with default settings.
///
/// # Examples
///
/// ```no_run
/// let report = openapi_merge_resolve::merge_files("api/openapi.yaml", "dist/openapi.yaml").unwrap();
/// println!("{} paths from {} files", report.paths, report.files.len() + 1);
/// ```
pub fn merge_files(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<MergeReport> {
    merge_files_with(input, output, &MergeConfig::default())
}

/// Merges `input` and writes the result to `output`.
///
/// Nothing is written unless the whole merge succeeds. The text goes to a
/// temporary file next to `output` that is then renamed over it.
pub fn merge_files_with(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &MergeConfig,
) -> Result<MergeReport> {
    let output = output.as_ref();
    let MergeOutput { text, mut report } = merge(input.as_ref(), config)?;
    write_output(output, &text)?;
    report.output = Some(output.to_path_buf());
    info!(
        input = %report.input.display(),
        output = %output.display(),
        files = report.files.len() + 1,
        paths = report.paths,
        "Merged document"
    );
    Ok(report)
}

/// Merges `input` and returns the encoded text without writing it.
pub fn merge_to_string(input: impl AsRef<Path>, config: &MergeConfig) -> Result<String> {
    merge(input.as_ref(), config).map(|merged| merged.text)
}

/// Merges `input` and returns the text and the report.
pub fn merge(input: &Path, config: &MergeConfig) -> Result<MergeOutput> {
    let path = normalize(input)?;
    merge_document(Document::load(&path)?, config)
}

/// Merges YAML text standing for the file at `path`.
///
/// Relative references in `source` resolve against the directory of
/// `path`, which does not have to exist unless they do.
pub fn merge_source(path: impl AsRef<Path>, source: &str, config: &MergeConfig) -> Result<MergeOutput> {
    let path = normalize(path.as_ref())?;
    merge_document(Document::from_source(path, source)?, config)
}

fn write_output(output: &Path, text: &str) -> Result<()> {
    let io_error = |source: io::Error| MergeError::Io {
        path: output.to_path_buf(),
        source,
    };
    let dir = output
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut file = NamedTempFile::new_in(dir).map_err(io_error)?;
    file.write_all(text.as_bytes()).map_err(io_error)?;
    file.persist(output).map_err(|err| io_error(err.error))?;
    Ok(())
}

fn merge_document(root: Document, config: &MergeConfig) -> Result<MergeOutput> {
    config.validate()?;
    let root_file = root.path().to_path_buf();
    let decoded = OpenApiDocument::from_value(root.root().clone())
        .map_err(|source| MergeError::type_error(&root_file, source))?;
    let (mut spec, components) = Specification::from_document(decoded);

    let mut loader = DocumentLoader::new();
    loader.insert(root);
    let mut resolver = Resolver::new(loader, &root_file, config.max_depth);
    resolver.substitute_paths(&mut spec.paths, &root_file)?;
    resolver.rewrite_mapping(&mut spec.extra, &root_file, &mut JsonPointer::root())?;

    let mut harvester = Harvester::new(config.on_conflict);
    if let Some(components) = components {
        harvester.harvest_root(&mut resolver, &mut spec.components, components, &root_file)?;
    }
    harvester.harvest_pending(&mut resolver, &mut spec.components)?;

    let node = Encoder::new(config.remainder_order)
        .encode(&spec)
        .map_err(|source| MergeError::type_error(&root_file, source))?;
    let text = to_yaml_string(&node);

    let (files, dropped) = harvester.into_parts();
    let report = MergeReport {
        input: root_file,
        output: None,
        files,
        paths: spec.paths.len(),
        components: spec.components.counts(),
        dropped,
    };
    Ok(MergeOutput { text, report })
}
