//! Output abstraction for product artifacts.
//!
//! The driver emits artifacts through a trait so tests can collect them in
//! memory while the CLI writes real files.

use indexmap::IndexMap;

use crate::error::{EvalResult, SimplexError};

/// Sink for product artifacts.
pub trait ArtifactWriter {
    /// Writes one artifact. `file_name` already includes the caller-supplied
    /// prefix, e.g. `out-box.stl`.
    fn write_artifact(&mut self, file_name: &str, contents: &str) -> EvalResult<()>;
}

/// Writes artifacts to the filesystem, relative to the current directory
/// (or wherever the prefix points).
#[derive(Debug, Default)]
pub struct FsWriter;

impl ArtifactWriter for FsWriter {
    fn write_artifact(&mut self, file_name: &str, contents: &str) -> EvalResult<()> {
        std::fs::write(file_name, contents)
            .map_err(|e| SimplexError::evaluation(format!("cannot write `{file_name}`: {e}")))
    }
}

/// Collects artifacts into a map, for tests and programmatic use.
#[derive(Debug, Default)]
pub struct CollectWriter {
    files: IndexMap<String, String>,
}

impl CollectWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The collected artifacts, in write order.
    #[must_use]
    pub fn files(&self) -> &IndexMap<String, String> {
        &self.files
    }

    #[must_use]
    pub fn into_files(self) -> IndexMap<String, String> {
        self.files
    }
}

impl ArtifactWriter for CollectWriter {
    fn write_artifact(&mut self, file_name: &str, contents: &str) -> EvalResult<()> {
        self.files.insert(file_name.to_owned(), contents.to_owned());
        Ok(())
    }
}

/// Discards every artifact. Backs `--dry-run`, which evaluates products
/// but writes nothing.
#[derive(Debug, Default)]
pub struct DiscardWriter;

impl ArtifactWriter for DiscardWriter {
    fn write_artifact(&mut self, _file_name: &str, _contents: &str) -> EvalResult<()> {
        Ok(())
    }
}
