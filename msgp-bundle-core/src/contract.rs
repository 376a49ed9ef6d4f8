//! # contract: data model passed between pipeline stages, and the generator seam
//!
//! Data flows strictly Scanner → Splitter → Merger → Invoker:
//! - [`SourceFile`]: a candidate file and its raw text, produced by [`crate::scan`]
//! - [`FileRecord`]: one file split into package name, imports and body, produced by [`crate::split`]
//! - [`MergedUnit`]: the single synthetic unit, produced by [`crate::merge`]
//! - [`Invocation`]: the generator command line, built by [`crate::generate`]
//!
//! The [`Generator`] trait is the only seam with side effects outside the
//! working directory. It is implemented by [`crate::generate::ProcessGenerator`]
//! and, in tests, by the `mockall` generated `MockGenerator`.

use async_trait::async_trait;
use mockall::automock;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::diagnostics::DiagnosticCollector;
use crate::error::PipelineError;

/// A scan candidate: a source file that carries the generation marker.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
}

/// One source file split into its declaration parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: PathBuf,
    /// Declared package, or `None` when no `package` line was found.
    pub unit_name: Option<String>,
    /// Import entries exactly as written (`"fmt"`, `msgp "github.com/tinylib/msgp/msgp"`).
    pub dependencies: BTreeSet<String>,
    /// The file without its package line and imports; blank lines kept.
    pub body: String,
    /// An `import (` block never closed; everything after it was dropped.
    pub unterminated_import: bool,
}

/// One file's contribution to the merged unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub source: PathBuf,
    pub body: String,
}

impl Section {
    /// Name used in the provenance comment preceding the section.
    pub fn source_name(&self) -> String {
        display_name(&self.source)
    }
}

/// Why a scanned file did not contribute to the merged unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exclusion {
    /// No package declaration could be found.
    NoPackage { path: PathBuf },
    /// The package carries the test suffix.
    TestPackage { path: PathBuf, unit_name: String },
}

impl Exclusion {
    pub fn path(&self) -> &Path {
        match self {
            Exclusion::NoPackage { path } | Exclusion::TestPackage { path, .. } => path,
        }
    }
}

/// The synthetic aggregate handed to the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedUnit {
    pub unit_name: String,
    /// Union of all imports, sorted and deduplicated.
    pub dependencies: Vec<String>,
    /// In scan order.
    pub sections: Vec<Section>,
    pub excluded: Vec<Exclusion>,
}

/// A fully resolved generator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl Invocation {
    /// Human-readable command line, as printed before running it.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Progress notifications emitted by [`crate::pipeline::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    Detected { files: Vec<PathBuf> },
    Merging { artifact: PathBuf },
    Invoking { command: String },
}

/// Runs the external generator for one invocation.
///
/// Implementations must push every output line (stdout and stderr, in the
/// order they are read) into `sink` as it arrives and return the exit code
/// once the process has finished.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Generator: Send + Sync {
    async fn execute(
        &self,
        invocation: &Invocation,
        sink: &mut DiagnosticCollector,
    ) -> Result<i32, PipelineError>;
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
