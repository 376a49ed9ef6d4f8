//! Error type shared by every pipeline stage.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Fatal pipeline conditions. Recoverable skips (unreadable or headerless
/// files) never surface here; they are logged and the file is dropped.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The working directory could not be listed.
    #[error("failed to scan directory {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An import block never closed and strict import handling is enabled.
    #[error("unterminated import block in {path} starting at line {line}")]
    UnterminatedImport { path: PathBuf, line: usize },

    /// Two non-test files declare different packages.
    #[error(
        "file {conflicting} has package `{found}`, expected `{expected}` (established by {anchor})"
    )]
    NameConflict {
        anchor: PathBuf,
        expected: String,
        conflicting: PathBuf,
        found: String,
    },

    /// Every candidate file was excluded before a package could be chosen.
    #[error("could not determine package name")]
    NoIdentity,

    /// The merged unit could not be written next to the sources.
    #[error("error writing combined file {path}: {source}")]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The generator binary could not be started.
    #[error("failed to launch generator `{program}`: {source}")]
    GeneratorLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading the generator output or waiting on the process failed.
    #[error("error executing generator: {0}")]
    GeneratorIo(#[source] std::io::Error),

    /// The spooled output transcript could not be written or replayed.
    #[error("output transcript error: {0}")]
    Transcript(#[source] std::io::Error),

    /// A configured marker or diagnostic pattern is not a valid regex.
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl PipelineError {
    /// Process exit code for a pipeline-level failure.
    pub fn exit_code(&self) -> i32 {
        1
    }
}
