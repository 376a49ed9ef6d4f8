//! High-level pipeline: orchestrates scan → split → merge → generate for one
//! working directory.
//!
//! # Major Types
//! - [`GenerationRequest`]: directory, config and artifact policy for a run
//! - [`PipelineOutcome`]: what happened, and which exit code it maps to
//!
//! # Error Handling
//! Recoverable conditions (unreadable or headerless files, test packages) are
//! logged and never fail the run. Everything else returns a
//! [`PipelineError`](crate::error::PipelineError) immediately; no artifact is
//! left behind.

use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use crate::contract::{Generator, MergedUnit, PipelineEvent};
use crate::diagnostics::Transcript;
use crate::error::PipelineResult;
pub use crate::generate::GenerationRequest;
use crate::generate::{invoke, GenerationOutcome};
use crate::merge::merge;
use crate::scan::scan;
use crate::split::split;

/// Summary of a successful generation.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub unit_name: String,
    pub output: PathBuf,
    /// Files merged into the unit, in merge order.
    pub sources: Vec<PathBuf>,
    /// Files that were scanned but left out of the merge.
    pub excluded: Vec<PathBuf>,
    /// Actionable generator output. Does not affect the exit code.
    pub warnings: Vec<String>,
}

#[derive(Debug)]
pub enum PipelineOutcome {
    /// No file carries the generation marker.
    NothingToDo,
    Generated(GenerationReport),
    /// The generator exited non-zero; its code is propagated as is.
    GeneratorFailed { exit_code: i32, transcript: Transcript },
}

impl PipelineOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineOutcome::NothingToDo | PipelineOutcome::Generated(_) => 0,
            PipelineOutcome::GeneratorFailed { exit_code, .. } => *exit_code,
        }
    }
}

/// Scans, splits and merges. Returns `None` when there is nothing to do.
pub fn prepare(
    request: &GenerationRequest,
    on_event: &mut dyn FnMut(PipelineEvent),
) -> PipelineResult<Option<MergedUnit>> {
    let config = &request.config;
    let files = scan(&request.dir, config)?;
    if files.is_empty() {
        info!(dir = %request.dir.display(), "No files with generation directives");
        return Ok(None);
    }
    on_event(PipelineEvent::Detected {
        files: files.iter().map(|f| f.path.clone()).collect(),
    });

    let records = files
        .iter()
        .map(|file| split(file, config.strict_imports))
        .collect::<PipelineResult<Vec<_>>>()?;
    merge(records, &config.test_suffix).map(Some)
}

/// Runs the whole pipeline against `generator`.
pub async fn run<G>(
    request: &GenerationRequest,
    generator: &G,
    on_event: &mut dyn FnMut(PipelineEvent),
) -> PipelineResult<PipelineOutcome>
where
    G: Generator + ?Sized,
{
    info!(dir = %request.dir.display(), "Starting generation pipeline");
    let Some(unit) = prepare(request, on_event)? else {
        return Ok(PipelineOutcome::NothingToDo);
    };

    let outcome = match invoke(&unit, request, generator, on_event).await? {
        GenerationOutcome::Generated { output, warnings } => {
            PipelineOutcome::Generated(GenerationReport {
                unit_name: unit.unit_name,
                output,
                sources: unit.sections.into_iter().map(|s| s.source).collect(),
                excluded: unit.excluded.iter().map(|e| e.path().to_path_buf()).collect(),
                warnings,
            })
        }
        GenerationOutcome::Failed {
            exit_code,
            transcript,
        } => PipelineOutcome::GeneratorFailed {
            exit_code,
            transcript,
        },
    };
    Ok(outcome)
}
