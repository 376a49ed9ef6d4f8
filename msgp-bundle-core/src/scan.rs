//! Directive scanner: finds the source files that ask for code generation.

use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::contract::SourceFile;
use crate::error::{PipelineError, PipelineResult};

/// Lists `dir` (non-recursive) and returns every source file that is not
/// excluded and contains the generation marker, in directory-listing order.
///
/// Unreadable files are skipped with a warning. An empty result is not an
/// error.
pub fn scan(dir: &Path, config: &PipelineConfig) -> PipelineResult<Vec<SourceFile>> {
    let marker = config.marker_regex()?;
    info!(dir = %dir.display(), "Scanning for generation directives");

    let entries = fs::read_dir(dir).map_err(|source| PipelineError::Scan {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut candidates = Vec::new();
    for entry_res in entries {
        let entry = entry_res.map_err(|source| PipelineError::Scan {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();

        if !file_name.ends_with(config.source_suffix.as_str()) || !path.is_file() {
            continue;
        }
        if config.is_excluded(&file_name) {
            debug!(path = %path.display(), "Skipping excluded file");
            continue;
        }

        match fs::read_to_string(&path) {
            Ok(text) => {
                if marker.is_match(&text) {
                    debug!(path = %path.display(), "Found generation directive");
                    candidates.push(SourceFile { path, text });
                }
            }
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Could not read file, skipping");
            }
        }
    }

    info!(count = candidates.len(), "Scan complete");
    Ok(candidates)
}
