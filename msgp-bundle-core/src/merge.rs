//! Unit merger: combines split files into one [`MergedUnit`] and renders it
//! as Go source.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use crate::contract::{Exclusion, FileRecord, MergedUnit, Section};
use crate::error::{PipelineError, PipelineResult};

/// Merges records in the given (scan) order.
///
/// Records without a package are skipped with a warning. The first named
/// record sets the package. A later record with a different package is
/// skipped silently when its package ends in `test_suffix`; any other
/// mismatch aborts the merge.
pub fn merge(records: Vec<FileRecord>, test_suffix: &str) -> PipelineResult<MergedUnit> {
    let mut anchor: Option<(String, PathBuf)> = None;
    let mut dependencies = BTreeSet::new();
    let mut sections = Vec::new();
    let mut excluded = Vec::new();

    for record in records {
        let Some(name) = record.unit_name else {
            warn!(path = %record.path.display(), "Could not detect package, skipping");
            excluded.push(Exclusion::NoPackage { path: record.path });
            continue;
        };

        let Some((expected, anchor_path)) = &anchor else {
            anchor = Some((name, record.path.clone()));
            dependencies.extend(record.dependencies);
            sections.push(Section {
                source: record.path,
                body: record.body,
            });
            continue;
        };

        if *expected != name {
            if !test_suffix.is_empty() && name.ends_with(test_suffix) {
                debug!(path = %record.path.display(), package = %name, "Leaving test package out of merge");
                excluded.push(Exclusion::TestPackage {
                    path: record.path,
                    unit_name: name,
                });
                continue;
            }
            error!(
                path = %record.path.display(),
                package = %name,
                expected = %expected,
                "Package name conflict"
            );
            return Err(PipelineError::NameConflict {
                anchor: anchor_path.clone(),
                expected: expected.clone(),
                conflicting: record.path,
                found: name,
            });
        }

        dependencies.extend(record.dependencies);
        sections.push(Section {
            source: record.path,
            body: record.body,
        });
    }

    let Some((unit_name, _)) = anchor else {
        error!("No candidate file declared a usable package");
        return Err(PipelineError::NoIdentity);
    };

    info!(
        package = %unit_name,
        sections = sections.len(),
        imports = dependencies.len(),
        "Merged source files"
    );

    Ok(MergedUnit {
        unit_name,
        dependencies: dependencies.into_iter().collect(),
        sections,
        excluded,
    })
}

/// Serializes the unit: package line, one import block, then every section
/// preceded by a provenance comment. Output is a pure function of `unit`.
pub fn render(unit: &MergedUnit) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "package {}", unit.unit_name);
    out.push('\n');
    out.push_str("import (\n");
    for dependency in unit.dependencies.iter().filter(|d| !d.is_empty()) {
        let _ = writeln!(out, "\t{dependency}");
    }
    out.push_str(")\n");
    for section in &unit.sections {
        let _ = write!(
            out,
            "\n// --- Content from {} ---\n{}\n",
            section.source_name(),
            section.body
        );
    }
    out
}
