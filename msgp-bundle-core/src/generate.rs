//! Generator invoker: writes the merged unit next to the sources, runs the
//! generator on it, classifies its output and removes the merged unit again.

use async_trait::async_trait;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::NamedTempFile;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::contract::{Generator, Invocation, MergedUnit, PipelineEvent};
use crate::diagnostics::{DiagnosticCollector, DiagnosticRules, Transcript};
use crate::error::{PipelineError, PipelineResult};
use crate::merge::render;

/// Where and how a single generation run happens.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Directory holding the sources; the artifact and output land here too.
    pub dir: PathBuf,
    pub config: PipelineConfig,
    /// Leave the merged artifact on disk after the run.
    pub keep_artifact: bool,
}

impl GenerationRequest {
    pub fn new(dir: impl Into<PathBuf>, config: PipelineConfig) -> Self {
        Self {
            dir: dir.into(),
            config,
            keep_artifact: false,
        }
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.dir.join(&self.config.artifact_name)
    }

    pub fn output_path(&self) -> PathBuf {
        self.dir.join(&self.config.output_name)
    }
}

/// Result of a run that got as far as executing the generator.
#[derive(Debug)]
pub enum GenerationOutcome {
    /// Exit code 0. `warnings` holds the actionable output lines, if any.
    Generated { output: PathBuf, warnings: Vec<String> },
    /// Non-zero exit. `transcript` holds the complete output.
    Failed { exit_code: i32, transcript: Transcript },
}

/// The merged unit on disk. Removed when dropped, unless [`keep`](Self::keep)
/// was called.
#[derive(Debug)]
pub struct ScratchArtifact {
    path: PathBuf,
    keep: bool,
}

impl ScratchArtifact {
    /// Writes `contents` to `path` atomically: a temporary file in the same
    /// directory is filled first and then renamed over `path`.
    pub fn write(path: PathBuf, contents: &str) -> PipelineResult<Self> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let write_err = |source: io::Error| PipelineError::ArtifactWrite {
            path: path.clone(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(contents.as_bytes()).map_err(write_err)?;
        tmp.persist(&path).map_err(|e| write_err(e.error))?;

        debug!(path = %path.display(), bytes = contents.len(), "Wrote merged artifact");
        Ok(Self { path, keep: false })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn keep(&mut self) {
        self.keep = true;
    }
}

impl Drop for ScratchArtifact {
    fn drop(&mut self) {
        if self.keep {
            info!(path = %self.path.display(), "Keeping merged artifact");
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => info!(path = %self.path.display(), "Cleaned up merged artifact"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(error = %e, path = %self.path.display(), "Failed to remove merged artifact"),
        }
    }
}

/// Writes `unit`, runs `generator` on it and interprets the result.
///
/// The artifact is removed once the generator has finished, and on every
/// error path after it was written.
pub async fn invoke<G>(
    unit: &MergedUnit,
    request: &GenerationRequest,
    generator: &G,
    on_event: &mut dyn FnMut(PipelineEvent),
) -> PipelineResult<GenerationOutcome>
where
    G: Generator + ?Sized,
{
    let config = &request.config;
    let rules = DiagnosticRules::new(&config.benign_patterns)?;

    let artifact_path = request.artifact_path();
    on_event(PipelineEvent::Merging {
        artifact: artifact_path.clone(),
    });
    let mut artifact = ScratchArtifact::write(artifact_path, &render(unit))?;
    if request.keep_artifact {
        artifact.keep();
    }

    let invocation = Invocation {
        program: config.generator.program.clone(),
        args: config
            .generator
            .args(&config.artifact_name, &config.output_name),
        working_dir: request.dir.clone(),
    };
    on_event(PipelineEvent::Invoking {
        command: invocation.command_line(),
    });
    info!(command = %invocation.command_line(), "Running generator");

    let mut collector = DiagnosticCollector::new(rules)?;
    let exit_code = generator.execute(&invocation, &mut collector).await?;
    drop(artifact);

    let (transcript, warnings) = collector.into_parts();
    if exit_code != 0 {
        error!(exit_code, lines = transcript.len(), "Generator failed");
        return Ok(GenerationOutcome::Failed {
            exit_code,
            transcript,
        });
    }

    info!(
        output = %request.output_path().display(),
        warnings = warnings.len(),
        "Generator finished"
    );
    Ok(GenerationOutcome::Generated {
        output: request.output_path(),
        warnings,
    })
}

/// Runs the generator as a child process. Stdout and stderr are read
/// concurrently, so lines reach the collector in roughly the order the
/// process wrote them.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessGenerator;

#[async_trait]
impl Generator for ProcessGenerator {
    async fn execute(
        &self,
        invocation: &Invocation,
        sink: &mut DiagnosticCollector,
    ) -> Result<i32, PipelineError> {
        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| {
                error!(error = %source, program = %invocation.program, "Failed to launch generator");
                PipelineError::GeneratorLaunch {
                    program: invocation.program.clone(),
                    source,
                }
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PipelineError::GeneratorIo(io::Error::other("stdout not captured")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| PipelineError::GeneratorIo(io::Error::other("stderr not captured")))?;

        let mut out_lines = BufReader::new(stdout).split(b'\n');
        let mut err_lines = BufReader::new(stderr).split(b'\n');
        let mut out_open = true;
        let mut err_open = true;

        while out_open || err_open {
            tokio::select! {
                line = out_lines.next_segment(), if out_open => {
                    out_open = forward(line, sink)?;
                }
                line = err_lines.next_segment(), if err_open => {
                    err_open = forward(line, sink)?;
                }
            }
        }

        let status = child.wait().await.map_err(PipelineError::GeneratorIo)?;
        match status.code() {
            Some(code) => Ok(code),
            None => {
                warn!(?status, "Generator terminated by signal");
                Ok(1)
            }
        }
    }
}

/// Pushes one raw line into the sink. Returns whether the stream is still open.
fn forward(line: io::Result<Option<Vec<u8>>>, sink: &mut DiagnosticCollector) -> PipelineResult<bool> {
    match line.map_err(PipelineError::GeneratorIo)? {
        Some(bytes) => {
            sink.push(&String::from_utf8_lossy(&bytes))?;
            Ok(true)
        }
        None => Ok(false),
    }
}
