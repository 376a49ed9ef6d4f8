///
/// This module implements the CLI interface for msgp-bundle: command parsing,
/// console output, and the mapping from pipeline outcomes to exit codes.
///
/// All pipeline logic (scanning, splitting, merging, running the generator)
/// lives in the [`msgp-bundle-core`] crate. This module only prints.
///
/// [`msgp-bundle-core`]: ../../msgp-bundle-core/
use crate::load_config::load_config;
use anyhow::Result;
use clap::{Parser, Subcommand};
use msgp_bundle_core::contract::PipelineEvent;
use msgp_bundle_core::diagnostics::Transcript;
use msgp_bundle_core::generate::ProcessGenerator;
use msgp_bundle_core::merge::render;
use msgp_bundle_core::pipeline::{self, GenerationRequest, PipelineOutcome};
use std::io::Write;
use std::path::PathBuf;

/// CLI for msgp-bundle: merge msgp-annotated Go sources and run the generator.
#[derive(Parser)]
#[clap(
    name = "msgp-bundle",
    version,
    about = "Merge Go sources marked with //go:generate msgp into one unit and run msgp on it"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Merge the annotated sources and run the generator on the result
    Generate {
        /// Directory holding the Go sources (not searched recursively)
        #[clap(long, default_value = ".")]
        dir: PathBuf,
        /// Optional YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
        /// Leave the merged source file on disk afterwards
        #[clap(long)]
        keep_artifact: bool,
    },
    /// Print the merged unit without writing it or running the generator
    Preview {
        #[clap(long, default_value = ".")]
        dir: PathBuf,
        #[clap(long)]
        config: Option<PathBuf>,
    },
}

/// CLI entrypoint for main() and integration tests. Returns the process exit code.
pub async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Generate {
            dir,
            config,
            keep_artifact,
        } => {
            let config = load_config(config.as_deref())?;
            let mut request = GenerationRequest::new(dir, config);
            request.keep_artifact = keep_artifact;
            tracing::info!(command = "generate", dir = %request.dir.display(), "Starting generation");

            let outcome = pipeline::run(&request, &ProcessGenerator, &mut print_event).await?;
            report(&request, outcome)
        }
        Commands::Preview { dir, config } => {
            let config = load_config(config.as_deref())?;
            let request = GenerationRequest::new(dir, config);
            tracing::info!(command = "preview", dir = %request.dir.display(), "Starting preview");

            match pipeline::prepare(&request, &mut print_event)? {
                Some(unit) => print!("{}", render(&unit)),
                None => print_nothing_to_do(&request),
            }
            Ok(0)
        }
    }
}

fn print_event(event: PipelineEvent) {
    match event {
        PipelineEvent::Detected { files } => {
            println!("Detected {} files with generation directives.", files.len())
        }
        PipelineEvent::Merging { artifact } => println!("Merging into {}...", artifact.display()),
        PipelineEvent::Invoking { command } => println!("Running: {command}"),
    }
}

fn print_nothing_to_do(request: &GenerationRequest) {
    println!(
        "No {} files with generation directives found.",
        request.config.source_suffix
    );
}

fn report(request: &GenerationRequest, outcome: PipelineOutcome) -> Result<i32> {
    let exit_code = outcome.exit_code();
    match outcome {
        PipelineOutcome::NothingToDo => print_nothing_to_do(request),
        PipelineOutcome::Generated(report) => {
            match serde_json::to_string_pretty(&report) {
                Ok(json) => tracing::debug!(json = %json, "Generation report"),
                Err(e) => tracing::error!(error = ?e, "Failed to serialize generation report"),
            }
            println!("Successfully generated {}", request.config.output_name);
            if !report.warnings.is_empty() {
                println!("--- Warnings ---");
                for warning in &report.warnings {
                    println!("{warning}");
                }
            }
        }
        PipelineOutcome::GeneratorFailed {
            exit_code,
            mut transcript,
        } => {
            tracing::error!(command = "generate", exit_code, "Generator failed");
            let stdout = std::io::stdout();
            return Ok(print_failure(
                &request.config.generator.program,
                exit_code,
                &mut transcript,
                &mut stdout.lock(),
            ));
        }
    }
    Ok(exit_code)
}

/// Prints the failure header and the generator's full output, returning the
/// generator's exit code. A console that cannot be written to is logged and
/// does not change the code.
fn print_failure<W: Write>(
    program: &str,
    exit_code: i32,
    transcript: &mut Transcript,
    out: &mut W,
) -> i32 {
    if let Err(e) = write_failure(program, exit_code, transcript, out) {
        tracing::error!(error = %e, exit_code, "Failed to print generator output");
    }
    exit_code
}

fn write_failure<W: Write>(
    program: &str,
    exit_code: i32,
    transcript: &mut Transcript,
    out: &mut W,
) -> Result<()> {
    writeln!(out, "\n{program} failed with exit code {exit_code}")?;
    writeln!(out, " --- Output --- ")?;
    transcript.replay(out)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use msgp_bundle_core::config::PipelineConfig;
    use msgp_bundle_core::diagnostics::{DiagnosticCollector, DiagnosticRules};
    use std::io;

    struct ClosedConsole;

    impl Write for ClosedConsole {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "console closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "console closed"))
        }
    }

    fn failed_outcome(exit_code: i32) -> PipelineOutcome {
        let rules = DiagnosticRules::new(&PipelineConfig::default().benign_patterns).unwrap();
        let mut collector = DiagnosticCollector::new(rules).unwrap();
        collector.push("msgp_gen.go:3: undefined: Missing").unwrap();
        let (transcript, _) = collector.into_parts();
        PipelineOutcome::GeneratorFailed {
            exit_code,
            transcript,
        }
    }

    #[test]
    fn test_failure_block_includes_transcript() {
        let PipelineOutcome::GeneratorFailed {
            exit_code,
            mut transcript,
        } = failed_outcome(7)
        else {
            unreachable!()
        };
        let mut out = Vec::new();
        write_failure("msgp", exit_code, &mut transcript, &mut out).unwrap();
        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("msgp failed with exit code 7"));
        assert!(printed.contains("undefined: Missing"));
    }

    #[test]
    fn test_unwritable_console_keeps_generator_exit_code() {
        let PipelineOutcome::GeneratorFailed {
            exit_code,
            mut transcript,
        } = failed_outcome(7)
        else {
            unreachable!()
        };
        assert!(write_failure("msgp", exit_code, &mut transcript, &mut ClosedConsole).is_err());
        let code = print_failure("msgp", exit_code, &mut transcript, &mut ClosedConsole);
        assert_eq!(code, 7);
    }
}
