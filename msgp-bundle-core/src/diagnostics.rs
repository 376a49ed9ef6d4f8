//! Classification of generator output, and a disk-backed transcript of it.
//!
//! Every line the generator prints is classified as it is read. Benign lines
//! are dropped after being spooled to the [`Transcript`]; actionable ones are
//! also kept in memory for the warnings summary. The transcript lets a failed
//! run print its full output without holding it all in memory.

use regex::{RegexSet, RegexSetBuilder};
use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Empty, or expected informational output.
    Benign,
    /// A warning or error worth showing to the user.
    Actionable,
}

/// Allow-list of benign output patterns, matched case-insensitively against
/// the trimmed line.
#[derive(Debug, Clone)]
pub struct DiagnosticRules {
    benign: RegexSet,
}

impl DiagnosticRules {
    pub fn new(patterns: &[String]) -> PipelineResult<Self> {
        let benign = RegexSetBuilder::new(patterns)
            .case_insensitive(true)
            .build()
            .map_err(|source| PipelineError::InvalidPattern {
                pattern: patterns.join(" | "),
                source,
            })?;
        Ok(Self { benign })
    }

    pub fn classify(&self, line: &str) -> Classification {
        let line = line.trim();
        if line.is_empty() || self.benign.is_match(line) {
            Classification::Benign
        } else {
            Classification::Actionable
        }
    }
}

/// Full generator output, spooled to an anonymous temporary file.
#[derive(Debug)]
pub struct Transcript {
    file: BufWriter<File>,
    lines: usize,
}

impl Transcript {
    pub fn new() -> PipelineResult<Self> {
        let file = tempfile::tempfile().map_err(PipelineError::Transcript)?;
        Ok(Self {
            file: BufWriter::new(file),
            lines: 0,
        })
    }

    fn append(&mut self, line: &str) -> io::Result<()> {
        self.lines += 1;
        writeln!(self.file, "{line}")
    }

    /// Number of lines recorded so far.
    pub fn len(&self) -> usize {
        self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines == 0
    }

    /// Copies everything recorded so far to `out`, oldest line first.
    pub fn replay<W: Write>(&mut self, out: &mut W) -> PipelineResult<()> {
        self.file.flush().map_err(PipelineError::Transcript)?;
        let file = self.file.get_mut();
        file.seek(SeekFrom::Start(0))
            .map_err(PipelineError::Transcript)?;
        io::copy(&mut *file, out).map_err(PipelineError::Transcript)?;
        file.seek(SeekFrom::End(0))
            .map_err(PipelineError::Transcript)?;
        Ok(())
    }
}

/// Sink handed to a [`crate::contract::Generator`]: receives each output line
/// as it is read.
#[derive(Debug)]
pub struct DiagnosticCollector {
    rules: DiagnosticRules,
    transcript: Transcript,
    actionable: Vec<String>,
}

impl DiagnosticCollector {
    pub fn new(rules: DiagnosticRules) -> PipelineResult<Self> {
        Ok(Self {
            rules,
            transcript: Transcript::new()?,
            actionable: Vec::new(),
        })
    }

    /// Records one output line (surrounding whitespace is stripped) and
    /// returns how it was classified.
    pub fn push(&mut self, line: &str) -> PipelineResult<Classification> {
        let line = line.trim();
        self.transcript
            .append(line)
            .map_err(PipelineError::Transcript)?;
        let class = self.rules.classify(line);
        debug!(line, ?class, "Generator output");
        if class == Classification::Actionable {
            self.actionable.push(line.to_string());
        }
        Ok(class)
    }

    pub fn actionable(&self) -> &[String] {
        &self.actionable
    }

    pub fn into_parts(self) -> (Transcript, Vec<String>) {
        (self.transcript, self.actionable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;

    fn rules() -> DiagnosticRules {
        DiagnosticRules::new(&PipelineConfig::default().benign_patterns).unwrap()
    }

    #[test]
    fn test_default_rules() {
        let rules = rules();
        for benign in [
            "",
            "   ",
            "info: wrote foo.go",
            "INFO: processed 12 types",
            "warn: unresolved identifier: Timestamp",
            "Generated 4 methods",
            "input: \"combined.go\"",
            "Wrote and tested \"msgp_gen.go\"",
        ] {
            assert_eq!(rules.classify(benign), Classification::Benign, "{benign:?}");
        }
        for actionable in [
            "foo.go:12: field Bar unsupported",
            "warn: unresolved identifier: Snowflake",
            "error: something went wrong",
        ] {
            assert_eq!(
                rules.classify(actionable),
                Classification::Actionable,
                "{actionable:?}"
            );
        }
    }

    #[test]
    fn test_collector_keeps_only_actionable_lines() {
        let mut collector = DiagnosticCollector::new(rules()).unwrap();
        collector.push("info: wrote foo.go\n").unwrap();
        collector.push("  foo.go:12: field Bar unsupported  ").unwrap();
        collector.push("").unwrap();
        assert_eq!(collector.actionable(), ["foo.go:12: field Bar unsupported"]);
    }

    #[test]
    fn test_transcript_replays_every_line_in_order() {
        let mut collector = DiagnosticCollector::new(rules()).unwrap();
        collector.push("input: a.go").unwrap();
        collector.push("boom").unwrap();
        collector.push("").unwrap();
        let (mut transcript, actionable) = collector.into_parts();
        assert_eq!(actionable, vec!["boom"]);
        assert_eq!(transcript.len(), 3);

        let mut out = Vec::new();
        transcript.replay(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "input: a.go\nboom\n\n");

        // replaying twice yields the same output
        let mut again = Vec::new();
        transcript.replay(&mut again).unwrap();
        assert_eq!(again.len(), "input: a.go\nboom\n\n".len());
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let err = DiagnosticRules::new(&["[".to_string()]).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidPattern { .. }));
    }
}
