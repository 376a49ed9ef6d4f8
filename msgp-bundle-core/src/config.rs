use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PipelineError, PipelineResult};

/// Everything the pipeline needs to know besides the working directory.
/// Every field has a default, so an empty YAML document is a valid config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Only files ending in this suffix are considered.
    pub source_suffix: String,
    /// File names ending in any of these are never candidates.
    pub exclude_suffixes: Vec<String>,
    /// Directive that marks a file as generator input (multi-line regex).
    pub marker: String,
    /// Package names ending in this suffix are left out of the merge.
    pub test_suffix: String,
    /// Name of the temporary merged unit written next to the sources.
    pub artifact_name: String,
    /// Name of the file the generator writes.
    pub output_name: String,
    pub generator: GeneratorConfig,
    /// Case-insensitive regexes for generator output that needs no attention.
    pub benign_patterns: Vec<String>,
    /// Fail instead of swallowing the rest of a file after an unclosed `import (`.
    pub strict_imports: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_suffix: ".go".to_string(),
            exclude_suffixes: vec![
                "_gen.go".to_string(),
                "_test.go".to_string(),
                "gen_msgp.py".to_string(),
                "msgp_codegen.py".to_string(),
                "generate_code.py".to_string(),
            ],
            marker: r"^\s*//go:generate\s+msgp".to_string(),
            test_suffix: "_test".to_string(),
            artifact_name: "msgp_combined_src.go".to_string(),
            output_name: "msgp_gen.go".to_string(),
            generator: GeneratorConfig::default(),
            benign_patterns: vec![
                "info:".to_string(),
                "unresolved identifier: timestamp".to_string(),
                "^generated".to_string(),
                "^input:".to_string(),
                "^wrote".to_string(),
            ],
            strict_imports: false,
        }
    }
}

impl PipelineConfig {
    pub fn trace_loaded(&self) {
        info!(
            generator = %self.generator.program,
            artifact = %self.artifact_name,
            output = %self.output_name,
            strict_imports = self.strict_imports,
            "Loaded pipeline config"
        );
        debug!(?self, "Pipeline config loaded (full debug)");
    }

    /// Compiles [`PipelineConfig::marker`] with `^` anchored per line.
    pub fn marker_regex(&self) -> PipelineResult<Regex> {
        RegexBuilder::new(&self.marker)
            .multi_line(true)
            .build()
            .map_err(|source| PipelineError::InvalidPattern {
                pattern: self.marker.clone(),
                source,
            })
    }

    /// True when `file_name` may never be a scan candidate.
    pub fn is_excluded(&self, file_name: &str) -> bool {
        file_name == self.artifact_name
            || file_name == self.output_name
            || self
                .exclude_suffixes
                .iter()
                .any(|suffix| file_name.ends_with(suffix.as_str()))
    }
}

/// How the external generator is launched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub program: String,
    pub io: bool,
    pub tests: bool,
    pub verbose: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            program: "msgp".to_string(),
            io: false,
            tests: false,
            verbose: true,
        }
    }
}

impl GeneratorConfig {
    /// Argument list for one run: input file, output file, then the flags.
    pub fn args(&self, input: &str, output: &str) -> Vec<String> {
        vec![
            "-file".to_string(),
            input.to_string(),
            "-o".to_string(),
            output.to_string(),
            format!("-io={}", self.io),
            format!("-tests={}", self.tests),
            format!("-v={}", self.verbose),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_marker_matches_directive_on_its_own_line() {
        let rx = PipelineConfig::default().marker_regex().unwrap();
        assert!(rx.is_match("package x\n\n//go:generate msgp\n"));
        assert!(rx.is_match("package x\n  //go:generate   msgp -tests=false\n"));
        assert!(!rx.is_match("package x\n// see //go:generate msgp\n"));
        assert!(!rx.is_match("package x\n//go:generate stringer\n"));
    }

    #[test]
    fn test_exclusions_cover_generated_tests_and_artifacts() {
        let config = PipelineConfig::default();
        assert!(config.is_excluded("user_gen.go"));
        assert!(config.is_excluded("user_test.go"));
        assert!(config.is_excluded("msgp_combined_src.go"));
        assert!(config.is_excluded("msgp_gen.go"));
        assert!(!config.is_excluded("user.go"));
    }

    #[test]
    fn test_generator_args_are_fixed_shape() {
        let args = GeneratorConfig::default().args("in.go", "out.go");
        assert_eq!(
            args,
            vec!["-file", "in.go", "-o", "out.go", "-io=false", "-tests=false", "-v=true"]
        );
    }

    #[test]
    fn test_invalid_marker_is_reported() {
        let config = PipelineConfig {
            marker: "(".to_string(),
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.marker_regex(),
            Err(PipelineError::InvalidPattern { .. })
        ));
    }
}
