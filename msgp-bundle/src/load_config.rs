/// `load_config` module: turns an optional YAML file plus the environment into a [`PipelineConfig`].
///
/// # Responsibilities
/// - Parse the user-supplied YAML file; every key is optional and falls back to the stock defaults
/// - Apply the `MSGP_BIN` environment override for the generator binary
/// - Produce clear diagnostics: a missing file mentions "read", bad YAML mentions "parse"
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::Result;
use msgp_bundle_core::config::PipelineConfig;
use std::fs;
use std::path::Path;
use tracing::{error, info};

/// Environment variable naming the generator binary to run.
pub const GENERATOR_ENV: &str = "MSGP_BIN";

/// Loads the pipeline config from `path` (or the defaults when `None`) and
/// applies environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let mut config = match path {
        None => {
            info!("No config file given, using defaults");
            PipelineConfig::default()
        }
        Some(path_ref) => {
            info!(config_path = ?path_ref, "Loading configuration from file");
            let config_content = match fs::read_to_string(path_ref) {
                Ok(content) => content,
                Err(e) => {
                    error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
                    return Err(anyhow::anyhow!(
                        "Failed to read config file {:?}: {}",
                        path_ref,
                        e
                    ));
                }
            };

            if config_content.trim().is_empty() {
                PipelineConfig::default()
            } else {
                match serde_yaml::from_str::<PipelineConfig>(&config_content) {
                    Ok(conf) => {
                        info!(config_path = ?path_ref, "Parsed config YAML successfully");
                        conf
                    }
                    Err(e) => {
                        error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
                        return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
                    }
                }
            }
        }
    };

    if let Ok(program) = std::env::var(GENERATOR_ENV) {
        if !program.trim().is_empty() {
            info!(program = %program, "Generator overridden from environment");
            config.generator.program = program;
        }
    }

    config.trace_loaded();
    Ok(config)
}
