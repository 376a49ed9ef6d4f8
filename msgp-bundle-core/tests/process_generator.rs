#![cfg(unix)]

use msgp_bundle_core::config::PipelineConfig;
use msgp_bundle_core::contract::{Generator, Invocation};
use msgp_bundle_core::diagnostics::{DiagnosticCollector, DiagnosticRules};
use msgp_bundle_core::error::PipelineError;
use msgp_bundle_core::generate::ProcessGenerator;
use tempfile::tempdir;

fn collector() -> DiagnosticCollector {
    let rules = DiagnosticRules::new(&PipelineConfig::default().benign_patterns).unwrap();
    DiagnosticCollector::new(rules).unwrap()
}

fn shell(script: &str, dir: &std::path::Path) -> Invocation {
    Invocation {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        working_dir: dir.to_path_buf(),
    }
}

#[tokio::test]
async fn test_reads_stdout_and_stderr_and_returns_exit_code() {
    let tmp = tempdir().unwrap();
    let invocation = shell(
        "echo 'info: wrote foo.go'; echo 'foo.go:12: field Bar unsupported' 1>&2; exit 3",
        tmp.path(),
    );
    let mut sink = collector();

    let code = ProcessGenerator.execute(&invocation, &mut sink).await.unwrap();

    assert_eq!(code, 3);
    assert_eq!(sink.actionable(), ["foo.go:12: field Bar unsupported"]);
    let (transcript, _) = sink.into_parts();
    assert_eq!(transcript.len(), 2);
}

#[tokio::test]
async fn test_runs_in_working_directory() {
    let tmp = tempdir().unwrap();
    std::fs::write(tmp.path().join("marker.txt"), "present").unwrap();
    let invocation = shell("cat marker.txt", tmp.path());
    let mut sink = collector();

    let code = ProcessGenerator.execute(&invocation, &mut sink).await.unwrap();

    assert_eq!(code, 0);
    assert_eq!(sink.actionable(), ["present"]);
}

#[tokio::test]
async fn test_missing_program_is_a_launch_error() {
    let tmp = tempdir().unwrap();
    let invocation = Invocation {
        program: "definitely-not-a-real-generator-binary".to_string(),
        args: vec![],
        working_dir: tmp.path().to_path_buf(),
    };
    let mut sink = collector();

    let err = ProcessGenerator
        .execute(&invocation, &mut sink)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::GeneratorLaunch { .. }));
}
