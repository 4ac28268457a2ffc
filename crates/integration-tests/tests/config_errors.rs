//! Configuration errors surface before anything runs

mod common;

use common::{registry, Collected, TEST_LOCATION};
use pipewright_core::application::Orchestrator;
use pipewright_core::domain::{ConfigError, PipelineSpec, WorkerSpec};
use pipewright_core::AppError;

fn config_error(result: pipewright_core::Result<()>) -> ConfigError {
    match result {
        Err(AppError::Config(e)) => e,
        other => panic!("expected a config error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_implementation_starts_nothing() {
    let spec = PipelineSpec::new(
        &["Q"],
        vec![
            WorkerSpec::new("Seed", "builtin", "ValueSource").output("Q"),
            WorkerSpec::new("Ghost", "nowhere", "Missing").input("Q"),
        ],
    );
    let mut orchestrator = Orchestrator::new(spec, registry(&Collected::default()));

    let err = config_error(orchestrator.start());
    assert!(matches!(err, ConfigError::UnknownImplementation { ref worker, .. } if worker == "Ghost"));
    assert!(err.to_string().contains("nowhere.Missing"));
    assert!(!orchestrator.is_running());
    assert!(orchestrator.queues().is_none());
}

#[tokio::test]
async fn test_undeclared_queue_is_rejected() {
    let spec = PipelineSpec::new(
        &["Declared"],
        vec![
            WorkerSpec::new("Seed", "builtin", "ValueSource").output("Declared"),
            WorkerSpec::new("Sink", TEST_LOCATION, "Collector").input("Typo"),
        ],
    );
    let mut orchestrator = Orchestrator::new(spec, registry(&Collected::default()));

    let err = config_error(orchestrator.start());
    assert!(matches!(err, ConfigError::UnknownQueue { ref queue, .. } if queue == "Typo"));
    assert!(orchestrator.run_id().is_none());
}

#[tokio::test]
async fn test_invalid_params_are_reported_at_construction() {
    let spec = PipelineSpec::new(
        &["In", "Out"],
        vec![
            WorkerSpec::new("Seed", "builtin", "ValueSource").output("In"),
            WorkerSpec::new("Scaler", "builtin", "Scale")
                .input("In")
                .output("Out")
                .params(serde_json::json!({ "factor": "twice" })),
        ],
    );
    let orchestrator = Orchestrator::new(spec, registry(&Collected::default()));

    let err = match orchestrator.plan() {
        Err(AppError::Config(e)) => e,
        other => panic!("expected a config error, got {other:?}"),
    };
    assert!(matches!(err, ConfigError::InvalidParams { ref worker, .. } if worker == "Scaler"));
}

#[tokio::test]
async fn test_source_wired_to_input_is_a_variant_mismatch() {
    let spec = PipelineSpec::new(
        &["Q"],
        vec![
            WorkerSpec::new("Seed", "builtin", "ValueSource").output("Q"),
            WorkerSpec::new("Confused", "builtin", "ValueSource").input("Q"),
        ],
    );
    let mut orchestrator = Orchestrator::new(spec, registry(&Collected::default()));

    let err = config_error(orchestrator.start());
    assert!(matches!(err, ConfigError::VariantMismatch { .. }));
    assert!(orchestrator.start().is_err());
}

#[test]
fn test_start_outside_runtime_is_invalid_state() {
    let spec = PipelineSpec::new(
        &["Q"],
        vec![WorkerSpec::new("Seed", "builtin", "ValueSource").output("Q")],
    );
    let mut orchestrator = Orchestrator::new(spec, registry(&Collected::default()));

    assert!(matches!(orchestrator.start(), Err(AppError::InvalidState(_))));
}
