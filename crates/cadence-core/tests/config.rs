use std::fs;

use cadence_core::{ConfigError, WorkerConfig};

#[test]
fn load_from_project_defaults_when_file_is_missing() {
    let dir = tempfile::tempdir().unwrap();
    let config = WorkerConfig::load_from_project(dir.path()).unwrap();
    assert_eq!(config, WorkerConfig::default());
}

#[test]
fn load_from_project_reads_cadence_config() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join(".cadence")).unwrap();
    fs::write(
        dir.path().join(".cadence/config.yaml"),
        "instruction_budget: 1200\nonce_threshold_ms: 50\nupdate10_threshold_ms: 500\n",
    )
    .unwrap();

    let config = WorkerConfig::load_from_project(dir.path()).unwrap();
    assert_eq!(config.instruction_budget, 1200);
    assert_eq!(config.once_threshold_ms, 50);
    assert_eq!(config.update10_threshold_ms, 500);
    assert_eq!(config.trace_capacity, 64);
}

#[test]
fn load_reports_parse_and_validation_failures() {
    let dir = tempfile::tempdir().unwrap();

    let malformed = dir.path().join("malformed.yaml");
    fs::write(&malformed, "instruction_budget: [not, a, number]\n").unwrap();
    assert!(matches!(
        WorkerConfig::load(&malformed),
        Err(ConfigError::Parse { .. })
    ));

    let zero = dir.path().join("zero.yaml");
    fs::write(&zero, "instruction_budget: 0\n").unwrap();
    assert!(matches!(
        WorkerConfig::load(&zero),
        Err(ConfigError::Invalid(_))
    ));

    let missing = dir.path().join("missing.yaml");
    assert!(matches!(
        WorkerConfig::load(&missing),
        Err(ConfigError::Read { .. })
    ));
}
