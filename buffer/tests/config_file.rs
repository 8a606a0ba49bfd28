use pretty_assertions::assert_eq;
use serial_test::serial;
use std::fs;
use tempfile::tempdir;

use slotgate::config::CONFIG_ENV_VAR;
use slotgate::{find_config_file_in, Category, Config, ConfigError};

const STAGING_YAML: &str = r#"
capacity: 8
producer_count: 2
consumer_count: 4
items_per_producer: 100
producer_categories:
  - Temperature
  - Humidity
producer_jitter_ms: 10
consumer_jitter_ms: 20
source_retry_attempts: 3
log_level: debug
"#;

#[test]
fn loads_full_yaml_file() {
  let dir = tempdir().unwrap();
  let path = dir.path().join("slotgate.yaml");
  fs::write(&path, STAGING_YAML).unwrap();

  let config = Config::from_file(&path).unwrap();
  assert_eq!(
    config,
    Config {
      capacity: 8,
      producer_count: 2,
      consumer_count: 4,
      items_per_producer: 100,
      producer_categories: vec![Category::new("Temperature"), Category::new("Humidity")],
      producer_jitter_ms: 10,
      consumer_jitter_ms: 20,
      source_retry_attempts: 3,
      log_level: "debug".to_string(),
    }
  );
}

#[test]
fn missing_file_is_a_read_error() {
  let dir = tempdir().unwrap();
  let err = Config::from_file(&dir.path().join("absent.yaml")).unwrap_err();
  assert!(matches!(err, ConfigError::Read(_)));
}

#[test]
fn empty_document_uses_defaults() {
  let dir = tempdir().unwrap();
  let path = dir.path().join("slotgate.yaml");
  fs::write(&path, "{}\n").unwrap();
  assert_eq!(Config::from_file(&path).unwrap(), Config::default());
}

#[test]
fn serialized_config_reloads_identically() {
  let config = Config::new(3, 1, 7, ["A", "B"]).with_retry_attempts(2);
  let yaml = serde_yaml::to_string(&config).unwrap();
  assert_eq!(Config::from_yaml_str(&yaml).unwrap(), config);
}

#[test]
#[serial]
fn find_prefers_environment_specific_file() {
  let dir = tempdir().unwrap();
  fs::write(dir.path().join("slotgate.yaml"), "capacity: 1\n").unwrap();
  fs::write(dir.path().join("slotgate.staging.yaml"), STAGING_YAML).unwrap();

  std::env::remove_var(CONFIG_ENV_VAR);
  let base = find_config_file_in(dir.path(), None).unwrap();
  assert_eq!(base, dir.path().join("slotgate.yaml"));

  let explicit = find_config_file_in(dir.path(), Some("staging")).unwrap();
  assert_eq!(explicit, dir.path().join("slotgate.staging.yaml"));

  std::env::set_var(CONFIG_ENV_VAR, "staging");
  let from_env = find_config_file_in(dir.path(), None).unwrap();
  std::env::remove_var(CONFIG_ENV_VAR);
  assert_eq!(from_env, dir.path().join("slotgate.staging.yaml"));
}

#[test]
#[serial]
fn find_reports_searched_names() {
  let dir = tempdir().unwrap();
  std::env::remove_var(CONFIG_ENV_VAR);
  match find_config_file_in(dir.path(), Some("prod")) {
    Err(ConfigError::NotFound(msg)) => {
      assert!(msg.contains("slotgate.prod.yaml"));
      assert!(msg.contains("slotgate.yaml"));
    }
    other => panic!("expected NotFound, got {other:?}"),
  }
}
