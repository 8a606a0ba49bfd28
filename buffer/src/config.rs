//! Startup configuration for a producer/consumer run.

use std::env;
use std::fs::File;
use std::io;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::item::Category;
use crate::jitter::Jitter;

const DEFAULT_CONFIG_BASE_NAME: &str = "slotgate";
const DEFAULT_CONFIG_EXTENSION: &str = "yaml";

/// Environment variable naming the config variant to look for first.
pub const CONFIG_ENV_VAR: &str = "SLOTGATE_ENV";

fn default_categories() -> Vec<Category> {
  vec![
    Category::new("Temperature"),
    Category::new("Humidity"),
    Category::new("Temperature"),
  ]
}

/// Everything the coordinator needs to start a run.
///
/// The defaults reproduce the classic sensor demo: five slots, three sensors
/// (temperature, humidity, temperature) producing ten readings each, two
/// consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
  /// Slot count of the circular buffer.
  pub capacity: usize,
  pub producer_count: usize,
  pub consumer_count: usize,
  /// Quota of each producer.
  pub items_per_producer: usize,
  /// One category per producer, in producer id order.
  pub producer_categories: Vec<Category>,
  /// Upper bound of the random pause after each produced item.
  pub producer_jitter_ms: u64,
  /// Upper bound of the random pause after each consumed item.
  pub consumer_jitter_ms: u64,
  /// Generate attempts per item before a producer gives up.
  pub source_retry_attempts: usize,
  /// Default log filter for binaries that honour it.
  pub log_level: String,
}

impl Default for Config {
  fn default() -> Self {
    Config {
      capacity: 5,
      producer_count: 3,
      consumer_count: 2,
      items_per_producer: 10,
      producer_categories: default_categories(),
      producer_jitter_ms: 500,
      consumer_jitter_ms: 800,
      source_retry_attempts: 1,
      log_level: "info".to_string(),
    }
  }
}

impl Config {
  /// A config with one producer per category and no jitter.
  pub fn new<I, C>(capacity: usize, consumer_count: usize, items_per_producer: usize, categories: I) -> Self
  where
    I: IntoIterator<Item = C>,
    C: Into<Category>,
  {
    let producer_categories: Vec<Category> = categories.into_iter().map(Into::into).collect();
    Config {
      capacity,
      producer_count: producer_categories.len(),
      consumer_count,
      items_per_producer,
      producer_categories,
      producer_jitter_ms: 0,
      consumer_jitter_ms: 0,
      ..Config::default()
    }
  }

  pub fn with_jitter_ms(mut self, producer_ms: u64, consumer_ms: u64) -> Self {
    self.producer_jitter_ms = producer_ms;
    self.consumer_jitter_ms = consumer_ms;
    self
  }

  pub fn with_retry_attempts(mut self, attempts: usize) -> Self {
    self.source_retry_attempts = attempts;
    self
  }

  /// Rejects configurations that cannot be run. Called by the coordinator
  /// before any task starts.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.capacity == 0 {
      return Err(ConfigError::ZeroCapacity);
    }
    if self.producer_count == 0 {
      return Err(ConfigError::NoProducers);
    }
    if self.consumer_count == 0 {
      return Err(ConfigError::NoConsumers);
    }
    if self.producer_categories.len() != self.producer_count {
      return Err(ConfigError::CategoryMismatch {
        producers: self.producer_count,
        categories: self.producer_categories.len(),
      });
    }
    if self.source_retry_attempts == 0 {
      return Err(ConfigError::InvalidValue {
        field: "source_retry_attempts",
        message: "must be at least 1".to_string(),
      });
    }
    Ok(())
  }

  pub fn producer_jitter(&self) -> Jitter {
    Jitter::from_millis(self.producer_jitter_ms)
  }

  pub fn consumer_jitter(&self) -> Jitter {
    Jitter::from_millis(self.consumer_jitter_ms)
  }

  pub(crate) fn attempts(&self) -> NonZeroUsize {
    NonZeroUsize::new(self.source_retry_attempts).unwrap_or(NonZeroUsize::MIN)
  }

  /// Total items all producers will generate, saturating at `usize::MAX`.
  pub fn total_items(&self) -> usize {
    self.producer_count.saturating_mul(self.items_per_producer)
  }

  /// Parses and validates a YAML document. Missing fields take their defaults.
  pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
    let config: Config = serde_yaml::from_str(yaml)?;
    config.validate()?;
    Ok(config)
  }

  /// Reads, parses and validates a YAML file.
  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    let file = File::open(path)?;
    let reader = io::BufReader::new(file);
    let config: Config = serde_yaml::from_reader(reader)?;
    config.validate()?;
    Ok(config)
  }
}

/// Finds a config file in the working directory. See `find_config_file_in`.
pub fn find_config_file(environment_suffix: Option<&str>) -> Result<PathBuf, ConfigError> {
  find_config_file_in(Path::new("."), environment_suffix)
}

/// Looks for `slotgate.<env>.yaml`, then `slotgate.yaml`, inside `dir`.
///
/// `<env>` comes from `environment_suffix`, falling back to the
/// `SLOTGATE_ENV` environment variable.
pub fn find_config_file_in(dir: &Path, environment_suffix: Option<&str>) -> Result<PathBuf, ConfigError> {
  let env_from_var = environment_suffix
    .map(|s| s.to_string())
    .or_else(|| env::var(CONFIG_ENV_VAR).ok());

  let mut files_to_check: Vec<String> = Vec::new();
  if let Some(env_str) = &env_from_var {
    if !env_str.is_empty() {
      files_to_check.push(format!(
        "{}.{}.{}",
        DEFAULT_CONFIG_BASE_NAME, env_str, DEFAULT_CONFIG_EXTENSION
      ));
    }
  }
  files_to_check.push(format!("{}.{}", DEFAULT_CONFIG_BASE_NAME, DEFAULT_CONFIG_EXTENSION));

  for file_name in &files_to_check {
    let path = dir.join(file_name);
    if path.is_file() {
      return Ok(path);
    }
  }

  Err(ConfigError::NotFound(format!(
    "Searched for: {:?} in {:?}. Provide a config file or set {}.",
    files_to_check, dir, CONFIG_ENV_VAR
  )))
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn default_matches_sensor_demo() {
    let config = Config::default();
    config.validate().unwrap();
    assert_eq!(config.capacity, 5);
    assert_eq!(config.total_items(), 30);
    assert_eq!(
      config.producer_categories,
      vec![
        Category::new("Temperature"),
        Category::new("Humidity"),
        Category::new("Temperature")
      ]
    );
  }

  #[test]
  fn new_derives_producer_count() {
    let config = Config::new(5, 2, 10, ["A", "B", "A"]);
    assert_eq!(config.producer_count, 3);
    assert_eq!(config.producer_jitter(), Jitter::NONE);
    config.validate().unwrap();
  }

  #[test]
  fn validation_failures() {
    let base = Config::new(5, 2, 10, ["A"]);

    let zero_capacity = Config { capacity: 0, ..base.clone() };
    assert!(matches!(zero_capacity.validate(), Err(ConfigError::ZeroCapacity)));

    let no_consumers = Config { consumer_count: 0, ..base.clone() };
    assert!(matches!(no_consumers.validate(), Err(ConfigError::NoConsumers)));

    let no_producers = Config::new(5, 2, 10, Vec::<Category>::new());
    assert!(matches!(no_producers.validate(), Err(ConfigError::NoProducers)));

    let mismatch = Config { producer_count: 2, ..base.clone() };
    assert!(matches!(
      mismatch.validate(),
      Err(ConfigError::CategoryMismatch {
        producers: 2,
        categories: 1
      })
    ));

    let no_attempts = base.with_retry_attempts(0);
    assert!(matches!(
      no_attempts.validate(),
      Err(ConfigError::InvalidValue {
        field: "source_retry_attempts",
        ..
      })
    ));
  }

  #[test]
  fn yaml_overrides_and_defaults() {
    let yaml = r#"
capacity: 1
producer_count: 2
consumer_count: 1
items_per_producer: 3
producer_categories: [A, B]
producer_jitter_ms: 0
"#;
    let config = Config::from_yaml_str(yaml).unwrap();
    assert_eq!(
      config,
      Config {
        capacity: 1,
        producer_count: 2,
        consumer_count: 1,
        items_per_producer: 3,
        producer_categories: vec![Category::new("A"), Category::new("B")],
        producer_jitter_ms: 0,
        ..Config::default()
      }
    );
  }

  #[test]
  fn total_items_saturates() {
    let config = Config {
      items_per_producer: usize::MAX,
      ..Config::default()
    };
    assert_eq!(config.total_items(), usize::MAX);
  }

  #[test]
  fn yaml_unknown_field_rejected() {
    let err = Config::from_yaml_str("capacity: 2\nbuffer_size: 9\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
  }

  #[test]
  fn yaml_invalid_config_rejected() {
    let err = Config::from_yaml_str("capacity: 0\n").unwrap_err();
    assert!(matches!(err, ConfigError::ZeroCapacity));
  }
}
