use slotgate::{ConfigError, LifecycleError};
use thiserror::Error;

/// The main error type for the sensor demo.
#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Lifecycle(#[from] LifecycleError),

  #[error("Invalid log filter '{filter}': {reason}")]
  InvalidLogFilter { filter: String, reason: String },

  #[error("Failed to initialize tracing_log bridge: {0}")]
  LogBridgeInit(String),

  #[error("Failed to set global tracing subscriber: {0}")]
  GlobalSubscriberSet(String),

  #[error("unknown sensor category '{0}'")]
  UnknownSensor(String),
}

/// A specialized `Result` type for the sensor demo.
pub type Result<T, E = Error> = std::result::Result<T, E>;
