//! Global logging setup for the demo binary.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{Error, Result};

/// Builds the filter: `RUST_LOG` wins when set, otherwise `default_level`.
pub fn env_filter(default_level: &str) -> Result<EnvFilter> {
  if let Ok(filter) = EnvFilter::try_from_default_env() {
    return Ok(filter);
  }
  EnvFilter::try_new(default_level).map_err(|e| Error::InvalidLogFilter {
    filter: default_level.to_string(),
    reason: e.to_string(),
  })
}

/// Installs a `fmt` subscriber with thread names and bridges `log` records
/// into `tracing`. Fails if a global subscriber is already set.
pub fn init(default_level: &str) -> Result<()> {
  let filter = env_filter(default_level)?;

  tracing_log::LogTracer::init().map_err(|e| Error::LogBridgeInit(e.to_string()))?;

  let subscriber = tracing_subscriber::registry().with(filter).with(
    fmt::layer()
      .with_thread_names(true)
      .with_target(false),
  );
  tracing::subscriber::set_global_default(subscriber)
    .map_err(|e| Error::GlobalSubscriberSet(e.to_string()))
}
