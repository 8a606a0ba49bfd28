//! Runs simulated temperature and humidity sensors through a bounded buffer.
//!
//! Configuration comes from `slotgate[.<env>].yaml` in the working directory
//! (`SLOTGATE_ENV` picks the variant); without one, the built-in defaults run:
//! five slots, three sensors, two consumers, ten readings per sensor.

use std::process::ExitCode;
use std::sync::Arc;

use slotgate::{find_config_file, Config, ConfigError, Coordinator};
use slotgate_sensors::{logging, ReadingSink, Result, SensorSource};
use tracing::{error, info, warn};

fn load_config() -> Result<Config> {
  match find_config_file(None) {
    Ok(path) => Ok(Config::from_file(&path)?),
    Err(ConfigError::NotFound(_)) => Ok(Config::default()),
    Err(err) => Err(err.into()),
  }
}

fn run() -> Result<bool> {
  let config = load_config()?;
  logging::init(&config.log_level)?;
  info!(?config, "configuration loaded");

  let sink = Arc::new(ReadingSink::new());
  let report = Coordinator::<i32>::from_shared(config, Arc::new(SensorSource), sink.clone()).run()?;

  for failure in &report.failures {
    warn!(error = %failure, "producer did not finish");
  }
  info!(
    produced = report.total_produced(),
    consumed = report.total_consumed(),
    logged = sink.received(),
    "All producers have finished. Exiting."
  );
  Ok(report.is_clean())
}

fn main() -> ExitCode {
  match run() {
    Ok(true) => ExitCode::SUCCESS,
    Ok(false) => ExitCode::FAILURE,
    Err(err) => {
      error!(error = %err, "sensor demo failed");
      eprintln!("sensor-demo: {err}");
      ExitCode::FAILURE
    }
  }
}
