//! Simulated sensors.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use slotgate::{BoxError, Category, ValueSource};

use crate::error::Error;

/// The kinds of sensor the demo knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
  Temperature,
  Humidity,
}

impl SensorKind {
  /// Range of simulated readings, inclusive start, exclusive end.
  pub fn range(self) -> std::ops::Range<i32> {
    match self {
      SensorKind::Temperature => 10..50,
      SensorKind::Humidity => 0..100,
    }
  }

  pub fn unit(self) -> &'static str {
    match self {
      SensorKind::Temperature => "°C",
      SensorKind::Humidity => "%RH",
    }
  }

  pub fn name(self) -> &'static str {
    match self {
      SensorKind::Temperature => "Temperature",
      SensorKind::Humidity => "Humidity",
    }
  }

  pub fn category(self) -> Category {
    Category::new(self.name())
  }
}

impl fmt::Display for SensorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for SensorKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "temperature" => Ok(SensorKind::Temperature),
      "humidity" => Ok(SensorKind::Humidity),
      _ => Err(Error::UnknownSensor(s.to_string())),
    }
  }
}

/// A value source that reads a random value in the sensor's range. The
/// producer's category picks the sensor.
#[derive(Debug, Default, Clone, Copy)]
pub struct SensorSource;

impl SensorSource {
  pub fn read(kind: SensorKind) -> i32 {
    rand::rng().random_range(kind.range())
  }
}

impl ValueSource<i32> for SensorSource {
  fn generate(&self, category: &Category) -> Result<i32, BoxError> {
    let kind: SensorKind = category.as_str().parse()?;
    let reading = Self::read(kind);
    tracing::debug!(sensor = %kind, reading, unit = kind.unit(), "read sensor");
    Ok(reading)
  }

  fn describe(&self, category: &Category, value: &i32) -> Option<String> {
    let unit = category.as_str().parse::<SensorKind>().map(SensorKind::unit).unwrap_or("");
    Some(format!("{value}{unit}"))
  }
}
