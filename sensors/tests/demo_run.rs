use std::sync::Arc;

use slotgate::{Config, Coordinator};
use slotgate_sensors::{ReadingSink, SensorKind, SensorSource};

#[test]
fn default_sensor_layout_runs_to_completion() {
  let config = Config::default().with_jitter_ms(1, 1);
  let sink = Arc::new(ReadingSink::new());
  let report = Coordinator::<i32>::from_shared(config, Arc::new(SensorSource), sink.clone())
    .run()
    .unwrap();

  assert!(report.is_clean());
  assert_eq!(report.total_consumed(), 30);
  assert_eq!(sink.received(), 30);
  assert_eq!(report.snapshot.free, 5);
  assert_eq!(report.snapshot.filled, 0);
}

#[test]
fn example_config_parses() {
  let yaml = include_str!("../slotgate.example.yaml");
  let config = Config::from_yaml_str(yaml).unwrap();
  assert_eq!(config, Config::default());
}

#[test]
fn unknown_sensor_fails_only_that_producer() {
  let config = Config::new(2, 1, 5, [SensorKind::Humidity.category(), "Barometer".into()]);
  let report = Coordinator::new(config, SensorSource, ReadingSink::new()).run().unwrap();

  assert_eq!(report.failures.len(), 1);
  assert_eq!(report.failures[0].producer(), 1);
  assert_eq!(report.total_consumed(), 5);
}
