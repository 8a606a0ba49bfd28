//! Stand-in collaborators for a slotgate run: simulated sensors as the value
//! source, a logging sink as the consumer side, and the logging setup used by
//! the `sensor-demo` binary.

pub mod error;
pub mod logging;
pub mod sensor;
pub mod sink;

pub use error::{Error, Result};
pub use sensor::{SensorKind, SensorSource};
pub use sink::ReadingSink;
