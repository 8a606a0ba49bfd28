use std::sync::atomic::{AtomicUsize, Ordering};

use slotgate::{BoxError, Item, Sink};
use tracing::info;

use crate::sensor::SensorKind;

/// Logs each reading it receives and keeps a running count.
#[derive(Debug, Default)]
pub struct ReadingSink {
  received: AtomicUsize,
}

impl ReadingSink {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn received(&self) -> usize {
    self.received.load(Ordering::Relaxed)
  }
}

impl Sink<i32> for ReadingSink {
  fn consume(&self, item: Item<i32>, slot: usize) -> Result<(), BoxError> {
    let unit = item
      .category()
      .as_str()
      .parse::<SensorKind>()
      .map(SensorKind::unit)
      .unwrap_or("");
    info!(
      category = %item.category(),
      producer = item.producer(),
      seq = item.seq(),
      slot,
      "Got {}{} from {}",
      item.value(),
      unit,
      slot
    );
    self.received.fetch_add(1, Ordering::Relaxed);
    Ok(())
  }
}
