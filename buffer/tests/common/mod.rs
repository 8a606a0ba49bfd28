#![allow(dead_code)]

use std::time::Duration;

use slotgate::{BoxError, Category, Item};

pub const SHORT_TIMEOUT: Duration = Duration::from_millis(500);
pub const LONG_TIMEOUT: Duration = Duration::from_secs(3);
pub const STRESS_TIMEOUT: Duration = Duration::from_secs(15);
pub const ITEMS_LOW: usize = 50;
pub const ITEMS_MEDIUM: usize = 200;
pub const ITEMS_HIGH: usize = 1000;

pub fn item(producer: usize, seq: u64) -> Item<u64> {
  Item::new(Category::new("A"), producer, seq, seq)
}

/// A value source that returns the same reading every time.
pub fn constant_source(value: u32) -> impl Fn(&Category) -> Result<u32, BoxError> + Send + Sync {
  move |_: &Category| -> Result<u32, BoxError> { Ok(value) }
}

/// Asserts that, for every producer, the sequence numbers appear in strictly
/// increasing order within `observed`.
pub fn assert_per_producer_fifo<V>(observed: &[Item<V>]) {
  let mut last_seen = std::collections::HashMap::new();
  for item in observed {
    if let Some(prev) = last_seen.insert(item.producer(), item.seq()) {
      assert!(
        item.seq() > prev,
        "producer {} item {} observed after item {}",
        item.producer(),
        item.seq(),
        prev
      );
    }
  }
}
