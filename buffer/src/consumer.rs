//! The consumer task body.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::buffer::{BoundedBuffer, Slotted};
use crate::capability::Sink;
use crate::item::Item;
use crate::jitter::Jitter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConsumerState {
  Idle,
  /// Parked on the filled-slot gate.
  WaitingForItem,
  /// Inside the region, taking from the read cursor.
  Reading,
  /// Released a permit to the free-slot gate; the sink runs from here.
  Signaled,
  /// The buffer was closed and drained.
  Done,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerReport {
  pub id: usize,
  pub consumed: usize,
  /// Items the sink rejected. They still count as consumed.
  pub sink_failures: usize,
  /// Items taken, keyed by producer id.
  pub per_producer: BTreeMap<usize, usize>,
}

/// Drains a shared buffer into a sink until the buffer is closed and empty.
pub struct Consumer<V> {
  id: usize,
  sink: Arc<dyn Sink<V>>,
  buffer: Arc<BoundedBuffer<Item<V>>>,
  jitter: Jitter,
  state: ConsumerState,
}

impl<V: Send + 'static> Consumer<V> {
  pub fn new(id: usize, sink: Arc<dyn Sink<V>>, buffer: Arc<BoundedBuffer<Item<V>>>) -> Self {
    Consumer {
      id,
      sink,
      buffer,
      jitter: Jitter::NONE,
      state: ConsumerState::Idle,
    }
  }

  pub fn with_jitter(mut self, jitter: Jitter) -> Self {
    self.jitter = jitter;
    self
  }

  pub fn id(&self) -> usize {
    self.id
  }

  fn transition(&mut self, next: ConsumerState) {
    trace!(consumer = self.id, from = ?self.state, to = ?next, "consumer state");
    self.state = next;
  }

  /// Runs until the buffer reports closed. Because a closed buffer keeps
  /// handing out whatever is still stored, returning means every item that
  /// reached a slot has been taken by some consumer.
  pub fn run(mut self) -> ConsumerReport {
    debug!(consumer = self.id, "consumer started");
    let mut report = ConsumerReport {
      id: self.id,
      ..ConsumerReport::default()
    };

    loop {
      self.transition(ConsumerState::WaitingForItem);
      if self.buffer.acquire_filled().is_err() {
        break;
      }

      self.transition(ConsumerState::Reading);
      let taken = self.buffer.take();

      self.transition(ConsumerState::Signaled);
      self.buffer.signal_free();

      let Slotted { slot, item } = taken;
      debug!(
        consumer = self.id,
        slot,
        producer = item.producer(),
        seq = item.seq(),
        "got item"
      );
      report.consumed += 1;
      *report.per_producer.entry(item.producer()).or_default() += 1;

      if let Err(err) = self.sink.consume(item, slot) {
        report.sink_failures += 1;
        warn!(consumer = self.id, error = %err, "sink failed to consume item");
      }

      self.jitter.pause();
    }

    self.transition(ConsumerState::Done);
    debug!(consumer = self.id, consumed = report.consumed, "consumer finished");
    report
  }
}
