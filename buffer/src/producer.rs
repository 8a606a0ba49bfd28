//! The producer task body.

use std::num::NonZeroUsize;
use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use crate::buffer::BoundedBuffer;
use crate::capability::{BoxError, ValueSource};
use crate::error::TaskError;
use crate::item::{Category, Item};
use crate::jitter::Jitter;

/// Where a producer is in its loop. Reported on every transition at `trace`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProducerState {
  Idle,
  /// Asking the value source for the next value. No permit or lock held.
  Generating,
  /// Parked on the free-slot gate.
  WaitingForSlot,
  /// Inside the region, storing at the write cursor.
  Writing,
  /// Released a permit to the filled-slot gate.
  Signaled,
  /// Quota reached.
  Done,
}

/// What a producer did before reaching its quota.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerReport {
  pub id: usize,
  pub category: Category,
  pub produced: usize,
  /// Generate attempts that failed and were retried.
  pub source_failures: usize,
}

/// Generates `quota` items from a value source and pushes them into a shared
/// buffer, one at a time and in order.
pub struct Producer<V> {
  id: usize,
  category: Category,
  quota: usize,
  source: Arc<dyn ValueSource<V>>,
  buffer: Arc<BoundedBuffer<Item<V>>>,
  jitter: Jitter,
  attempts: NonZeroUsize,
  state: ProducerState,
  source_failures: usize,
}

impl<V: Send + 'static> Producer<V> {
  pub fn new(
    id: usize,
    category: Category,
    quota: usize,
    source: Arc<dyn ValueSource<V>>,
    buffer: Arc<BoundedBuffer<Item<V>>>,
  ) -> Self {
    Producer {
      id,
      category,
      quota,
      source,
      buffer,
      jitter: Jitter::NONE,
      attempts: NonZeroUsize::MIN,
      state: ProducerState::Idle,
      source_failures: 0,
    }
  }

  pub fn with_jitter(mut self, jitter: Jitter) -> Self {
    self.jitter = jitter;
    self
  }

  /// How many times a single item's `generate` is tried before the task
  /// gives up.
  pub fn with_attempts(mut self, attempts: NonZeroUsize) -> Self {
    self.attempts = attempts;
    self
  }

  pub fn id(&self) -> usize {
    self.id
  }

  fn transition(&mut self, next: ProducerState) {
    trace!(producer = self.id, from = ?self.state, to = ?next, "producer state");
    self.state = next;
  }

  /// Runs the loop to completion.
  ///
  /// A failed `generate` is retried without ever holding a gate permit, so
  /// giving up leaves the buffer exactly as it was.
  pub fn run(mut self) -> Result<ProducerReport, TaskError> {
    debug!(producer = self.id, category = %self.category, quota = self.quota, "producer started");

    let mut produced = 0;
    while produced < self.quota {
      self.transition(ProducerState::Generating);
      let value = self.generate(produced)?;
      let shown = self.source.describe(&self.category, &value);
      let item = Item::new(self.category.clone(), self.id, produced as u64, value);

      self.transition(ProducerState::WaitingForSlot);
      if self.buffer.acquire_free().is_err() {
        warn!(
          producer = self.id,
          category = %self.category,
          seq = item.seq(),
          produced,
          "buffer closed before quota was reached; discarding generated item"
        );
        self.transition(ProducerState::Done);
        return Err(TaskError::BufferClosed {
          producer: self.id,
          produced,
        });
      }

      self.transition(ProducerState::Writing);
      let slot = self.buffer.store(item);

      self.transition(ProducerState::Signaled);
      self.buffer.signal_filled();
      match shown {
        Some(shown) => info!(
          producer = self.id,
          category = %self.category,
          seq = produced,
          slot,
          "Put {shown} at {slot}"
        ),
        None => debug!(producer = self.id, category = %self.category, seq = produced, slot, "put item"),
      }
      produced += 1;

      self.jitter.pause();
    }

    self.transition(ProducerState::Done);
    debug!(producer = self.id, produced, "producer finished");
    Ok(ProducerReport {
      id: self.id,
      category: self.category,
      produced,
      source_failures: self.source_failures,
    })
  }

  fn generate(&mut self, produced: usize) -> Result<V, TaskError> {
    let mut last_error: Option<BoxError> = None;
    for attempt in 1..=self.attempts.get() {
      match self.source.generate(&self.category) {
        Ok(value) => return Ok(value),
        Err(err) => {
          self.source_failures += 1;
          warn!(producer = self.id, attempt, error = %err, "value source failed");
          last_error = Some(err);
        }
      }
    }
    self.transition(ProducerState::Done);
    Err(TaskError::Source {
      producer: self.id,
      produced,
      attempts: self.attempts.get(),
      source: last_error.unwrap_or_else(|| "value source failed".into()),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use parking_lot::Mutex;
  use std::io;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use tracing_subscriber::fmt::MakeWriter;

  #[derive(Clone, Default)]
  struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

  impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
      self.0.lock().extend_from_slice(buf);
      Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
      Ok(())
    }
  }

  impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
      self.clone()
    }
  }

  /// Runs `body` on this thread with an `info` subscriber and returns what it
  /// logged.
  fn capture_info(body: impl FnOnce()) -> String {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
      .with_writer(logs.clone())
      .with_ansi(false)
      .with_max_level(tracing::Level::INFO)
      .finish();
    tracing::subscriber::with_default(subscriber, body);
    let bytes = logs.0.lock().clone();
    String::from_utf8(bytes).unwrap()
  }

  struct Described;

  impl ValueSource<u32> for Described {
    fn generate(&self, _: &Category) -> Result<u32, BoxError> {
      Ok(21)
    }

    fn describe(&self, category: &Category, value: &u32) -> Option<String> {
      Some(format!("{value} {category}"))
    }
  }

  fn counter_source() -> Arc<dyn ValueSource<usize>> {
    let next = AtomicUsize::new(0);
    Arc::new(move |_: &Category| -> Result<usize, BoxError> { Ok(next.fetch_add(1, Ordering::Relaxed)) })
  }

  #[test]
  fn zero_quota_never_touches_buffer() {
    let buffer = Arc::new(BoundedBuffer::new(1).unwrap());
    let producer = Producer::new(0, "A".into(), 0, counter_source(), buffer.clone());
    let report = producer.run().unwrap();
    assert_eq!(report.produced, 0);

    let snapshot = buffer.snapshot();
    assert_eq!((snapshot.free, snapshot.filled, snapshot.len), (1, 0, 0));
    assert_eq!(snapshot.write_cursor, 0);
  }

  #[test]
  fn fills_buffer_in_order() {
    let buffer = Arc::new(BoundedBuffer::new(4).unwrap());
    let producer = Producer::new(3, "A".into(), 4, counter_source(), buffer.clone());
    let report = producer.run().unwrap();
    assert_eq!(report.produced, 4);
    assert_eq!(report.id, 3);

    for expected in 0..4u64 {
      let item = buffer.try_dequeue().unwrap().into_inner();
      assert_eq!(item.seq(), expected);
      assert_eq!(item.producer(), 3);
    }
  }

  #[test]
  fn retries_flaky_source_without_taking_a_slot() {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();
    let source: Arc<dyn ValueSource<u32>> = Arc::new(move |_: &Category| -> Result<u32, BoxError> {
      if calls_clone.fetch_add(1, Ordering::Relaxed) % 2 == 0 {
        Err("sensor glitch".into())
      } else {
        Ok(7)
      }
    });
    let buffer = Arc::new(BoundedBuffer::new(2).unwrap());
    let report = Producer::new(0, "A".into(), 2, source, buffer.clone())
      .with_attempts(NonZeroUsize::new(2).unwrap())
      .run()
      .unwrap();

    assert_eq!(report.produced, 2);
    assert_eq!(report.source_failures, 2);
    assert_eq!(buffer.len(), 2);
    buffer.check_consistency().unwrap();
  }

  #[test]
  fn exhausted_retries_end_the_task_cleanly() {
    let source: Arc<dyn ValueSource<u32>> =
      Arc::new(|_: &Category| -> Result<u32, BoxError> { Err("offline".into()) });
    let buffer = Arc::new(BoundedBuffer::new(2).unwrap());
    let err = Producer::new(5, "B".into(), 3, source, buffer.clone())
      .with_attempts(NonZeroUsize::new(3).unwrap())
      .run()
      .unwrap_err();

    match err {
      TaskError::Source {
        producer,
        produced,
        attempts,
        ..
      } => {
        assert_eq!(producer, 5);
        assert_eq!(produced, 0);
        assert_eq!(attempts, 3);
      }
      other => panic!("unexpected error: {other}"),
    }
    let snapshot = buffer.snapshot();
    assert_eq!((snapshot.free, snapshot.filled), (2, 0));
  }

  #[test]
  fn closed_buffer_stops_producer() {
    let buffer = Arc::new(BoundedBuffer::new(2).unwrap());
    buffer.close();
    let err = Producer::new(1, "A".into(), 5, counter_source(), buffer)
      .run()
      .unwrap_err();
    assert!(matches!(
      err,
      TaskError::BufferClosed {
        producer: 1,
        produced: 0
      }
    ));
  }

  #[test]
  fn described_values_log_put_lines() {
    let buffer = Arc::new(BoundedBuffer::new(2).unwrap());
    let source: Arc<dyn ValueSource<u32>> = Arc::new(Described);
    let logs = capture_info(|| {
      Producer::new(0, "Gauge".into(), 2, source, buffer.clone()).run().unwrap();
    });

    assert!(logs.contains("Put 21 Gauge at 0"), "logs were: {logs}");
    assert!(logs.contains("Put 21 Gauge at 1"), "logs were: {logs}");
  }

  #[test]
  fn undescribed_values_stay_below_info() {
    let buffer = Arc::new(BoundedBuffer::new(1).unwrap());
    let logs = capture_info(|| {
      Producer::new(0, "A".into(), 1, counter_source(), buffer.clone()).run().unwrap();
    });
    assert!(!logs.contains("Put"), "logs were: {logs}");
  }

  #[test]
  fn closed_buffer_reports_the_discarded_item() {
    let buffer = Arc::new(BoundedBuffer::new(1).unwrap());
    buffer.close();
    let logs = capture_info(|| {
      let err = Producer::new(2, "A".into(), 3, counter_source(), buffer.clone())
        .run()
        .unwrap_err();
      assert_eq!(err.produced(), 0);
    });
    assert!(logs.contains("discarding generated item"), "logs were: {logs}");
    assert!(logs.contains("seq=0"), "logs were: {logs}");
  }
}
