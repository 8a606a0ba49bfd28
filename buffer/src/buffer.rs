//! The bounded buffer: a slot pool behind a mutual-exclusion region, fronted by
//! a pair of capacity gates.
//!
//! ### Protocol
//!
//! Enqueue: acquire a permit from the `free` gate, store the item at the write
//! cursor inside the region, then release a permit to the `filled` gate.
//!
//! Dequeue: acquire from `filled`, take the item at the read cursor inside the
//! region, then release to `free`.
//!
//! The gates decide *whether* a slot is available; the region decides *which*
//! slot. Because a producer only reaches the region after a consumer has
//! released the cell it is about to overwrite, a cell is never written before
//! the previous occupant was read.
//!
//! ### Shutdown
//!
//! `close` stops new enqueues and wakes everyone parked on either gate.
//! Blocked producers get their item back; consumers keep receiving until the
//! filled gate runs dry and only then see `DequeueError::Closed`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::trace;

use crate::coord::CapacityGate;
use crate::error::{
  AcquireError, ConfigError, ConsistencyError, DequeueError, DequeueTimeoutError, EnqueueError,
  TryDequeueError, TryEnqueueError,
};
use crate::region::Region;

/// An item together with the slot index it occupied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slotted<T> {
  pub slot: usize,
  pub item: T,
}

impl<T> Slotted<T> {
  pub fn into_inner(self) -> T {
    self.item
  }
}

/// Point-in-time view of the buffer's counters.
///
/// Gate counts and pool state are read under separate locks, so the snapshot
/// is only guaranteed to be coherent when no task is mid-operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSnapshot {
  pub capacity: usize,
  /// Permits available on the free-slot gate.
  pub free: usize,
  /// Permits available on the filled-slot gate.
  pub filled: usize,
  /// Filled cells according to the cursors.
  pub len: usize,
  pub write_cursor: usize,
  pub read_cursor: usize,
  pub closed: bool,
}

/// A fixed-capacity circular buffer shared by any number of producers and
/// consumers. Share it with `Arc`.
#[derive(Debug)]
pub struct BoundedBuffer<T> {
  free: CapacityGate,
  filled: CapacityGate,
  region: Region<T>,
  closed: AtomicBool,
}

impl<T> BoundedBuffer<T> {
  /// Creates a buffer with `capacity` slots, all free.
  pub fn new(capacity: usize) -> Result<Self, ConfigError> {
    if capacity == 0 {
      return Err(ConfigError::ZeroCapacity);
    }
    Ok(BoundedBuffer {
      free: CapacityGate::new(capacity),
      filled: CapacityGate::with_permits(capacity, 0),
      region: Region::new(capacity),
      closed: AtomicBool::new(false),
    })
  }

  #[inline]
  pub fn capacity(&self) -> usize {
    self.free.capacity()
  }

  /// Number of items currently stored.
  pub fn len(&self) -> usize {
    self.region.with_lock(|state| state.len())
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn is_closed(&self) -> bool {
    self.closed.load(Ordering::Acquire)
  }

  // --- Protocol steps ---
  //
  // Producer and consumer tasks drive these one at a time so their state
  // machines can observe each step. The public enqueue/dequeue methods below
  // compose them in the only valid order.

  #[inline]
  pub(crate) fn acquire_free(&self) -> Result<(), AcquireError> {
    if self.is_closed() {
      return Err(AcquireError::Closed);
    }
    self.free.acquire_sync()
  }

  /// Writes into the slot a free permit was just taken for.
  #[inline]
  pub(crate) fn store(&self, item: T) -> usize {
    self.region.with_lock(|state| state.push(item))
  }

  #[inline]
  pub(crate) fn signal_filled(&self) {
    self.filled.release();
  }

  #[inline]
  pub(crate) fn acquire_filled(&self) -> Result<(), AcquireError> {
    self.filled.acquire_sync()
  }

  /// Takes from the slot a filled permit was just taken for.
  #[inline]
  pub(crate) fn take(&self) -> Slotted<T> {
    let (slot, item) = self.region.with_lock(|state| state.pop());
    Slotted { slot, item }
  }

  #[inline]
  pub(crate) fn signal_free(&self) {
    self.free.release();
  }

  // --- Blocking API ---

  /// Stores `item`, parking the calling thread while every slot is full.
  /// Returns the slot index the item landed in.
  pub fn enqueue(&self, item: T) -> Result<usize, EnqueueError<T>> {
    if self.acquire_free().is_err() {
      return Err(EnqueueError::Closed(item));
    }
    let slot = self.store(item);
    self.signal_filled();
    trace!(slot, "enqueued");
    Ok(slot)
  }

  /// Takes the oldest item, parking the calling thread while the buffer is
  /// empty.
  pub fn dequeue(&self) -> Result<Slotted<T>, DequeueError> {
    self
      .acquire_filled()
      .map_err(|_| DequeueError::Closed)?;
    let taken = self.take();
    self.signal_free();
    trace!(slot = taken.slot, "dequeued");
    Ok(taken)
  }

  /// Like `dequeue`, but gives up after `timeout`.
  pub fn dequeue_timeout(&self, timeout: Duration) -> Result<Slotted<T>, DequeueTimeoutError> {
    match self.filled.acquire_timeout(timeout) {
      Ok(()) => {}
      Err(AcquireError::Closed) => return Err(DequeueTimeoutError::Closed),
      Err(AcquireError::Timeout) => return Err(DequeueTimeoutError::Timeout),
    }
    let taken = self.take();
    self.signal_free();
    Ok(taken)
  }

  // --- Non-blocking API ---

  pub fn try_enqueue(&self, item: T) -> Result<usize, TryEnqueueError<T>> {
    if self.is_closed() {
      return Err(TryEnqueueError::Closed(item));
    }
    if !self.free.try_acquire() {
      return Err(TryEnqueueError::Full(item));
    }
    let slot = self.store(item);
    self.signal_filled();
    Ok(slot)
  }

  pub fn try_dequeue(&self) -> Result<Slotted<T>, TryDequeueError> {
    if !self.filled.try_acquire() {
      return if self.filled.is_closed() {
        Err(TryDequeueError::Closed)
      } else {
        Err(TryDequeueError::Empty)
      };
    }
    let taken = self.take();
    self.signal_free();
    Ok(taken)
  }

  // --- Async API ---

  /// Async counterpart of `enqueue`; the task is suspended instead of the
  /// thread. Dropping the future before it completes returns any permit it
  /// was granted.
  pub async fn enqueue_async(&self, item: T) -> Result<usize, EnqueueError<T>> {
    if self.is_closed() {
      return Err(EnqueueError::Closed(item));
    }
    if self.free.acquire_async().await.is_err() {
      return Err(EnqueueError::Closed(item));
    }
    let slot = self.store(item);
    self.signal_filled();
    Ok(slot)
  }

  /// Async counterpart of `dequeue`.
  pub async fn dequeue_async(&self) -> Result<Slotted<T>, DequeueError> {
    self
      .filled
      .acquire_async()
      .await
      .map_err(|_| DequeueError::Closed)?;
    let taken = self.take();
    self.signal_free();
    Ok(taken)
  }

  // --- Lifecycle and inspection ---

  /// Stops the buffer from accepting new items and wakes every parked task.
  ///
  /// Items already stored stay dequeueable. An enqueue that had already passed
  /// its free-slot wait when `close` ran still completes, and its item remains
  /// reachable through `try_dequeue`. Close after producers have finished to
  /// avoid that window.
  ///
  /// Returns `false` if the buffer was already closed.
  pub fn close(&self) -> bool {
    if self
      .closed
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .is_err()
    {
      return false;
    }
    self.free.close();
    self.filled.close();
    true
  }

  pub fn snapshot(&self) -> BufferSnapshot {
    let (len, write_cursor, read_cursor) =
      self
        .region
        .with_lock(|state| (state.len(), state.write_cursor(), state.read_cursor()));
    BufferSnapshot {
      capacity: self.capacity(),
      free: self.free.available(),
      filled: self.filled.available(),
      len,
      write_cursor,
      read_cursor,
      closed: self.is_closed(),
    }
  }

  /// Audits the gate counters against the slot pool.
  ///
  /// Only meaningful while no producer or consumer is between its gate
  /// acquire and its matching release.
  pub fn check_consistency(&self) -> Result<(), ConsistencyError> {
    let occupied = self.region.with_lock(|state| {
      debug_assert_eq!(state.len(), state.occupied());
      state.occupied()
    });
    let free = self.free.available();
    let filled = self.filled.available();
    let capacity = self.capacity();
    if free + filled != capacity {
      return Err(ConsistencyError::GateImbalance {
        free,
        filled,
        capacity,
      });
    }
    if occupied != filled {
      return Err(ConsistencyError::CursorMismatch { occupied, filled });
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn zero_capacity_is_a_config_error() {
    assert!(matches!(
      BoundedBuffer::<u8>::new(0),
      Err(ConfigError::ZeroCapacity)
    ));
  }

  #[test]
  fn fresh_buffer_is_consistent() {
    let buffer = BoundedBuffer::<u8>::new(4).unwrap();
    let snapshot = buffer.snapshot();
    assert_eq!(snapshot.free, 4);
    assert_eq!(snapshot.filled, 0);
    assert_eq!(snapshot.len, 0);
    assert!(!snapshot.closed);
    buffer.check_consistency().unwrap();
  }

  #[test]
  fn protocol_steps_keep_counts_balanced() {
    let buffer = BoundedBuffer::new(2).unwrap();
    buffer.acquire_free().unwrap();
    assert_eq!(buffer.store("x"), 0);
    buffer.signal_filled();
    buffer.check_consistency().unwrap();

    buffer.acquire_filled().unwrap();
    let taken = buffer.take();
    buffer.signal_free();
    assert_eq!(taken, Slotted { slot: 0, item: "x" });
    buffer.check_consistency().unwrap();
  }

  #[test]
  fn mid_operation_imbalance_is_reported() {
    let buffer = BoundedBuffer::<u8>::new(2).unwrap();
    buffer.acquire_free().unwrap();
    assert_eq!(
      buffer.check_consistency(),
      Err(ConsistencyError::GateImbalance {
        free: 1,
        filled: 0,
        capacity: 2
      })
    );
    buffer.signal_free();
    buffer.check_consistency().unwrap();
  }
}
