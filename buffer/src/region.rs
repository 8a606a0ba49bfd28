//! The mutual-exclusion region guarding the cursors and the slot pool.
//!
//! Everything that moves a cursor or touches a cell happens inside
//! `Region::with_lock`. Gate waits and gate signals never do: holding the
//! region while parked on a gate would stop the other side from ever freeing
//! the capacity being waited for.

use parking_lot::Mutex;

use crate::pool::SlotPool;

/// The pool plus its two cursors. Only reachable through `Region::with_lock`.
#[derive(Debug)]
pub struct PoolState<T> {
  pool: SlotPool<T>,
  write_cursor: usize,
  read_cursor: usize,
  len: usize,
}

impl<T> PoolState<T> {
  fn new(capacity: usize) -> Self {
    PoolState {
      pool: SlotPool::new(capacity),
      write_cursor: 0,
      read_cursor: 0,
      len: 0,
    }
  }

  #[inline]
  fn advance(&self, cursor: usize) -> usize {
    (cursor + 1) % self.pool.capacity()
  }

  /// Stores `item` at the write cursor and advances it. Returns the slot index
  /// that was filled.
  pub fn push(&mut self, item: T) -> usize {
    let slot = self.write_cursor;
    self.pool.write_at(slot, item);
    self.write_cursor = self.advance(slot);
    self.len += 1;
    slot
  }

  /// Takes the item at the read cursor and advances it.
  pub fn pop(&mut self) -> (usize, T) {
    let slot = self.read_cursor;
    let item = self.pool.read_at(slot);
    self.read_cursor = self.advance(slot);
    self.len -= 1;
    (slot, item)
  }

  #[inline]
  pub fn capacity(&self) -> usize {
    self.pool.capacity()
  }

  /// Filled cells as tracked by the cursors.
  #[inline]
  pub fn len(&self) -> usize {
    self.len
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  #[inline]
  pub fn write_cursor(&self) -> usize {
    self.write_cursor
  }

  #[inline]
  pub fn read_cursor(&self) -> usize {
    self.read_cursor
  }

  /// Counts occupied cells directly, independent of the cursors.
  pub fn occupied(&self) -> usize {
    self.pool.occupied()
  }
}

/// Scoped exclusive access to a `PoolState`.
#[derive(Debug)]
pub struct Region<T> {
  state: Mutex<PoolState<T>>,
}

impl<T> Region<T> {
  pub fn new(capacity: usize) -> Self {
    Region {
      state: Mutex::new(PoolState::new(capacity)),
    }
  }

  /// Runs `body` with the region held. The guard is released on every exit
  /// path, including a panic unwinding out of `body`, and `parking_lot` locks
  /// are not poisoned, so the region stays usable afterwards.
  #[inline]
  pub fn with_lock<R>(&self, body: impl FnOnce(&mut PoolState<T>) -> R) -> R {
    let mut guard = self.state.lock();
    body(&mut guard)
  }
}
