//! The fixed-size circular slot storage.

use std::fmt;

/// `capacity` item cells addressed by index. The pool itself keeps no cursors;
/// `PoolState` in the region module owns those and is the only caller.
///
/// Writing into an occupied cell or reading an empty one means the gate
/// protocol was broken somewhere, and both panic rather than lose or
/// duplicate an item.
pub struct SlotPool<T> {
  slots: Box<[Option<T>]>,
}

impl<T> SlotPool<T> {
  /// # Panics
  ///
  /// Panics if `capacity` is `0`.
  pub fn new(capacity: usize) -> Self {
    assert!(capacity > 0, "slot pool capacity must be greater than 0");
    SlotPool {
      slots: (0..capacity).map(|_| None).collect(),
    }
  }

  #[inline]
  pub fn capacity(&self) -> usize {
    self.slots.len()
  }

  #[inline]
  pub fn is_occupied(&self, index: usize) -> bool {
    self.slots[index].is_some()
  }

  /// Number of occupied cells. Walks the whole pool.
  pub fn occupied(&self) -> usize {
    self.slots.iter().filter(|slot| slot.is_some()).count()
  }

  pub fn write_at(&mut self, index: usize, item: T) {
    let slot = &mut self.slots[index];
    assert!(slot.is_none(), "write into occupied slot {index}");
    *slot = Some(item);
  }

  pub fn read_at(&mut self, index: usize) -> T {
    match self.slots[index].take() {
      Some(item) => item,
      None => panic!("read from empty slot {index}"),
    }
  }
}

impl<T> fmt::Debug for SlotPool<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SlotPool")
      .field("capacity", &self.capacity())
      .field("occupied", &self.occupied())
      .finish()
  }
}
