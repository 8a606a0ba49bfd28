//! The two pluggable behaviours at the edge of the buffer: where values come
//! from and where items go.
//!
//! Both traits are implemented for plain closures, so tests and small programs
//! can pass `|category| Ok(42)` or `|item, slot| Ok(())` directly.

use crate::item::{Category, Item};

/// Error type returned by value sources and sinks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Produces raw values for a producer task.
///
/// Implementations may be called concurrently from several producer threads
/// and must not touch the buffer themselves.
pub trait ValueSource<V>: Send + Sync {
  fn generate(&self, category: &Category) -> Result<V, BoxError>;

  /// Renders a generated value for the producer's `Put <value> at <slot>`
  /// progress event. The default renders nothing and the event is skipped.
  ///
  /// Called before the item is stored, with no lock or permit held.
  fn describe(&self, _category: &Category, _value: &V) -> Option<String> {
    None
  }
}

/// Receives items drained by a consumer task.
///
/// `slot` is the buffer cell the item was read from. Failures belong to the
/// sink: the buffer has already released that slot by the time `consume` runs.
pub trait Sink<V>: Send + Sync {
  fn consume(&self, item: Item<V>, slot: usize) -> Result<(), BoxError>;
}

impl<V, F> ValueSource<V> for F
where
  F: Fn(&Category) -> Result<V, BoxError> + Send + Sync,
{
  fn generate(&self, category: &Category) -> Result<V, BoxError> {
    self(category)
  }
}

impl<V, F> Sink<V> for F
where
  F: Fn(Item<V>, usize) -> Result<(), BoxError> + Send + Sync,
{
  fn consume(&self, item: Item<V>, slot: usize) -> Result<(), BoxError> {
    self(item, slot)
  }
}
