//! The unit of work that flows through the buffer.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// The semantic tag naming where an item came from (e.g. `Temperature`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Category(Arc<str>);

impl Category {
  pub fn new(name: impl AsRef<str>) -> Self {
    Category(Arc::from(name.as_ref()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Debug for Category {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Category({})", self.0)
  }
}

impl fmt::Display for Category {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for Category {
  fn from(name: &str) -> Self {
    Category::new(name)
  }
}

impl From<String> for Category {
  fn from(name: String) -> Self {
    Category(Arc::from(name))
  }
}

impl From<Category> for String {
  fn from(category: Category) -> Self {
    category.0.to_string()
  }
}

/// A produced value, tagged with its category, the producer that made it and
/// that producer's sequence number for it.
///
/// Items are immutable once produced and move by value: producer, then slot,
/// then consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item<V> {
  category: Category,
  producer: usize,
  seq: u64,
  value: V,
}

impl<V> Item<V> {
  pub fn new(category: Category, producer: usize, seq: u64, value: V) -> Self {
    Self {
      category,
      producer,
      seq,
      value,
    }
  }

  #[inline]
  pub fn category(&self) -> &Category {
    &self.category
  }

  /// Id of the producer task that generated this item.
  #[inline]
  pub fn producer(&self) -> usize {
    self.producer
  }

  /// Position of this item in its producer's output, starting at 0.
  #[inline]
  pub fn seq(&self) -> u64 {
    self.seq
  }

  #[inline]
  pub fn value(&self) -> &V {
    &self.value
  }

  pub fn into_value(self) -> V {
    self.value
  }
}
