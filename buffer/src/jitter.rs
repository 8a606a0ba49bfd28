//! Bounded random pauses used to emulate uneven arrival and processing rates.

use std::thread;
use std::time::Duration;

use rand::Rng;

/// A pause drawn uniformly from `[0, max)` after each task iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Jitter {
  max: Duration,
}

impl Jitter {
  /// No pause at all.
  pub const NONE: Jitter = Jitter { max: Duration::ZERO };

  pub fn up_to(max: Duration) -> Self {
    Jitter { max }
  }

  pub fn from_millis(max_ms: u64) -> Self {
    Self::up_to(Duration::from_millis(max_ms))
  }

  #[inline]
  pub fn max(&self) -> Duration {
    self.max
  }

  #[inline]
  pub fn is_none(&self) -> bool {
    self.max.is_zero()
  }

  pub fn sample(&self) -> Duration {
    if self.is_none() {
      return Duration::ZERO;
    }
    let max_micros = u64::try_from(self.max.as_micros()).unwrap_or(u64::MAX);
    if max_micros == 0 {
      return Duration::ZERO;
    }
    let mut rng = rand::rng();
    Duration::from_micros(rng.random_range(0..max_micros))
  }

  /// Sleeps the calling thread for a freshly sampled duration.
  pub fn pause(&self) {
    let delay = self.sample();
    if !delay.is_zero() {
      thread::sleep(delay);
    }
  }
}
