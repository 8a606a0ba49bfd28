// src/error.rs

use core::fmt;
use std::io;

use thiserror::Error;

use crate::capability::BoxError;

/// Error returned by `acquire` operations on a `CapacityGate`.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum AcquireError {
  /// The gate was closed and has no permits left to hand out.
  #[error("capacity gate closed")]
  Closed,
  /// The timeout elapsed before a permit became available.
  #[error("capacity gate acquire timed out")]
  Timeout,
}

/// Error returned by blocking and async `enqueue` operations. The rejected
/// item is handed back so it is never lost.
#[derive(Error, PartialEq, Eq, Clone)]
pub enum EnqueueError<T> {
  #[error("buffer closed")]
  Closed(T),
}

/// Error returned by `try_enqueue` when the item could not be stored
/// immediately. The item being enqueued is returned.
#[derive(Error, PartialEq, Eq, Clone)]
pub enum TryEnqueueError<T> {
  /// Every slot is occupied.
  #[error("buffer full")]
  Full(T),
  #[error("buffer closed")]
  Closed(T),
}

impl<T> fmt::Debug for EnqueueError<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      EnqueueError::Closed(_) => write!(f, "EnqueueError::Closed(..)"),
    }
  }
}

impl<T> fmt::Debug for TryEnqueueError<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TryEnqueueError::Full(_) => write!(f, "TryEnqueueError::Full(..)"),
      TryEnqueueError::Closed(_) => write!(f, "TryEnqueueError::Closed(..)"),
    }
  }
}

impl<T> EnqueueError<T> {
  /// Consumes the error, returning the rejected item.
  #[inline]
  pub fn into_inner(self) -> T {
    match self {
      EnqueueError::Closed(item) => item,
    }
  }
}

impl<T> TryEnqueueError<T> {
  /// Consumes the error, returning the rejected item.
  #[inline]
  pub fn into_inner(self) -> T {
    match self {
      TryEnqueueError::Full(item) | TryEnqueueError::Closed(item) => item,
    }
  }
}

/// Error returned by blocking and async `dequeue` operations.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum DequeueError {
  /// The buffer is closed and every filled slot has been drained.
  #[error("buffer closed and drained")]
  Closed,
}

/// Error returned by `try_dequeue`.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum TryDequeueError {
  #[error("buffer empty")]
  Empty,
  #[error("buffer closed and drained")]
  Closed,
}

/// Error returned by `dequeue_timeout`.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum DequeueTimeoutError {
  #[error("buffer closed and drained")]
  Closed,
  #[error("dequeue timed out")]
  Timeout,
}

/// A startup configuration that cannot be run.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("Configuration file not found: {0}")]
  NotFound(String),

  #[error("Failed to read configuration file: {0}")]
  Read(#[from] io::Error),

  #[error("Failed to parse configuration: {0}")]
  Parse(#[from] serde_yaml::Error),

  #[error("capacity must be at least 1")]
  ZeroCapacity,

  #[error("producer_count must be at least 1")]
  NoProducers,

  #[error("consumer_count must be at least 1")]
  NoConsumers,

  #[error("{producers} producers configured but {categories} producer categories given")]
  CategoryMismatch { producers: usize, categories: usize },

  #[error("Invalid configuration value for '{field}': {message}")]
  InvalidValue { field: &'static str, message: String },
}

/// Why a single producer task stopped before reaching its quota.
#[derive(Debug, Error)]
pub enum TaskError {
  #[error("producer {producer} gave up after {attempts} failed generate attempts (produced {produced})")]
  Source {
    producer: usize,
    produced: usize,
    attempts: usize,
    #[source]
    source: BoxError,
  },

  #[error("producer {producer} found the buffer closed (produced {produced})")]
  BufferClosed { producer: usize, produced: usize },
}

impl TaskError {
  pub fn producer(&self) -> usize {
    match self {
      TaskError::Source { producer, .. } | TaskError::BufferClosed { producer, .. } => *producer,
    }
  }

  /// Items the producer stored before it stopped.
  pub fn produced(&self) -> usize {
    match self {
      TaskError::Source { produced, .. } | TaskError::BufferClosed { produced, .. } => *produced,
    }
  }
}

/// Errors surfaced by the lifecycle coordinator.
#[derive(Debug, Error)]
pub enum LifecycleError {
  #[error("invalid configuration: {0}")]
  Config(#[from] ConfigError),

  #[error("failed to spawn task thread: {0}")]
  Spawn(#[from] io::Error),

  #[error("task '{0}' panicked")]
  TaskPanicked(String),
}

/// A disagreement between the gate counters and the slot pool, found while
/// auditing a quiescent buffer.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum ConsistencyError {
  #[error("gate counters out of balance: free {free} + filled {filled} != capacity {capacity}")]
  GateImbalance {
    free: usize,
    filled: usize,
    capacity: usize,
  },

  #[error("slot pool holds {occupied} items but the filled gate counts {filled}")]
  CursorMismatch { occupied: usize, filled: usize },
}

/// A specialized `Result` type for coordinator operations.
pub type Result<T, E = LifecycleError> = std::result::Result<T, E>;
