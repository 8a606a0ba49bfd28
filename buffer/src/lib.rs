//! A bounded circular buffer for handing items from many producers to many
//! consumers.
//!
//! slotgate pairs a fixed-size slot pool with two counting gates: one counting
//! free slots, one counting filled slots. Producers park on the free gate when
//! the buffer is full, consumers park on the filled gate when it is empty, and
//! a short mutex-guarded region moves the cursors in between. The mutex is
//! never held while parked, so the two sides can never deadlock each other.
//!
//! On top of the buffer sit the producer and consumer task bodies and a
//! lifecycle [`Coordinator`] that starts them on their own threads, waits for
//! the producers to reach their quotas, then closes the buffer so consumers
//! drain what is left and exit.

pub mod buffer;
pub mod capability;
pub mod config;
pub mod consumer;
pub mod coord;
pub mod coordinator;
pub mod error;
pub mod item;
pub mod jitter;
pub mod pool;
pub mod producer;
pub mod region;

pub use buffer::{BoundedBuffer, BufferSnapshot, Slotted};
pub use capability::{BoxError, Sink, ValueSource};
pub use config::{find_config_file, find_config_file_in, Config};
pub use consumer::{Consumer, ConsumerReport};
pub use coordinator::{Coordinator, RunReport, Running};
pub use error::{
  AcquireError, ConfigError, ConsistencyError, DequeueError, DequeueTimeoutError, EnqueueError,
  LifecycleError, TaskError, TryDequeueError, TryEnqueueError,
};
pub use item::{Category, Item};
pub use jitter::Jitter;
pub use producer::{Producer, ProducerReport};
