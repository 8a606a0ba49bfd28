//! The lifecycle coordinator: builds the shared buffer, starts producer and
//! consumer threads, and shuts them down in the right order.
//!
//! Shutdown is driven by the producers. Once every producer thread has been
//! joined the buffer is closed; consumers then drain what is left and exit on
//! their own, and are joined in turn.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{error, info};

use crate::buffer::{BoundedBuffer, BufferSnapshot};
use crate::capability::{Sink, ValueSource};
use crate::config::Config;
use crate::consumer::{Consumer, ConsumerReport};
use crate::error::{LifecycleError, Result, TaskError};
use crate::item::Item;
use crate::producer::{Producer, ProducerReport};

type ProducerHandle = JoinHandle<std::result::Result<ProducerReport, TaskError>>;

/// Outcome of a complete run.
#[derive(Debug)]
pub struct RunReport {
  /// Producers that reached their quota, in id order.
  pub producers: Vec<ProducerReport>,
  /// Producers that stopped early.
  pub failures: Vec<TaskError>,
  pub consumers: Vec<ConsumerReport>,
  /// Buffer state after every task was joined.
  pub snapshot: BufferSnapshot,
}

impl RunReport {
  pub fn total_produced(&self) -> usize {
    self.producers.iter().map(|p| p.produced).sum::<usize>()
      + self.failures.iter().map(TaskError::produced).sum::<usize>()
  }

  pub fn total_consumed(&self) -> usize {
    self.consumers.iter().map(|c| c.consumed).sum()
  }

  pub fn sink_failures(&self) -> usize {
    self.consumers.iter().map(|c| c.sink_failures).sum()
  }

  /// `true` when every producer met its quota and everything produced was
  /// consumed.
  pub fn is_clean(&self) -> bool {
    self.failures.is_empty() && self.total_produced() == self.total_consumed()
  }
}

/// Starts and stops a configured set of producer and consumer tasks.
pub struct Coordinator<V> {
  config: Config,
  source: Arc<dyn ValueSource<V>>,
  sink: Arc<dyn Sink<V>>,
}

impl<V: Send + 'static> Coordinator<V> {
  pub fn new(config: Config, source: impl ValueSource<V> + 'static, sink: impl Sink<V> + 'static) -> Self {
    Self::from_shared(config, Arc::new(source), Arc::new(sink))
  }

  pub fn from_shared(config: Config, source: Arc<dyn ValueSource<V>>, sink: Arc<dyn Sink<V>>) -> Self {
    Coordinator { config, source, sink }
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  /// Validates the config, builds the buffer and spawns every task.
  ///
  /// Nothing is spawned if the config is invalid.
  pub fn start(self) -> Result<Running<V>> {
    self.config.validate()?;
    let buffer = Arc::new(BoundedBuffer::new(self.config.capacity)?);

    info!(
      capacity = self.config.capacity,
      producers = self.config.producer_count,
      consumers = self.config.consumer_count,
      items_per_producer = self.config.items_per_producer,
      "starting run"
    );

    let mut running = Running {
      buffer: Arc::clone(&buffer),
      producers: Vec::with_capacity(self.config.producer_count),
      consumers: Vec::with_capacity(self.config.consumer_count),
      producer_outcomes: None,
    };

    for (id, category) in self.config.producer_categories.iter().enumerate() {
      let producer = Producer::new(
        id,
        category.clone(),
        self.config.items_per_producer,
        Arc::clone(&self.source),
        Arc::clone(&buffer),
      )
      .with_jitter(self.config.producer_jitter())
      .with_attempts(self.config.attempts());

      match thread::Builder::new()
        .name(format!("producer-{id}"))
        .spawn(move || producer.run())
      {
        Ok(handle) => running.producers.push(handle),
        Err(err) => return Err(running.abort(err)),
      }
    }

    for id in 0..self.config.consumer_count {
      let consumer = Consumer::new(id, Arc::clone(&self.sink), Arc::clone(&buffer))
        .with_jitter(self.config.consumer_jitter());

      match thread::Builder::new()
        .name(format!("consumer-{id}"))
        .spawn(move || consumer.run())
      {
        Ok(handle) => running.consumers.push(handle),
        Err(err) => return Err(running.abort(err)),
      }
    }

    Ok(running)
  }

  /// Starts every task, waits for the producers, then drains and stops the
  /// consumers.
  pub fn run(self) -> Result<RunReport> {
    self.start()?.shutdown()
  }
}

type ProducerOutcomes = Vec<std::result::Result<ProducerReport, TaskError>>;

/// A run in progress.
pub struct Running<V> {
  buffer: Arc<BoundedBuffer<Item<V>>>,
  producers: Vec<ProducerHandle>,
  consumers: Vec<JoinHandle<ConsumerReport>>,
  producer_outcomes: Option<std::result::Result<ProducerOutcomes, LifecycleError>>,
}

impl<V> Running<V> {
  /// The shared buffer, for observation.
  pub fn buffer(&self) -> &Arc<BoundedBuffer<Item<V>>> {
    &self.buffer
  }

  /// Blocks until every producer thread has finished. Calling it again is a
  /// no-op.
  pub fn wait_producers(&mut self) {
    if self.producer_outcomes.is_some() {
      return;
    }
    let mut outcomes = Vec::with_capacity(self.producers.len());
    let mut panicked = None;
    for handle in self.producers.drain(..) {
      let name = thread_name(&handle);
      match handle.join() {
        Ok(outcome) => outcomes.push(outcome),
        Err(_) => {
          error!(task = %name, "producer thread panicked");
          panicked.get_or_insert(name);
        }
      }
    }
    info!("all producers have finished");
    self.producer_outcomes = Some(match panicked {
      Some(name) => Err(LifecycleError::TaskPanicked(name)),
      None => Ok(outcomes),
    });
  }

  /// Waits for producers if needed, closes the buffer so consumers drain and
  /// exit, joins the consumers and assembles the report.
  pub fn shutdown(mut self) -> Result<RunReport> {
    self.wait_producers();
    self.buffer.close();

    let mut consumers = Vec::with_capacity(self.consumers.len());
    let mut panicked = None;
    for handle in self.consumers.drain(..) {
      let name = thread_name(&handle);
      match handle.join() {
        Ok(report) => consumers.push(report),
        Err(_) => {
          error!(task = %name, "consumer thread panicked");
          panicked.get_or_insert(name);
        }
      }
    }

    let outcomes = match self.producer_outcomes.take() {
      Some(outcomes) => outcomes?,
      None => Vec::new(),
    };
    if let Some(name) = panicked {
      return Err(LifecycleError::TaskPanicked(name));
    }

    let mut producers = Vec::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
      match outcome {
        Ok(report) => producers.push(report),
        Err(err) => {
          error!(producer = err.producer(), error = %err, "producer stopped early");
          failures.push(err);
        }
      }
    }

    let report = RunReport {
      producers,
      failures,
      consumers,
      snapshot: self.buffer.snapshot(),
    };
    info!(
      produced = report.total_produced(),
      consumed = report.total_consumed(),
      sink_failures = report.sink_failures(),
      "run complete"
    );
    Ok(report)
  }

  /// Closes the buffer after a failed spawn so already-started tasks wind
  /// down by themselves.
  fn abort(self, err: std::io::Error) -> LifecycleError {
    error!(error = %err, "failed to spawn task; closing buffer");
    self.buffer.close();
    LifecycleError::Spawn(err)
  }
}

impl<V> Drop for Running<V> {
  /// A run dropped without `shutdown` closes its buffer so no consumer is
  /// left parked forever.
  fn drop(&mut self) {
    self.buffer.close();
  }
}

fn thread_name<T>(handle: &JoinHandle<T>) -> String {
  handle.thread().name().unwrap_or("<unnamed>").to_string()
}
