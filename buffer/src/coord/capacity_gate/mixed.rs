//! A counting semaphore that supports both synchronous and asynchronous waiters.
//!
//! The `CapacityGate` is the counting signal behind each side of the bounded
//! buffer: one gate counts free slots, the other counts filled slots. It uses a
//! `parking_lot::Mutex` to protect its permit count and a unified FIFO queue of
//! waiters (parked `Thread`s and async `Waker`s).
//!
//! Permits are handed off directly: a `release` with a waiter queued marks that
//! waiter's node as granted instead of bumping the count. A new arrival can
//! therefore never steal a permit from a thread that was already woken for it,
//! and the count is always `0` while anyone is queued.
//!
//! A gate can be closed. Closing wakes every queued waiter with
//! `AcquireError::Closed`, but permits still in the count remain acquirable, so
//! a closed "filled" gate drains before it reports closure.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread::{self, Thread};
use std::time::{Duration, Instant};

use futures_core::FusedFuture;
use futures_util::task::AtomicWaker;
use parking_lot::Mutex;

use crate::error::AcquireError;

const WAITING: u8 = 0;
const GRANTED: u8 = 1;
const CLOSED: u8 = 2;

/// Either a parked thread or an async task.
enum Waiter {
  Sync(Thread),
  Async(AtomicWaker),
}

/// One queued acquirer. The `state` only ever moves away from `WAITING` while
/// the gate mutex is held.
struct WaitNode {
  state: AtomicU8,
  waiter: Waiter,
}

impl WaitNode {
  fn new(waiter: Waiter) -> Self {
    Self {
      state: AtomicU8::new(WAITING),
      waiter,
    }
  }

  #[inline]
  fn state(&self) -> u8 {
    self.state.load(Ordering::Acquire)
  }

  /// Wakes the underlying thread or task.
  fn wake(&self) {
    match &self.waiter {
      Waiter::Sync(thread) => thread.unpark(),
      Waiter::Async(waker) => waker.wake(),
    }
  }
}

impl fmt::Debug for WaitNode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let kind = match self.waiter {
      Waiter::Sync(_) => "sync",
      Waiter::Async(_) => "async",
    };
    f.debug_struct("WaitNode")
      .field("kind", &kind)
      .field("state", &self.state())
      .finish()
  }
}

/// The internal state of the `CapacityGate`, protected by a `Mutex`.
#[derive(Debug)]
struct GateInternal {
  /// The number of currently available permits.
  permits: usize,
  /// A unified, fair (FIFO) queue of waiting threads and tasks.
  waiters: VecDeque<Arc<WaitNode>>,
  closed: bool,
}

impl GateInternal {
  #[inline]
  fn take_permit(&mut self) -> bool {
    if self.permits > 0 {
      self.permits -= 1;
      true
    } else {
      false
    }
  }

  fn forget(&mut self, node: &Arc<WaitNode>) {
    self.waiters.retain(|queued| !Arc::ptr_eq(queued, node));
  }
}

/// A clonable handle to a hybrid sync/async counting semaphore.
pub struct CapacityGate {
  capacity: usize,
  internal: Arc<Mutex<GateInternal>>,
}

impl fmt::Debug for CapacityGate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let internal = self.internal.lock();
    f.debug_struct("CapacityGate")
      .field("capacity", &self.capacity)
      .field("permits", &internal.permits)
      .field("waiters", &internal.waiters.len())
      .field("closed", &internal.closed)
      .finish()
  }
}

impl CapacityGate {
  /// Creates a new `CapacityGate` with every permit available.
  pub fn new(capacity: usize) -> Self {
    Self::with_permits(capacity, capacity)
  }

  /// Creates a gate with `capacity` permits in total, `initial` of which are
  /// available up front.
  ///
  /// # Panics
  ///
  /// Panics if `initial` exceeds `capacity`.
  pub fn with_permits(capacity: usize, initial: usize) -> Self {
    assert!(
      initial <= capacity,
      "initial permits ({initial}) exceed gate capacity ({capacity})"
    );
    Self {
      capacity,
      internal: Arc::new(Mutex::new(GateInternal {
        permits: initial,
        waiters: VecDeque::new(),
        closed: false,
      })),
    }
  }

  /// Returns the total capacity of the gate.
  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Returns the number of permits that could be acquired right now.
  pub fn available(&self) -> usize {
    self.internal.lock().permits
  }

  /// Returns the number of threads and tasks currently queued on the gate.
  pub fn waiting(&self) -> usize {
    self.internal.lock().waiters.len()
  }

  pub fn is_closed(&self) -> bool {
    self.internal.lock().closed
  }

  /// Acquires a permit, parking the current thread if none are available.
  ///
  /// Returns `Err(AcquireError::Closed)` only once the gate is closed *and*
  /// empty.
  pub fn acquire_sync(&self) -> Result<(), AcquireError> {
    match self.enqueue_sync()? {
      Some(node) => Self::park_until_decided(&node),
      None => Ok(()),
    }
  }

  fn park_until_decided(node: &WaitNode) -> Result<(), AcquireError> {
    loop {
      match node.state() {
        GRANTED => return Ok(()),
        CLOSED => return Err(AcquireError::Closed),
        // Spurious wakeups land back here and park again.
        _ => thread::park(),
      }
    }
  }

  /// Like `acquire_sync`, but gives up after `timeout`.
  ///
  /// A timeout too large to express as an `Instant` waits without a deadline.
  pub fn acquire_timeout(&self, timeout: Duration) -> Result<(), AcquireError> {
    let node = match self.enqueue_sync()? {
      Some(node) => node,
      None => return Ok(()),
    };
    let deadline = match Instant::now().checked_add(timeout) {
      Some(deadline) => deadline,
      None => return Self::park_until_decided(&node),
    };

    loop {
      match node.state() {
        GRANTED => return Ok(()),
        CLOSED => return Err(AcquireError::Closed),
        _ => {}
      }

      let now = Instant::now();
      if now >= deadline {
        // The state can only change under the lock, so decide there.
        let mut internal = self.internal.lock();
        return match node.state() {
          GRANTED => Ok(()),
          CLOSED => Err(AcquireError::Closed),
          _ => {
            internal.forget(&node);
            Err(AcquireError::Timeout)
          }
        };
      }
      thread::park_timeout(deadline - now);
    }
  }

  /// Takes a permit immediately or queues a sync waiter node for this thread.
  fn enqueue_sync(&self) -> Result<Option<Arc<WaitNode>>, AcquireError> {
    let mut internal = self.internal.lock();
    if internal.take_permit() {
      return Ok(None);
    }
    if internal.closed {
      return Err(AcquireError::Closed);
    }
    let node = Arc::new(WaitNode::new(Waiter::Sync(thread::current())));
    internal.waiters.push_back(Arc::clone(&node));
    Ok(Some(node))
  }

  /// Acquires a permit asynchronously, returning a future that resolves
  /// when a permit is available or the gate is closed and empty.
  pub fn acquire_async(&self) -> AcquireFuture<'_> {
    AcquireFuture {
      gate: self,
      node: None,
      done: false,
    }
  }

  /// Attempts to acquire a permit without blocking.
  ///
  /// Because permits are handed straight to queued waiters, the count is zero
  /// whenever anyone is waiting, so this can never jump the queue.
  pub fn try_acquire(&self) -> bool {
    self.internal.lock().take_permit()
  }

  /// Releases a permit back to the gate, handing it to the oldest waiter if
  /// there is one.
  ///
  /// # Panics
  ///
  /// Panics if the release would push the count past the gate's capacity. That
  /// can only happen when a caller releases a permit it never acquired, which
  /// breaks the counting invariant the whole buffer relies on.
  pub fn release(&self) {
    let node = {
      let mut internal = self.internal.lock();
      match internal.waiters.pop_front() {
        Some(node) => {
          node.state.store(GRANTED, Ordering::Release);
          node
        }
        None => {
          assert!(
            internal.permits < self.capacity,
            "capacity gate released past its capacity of {}",
            self.capacity
          );
          internal.permits += 1;
          return;
        }
      }
    };
    node.wake();
  }

  /// Closes the gate and wakes every queued waiter with `AcquireError::Closed`.
  ///
  /// Returns `false` if the gate was already closed.
  pub fn close(&self) -> bool {
    let woken: Vec<Arc<WaitNode>> = {
      let mut internal = self.internal.lock();
      if internal.closed {
        return false;
      }
      internal.closed = true;
      internal
        .waiters
        .drain(..)
        .inspect(|node| node.state.store(CLOSED, Ordering::Release))
        .collect()
    };
    for node in woken {
      node.wake();
    }
    true
  }
}

impl Clone for CapacityGate {
  fn clone(&self) -> Self {
    Self {
      capacity: self.capacity,
      internal: self.internal.clone(),
    }
  }
}

/// A future that resolves when a permit is acquired from the `CapacityGate`.
///
/// Dropping the future while it is queued removes it from the queue; dropping
/// it after a permit was handed to it but before it was polled again passes
/// that permit on, so cancellation never leaks capacity.
#[must_use = "futures do nothing unless you .await or poll them"]
pub struct AcquireFuture<'a> {
  gate: &'a CapacityGate,
  node: Option<Arc<WaitNode>>,
  done: bool,
}

impl Future for AcquireFuture<'_> {
  type Output = Result<(), AcquireError>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = self.get_mut();
    assert!(!this.done, "AcquireFuture polled after completion");

    let node = match this.node.clone() {
      Some(node) => node,
      None => {
        let mut internal = this.gate.internal.lock();
        if internal.take_permit() {
          this.done = true;
          return Poll::Ready(Ok(()));
        }
        if internal.closed {
          this.done = true;
          return Poll::Ready(Err(AcquireError::Closed));
        }
        let node = Arc::new(WaitNode::new(Waiter::Async(AtomicWaker::new())));
        if let Waiter::Async(waker) = &node.waiter {
          waker.register(cx.waker());
        }
        internal.waiters.push_back(Arc::clone(&node));
        this.node = Some(node);
        return Poll::Pending;
      }
    };

    // Register before checking so a grant racing with this poll is not missed.
    if let Waiter::Async(waker) = &node.waiter {
      waker.register(cx.waker());
    }
    match node.state() {
      GRANTED => {
        this.node = None;
        this.done = true;
        Poll::Ready(Ok(()))
      }
      CLOSED => {
        this.node = None;
        this.done = true;
        Poll::Ready(Err(AcquireError::Closed))
      }
      _ => Poll::Pending,
    }
  }
}

impl FusedFuture for AcquireFuture<'_> {
  fn is_terminated(&self) -> bool {
    self.done
  }
}

impl Drop for AcquireFuture<'_> {
  fn drop(&mut self) {
    let Some(node) = self.node.take() else {
      return;
    };
    let mut internal = self.gate.internal.lock();
    match node.state() {
      WAITING => internal.forget(&node),
      GRANTED => {
        drop(internal);
        self.gate.release();
      }
      _ => {}
    }
  }
}
