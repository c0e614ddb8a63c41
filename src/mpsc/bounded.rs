// src/mpsc/bounded.rs

//! The bounded MPSC mailbox: lock-serialized producers, lock-free consumer.
//!
//! ### Index scheme
//!
//! `front` and `back` range over `[0, 2 * capacity)` and are never reduced
//! modulo `capacity` in storage; the slot for index `i` is `i mod capacity`,
//! computed by a conditional subtraction. Advancing past `2 * capacity - 1`
//! wraps to `0`. This double-range encoding distinguishes empty
//! (`front == back`) from full (`|back - front| == capacity`) without a
//! separate counter, which is what keeps the consumer lock-free: it only
//! observes `back`, never coordinates with anything producers write.

use crate::error::{TryRecvError, TrySendError};
use crate::internal::cache_padded::CachePadded;
use crate::internal::sync::{AtomicUsize, Mutex, Ordering, UnsafeCell};
use crate::telemetry;

use std::fmt;
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::sync::Arc;

// --- Telemetry constants ---
const LOC_P_TRY_SEND: &str = "BoundedSender::try_send";
const LOC_C_TRY_RECV: &str = "BoundedReceiver::try_recv";

const EVT_P_FAST_FULL: &str = "P:FastPathFull";
const EVT_P_RECHECK_FULL: &str = "P:RecheckFull";
const EVT_P_PUBLISH: &str = "P:Publish";
const EVT_C_EMPTY: &str = "C:Empty";
const EVT_C_TAKE: &str = "C:Take";

const CTR_P_OK: &str = "SendsOk";
const CTR_P_FULL: &str = "SendsRejectedFull";
const CTR_C_OK: &str = "RecvsOk";
const CTR_C_EMPTY: &str = "RecvsEmpty";

/// Internal shared state for the bounded mailbox.
pub(crate) struct BoundedShared<T> {
  // Serializes producers. The consumer never touches it.
  pub(crate) back_lock: Mutex<()>,
  pub(crate) capacity: usize,
  pub(crate) buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,
  // Consumer-written index, on its own cache line.
  pub(crate) front: CachePadded<AtomicUsize>,
  // Producer-written index, on its own cache line. Changes only under
  // `back_lock`.
  pub(crate) back: CachePadded<AtomicUsize>,
}

unsafe impl<T: Send> Send for BoundedShared<T> {}
unsafe impl<T: Send> Sync for BoundedShared<T> {}

impl<T> BoundedShared<T> {
  fn new_internal(capacity: usize) -> Self {
    assert!(capacity > 0, "mailbox capacity must be greater than 0");
    let mut buffer_vec = Vec::with_capacity(capacity);
    for _ in 0..capacity {
      buffer_vec.push(UnsafeCell::new(MaybeUninit::uninit()));
    }
    BoundedShared {
      back_lock: Mutex::new(()),
      capacity,
      buffer: buffer_vec.into_boxed_slice(),
      front: CachePadded::new(AtomicUsize::new(0)),
      back: CachePadded::new(AtomicUsize::new(0)),
    }
  }

  /// Maps a `[0, 2 * capacity)` index to its slot position.
  #[inline]
  fn slot_index(&self, idx: usize) -> usize {
    if idx >= self.capacity {
      idx - self.capacity
    } else {
      idx
    }
  }

  /// Advances an index by one, wrapping from `2 * capacity - 1` to `0`.
  #[inline]
  fn wrap_increment(&self, idx: usize) -> usize {
    let next = idx + 1;
    if next == 2 * self.capacity {
      0
    } else {
      next
    }
  }

  /// Fullness test on observed indices. `|back - front| == capacity` holds
  /// exactly in the full state, including when `back` has wrapped below
  /// `front` (the difference is then negative with magnitude `capacity`).
  #[inline]
  fn is_full(&self, front: usize, back: usize) -> bool {
    back.abs_diff(front) == self.capacity
  }

  #[inline]
  fn is_empty(&self, front: usize, back: usize) -> bool {
    front == back
  }

  /// Occupancy on observed indices: `(back - front) mod 2 * capacity`.
  /// Note `|back - front|` would be wrong here; it is only a fullness test.
  #[inline]
  fn occupied(&self, front: usize, back: usize) -> usize {
    if back >= front {
      back - front
    } else {
      back + 2 * self.capacity - front
    }
  }

  /// Moves `item` into slot `slot_idx`.
  ///
  /// # Safety
  ///
  /// The caller must hold `back_lock` and have verified the slot vacant via
  /// the fullness check with an acquire-load of `front`.
  #[inline]
  unsafe fn slot_write(&self, slot_idx: usize, item: T) {
    #[cfg(weft_loom)]
    {
      self.buffer[slot_idx].with_mut(|ptr| unsafe {
        (*ptr).write(item);
      });
    }

    #[cfg(not(weft_loom))]
    unsafe {
      (*self.buffer[slot_idx].get()).write(item);
    }
  }

  /// Moves the value out of slot `slot_idx`, leaving it uninitialized.
  ///
  /// # Safety
  ///
  /// The caller must be the sole consumer and have verified the slot
  /// occupied via the emptiness check with an acquire-load of `back`.
  #[inline]
  unsafe fn slot_take(&self, slot_idx: usize) -> T {
    #[cfg(weft_loom)]
    {
      self.buffer[slot_idx].with_mut(|ptr| unsafe { (*ptr).assume_init_read() })
    }

    #[cfg(not(weft_loom))]
    unsafe {
      (*self.buffer[slot_idx].get()).assume_init_read()
    }
  }

  /// Drops the value in slot `slot_idx` in place.
  ///
  /// # Safety
  ///
  /// The slot must be occupied and the caller must have exclusive access.
  #[inline]
  unsafe fn slot_drop(&self, slot_idx: usize) {
    #[cfg(weft_loom)]
    {
      self.buffer[slot_idx].with_mut(|ptr| unsafe { (*ptr).assume_init_drop() });
    }

    #[cfg(not(weft_loom))]
    unsafe {
      (*self.buffer[slot_idx].get()).assume_init_drop();
    }
  }
}

impl<T> fmt::Debug for BoundedShared<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BoundedShared")
      .field("capacity", &self.capacity)
      .field("front", &self.front.load(Ordering::Relaxed))
      .field("back", &self.back.load(Ordering::Relaxed))
      .finish_non_exhaustive()
  }
}

impl<T> Drop for BoundedShared<T> {
  fn drop(&mut self) {
    // Arc refcount reaching zero gives exclusive access; drain whatever is
    // still in flight so element destructors run.
    let mut front = self.front.load(Ordering::Relaxed);
    let back = self.back.load(Ordering::Relaxed);
    while front != back {
      unsafe { self.slot_drop(self.slot_index(front)) };
      front = self.wrap_increment(front);
    }
  }
}

/// A producing handle for the bounded mailbox. Cloneable and shareable:
/// any number of threads may send concurrently.
#[derive(Debug)]
pub struct BoundedSender<T> {
  pub(crate) shared: Arc<BoundedShared<T>>,
}

/// The consuming handle for the bounded mailbox. There is exactly one.
#[derive(Debug)]
pub struct BoundedReceiver<T> {
  pub(crate) shared: Arc<BoundedShared<T>>,
  // Makes the handle !Sync: the single consumer is a type-level fact.
  _phantom: PhantomData<*mut ()>,
}

impl<T> Clone for BoundedSender<T> {
  fn clone(&self) -> Self {
    BoundedSender {
      shared: Arc::clone(&self.shared),
    }
  }
}

unsafe impl<T: Send> Send for BoundedReceiver<T> {}

impl<T: Send> BoundedSender<T> {
  /// Attempts to enqueue `item` without blocking on the consumer.
  ///
  /// May wait on the producer mutex; that wait is bounded by other
  /// producers' (short) critical sections, never by consumer progress.
  ///
  /// # Errors
  ///
  /// - `Err(TrySendError::Full(item))` if the mailbox is full. The fast path
  ///   may also reject on a stale index pair; callers treat both the same
  ///   and retry.
  pub fn try_send(&self, item: T) -> Result<(), TrySendError<T>> {
    let shared = &*self.shared;

    // Fast path: refuse without the lock when observably full. A stale
    // observation can only produce a spurious rejection; a false "not full"
    // is impossible because only the consumer advances `front`.
    let back = shared.back.load(Ordering::Relaxed);
    let front = shared.front.load(Ordering::Acquire);
    if shared.is_full(front, back) {
      telemetry::log_event(None, LOC_P_TRY_SEND, EVT_P_FAST_FULL, None);
      telemetry::increment_counter(LOC_P_TRY_SEND, CTR_P_FULL);
      return Err(TrySendError::Full(item));
    }

    let _guard = shared.back_lock.lock();

    // Re-check under the lock: `back` is now stable, and the acquire-load of
    // `front` pairs with the consumer's release-store so the slot we are
    // about to overwrite has been fully read out.
    let back = shared.back.load(Ordering::Relaxed);
    let front = shared.front.load(Ordering::Acquire);
    if shared.is_full(front, back) {
      telemetry::log_event(None, LOC_P_TRY_SEND, EVT_P_RECHECK_FULL, None);
      telemetry::increment_counter(LOC_P_TRY_SEND, CTR_P_FULL);
      return Err(TrySendError::Full(item));
    }

    unsafe { shared.slot_write(shared.slot_index(back), item) };
    // Linearization point: publish the slot write to the consumer's
    // acquire-load of `back`.
    shared
      .back
      .store(shared.wrap_increment(back), Ordering::Release);

    telemetry::log_event(None, LOC_P_TRY_SEND, EVT_P_PUBLISH, None);
    telemetry::increment_counter(LOC_P_TRY_SEND, CTR_P_OK);
    Ok(())
  }
}

impl<T> BoundedSender<T> {
  /// Returns the total capacity of the mailbox.
  pub fn capacity(&self) -> usize {
    self.shared.capacity
  }

  /// Returns the number of items currently buffered. Approximate while
  /// other threads are active.
  #[inline]
  pub fn len(&self) -> usize {
    let front = self.shared.front.load(Ordering::Acquire);
    let back = self.shared.back.load(Ordering::Acquire);
    self.shared.occupied(front, back)
  }

  /// Returns `true` if the mailbox was observably empty.
  #[inline]
  pub fn is_empty(&self) -> bool {
    let front = self.shared.front.load(Ordering::Acquire);
    let back = self.shared.back.load(Ordering::Acquire);
    self.shared.is_empty(front, back)
  }

  /// Returns `true` if the mailbox was observably full.
  #[inline]
  pub fn is_full(&self) -> bool {
    let front = self.shared.front.load(Ordering::Acquire);
    let back = self.shared.back.load(Ordering::Acquire);
    self.shared.is_full(front, back)
  }
}

impl<T: Send> BoundedReceiver<T> {
  /// Attempts to dequeue the oldest item without blocking. Never takes a
  /// lock.
  ///
  /// # Errors
  ///
  /// - `Err(TryRecvError::Empty)` if no item was observably available.
  pub fn try_recv(&self) -> Result<T, TryRecvError> {
    let shared = &*self.shared;

    let front = shared.front.load(Ordering::Relaxed);
    // Pairs with a producer's release-store of `back`, making its slot write
    // visible before we read the slot.
    let back = shared.back.load(Ordering::Acquire);
    if shared.is_empty(front, back) {
      telemetry::log_event(None, LOC_C_TRY_RECV, EVT_C_EMPTY, None);
      telemetry::increment_counter(LOC_C_TRY_RECV, CTR_C_EMPTY);
      return Err(TryRecvError::Empty);
    }

    let item = unsafe { shared.slot_take(shared.slot_index(front)) };
    // Linearization point: publish slot vacancy to producers' acquire-loads
    // of `front`.
    shared
      .front
      .store(shared.wrap_increment(front), Ordering::Release);

    telemetry::log_event(None, LOC_C_TRY_RECV, EVT_C_TAKE, None);
    telemetry::increment_counter(LOC_C_TRY_RECV, CTR_C_OK);
    Ok(item)
  }

  /// Drops all buffered items and resets both indices to zero.
  ///
  /// Reinitialization only. Holding the producer lock makes this safe
  /// against concurrent senders; `&mut self` rules out a concurrent
  /// `try_recv`.
  pub fn clear(&mut self) {
    let shared = &*self.shared;
    let _guard = shared.back_lock.lock();

    let mut front = shared.front.load(Ordering::Relaxed);
    let back = shared.back.load(Ordering::Relaxed);
    while front != back {
      unsafe { shared.slot_drop(shared.slot_index(front)) };
      front = shared.wrap_increment(front);
    }
    // Relaxed suffices: the lock hand-off orders these stores for the next
    // producer, and the consumer is this thread.
    shared.front.store(0, Ordering::Relaxed);
    shared.back.store(0, Ordering::Relaxed);
  }
}

impl<T> BoundedReceiver<T> {
  /// Returns the total capacity of the mailbox.
  pub fn capacity(&self) -> usize {
    self.shared.capacity
  }

  /// Returns the number of items currently buffered. Exact from the
  /// consumer's point of view (it may only grow concurrently).
  #[inline]
  pub fn len(&self) -> usize {
    let front = self.shared.front.load(Ordering::Acquire);
    let back = self.shared.back.load(Ordering::Acquire);
    self.shared.occupied(front, back)
  }

  /// Returns `true` if the mailbox was observably empty.
  #[inline]
  pub fn is_empty(&self) -> bool {
    let front = self.shared.front.load(Ordering::Acquire);
    let back = self.shared.back.load(Ordering::Acquire);
    self.shared.is_empty(front, back)
  }

  /// Returns `true` if the mailbox was observably full.
  #[inline]
  pub fn is_full(&self) -> bool {
    let front = self.shared.front.load(Ordering::Acquire);
    let back = self.shared.back.load(Ordering::Acquire);
    self.shared.is_full(front, back)
  }
}

/// Creates a bounded mailbox with the given capacity.
///
/// The sender may be cloned freely; the receiver is unique. `capacity` is
/// fixed for the channel's lifetime.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn bounded<T: Send>(capacity: usize) -> (BoundedSender<T>, BoundedReceiver<T>) {
  let shared = Arc::new(BoundedShared::new_internal(capacity));

  // The producer-written and consumer-written indices must not share a
  // cache line.
  let line = CachePadded::<AtomicUsize>::alignment_value();
  debug_assert_ne!(
    (&shared.front as *const _ as usize) / line,
    (&shared.back as *const _ as usize) / line,
    "front and back must occupy distinct cache lines"
  );

  (
    BoundedSender {
      shared: Arc::clone(&shared),
    },
    BoundedReceiver {
      shared,
      _phantom: PhantomData,
    },
  )
}
