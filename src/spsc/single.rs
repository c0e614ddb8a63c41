// src/spsc/single.rs

//! The one-slot wait-free SPSC channel.

use crate::error::{TryRecvError, TrySendError};
use crate::internal::cache_padded::CachePadded;
use crate::internal::sync::{AtomicBool, Ordering, UnsafeCell};

use std::fmt;
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::sync::Arc;

/// Internal shared state for the one-slot channel.
///
/// Layout: the slot starts on its own cache line (so arrays of channels and
/// neighbouring fields cannot false-share with it) and is padded out to whole
/// lines; `full` lives on the next line. For task descriptors up to one line
/// the whole channel is exactly two cache lines.
pub(crate) struct SingleShared<T> {
  slot: CachePadded<UnsafeCell<MaybeUninit<T>>>,
  // The only synchronization point. Invariant: true iff the slot holds an
  // owned value. Producer flips false->true, consumer true->false.
  full: CachePadded<AtomicBool>,
}

unsafe impl<T: Send> Send for SingleShared<T> {}
unsafe impl<T: Send> Sync for SingleShared<T> {}

impl<T> SingleShared<T> {
  fn new_internal() -> Self {
    SingleShared {
      slot: CachePadded::new(UnsafeCell::new(MaybeUninit::uninit())),
      full: CachePadded::new(AtomicBool::new(false)),
    }
  }

  /// Moves `item` into the slot.
  ///
  /// # Safety
  ///
  /// The caller must be the sole producer and must have observed
  /// `full == false` with acquire ordering.
  #[inline]
  unsafe fn slot_write(&self, item: T) {
    #[cfg(weft_loom)]
    {
      self.slot.with_mut(|ptr| unsafe {
        (*ptr).write(item);
      });
    }

    #[cfg(not(weft_loom))]
    unsafe {
      (*self.slot.get()).write(item);
    }
  }

  /// Moves the value out of the slot, leaving it uninitialized.
  ///
  /// # Safety
  ///
  /// The caller must be the sole consumer and must have observed
  /// `full == true` with acquire ordering.
  #[inline]
  unsafe fn slot_take(&self) -> T {
    #[cfg(weft_loom)]
    {
      self.slot.with_mut(|ptr| unsafe { (*ptr).assume_init_read() })
    }

    #[cfg(not(weft_loom))]
    unsafe {
      (*self.slot.get()).assume_init_read()
    }
  }

  /// Drops the slot's value in place.
  ///
  /// # Safety
  ///
  /// The slot must be full and the caller must have exclusive access to the
  /// channel.
  #[inline]
  unsafe fn slot_drop(&self) {
    #[cfg(weft_loom)]
    {
      self.slot.with_mut(|ptr| unsafe { (*ptr).assume_init_drop() });
    }

    #[cfg(not(weft_loom))]
    unsafe {
      (*self.slot.get()).assume_init_drop();
    }
  }
}

impl<T> fmt::Debug for SingleShared<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SingleShared")
      .field("full", &self.full.load(Ordering::Relaxed))
      .finish_non_exhaustive()
  }
}

impl<T> Drop for SingleShared<T> {
  fn drop(&mut self) {
    // Arc refcount reaching zero gives exclusive access; a resident value is
    // dropped rather than leaked.
    if self.full.load(Ordering::Relaxed) {
      unsafe { self.slot_drop() };
    }
  }
}

/// The producing half of a one-slot channel.
#[derive(Debug)]
pub struct SingleSender<T> {
  shared: Arc<SingleShared<T>>,
  // Makes the handle !Sync: the single producer is a type-level fact.
  _phantom: PhantomData<*mut ()>,
}

/// The consuming half of a one-slot channel.
#[derive(Debug)]
pub struct SingleReceiver<T> {
  shared: Arc<SingleShared<T>>,
  // Makes the handle !Sync.
  _phantom: PhantomData<*mut ()>,
}

unsafe impl<T: Send> Send for SingleSender<T> {}
unsafe impl<T: Send> Send for SingleReceiver<T> {}

impl<T: Send> SingleSender<T> {
  /// Attempts to place `item` in the slot without blocking.
  ///
  /// # Errors
  ///
  /// - `Err(TrySendError::Full(item))` if the slot already holds a value.
  pub fn try_send(&self, item: T) -> Result<(), TrySendError<T>> {
    // The acquire pairs with the consumer's release-store of false, ordering
    // the consumer's read-out of the slot before our overwrite.
    if self.shared.full.load(Ordering::Acquire) {
      return Err(TrySendError::Full(item));
    }
    unsafe { self.shared.slot_write(item) };
    // Publish the slot write to the consumer's acquire-load.
    self.shared.full.store(true, Ordering::Release);
    Ok(())
  }
}

impl<T> SingleSender<T> {
  /// Returns `true` if the slot currently holds a value.
  #[inline]
  pub fn is_full(&self) -> bool {
    self.shared.full.load(Ordering::Acquire)
  }

  /// Returns `true` if the slot is currently vacant.
  #[inline]
  pub fn is_empty(&self) -> bool {
    !self.is_full()
  }
}

impl<T: Send> SingleReceiver<T> {
  /// Attempts to take the value out of the slot without blocking.
  ///
  /// # Errors
  ///
  /// - `Err(TryRecvError::Empty)` if the slot holds no value.
  pub fn try_recv(&self) -> Result<T, TryRecvError> {
    // Pairs with the producer's release-store of true, making the slot write
    // visible before we read it out.
    if !self.shared.full.load(Ordering::Acquire) {
      return Err(TryRecvError::Empty);
    }
    let item = unsafe { self.shared.slot_take() };
    // Recycle the slot back to the producer.
    self.shared.full.store(false, Ordering::Release);
    Ok(item)
  }

  /// Drops any value in the slot and marks the channel empty.
  ///
  /// Reinitialization only. Taking `&mut` on both halves proves no transfer
  /// is in flight, so no atomics stronger than relaxed are needed. Calling
  /// this on an empty channel is a no-op.
  ///
  /// # Panics
  ///
  /// Panics if `sender` is not the other half of this channel.
  pub fn clear(&mut self, sender: &mut SingleSender<T>) {
    assert!(
      Arc::ptr_eq(&self.shared, &sender.shared),
      "clear requires both halves of the same channel"
    );
    if self.shared.full.load(Ordering::Relaxed) {
      unsafe { self.shared.slot_drop() };
      self.shared.full.store(false, Ordering::Relaxed);
    }
  }
}

impl<T> SingleReceiver<T> {
  /// Returns `true` if the slot currently holds a value.
  #[inline]
  pub fn is_full(&self) -> bool {
    self.shared.full.load(Ordering::Acquire)
  }

  /// Returns `true` if the slot is currently vacant.
  #[inline]
  pub fn is_empty(&self) -> bool {
    !self.is_full()
  }
}

/// Creates the two halves of a one-slot handoff channel.
///
/// The sender and receiver are the sole handles to their respective ends;
/// neither can be cloned or shared between threads, which is what makes the
/// wait-free protocol sound.
pub fn single<T: Send>() -> (SingleSender<T>, SingleReceiver<T>) {
  let shared = Arc::new(SingleShared::new_internal());
  (
    SingleSender {
      shared: Arc::clone(&shared),
      _phantom: PhantomData,
    },
    SingleReceiver {
      shared,
      _phantom: PhantomData,
    },
  )
}

#[cfg(all(test, not(weft_loom)))]
mod tests {
  use super::*;
  use std::mem;
  use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
  use std::thread;

  #[test]
  fn create_channel() {
    let (p, c) = single::<i32>();
    assert!(p.is_empty());
    assert!(c.is_empty());
    assert!(!p.is_full());
    assert!(!c.is_full());
  }

  #[test]
  fn roundtrip_single_item() {
    let (p, c) = single();
    p.try_send(42i32).unwrap();
    assert!(p.is_full());
    assert!(c.is_full());

    assert_eq!(c.try_recv().unwrap(), 42);
    assert!(c.is_empty());
    assert_eq!(c.try_recv(), Err(TryRecvError::Empty));
  }

  #[test]
  fn full_slot_rejects_and_returns_item() {
    let (p, c) = single();
    p.try_send(10).unwrap();
    match p.try_send(20) {
      Err(TrySendError::Full(v)) => assert_eq!(v, 20),
      res => panic!("expected Full, got {:?}", res),
    }
    // The resident value is untouched by the rejection.
    assert_eq!(c.try_recv().unwrap(), 10);
  }

  #[test]
  fn slot_is_reusable_after_recv() {
    let (p, c) = single();
    for i in 0..100 {
      p.try_send(i).unwrap();
      assert_eq!(c.try_recv().unwrap(), i);
    }
  }

  #[test]
  fn clear_occupied_then_reuse() {
    let (mut p, mut c) = single();
    p.try_send(1).unwrap();
    c.clear(&mut p);
    assert!(c.is_empty());
    assert_eq!(c.try_recv(), Err(TryRecvError::Empty));

    p.try_send(2).unwrap();
    assert_eq!(c.try_recv().unwrap(), 2);
  }

  #[test]
  fn clear_empty_is_noop() {
    let (mut p, mut c) = single::<String>();
    c.clear(&mut p);
    assert!(c.is_empty());
  }

  #[test]
  #[should_panic(expected = "both halves of the same channel")]
  fn clear_rejects_foreign_sender() {
    let (_p1, mut c1) = single::<i32>();
    let (mut p2, _c2) = single::<i32>();
    c1.clear(&mut p2);
  }

  #[test]
  fn resident_value_dropped_on_teardown() {
    struct Droppable(Arc<AtomicUsize>);
    impl Drop for Droppable {
      fn drop(&mut self) {
        self.0.fetch_add(1, AtomicOrdering::Relaxed);
      }
    }

    let drops = Arc::new(AtomicUsize::new(0));
    {
      let (p, c) = single();
      p.try_send(Droppable(drops.clone())).unwrap();
      drop(p);
      drop(c);
    }
    assert_eq!(drops.load(AtomicOrdering::Relaxed), 1);

    // clear drops too, exactly once.
    drops.store(0, AtomicOrdering::Relaxed);
    {
      let (mut p, mut c) = single();
      p.try_send(Droppable(drops.clone())).unwrap();
      c.clear(&mut p);
      assert_eq!(drops.load(AtomicOrdering::Relaxed), 1);
    }
    assert_eq!(drops.load(AtomicOrdering::Relaxed), 1);
  }

  #[test]
  fn layout_is_two_cache_lines_for_small_t() {
    let line = CachePadded::<u64>::alignment_value();
    assert_eq!(mem::size_of::<SingleShared<u64>>(), 2 * line);
  }

  #[test]
  fn cross_thread_handoff() {
    let (p, c) = single();

    let producer = thread::spawn(move || {
      p.try_send(7u64).unwrap();
    });

    let got = loop {
      match c.try_recv() {
        Ok(v) => break v,
        Err(TryRecvError::Empty) => thread::yield_now(),
      }
    };

    producer.join().unwrap();
    assert_eq!(got, 7);
  }
}
