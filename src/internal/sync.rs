// src/internal/sync.rs

//! Source switch between the real concurrency primitives and `loom`'s
//! instrumented doubles.
//!
//! The channel code is written once against these names; building with
//! `RUSTFLAGS="--cfg weft_loom"` swaps every atomic, cell, and mutex for its
//! loom equivalent so the exact shipping algorithms run under loom's
//! exhaustive interleaver (`cargo test --test loom`).

#[cfg(not(weft_loom))]
pub(crate) use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[cfg(weft_loom)]
pub(crate) use loom::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[cfg(not(weft_loom))]
pub(crate) use std::cell::UnsafeCell;

#[cfg(weft_loom)]
pub(crate) use loom::cell::UnsafeCell;

#[cfg(not(weft_loom))]
pub(crate) use parking_lot::Mutex;

/// Minimal stand-in for `parking_lot::Mutex` backed by `loom::sync::Mutex`.
/// Only the surface the channels use: `new` and an infallible `lock`.
#[cfg(weft_loom)]
pub(crate) struct Mutex<T>(loom::sync::Mutex<T>);

#[cfg(weft_loom)]
impl<T> Mutex<T> {
  pub(crate) fn new(value: T) -> Self {
    Mutex(loom::sync::Mutex::new(value))
  }

  pub(crate) fn lock(&self) -> loom::sync::MutexGuard<'_, T> {
    // Loom mutexes report poisoning like std; the channels never panic while
    // holding the lock, so unwrap cannot fire inside a model.
    self.0.lock().unwrap()
  }
}
