// src/internal/cache_padded.rs

//! Utility for cache line padding.

use core::fmt;
use core::ops::{Deref, DerefMut};

// Specific aligned inner types for the cache line sizes we target.

#[repr(C)]
#[repr(align(64))]
#[derive(Clone, Copy, Default, Hash, PartialEq, Eq)]
struct AlignedInner64<T> {
  value: T,
}

#[repr(C)]
#[repr(align(128))]
#[derive(Clone, Copy, Default, Hash, PartialEq, Eq)]
#[allow(dead_code)]
struct AlignedInner128<T> {
  value: T,
}

// Conditionally compiled module selecting the alignment value and type alias
// for the current architecture. This is the crate's one compile-time knob:
// the padding granularity used everywhere an atomic must own its line.
#[cfg(target_arch = "x86_64")]
mod arch_details {
  pub const CACHE_LINE_SIZE_USIZE: usize = 64;
  pub type ArchAligned<T> = super::AlignedInner64<T>;
}

#[cfg(target_arch = "aarch64")]
mod arch_details {
  // AArch64 parts ship with 64- or 128-byte lines. 64 is the broadly
  // compatible default; switch the alias to AlignedInner128 for targets
  // known to use 128.
  pub const CACHE_LINE_SIZE_USIZE: usize = 64;
  pub type ArchAligned<T> = super::AlignedInner64<T>;
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
mod arch_details {
  pub const CACHE_LINE_SIZE_USIZE: usize = 64;
  pub type ArchAligned<T> = super::AlignedInner64<T>;
}

/// A type `T` padded and aligned to the length of a cache line.
#[derive(Clone, Copy, Default, Hash, PartialEq, Eq)]
pub(crate) struct CachePadded<T> {
  inner: arch_details::ArchAligned<T>,
}

impl<T> CachePadded<T> {
  /// Creates a new cache-padded value.
  #[inline]
  pub(crate) const fn new(value: T) -> Self {
    CachePadded {
      inner: arch_details::ArchAligned { value },
    }
  }

  /// The cache line size used for padding on the current architecture.
  #[inline]
  pub(crate) const fn alignment_value() -> usize {
    arch_details::CACHE_LINE_SIZE_USIZE
  }
}

impl<T> Deref for CachePadded<T> {
  type Target = T;
  #[inline]
  fn deref(&self) -> &T {
    &self.inner.value
  }
}

impl<T> DerefMut for CachePadded<T> {
  #[inline]
  fn deref_mut(&mut self) -> &mut T {
    &mut self.inner.value
  }
}

impl<T: fmt::Debug> fmt::Debug for CachePadded<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CachePadded")
      .field("value", &self.inner.value)
      .field("alignment", &Self::alignment_value())
      .finish()
  }
}

unsafe impl<T: Send> Send for CachePadded<T> {}
unsafe impl<T: Sync> Sync for CachePadded<T> {}
