// src/error.rs

use core::fmt;

/// Error returned by `try_send` when the channel cannot accept an item
/// immediately. The item being sent is handed back to the caller.
///
/// There is no `Closed` variant: weft channels carry no disconnect state, so
/// a send can only be refused because the channel is full right now.
#[derive(PartialEq, Eq, Clone)]
pub enum TrySendError<T> {
  /// The channel is full. The rejected item is returned so the caller keeps
  /// ownership and can retry.
  Full(T),
}

impl<T> TrySendError<T> {
  /// Consumes the error, returning the item that could not be sent.
  #[inline]
  pub fn into_inner(self) -> T {
    match self {
      TrySendError::Full(v) => v,
    }
  }
}

// Manual Debug so the error is printable without requiring T: Debug.
impl<T> fmt::Debug for TrySendError<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TrySendError::Full(_) => write!(f, "TrySendError::Full(..)"),
    }
  }
}

impl<T> fmt::Display for TrySendError<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TrySendError::Full(_) => f.write_str("channel full"),
    }
  }
}

impl<T> std::error::Error for TrySendError<T> {}

/// Error returned by `try_recv` when no item is available immediately.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TryRecvError {
  /// The channel holds no items at this time.
  Empty,
}

impl std::error::Error for TryRecvError {}

impl fmt::Display for TryRecvError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TryRecvError::Empty => f.write_str("channel empty"),
    }
  }
}
