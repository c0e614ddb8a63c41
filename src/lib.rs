#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

//! Inter-worker channels for a work-stealing task runtime.
//!
//! `weft` provides the two shared-memory channels such a runtime needs to
//! move task descriptors between worker threads:
//!
//! - [`spsc`]: a wait-free single-slot channel for handing one task from a
//!   thief to its victim, or carrying a steal request the other way.
//! - [`mpsc`]: a bounded mailbox with any number of producers serialized by
//!   a short critical section and a lock-free consumer.
//!
//! Both channels are strictly non-blocking. `try_send` and `try_recv` either
//! complete immediately or report full/empty; callers that want to wait layer
//! their own spin or yield loop on top. There is no close or disconnect
//! state: a channel outlives its traffic and never poisons.
//!
//! Handles enforce the producer/consumer cardinality at the type level. The
//! SPSC halves and the MPSC receiver are `Send` but neither `Sync` nor
//! `Clone`; the MPSC sender is both `Clone` and `Sync`.

pub mod error;

// Channel type modules
pub mod mpsc;
pub mod spsc;
pub mod telemetry;

// Internal utilities - not part of the public API
mod internal;

// Public re-exports for convenience
pub use error::{TryRecvError, TrySendError};
