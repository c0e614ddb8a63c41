// src/mpsc/mod.rs

//! Multi-producer, single-consumer channels.
//!
//! [`bounded`] is a worker's inbound mailbox: a fixed-capacity ring that any
//! number of threads may send into while exactly one consumer drains it.
//! Producers serialize on a short mutex-guarded critical section (one slot
//! write plus an index bump); the consumer never takes a lock and is never
//! blocked by producer activity.

mod bounded;


pub use bounded::{bounded, BoundedReceiver, BoundedSender};
