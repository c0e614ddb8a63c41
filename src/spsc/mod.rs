// src/spsc/mod.rs

//! Single-producer, single-consumer channels.
//!
//! The one variant here, [`single`], holds at most one item and is wait-free
//! on both sides: each operation is one atomic load and at most one atomic
//! store, with no loops and no locks. A work-stealing runtime uses it to
//! hand a stolen task from thief to victim, or to carry a steal request the
//! other way.

mod single;

pub use single::{single, SingleReceiver, SingleSender};
