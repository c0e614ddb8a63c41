// src/telemetry.rs

//! Feature-gated event and counter collection for debugging channel
//! interleavings.
//!
//! With the `weft_telemetry` feature enabled, the channel hot paths record
//! sequenced events and bump named counters in a global collector;
//! [`print_telemetry_report`] dumps everything in submission order. With the
//! feature disabled (the default) every entry point is an empty inline
//! function and the hot paths carry no overhead.
//!
//! Not for production use, and not compatible with loom model runs (the
//! collector uses real std synchronization).

#[cfg(feature = "weft_telemetry")]
mod enabled {
  use std::collections::HashMap;
  use std::fmt;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Mutex;
  use std::thread::{self, ThreadId};
  use std::time::Instant;

  static NEXT_EVENT_SEQUENCE_ID: AtomicUsize = AtomicUsize::new(0);

  /// A single recorded channel event.
  #[derive(Clone)]
  pub struct TelemetryEvent {
    pub seq_id: usize,
    pub timestamp: Instant,
    pub os_thread_id: ThreadId,
    pub item_id: Option<usize>,
    pub location: &'static str,
    pub event_type: &'static str,
    pub message: Option<String>,
  }

  impl fmt::Debug for TelemetryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("TelemetryEvent")
        .field("seq", &self.seq_id)
        .field("os_tid", &self.os_thread_id)
        .field("item_id", &self.item_id)
        .field("loc", &self.location)
        .field("evt", &self.event_type)
        .field("msg", &self.message.as_deref().unwrap_or(""))
        .finish()
    }
  }

  type CounterKey = (&'static str, &'static str); // (location, counter_name)

  struct CollectorData {
    events: Vec<TelemetryEvent>,
    counters: HashMap<CounterKey, usize>,
    start_time: Instant,
  }

  impl CollectorData {
    fn new() -> Self {
      CollectorData {
        events: Vec::new(),
        counters: HashMap::new(),
        start_time: Instant::now(),
      }
    }
  }

  lazy_static::lazy_static! {
    static ref GLOBAL_COLLECTOR: Mutex<CollectorData> = Mutex::new(CollectorData::new());
  }

  pub fn log_event_fn(
    item_id: Option<usize>,
    location: &'static str,
    event_type: &'static str,
    message: Option<String>,
  ) {
    let event = TelemetryEvent {
      seq_id: NEXT_EVENT_SEQUENCE_ID.fetch_add(1, Ordering::Relaxed),
      timestamp: Instant::now(),
      os_thread_id: thread::current().id(),
      item_id,
      location,
      event_type,
      message,
    };

    if let Ok(mut collector) = GLOBAL_COLLECTOR.lock() {
      collector.events.push(event);
    } else {
      eprintln!("[WEFT TELEMETRY] collector mutex poisoned while recording event");
    }
  }

  pub fn increment_counter_fn(location: &'static str, counter_name: &'static str) {
    if let Ok(mut collector) = GLOBAL_COLLECTOR.lock() {
      *collector.counters.entry((location, counter_name)).or_insert(0) += 1;
    } else {
      eprintln!("[WEFT TELEMETRY] collector mutex poisoned while incrementing counter");
    }
  }

  pub fn print_telemetry_report_fn() {
    if let Ok(collector) = GLOBAL_COLLECTOR.lock() {
      println!("\n--- Weft Telemetry Report ---");

      if collector.events.is_empty() {
        println!("\n[Events] none recorded");
      } else {
        println!("\n[Events] {} recorded:", collector.events.len());
        let mut sorted_events = collector.events.clone();
        sorted_events.sort_by_key(|e| e.seq_id);

        for event in sorted_events.iter() {
          let since_start = event.timestamp.duration_since(collector.start_time);
          println!(
            "  +{:<10.6}s [Seq:{:<5}] TID:{:<18} Item:{:<6} Loc:{:<28} Evt:{:<22} {}",
            since_start.as_secs_f64(),
            event.seq_id,
            format!("{:?}", event.os_thread_id),
            event.item_id.map_or_else(|| "-".to_string(), |id| id.to_string()),
            event.location,
            event.event_type,
            event.message.as_deref().unwrap_or("")
          );
        }
      }

      if collector.counters.is_empty() {
        println!("\n[Counters] none recorded");
      } else {
        println!("\n[Counters] {} recorded:", collector.counters.len());
        let mut sorted_counters: Vec<_> = collector.counters.iter().collect();
        sorted_counters.sort_by_key(|(k, _v)| *k);
        for ((loc, name), count) in sorted_counters {
          println!("  Loc:{:<28} Counter:{:<22} Value: {}", loc, name, count);
        }
      }
      println!("\n--- End of Telemetry Report ---");
    } else {
      eprintln!("[WEFT TELEMETRY] collector mutex poisoned, cannot print report");
    }
  }

  pub fn clear_telemetry_fn() {
    if let Ok(mut collector) = GLOBAL_COLLECTOR.lock() {
      collector.events.clear();
      collector.counters.clear();
      collector.start_time = Instant::now();
    }
    NEXT_EVENT_SEQUENCE_ID.store(0, Ordering::Relaxed);
  }
}

#[cfg(not(feature = "weft_telemetry"))]
mod disabled {
  #[inline(always)]
  pub fn log_event_fn(
    _item_id: Option<usize>,
    _location: &'static str,
    _event_type: &'static str,
    _message: Option<String>,
  ) {
  }
  #[inline(always)]
  pub fn increment_counter_fn(_location: &'static str, _counter_name: &'static str) {}
  #[inline(always)]
  pub fn print_telemetry_report_fn() {}
  #[inline(always)]
  pub fn clear_telemetry_fn() {}
}

// Re-export the correct set of functions based on the feature flag.

/// Records an event from a channel hot path.
#[cfg(feature = "weft_telemetry")]
pub use enabled::log_event_fn as log_event;
/// Bumps a named counter.
#[cfg(feature = "weft_telemetry")]
pub use enabled::increment_counter_fn as increment_counter;
/// Prints everything collected so far to stdout.
#[cfg(feature = "weft_telemetry")]
pub use enabled::print_telemetry_report_fn as print_telemetry_report;
/// Discards all collected events and counters.
#[cfg(feature = "weft_telemetry")]
pub use enabled::clear_telemetry_fn as clear_telemetry;

/// Records an event from a channel hot path (no-op in this build).
#[cfg(not(feature = "weft_telemetry"))]
pub use disabled::log_event_fn as log_event;
/// Bumps a named counter (no-op in this build).
#[cfg(not(feature = "weft_telemetry"))]
pub use disabled::increment_counter_fn as increment_counter;
/// Prints everything collected so far to stdout (no-op in this build).
#[cfg(not(feature = "weft_telemetry"))]
pub use disabled::print_telemetry_report_fn as print_telemetry_report;
/// Discards all collected events and counters (no-op in this build).
#[cfg(not(feature = "weft_telemetry"))]
pub use disabled::clear_telemetry_fn as clear_telemetry;
