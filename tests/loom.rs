// Exhaustive interleaving checks. Build and run with:
//
//   RUSTFLAGS="--cfg weft_loom" cargo test --test loom --release
//
// Loom replaces every atomic, cell, and mutex in the channels (see
// src/internal/sync.rs) and explores all schedules, so an acquire/release
// pairing that is too weak shows up as an uninitialized or double-read slot
// here rather than as a once-a-month crash in a runtime.
#![cfg(weft_loom)]

use weft::error::TryRecvError;
use weft::{mpsc, spsc};

#[test]
fn spsc_handoff_exactly_once() {
  loom::model(|| {
    let (tx, rx) = spsc::single::<Box<u32>>();

    let producer = loom::thread::spawn(move || {
      tx.try_send(Box::new(7)).unwrap();
    });

    // A concurrent recv sees either nothing or the fully written value.
    let first = rx.try_recv().ok();
    producer.join().unwrap();
    let second = rx.try_recv().ok();

    let got: Vec<u32> = first.into_iter().chain(second).map(|b| *b).collect();
    assert_eq!(got, vec![7]);
  });
}

#[test]
fn spsc_slot_recycles_cleanly() {
  loom::model(|| {
    let (tx, rx) = spsc::single::<Box<u32>>();
    tx.try_send(Box::new(1)).unwrap();

    let consumer = loom::thread::spawn(move || {
      assert_eq!(*rx.try_recv().unwrap(), 1);
      rx
    });

    // Concurrent refill: legal to be rejected while the slot is occupied,
    // but if it lands it must land intact.
    let refill_sent = tx.try_send(Box::new(2)).is_ok();
    let rx = consumer.join().unwrap();

    match rx.try_recv() {
      Ok(v) => {
        assert!(refill_sent);
        assert_eq!(*v, 2);
      }
      Err(TryRecvError::Empty) => assert!(!refill_sent),
    }
  });
}

#[test]
fn mpsc_two_producers_exactly_once() {
  loom::model(|| {
    let (tx, rx) = mpsc::bounded::<Box<usize>>(2);
    let tx2 = tx.clone();

    let h1 = loom::thread::spawn(move || tx.try_send(Box::new(1)).unwrap());
    let h2 = loom::thread::spawn(move || tx2.try_send(Box::new(2)).unwrap());

    // Drain concurrently with the producers, then finish after they join.
    let mut got = Vec::new();
    if let Ok(v) = rx.try_recv() {
      got.push(*v);
    }
    h1.join().unwrap();
    h2.join().unwrap();
    while let Ok(v) = rx.try_recv() {
      got.push(*v);
    }

    got.sort_unstable();
    assert_eq!(got, vec![1, 2]);
  });
}

#[test]
fn mpsc_full_rejection_returns_ownership() {
  loom::model(|| {
    let (tx, rx) = mpsc::bounded::<Box<u32>>(1);
    tx.try_send(Box::new(1)).unwrap();

    let producer = loom::thread::spawn(move || {
      match tx.try_send(Box::new(2)) {
        Ok(()) => true,
        Err(e) => {
          assert_eq!(*e.into_inner(), 2);
          false
        }
      }
    });

    assert_eq!(*rx.try_recv().unwrap(), 1);
    let second_sent = producer.join().unwrap();

    match rx.try_recv() {
      Ok(v) => {
        assert!(second_sent);
        assert_eq!(*v, 2);
      }
      Err(TryRecvError::Empty) => assert!(!second_sent),
    }
  });
}
