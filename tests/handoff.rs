//! Producer and consumer on separate threads hammering the TLE mailbox.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use sat_mount::tracker::{Mailbox, TrackerError};

const ROUNDS: u64 = 20_000;

/// Payload wide enough that a torn write would show up as mixed words.
type Payload = [u64; 16];

#[test]
fn every_payload_arrives_whole_and_once() {
    let mailbox: Arc<Mailbox<Payload>> = Arc::new(Mailbox::new());
    let done = Arc::new(AtomicBool::new(false));

    let producer = {
        let mailbox = mailbox.clone();
        let done = done.clone();
        thread::spawn(move || {
            let mut refused = 0u64;
            for round in 0..ROUNDS {
                loop {
                    match mailbox.submit([round; 16]) {
                        Ok(()) => break,
                        Err(TrackerError::HandoffBusy) => {
                            refused += 1;
                            thread::yield_now();
                        }
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                }
            }
            done.store(true, Ordering::Release);
            refused
        })
    };

    let consumer = {
        let mailbox = mailbox.clone();
        let done = done.clone();
        thread::spawn(move || {
            let mut received = Vec::with_capacity(ROUNDS as usize);
            loop {
                match mailbox.take() {
                    Some(delivery) => {
                        let payload = *delivery;
                        assert!(
                            payload.iter().all(|&word| word == payload[0]),
                            "torn payload {payload:?}"
                        );
                        assert!(mailbox.is_pending());
                        received.push(payload[0]);
                    }
                    None if done.load(Ordering::Acquire) && !mailbox.is_pending() => break,
                    None => thread::yield_now(),
                }
            }
            received
        })
    };

    let refused = producer.join().unwrap();
    let received = consumer.join().unwrap();

    assert_eq!(received, (0..ROUNDS).collect::<Vec<_>>());
    assert!(!mailbox.is_pending());
    eprintln!("{refused} submissions refused while the slot was busy");
}

#[test]
fn concurrent_producers_get_one_slot() {
    let mailbox: Arc<Mailbox<u32>> = Arc::new(Mailbox::new());
    let workers: Vec<_> = (0..8)
        .map(|id| {
            let mailbox = mailbox.clone();
            thread::spawn(move || mailbox.submit(id).is_ok())
        })
        .collect();

    let accepted = workers
        .into_iter()
        .map(|worker| worker.join().unwrap())
        .filter(|&ok| ok)
        .count();

    assert_eq!(accepted, 1);
    assert!(mailbox.take().is_some());
    assert!(mailbox.take().is_none());
}
