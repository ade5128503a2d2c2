// Contract tests: every property is checked against both strategies.
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel;
use pbuf_buffer::{
    new_buffer, BoundedBuffer, BufferError, CancelToken, Cancelled, OfferError, PollError,
    SharedBuffer, Strategy, CANCEL_POLL_INTERVAL,
};

// Generous bound for "returned promptly" on a loaded CI machine.
const SLACK: Duration = Duration::from_millis(500);

fn buffer<T: Send + 'static>(strategy: Strategy, capacity: usize) -> SharedBuffer<T> {
    new_buffer(strategy, capacity).unwrap()
}

fn drain<T>(buffer: &SharedBuffer<T>) -> Vec<T> {
    std::iter::from_fn(|| buffer.remove()).collect()
}

#[test]
fn zero_capacity_is_rejected() {
    for strategy in Strategy::ALL {
        let err = new_buffer::<u8>(strategy, 0).err();
        assert_eq!(err, Some(BufferError::InvalidCapacity(0)), "{strategy}");
    }
}

#[test]
fn observers_report_construction_parameters() {
    for strategy in Strategy::ALL {
        let b = buffer::<u8>(strategy, 5);
        assert_eq!(b.strategy(), strategy);
        assert_eq!(b.capacity(), 5);
        assert!(b.is_empty());
        assert!(!b.is_full());
    }
}

#[test]
fn single_slot_scenario() {
    for strategy in Strategy::ALL {
        let b = buffer(strategy, 1);
        b.put(5);
        assert!(b.is_full());
        assert_eq!(b.add(7), Err(7), "{strategy}");
        assert_eq!(b.len(), 1);
        assert_eq!(b.get(), 5);
        assert!(b.is_empty());
        assert_eq!(b.remove(), None, "{strategy}");
    }
}

#[test]
fn put_on_full_buffer_waits_for_a_get() {
    for strategy in Strategy::ALL {
        let b = buffer(strategy, 3);
        for v in 1..=3 {
            b.put(v);
        }

        let (done_tx, done_rx) = channel::bounded(1);
        let producer = {
            let b = Arc::clone(&b);
            thread::spawn(move || {
                b.put(4);
                done_tx.send(()).unwrap();
            })
        };

        assert!(
            done_rx.recv_timeout(Duration::from_millis(100)).is_err(),
            "{strategy}: put(4) returned while the buffer was full"
        );
        assert_eq!(b.get(), 1);
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        producer.join().unwrap();

        assert_eq!(drain(&b), vec![2, 3, 4], "{strategy}");
    }
}

#[test]
fn get_on_empty_buffer_waits_for_a_put() {
    for strategy in Strategy::ALL {
        let b = buffer::<&'static str>(strategy, 2);
        let (got_tx, got_rx) = channel::bounded(1);
        let consumer = {
            let b = Arc::clone(&b);
            thread::spawn(move || got_tx.send(b.get()).unwrap())
        };

        assert!(got_rx.recv_timeout(Duration::from_millis(100)).is_err());
        b.put("late");
        assert_eq!(got_rx.recv_timeout(Duration::from_secs(5)).unwrap(), "late");
        consumer.join().unwrap();
    }
}

#[test]
fn spsc_preserves_fifo_order() {
    for strategy in Strategy::ALL {
        let b = buffer::<u32>(strategy, 4);
        let producer = {
            let b = Arc::clone(&b);
            thread::spawn(move || {
                for v in 0..2000 {
                    b.put(v);
                }
            })
        };
        let received: Vec<u32> = (0..2000).map(|_| b.get()).collect();
        producer.join().unwrap();
        assert_eq!(received, (0..2000).collect::<Vec<_>>(), "{strategy}");
    }
}

#[test]
fn mpmc_neither_loses_nor_duplicates() {
    const PRODUCERS: usize = 4;
    const CONSUMERS: usize = 4;
    const PER_PRODUCER: usize = 500;

    for strategy in Strategy::ALL {
        let b = buffer::<(usize, usize)>(strategy, 3);
        let over_capacity = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(true));

        let watcher = {
            let (b, over, running) = (Arc::clone(&b), Arc::clone(&over_capacity), Arc::clone(&running));
            thread::spawn(move || {
                while running.load(Ordering::Relaxed) {
                    if b.len() > b.capacity() {
                        over.store(true, Ordering::Relaxed);
                    }
                    thread::yield_now();
                }
            })
        };

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let b = Arc::clone(&b);
                thread::spawn(move || {
                    for seq in 0..PER_PRODUCER {
                        b.put((p, seq));
                    }
                })
            })
            .collect();
        let consumers: Vec<_> = (0..CONSUMERS)
            .map(|_| {
                let b = Arc::clone(&b);
                thread::spawn(move || {
                    (0..PRODUCERS * PER_PRODUCER / CONSUMERS)
                        .map(|_| b.get())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for p in producers {
            p.join().unwrap();
        }
        let per_consumer: Vec<Vec<(usize, usize)>> =
            consumers.into_iter().map(|c| c.join().unwrap()).collect();
        running.store(false, Ordering::Relaxed);
        watcher.join().unwrap();

        // Within one consumer, items of one producer come out in production order.
        for items in &per_consumer {
            let mut last: HashMap<usize, usize> = HashMap::new();
            for &(p, seq) in items {
                if let Some(prev) = last.insert(p, seq) {
                    assert!(prev < seq, "{strategy}: producer {p} reordered");
                }
            }
        }

        let mut all: Vec<_> = per_consumer.into_iter().flatten().collect();
        all.sort_unstable();
        let expected: Vec<_> = (0..PRODUCERS)
            .flat_map(|p| (0..PER_PRODUCER).map(move |seq| (p, seq)))
            .collect();
        assert_eq!(all, expected, "{strategy}");
        assert!(!over_capacity.load(Ordering::Relaxed), "{strategy}: capacity exceeded");
        assert!(b.is_empty());
    }
}

#[test]
fn non_blocking_calls_return_immediately() {
    for strategy in Strategy::ALL {
        let b = buffer(strategy, 2);

        let start = Instant::now();
        assert_eq!(b.remove(), None);
        assert!(start.elapsed() < SLACK);

        b.put('a');
        b.put('b');
        let start = Instant::now();
        assert_eq!(b.add('c'), Err('c'));
        assert!(start.elapsed() < SLACK);
        assert_eq!(drain(&b), vec!['a', 'b'], "{strategy}");
    }
}

#[test]
fn offer_on_full_buffer_times_out_at_deadline() {
    for strategy in Strategy::ALL {
        let b = buffer(strategy, 1);
        b.put(0u8);

        let wait = Duration::from_millis(60);
        let start = Instant::now();
        let result = b.offer(1, start + wait);
        let elapsed = start.elapsed();

        assert_eq!(result, Err(OfferError::Timeout(1)), "{strategy}");
        assert!(elapsed >= wait, "{strategy}: gave up early after {elapsed:?}");
        assert!(elapsed < wait + SLACK, "{strategy}: overslept {elapsed:?}");
        assert_eq!(drain(&b), vec![0]);
    }
}

#[test]
fn poll_on_empty_buffer_times_out_at_deadline() {
    for strategy in Strategy::ALL {
        let b = buffer::<u8>(strategy, 1);

        let wait = Duration::from_millis(60);
        let start = Instant::now();
        let result = b.poll_for(wait);
        let elapsed = start.elapsed();

        assert_eq!(result, Err(PollError::Timeout), "{strategy}");
        assert!(elapsed >= wait);
        assert!(elapsed < wait + SLACK, "{strategy}: overslept {elapsed:?}");
        assert!(b.is_empty());
    }
}

#[test]
fn offer_succeeds_when_a_slot_frees_before_deadline() {
    for strategy in Strategy::ALL {
        let b = buffer(strategy, 1);
        b.put(1u32);

        let consumer = {
            let b = Arc::clone(&b);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(40));
                b.get()
            })
        };

        let start = Instant::now();
        assert_eq!(b.offer_for(2, Duration::from_secs(5)), Ok(()), "{strategy}");
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(consumer.join().unwrap(), 1);
        assert_eq!(b.get(), 2);
    }
}

#[test]
fn poll_receives_value_arriving_before_deadline() {
    for strategy in Strategy::ALL {
        let b = buffer(strategy, 1);
        let producer = {
            let b = Arc::clone(&b);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(40));
                b.put(99u64);
            })
        };
        assert_eq!(b.poll_for(Duration::from_secs(5)), Ok(99), "{strategy}");
        producer.join().unwrap();
    }
}

#[test]
fn unrepresentable_timeout_waits_without_limit() {
    for strategy in Strategy::ALL {
        let b = buffer(strategy, 1);

        assert_eq!(b.offer_for(1u32, Duration::MAX), Ok(()), "{strategy}");
        assert_eq!(b.poll_for(Duration::MAX), Ok(1), "{strategy}");

        let (tx, rx) = channel::bounded(1);
        let waiter = {
            let b = Arc::clone(&b);
            thread::spawn(move || {
                let _ = tx.send(b.poll_for(Duration::MAX));
            })
        };
        assert!(
            rx.recv_timeout(Duration::from_millis(50)).is_err(),
            "{strategy}: poll_for returned on an empty buffer"
        );
        b.put(2);
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(Ok(2)), "{strategy}");
        waiter.join().unwrap();

        b.put(3);
        let (tx, rx) = channel::bounded(1);
        let blocked = {
            let b = Arc::clone(&b);
            thread::spawn(move || {
                let _ = tx.send(b.offer_for(4, Duration::MAX));
            })
        };
        assert!(
            rx.recv_timeout(Duration::from_millis(50)).is_err(),
            "{strategy}: offer_for returned on a full buffer"
        );
        assert_eq!(b.get(), 3);
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(Ok(())), "{strategy}");
        blocked.join().unwrap();
        assert_eq!(drain(&b), vec![4]);
    }
}

#[test]
fn past_deadline_behaves_like_a_try() {
    for strategy in Strategy::ALL {
        let b = buffer(strategy, 1);
        let past = Instant::now();
        thread::sleep(Duration::from_millis(2));

        assert_eq!(b.offer(3, past), Ok(()), "{strategy}");
        assert_eq!(b.offer(4, past), Err(OfferError::Timeout(4)));
        assert_eq!(b.poll(past), Ok(3));
        assert_eq!(b.poll(past), Err(PollError::Timeout));
    }
}

#[test]
fn cancelled_put_leaves_buffer_unchanged() {
    for strategy in Strategy::ALL {
        let b = buffer(strategy, 2);
        b.put(1);
        b.put(2);
        let cancel = CancelToken::new();

        let producer = {
            let (b, cancel) = (Arc::clone(&b), cancel.clone());
            thread::spawn(move || b.put_cancellable(3, &cancel))
        };
        thread::sleep(Duration::from_millis(40));
        let cancelled_at = Instant::now();
        cancel.cancel();

        assert_eq!(producer.join().unwrap(), Err(Cancelled(3)), "{strategy}");
        assert!(cancelled_at.elapsed() < CANCEL_POLL_INTERVAL + SLACK);
        assert_eq!(drain(&b), vec![1, 2], "{strategy}");

        // The buffer still works normally afterwards.
        assert_eq!(b.add(5), Ok(()));
        assert_eq!(b.get(), 5);
    }
}

#[test]
fn cancelled_get_takes_nothing() {
    for strategy in Strategy::ALL {
        let b = buffer::<u16>(strategy, 1);
        let cancel = CancelToken::new();

        let consumer = {
            let (b, cancel) = (Arc::clone(&b), cancel.clone());
            thread::spawn(move || b.get_cancellable(&cancel))
        };
        thread::sleep(Duration::from_millis(40));
        cancel.cancel();
        assert_eq!(consumer.join().unwrap(), Err(Cancelled(())), "{strategy}");

        b.put(8);
        assert_eq!(b.remove(), Some(8), "{strategy}");
    }
}

#[test]
fn cancellation_cuts_bounded_waits_short() {
    for strategy in Strategy::ALL {
        let full = buffer(strategy, 1);
        full.put(0u8);
        let empty = buffer::<u8>(strategy, 1);
        let cancel = CancelToken::new();
        let deadline = Instant::now() + Duration::from_secs(30);

        let offerer = {
            let (b, cancel) = (Arc::clone(&full), cancel.clone());
            thread::spawn(move || b.offer_cancellable(1, deadline, &cancel))
        };
        let poller = {
            let (b, cancel) = (Arc::clone(&empty), cancel.clone());
            thread::spawn(move || b.poll_cancellable(deadline, &cancel))
        };
        thread::sleep(Duration::from_millis(40));
        cancel.cancel();

        assert_eq!(offerer.join().unwrap(), Err(OfferError::Cancelled(1)), "{strategy}");
        assert_eq!(poller.join().unwrap(), Err(PollError::Cancelled), "{strategy}");
        assert!(Instant::now() < deadline);
        assert_eq!(drain(&full), vec![0]);
        assert!(empty.is_empty());
    }
}

#[test]
fn cancelled_token_does_not_block_a_ready_operation() {
    for strategy in Strategy::ALL {
        let b = buffer(strategy, 1);
        let cancel = CancelToken::new();
        cancel.cancel();

        assert_eq!(b.put_cancellable('k', &cancel), Ok(()));
        assert_eq!(b.put_cancellable('l', &cancel), Err(Cancelled('l')));
        assert_eq!(b.get_cancellable(&cancel), Ok('k'));
        assert_eq!(b.get_cancellable(&cancel), Err(Cancelled(())));
    }
}

#[test]
fn mixed_access_modes_move_every_value() {
    const ITEMS: u32 = 400;

    for strategy in Strategy::ALL {
        let b = buffer::<u32>(strategy, 2);

        let adder = {
            let b = Arc::clone(&b);
            thread::spawn(move || {
                for v in 0..ITEMS {
                    let mut pending = v;
                    while let Err(back) = b.add(pending) {
                        pending = back;
                        thread::yield_now();
                    }
                }
            })
        };
        let offerer = {
            let b = Arc::clone(&b);
            thread::spawn(move || {
                for v in ITEMS..2 * ITEMS {
                    let mut pending = v;
                    while let Err(err) = b.offer_for(pending, Duration::from_millis(5)) {
                        pending = err.into_inner();
                    }
                }
            })
        };

        let mut seen = Vec::with_capacity(2 * ITEMS as usize);
        while seen.len() < 2 * ITEMS as usize {
            match b.poll_for(Duration::from_millis(5)) {
                Ok(v) => seen.push(v),
                Err(err) => assert!(err.is_timeout()),
            }
        }
        adder.join().unwrap();
        offerer.join().unwrap();

        seen.sort_unstable();
        assert_eq!(seen, (0..2 * ITEMS).collect::<Vec<_>>(), "{strategy}");
    }
}
