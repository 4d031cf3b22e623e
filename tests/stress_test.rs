use rand::Rng;
use savak::{bounded, unbounded};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const SENDERS: usize = 4;
const RECEIVERS: usize = 4;

fn assert_each_ticket_once(marks: &[usize], n: usize) {
    assert_eq!(marks.len(), n);
    let mut seen = vec![false; n];
    for &v in marks {
        assert!(!seen[v], "ticket {} received twice", v);
        seen[v] = true;
    }
    assert!(seen.iter().all(|&s| s));
}

/// Pushes `n` distinct tickets through a bounded channel from several
/// producer threads and checks that every ticket comes out exactly once.
fn run_bounded_sweep(cap: usize, n: usize) {
    let (s, r) = bounded::<usize>(cap);
    let ticket = Arc::new(AtomicUsize::new(0));
    let marks = Arc::new(Mutex::new(Vec::new()));

    let mut receivers = Vec::new();
    for _ in 0..RECEIVERS {
        let r = r.clone();
        let marks = Arc::clone(&marks);
        receivers.push(thread::spawn(move || {
            while let Ok(v) = r.recv() {
                marks.lock().unwrap().push(v);
            }
        }));
    }

    let mut senders = Vec::new();
    for _ in 0..SENDERS {
        let s = s.clone();
        let ticket = Arc::clone(&ticket);
        senders.push(thread::spawn(move || {
            let mut rng = rand::thread_rng();
            loop {
                let v = ticket.fetch_add(1, Ordering::Relaxed);
                if v >= n {
                    return;
                }
                s.send(v).unwrap();
                if rng.gen_bool(0.01) {
                    thread::yield_now();
                }
            }
        }));
    }

    for handle in senders {
        handle.join().unwrap();
    }

    // Once every receiver hangs again, everything sent has been taken.
    while r.size() != -(RECEIVERS as isize) {
        thread::sleep(Duration::from_millis(5));
    }
    r.close();
    for handle in receivers {
        handle.join().unwrap();
    }

    assert_each_ticket_once(&marks.lock().unwrap(), n);
}

fn run_unbounded_sweep(n: usize) {
    let (s, r) = unbounded::<usize>();
    let ticket = Arc::new(AtomicUsize::new(0));
    let marks = Arc::new(Mutex::new(Vec::new()));

    let mut receivers = Vec::new();
    for _ in 0..RECEIVERS {
        let r = r.clone();
        let marks = Arc::clone(&marks);
        receivers.push(thread::spawn(move || {
            while let Ok(v) = r.recv() {
                marks.lock().unwrap().push(v);
            }
        }));
    }

    let mut senders = Vec::new();
    for _ in 0..SENDERS {
        let s = s.clone();
        let ticket = Arc::clone(&ticket);
        senders.push(thread::spawn(move || {
            let mut rng = rand::thread_rng();
            loop {
                let v = ticket.fetch_add(1, Ordering::Relaxed);
                if v >= n {
                    return;
                }
                s.send(v).unwrap();
                if rng.gen_bool(0.01) {
                    thread::yield_now();
                }
            }
        }));
    }

    for handle in senders {
        handle.join().unwrap();
    }

    while r.size() != -(RECEIVERS as isize) {
        thread::sleep(Duration::from_millis(5));
    }
    r.close();
    for handle in receivers {
        handle.join().unwrap();
    }

    assert_each_ticket_once(&marks.lock().unwrap(), n);
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_rendezvous_ticket_sweep() {
    run_bounded_sweep(0, 2_000);
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_bounded_ticket_sweep() {
    run_bounded_sweep(1, 2_000);
    run_bounded_sweep(8, 5_000);
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_unbounded_ticket_sweep() {
    run_unbounded_sweep(10_000);
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_bounded_back_pressure_keeps_order() {
    let (s, r) = bounded(4);

    let producer = thread::spawn(move || {
        for i in 0..200 {
            s.send(i).unwrap();
        }
    });

    let consumer = thread::spawn(move || {
        let mut received = Vec::new();
        for _ in 0..200 {
            received.push(r.recv().unwrap());
        }
        received
    });

    producer.join().unwrap();
    let received = consumer.join().unwrap();
    assert_eq!(received.len(), 200);
    for (i, v) in received.iter().enumerate() {
        assert_eq!(*v, i);
    }
}
