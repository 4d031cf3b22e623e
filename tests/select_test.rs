use savak::{
    recv, recv_then, rendezvous, select, select_or, select_with, send, send_then, unbounded,
    StopSource,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_millis(100);

#[test]
fn test_select_prefers_ready_operation() {
    let (_s1, r1) = rendezvous::<i32>();
    let (s2, r2) = unbounded::<String>();
    s2.send("foo".to_string()).unwrap();

    let got = Arc::new(Mutex::new(None));
    {
        let settled = Arc::clone(&got);
        let mut op1 = recv(&r1);
        let mut op2 = recv_then(&r2, move |value| {
            *settled.lock().unwrap() = value;
        });
        select(&mut [&mut op1, &mut op2]);
    }

    assert_eq!(got.lock().unwrap().as_deref(), Some("foo"));
    // The losing receive never registered anything.
    assert_eq!(r1.size(), 0);
}

#[test]
fn test_select_greedy_pass_is_in_order() {
    let (s1, r1) = unbounded::<i32>();
    let (s2, r2) = unbounded::<i32>();
    s1.send(1).unwrap();
    s2.send(2).unwrap();

    let winner = Arc::new(Mutex::new(None));
    {
        let first = Arc::clone(&winner);
        let second = Arc::clone(&winner);
        let mut op1 = recv_then(&r1, move |_| {
            *first.lock().unwrap() = Some("first");
        });
        let mut op2 = recv_then(&r2, move |_| {
            *second.lock().unwrap() = Some("second");
        });
        select(&mut [&mut op1, &mut op2]);
    }

    assert_eq!(*winner.lock().unwrap(), Some("first"));
    // The second channel keeps its value.
    assert_eq!(r2.try_recv(), Ok(2));
}

#[test]
fn test_select_immediate_send_cancels_siblings() {
    let (_s1, r1) = rendezvous::<i32>();
    let (s2, r2) = unbounded::<String>();

    let sent = Arc::new(Mutex::new(Vec::new()));
    {
        let a = Arc::clone(&sent);
        let b = Arc::clone(&sent);
        let mut op1 = recv(&r1);
        let mut op2 = send_then(&s2, "foo".to_string(), move |ok| {
            a.lock().unwrap().push(("foo", ok));
        });
        let mut op3 = send_then(&s2, "bar".to_string(), move |ok| {
            b.lock().unwrap().push(("bar", ok));
        });
        select(&mut [&mut op1, &mut op2, &mut op3]);
    }

    assert_eq!(*sent.lock().unwrap(), vec![("foo", true)]);
    assert_eq!(r1.size(), 0);
    assert_eq!(r2.size(), 1);
    assert_eq!(r2.try_recv().unwrap(), "foo");
}

#[test]
fn test_select_fallback_when_nothing_ready() {
    let (_s1, r1) = rendezvous::<i32>();

    let fell_back = Arc::new(Mutex::new(false));
    {
        let flag = Arc::clone(&fell_back);
        let mut op1 = recv(&r1);
        select_or(&mut [&mut op1], move || {
            *flag.lock().unwrap() = true;
        });
    }

    assert!(*fell_back.lock().unwrap());
    assert_eq!(r1.size(), 0);
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_select_scheduled_settled_by_send() {
    let (_s1, r1) = rendezvous::<i32>();
    let (s2, r2) = unbounded::<String>();
    let s2_keep = s2.clone();

    let hits = Arc::new(AtomicUsize::new(0));
    let t0 = Instant::now();
    let sender = thread::spawn(move || {
        thread::sleep(WAIT);
        s2.send("foo".to_string()).unwrap();
    });

    {
        let h1 = Arc::clone(&hits);
        let h2 = Arc::clone(&hits);
        let mut op1 = recv(&r1);
        let mut op2 = recv_then(&r2, move |value| {
            if value.is_some() {
                h1.fetch_add(1, Ordering::Relaxed);
            }
        });
        let mut op3 = recv_then(&r2, move |value| {
            if value.is_some() {
                h2.fetch_add(1, Ordering::Relaxed);
            }
        });
        select(&mut [&mut op1, &mut op2, &mut op3]);
    }

    assert!(t0.elapsed() >= WAIT);
    sender.join().unwrap();

    // Exactly one sibling took the value; the rest were aborted.
    assert_eq!(hits.load(Ordering::Relaxed), 1);
    assert_eq!(r1.size(), 0);
    assert_eq!(r2.size(), 0);

    // The surviving registrations are dead: a later value flows normally.
    s2_keep.send("bar".to_string()).unwrap();
    assert_eq!(r2.recv().unwrap(), "bar");
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_select_scheduled_settled_by_receive() {
    let (s1, _r1) = rendezvous::<i32>();
    let (s2, r2) = rendezvous::<String>();

    let received = Arc::new(Mutex::new(None));
    let t0 = Instant::now();
    let receiver = {
        let received = Arc::clone(&received);
        thread::spawn(move || {
            thread::sleep(WAIT);
            *received.lock().unwrap() = Some(r2.recv().unwrap());
        })
    };

    let settled = Arc::new(Mutex::new(Vec::new()));
    {
        let a = Arc::clone(&settled);
        let b = Arc::clone(&settled);
        let mut op1 = send(&s1, 42);
        let mut op2 = send_then(&s2, "foo".to_string(), move |ok| {
            a.lock().unwrap().push(("foo", ok));
        });
        let mut op3 = send_then(&s2, "bar".to_string(), move |ok| {
            b.lock().unwrap().push(("bar", ok));
        });
        select(&mut [&mut op1, &mut op2, &mut op3]);
    }

    assert!(t0.elapsed() >= WAIT);
    receiver.join().unwrap();

    // The receiver took the oldest parked send; its sibling was aborted.
    assert_eq!(*settled.lock().unwrap(), vec![("foo", true)]);
    assert_eq!(received.lock().unwrap().as_deref(), Some("foo"));
    assert_eq!(s1.size(), 0);
    assert_eq!(s2.size(), 0);
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_select_scheduled_settled_by_close() {
    let (_s1, r1) = rendezvous::<i32>();
    let (s2, r2) = rendezvous::<String>();

    let s2_closer = s2.clone();
    let t0 = Instant::now();
    let closer = thread::spawn(move || {
        thread::sleep(WAIT);
        s2_closer.close();
    });

    let settled = Arc::new(Mutex::new(Vec::new()));
    {
        let a = Arc::clone(&settled);
        let b = Arc::clone(&settled);
        let mut op1 = recv(&r1);
        let mut op2 = send_then(&s2, "foo".to_string(), move |ok| {
            a.lock().unwrap().push(ok);
        });
        let mut op3 = send_then(&s2, "bar".to_string(), move |ok| {
            b.lock().unwrap().push(ok);
        });
        select(&mut [&mut op1, &mut op2, &mut op3]);
    }

    assert!(t0.elapsed() >= WAIT);
    closer.join().unwrap();

    // Closing settles exactly one parked operation with a failure; the other
    // is aborted without its callback running.
    assert_eq!(*settled.lock().unwrap(), vec![false]);
    assert_eq!(r1.size(), 0);
    assert_eq!(r2.size(), 0);
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_select_canceled_by_token() {
    let (_s1, r1) = rendezvous::<i32>();
    let source = StopSource::new();
    let token = source.token();

    let canceler = thread::spawn(move || {
        thread::sleep(WAIT);
        source.request_stop();
    });

    let hits = Arc::new(AtomicUsize::new(0));
    let t0 = Instant::now();
    {
        let hits = Arc::clone(&hits);
        let mut op1 = recv_then(&r1, move |_| {
            hits.fetch_add(1, Ordering::Relaxed);
        });
        select_with(&token, &mut [&mut op1]);
    }

    assert!(t0.elapsed() >= WAIT);
    canceler.join().unwrap();

    // Cancellation commits nothing.
    assert_eq!(hits.load(Ordering::Relaxed), 0);
    assert_eq!(r1.size(), 0);
}

#[test]
fn test_select_with_pre_stopped_token() {
    let (_s1, r1) = rendezvous::<i32>();
    let source = StopSource::new();
    source.request_stop();
    let token = source.token();

    let hits = Arc::new(AtomicUsize::new(0));
    {
        let hits = Arc::clone(&hits);
        let mut op1 = recv_then(&r1, move |_| {
            hits.fetch_add(1, Ordering::Relaxed);
        });
        select_with(&token, &mut [&mut op1]);
    }

    assert_eq!(hits.load(Ordering::Relaxed), 0);
    assert_eq!(r1.size(), 0);
}

#[test]
fn test_select_settles_against_closed_channel() {
    let (s1, r1) = rendezvous::<i32>();
    s1.close();

    let got = Arc::new(Mutex::new(None));
    {
        let settled = Arc::clone(&got);
        let mut op1 = recv_then(&r1, move |value| {
            *settled.lock().unwrap() = Some(value);
        });
        select(&mut [&mut op1]);
    }

    // A closed channel settles the operation with a failure.
    assert_eq!(*got.lock().unwrap(), Some(None));
}
