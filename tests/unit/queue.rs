use super::*;
use crate::foundation::core::Size;
use crate::video::io::InMemorySource;

fn source(n: usize) -> InMemorySource {
    InMemorySource::solid(Size::new(4, 2), [1, 2, 3], n, 30.0).unwrap()
}

#[test]
fn queue_is_fifo_and_bounded() {
    let q = SafeQueue::new(2);
    q.enqueue(1);
    q.enqueue(2);
    assert_eq!(q.len(), q.capacity());
    assert_eq!(q.dequeue(), 1);
    assert_eq!(q.try_dequeue(), Some(2));
    assert_eq!(q.try_dequeue(), None);
}

#[test]
fn blocked_producer_wakes_when_consumer_pops() {
    let q = Arc::new(SafeQueue::new(1));
    q.enqueue(0u32);
    let q2 = Arc::clone(&q);
    let t = std::thread::spawn(move || {
        for i in 1..=3 {
            q2.enqueue(i);
        }
    });
    let got: Vec<u32> = (0..4).map(|_| q.dequeue()).collect();
    t.join().unwrap();
    assert_eq!(got, [0, 1, 2, 3]);
}

#[test]
fn consumer_sees_frames_in_order_then_terminates_on_sentinel() {
    let q = Arc::new(SafeQueue::new(2));
    let done = CancelFlag::new();
    let mut n = 0.0;
    let producer = spawn_producer(Arc::clone(&q), done.clone(), source(5), move |_| {
        n += 1.0;
        Ok(vec![Point::new(n, 0.0)])
    })
    .unwrap();

    let mut xs = Vec::new();
    let consumed = consume(&q, &done, |p| {
        xs.push(p.points[0].x);
        Ok(true)
    })
    .unwrap();

    assert_eq!(producer.join().unwrap().unwrap(), 5);
    assert_eq!(consumed, 5);
    assert_eq!(xs, [1.0, 2.0, 3.0, 4.0, 5.0]);
    assert!(q.is_empty());
    assert!(!done.is_cancelled());
}

#[test]
fn early_consumer_exit_cancels_and_unblocks_producer() {
    let q = Arc::new(SafeQueue::new(1));
    let done = CancelFlag::new();
    let producer =
        spawn_producer(Arc::clone(&q), done.clone(), source(1000), |_| Ok(Vec::new())).unwrap();

    let consumed = consume(&q, &done, |_| Ok(false)).unwrap();
    assert_eq!(consumed, 1);
    assert!(done.is_cancelled());
    let produced = producer.join().unwrap().unwrap();
    assert!(produced < 1000);
    assert!(q.is_empty());
}

#[test]
fn producer_error_still_sends_sentinel() {
    let q = Arc::new(SafeQueue::new(4));
    let done = CancelFlag::new();
    let producer = spawn_producer(Arc::clone(&q), done.clone(), source(3), |_| {
        Err(crate::BridgeError::validation("analysis failed"))
    })
    .unwrap();
    let consumed = consume(&q, &done, |_| Ok(true)).unwrap();
    assert_eq!(consumed, 0);
    assert!(producer.join().unwrap().is_err());
}

#[test]
fn sentinel_is_an_empty_frame() {
    assert!(FramePacket::sentinel().is_sentinel());
}

#[test]
fn panicking_analysis_still_ends_the_stream() {
    let q = Arc::new(SafeQueue::new(1));
    let done = CancelFlag::new();
    let analyze = |_: &PixelBuffer| -> BridgeResult<Vec<Point>> { panic!("analysis bug") };
    let producer = spawn_producer(Arc::clone(&q), done.clone(), source(3), analyze).unwrap();

    let (tx, rx) = std::sync::mpsc::channel();
    let q2 = Arc::clone(&q);
    std::thread::spawn(move || {
        let _ = tx.send(consume(&q2, &done, |_| Ok(true)));
    });
    let consumed = rx
        .recv_timeout(std::time::Duration::from_secs(5))
        .expect("consumer stayed blocked")
        .unwrap();
    assert_eq!(consumed, 0);
    assert!(producer.join().is_err());
}
