//! Blocking bounded FIFO with a pluggable overflow policy.
//!
//! When a push finds the queue at capacity, the overflow policy runs first
//! with mutable access to the backing deque, under the queue lock. The
//! composer installs [`erase_oldest_half`]: under sustained backpressure the
//! oldest half of the buffered stripes is dropped so consumers catch up on
//! fresh pixels. This is lossy on purpose; consumers spot the loss through
//! `seq_number` gaps.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Condvar, Mutex};

/// Overflow policy invoked with the full backing deque.
pub type OverflowFn<T> = Box<dyn Fn(&mut VecDeque<T>) + Send + Sync>;

/// Thread-safe bounded queue. `pop` blocks while empty.
pub struct BoundedQueue<T> {
    items: Mutex<VecDeque<T>>,
    not_empty: Condvar,
    capacity: usize,
    overflow: OverflowFn<T>,
    /// Elements removed by the overflow policy.
    evicted: AtomicU64,
}

impl<T> BoundedQueue<T> {
    /// # Panics
    /// Panics if `capacity` is 0.
    pub fn new<F>(capacity: usize, overflow: F) -> Self
    where
        F: Fn(&mut VecDeque<T>) + Send + Sync + 'static,
    {
        assert!(capacity > 0, "queue capacity must be greater than 0");
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            not_empty: Condvar::new(),
            capacity,
            overflow: Box::new(overflow),
            evicted: AtomicU64::new(0),
        }
    }

    /// Queue that drops its oldest half on overflow.
    pub fn with_half_eviction(capacity: usize) -> Self
    where
        T: 'static,
    {
        Self::new(capacity, erase_oldest_half(capacity))
    }

    /// Append `item` at the tail, running the overflow policy first if full.
    /// Wakes one blocked popper.
    pub fn push(&self, item: T) {
        let mut items = self.items.lock();
        if items.len() >= self.capacity {
            let before = items.len();
            (self.overflow)(&mut items);
            let dropped = before.saturating_sub(items.len());
            if dropped > 0 {
                self.evicted.fetch_add(dropped as u64, Ordering::Relaxed);
            }
        }
        items.push_back(item);
        drop(items);
        self.not_empty.notify_one();
    }

    /// Remove and return the oldest element, blocking until one exists.
    pub fn pop(&self) -> T {
        let mut items = self.items.lock();
        loop {
            if let Some(item) = items.pop_front() {
                return item;
            }
            self.not_empty.wait(&mut items);
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total elements dropped by the overflow policy so far.
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }
}

/// Overflow policy that drops the oldest `capacity / 2` elements.
pub fn erase_oldest_half<T: 'static>(capacity: usize) -> impl Fn(&mut VecDeque<T>) + Send + Sync + 'static {
    move |items: &mut VecDeque<T>| {
        let n = (capacity / 2).min(items.len());
        items.drain(..n);
        tracing::warn!(
            evicted = n,
            capacity,
            "Stripe queue full — dropped oldest half (consumers are behind)"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn fifo_order() {
        let q = BoundedQueue::with_half_eviction(8);
        for i in 0..5 {
            q.push(i);
        }
        let out: Vec<i32> = (0..5).map(|_| q.pop()).collect();
        assert_eq!(out, vec![0, 1, 2, 3, 4]);
        assert!(q.is_empty());
    }

    #[test]
    fn overflow_drops_oldest_half_before_insert() {
        let q = BoundedQueue::with_half_eviction(200);
        for i in 0..200 {
            q.push(i);
        }
        assert_eq!(q.len(), 200);
        assert_eq!(q.evicted(), 0);

        q.push(200);
        assert_eq!(q.len(), 101);
        assert_eq!(q.evicted(), 100);

        let survivors: Vec<i32> = (0..101).map(|_| q.pop()).collect();
        assert_eq!(survivors, (100..=200).collect::<Vec<_>>());
    }

    #[test]
    fn odd_capacity_evicts_floor_half() {
        let q = BoundedQueue::with_half_eviction(5);
        for i in 0..6 {
            q.push(i);
        }
        // 5 full → drop 2 → push 1
        assert_eq!(q.len(), 4);
        assert_eq!(q.pop(), 2);
    }

    #[test]
    fn custom_policy_sees_full_queue() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = Arc::clone(&seen);
        let q = BoundedQueue::new(3, move |items: &mut VecDeque<u8>| {
            seen2.lock().push(items.len());
            items.pop_back();
        });
        for i in 0..4 {
            q.push(i);
        }
        assert_eq!(*seen.lock(), vec![3]);
        assert_eq!(q.evicted(), 1);
        assert_eq!((0..3).map(|_| q.pop()).collect::<Vec<_>>(), vec![0, 1, 3]);
    }

    #[test]
    fn pop_blocks_until_push() {
        let q = Arc::new(BoundedQueue::with_half_eviction(4));
        let (tx, rx) = mpsc::channel();
        let q2 = Arc::clone(&q);
        let popper = thread::spawn(move || {
            let v: u32 = q2.pop();
            tx.send(v).unwrap();
        });

        // Nothing to pop yet.
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

        q.push(42);
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
        popper.join().unwrap();
    }

    #[test]
    fn concurrent_producers_and_consumers_lose_nothing_below_capacity() {
        let q = Arc::new(BoundedQueue::with_half_eviction(1024));
        let producers: Vec<_> = (0..4)
            .map(|p| {
                let q = Arc::clone(&q);
                thread::spawn(move || {
                    for i in 0..100u32 {
                        q.push(p * 1000 + i);
                    }
                })
            })
            .collect();
        let consumers: Vec<_> = (0..2)
            .map(|_| {
                let q = Arc::clone(&q);
                thread::spawn(move || (0..200).map(|_| q.pop()).collect::<Vec<u32>>())
            })
            .collect();

        for p in producers {
            p.join().unwrap();
        }
        let mut all: Vec<u32> = consumers.into_iter().flat_map(|c| c.join().unwrap()).collect();
        all.sort_unstable();
        assert_eq!(all.len(), 400);
        all.dedup();
        assert_eq!(all.len(), 400);
        assert_eq!(q.evicted(), 0);
    }
}
