//! Deque ordering, growth and blocking behavior.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use taskpool::Deque;

#[test]
fn test_order_across_both_ends() {
    // Front-to-back logical order after these pushes is [4, 3, 1, 2]:
    // same-end pops are LIFO, cross-end order follows insertion time.
    let dq = Deque::with_capacity(8);
    dq.push_back(1u32);
    dq.push_back(2);
    dq.push_front(3);
    dq.push_front(4);
    assert_eq!(dq.pop_front(false), Some(4));
    assert_eq!(dq.pop_front(false), Some(3));
    assert_eq!(dq.pop_front(false), Some(1));
    assert_eq!(dq.pop_front(false), Some(2));

    let dq = Deque::with_capacity(8);
    dq.push_back(1u32);
    dq.push_back(2);
    dq.push_front(3);
    dq.push_front(4);
    assert_eq!(dq.pop_back(false), Some(2));
    assert_eq!(dq.pop_back(false), Some(1));
    assert_eq!(dq.pop_back(false), Some(3));
    assert_eq!(dq.pop_back(false), Some(4));
}

fn grown_capacity(initial: usize) -> usize {
    let dq = Deque::with_capacity(initial);
    for i in 0..initial {
        dq.push_back(i);
    }
    assert_eq!(dq.capacity(), initial);
    assert_eq!(dq.len(), initial);
    // The next insert finds the buffer full and grows it first.
    dq.push_back(initial);
    assert_eq!(dq.stats().grows, 1);
    dq.capacity()
}

#[test]
fn test_growth_boundaries() {
    assert_eq!(grown_capacity(2), 65_536);
    assert_eq!(grown_capacity(32_767), 65_536);
    assert_eq!(grown_capacity(32_768), 65_536);
}

#[test]
fn test_growth_boundaries_large() {
    assert_eq!(grown_capacity(1_048_576), 2_097_152);
    assert_eq!(grown_capacity(1_048_577), 1_048_577 + 1_048_576);
}

#[test]
fn test_growth_preserves_positions() {
    let dq = Deque::with_capacity(16);
    for i in 0..8u32 {
        dq.push_front(i);
    }
    for i in 8..100u32 {
        dq.push_back(i);
    }
    assert!(dq.stats().grows >= 1);
    for i in (0..8u32).rev() {
        assert_eq!(dq.pop_front(false), Some(i));
    }
    for i in 8..100u32 {
        assert_eq!(dq.pop_front(false), Some(i));
    }
    assert!(dq.is_empty());
}

#[test]
fn test_matches_model_deque() {
    let dq = Deque::with_capacity(4);
    let mut model: VecDeque<u64> = VecDeque::new();
    let mut state = 0x2545_f491_4f6c_dd1du64;
    for step in 0..10_000u64 {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        match state >> 61 {
            0..=2 => {
                dq.push_back(step);
                model.push_back(step);
            }
            3 | 4 => {
                dq.push_front(step);
                model.push_front(step);
            }
            5 | 6 => assert_eq!(dq.pop_front(false), model.pop_front()),
            _ => assert_eq!(dq.pop_back(false), model.pop_back()),
        }
        assert_eq!(dq.len(), model.len());
    }
    while let Some(v) = model.pop_front() {
        assert_eq!(dq.pop_front(false), Some(v));
    }
    assert!(dq.is_empty());
}

#[test]
fn test_blocking_pop_waits_for_push() {
    let dq: Arc<Deque<usize>> = Arc::new(Deque::with_capacity(4));
    let dq2 = dq.clone();
    let consumer = thread::spawn(move || dq2.pop_front(true));
    thread::sleep(Duration::from_millis(100));
    dq.push_back(42);
    assert_eq!(consumer.join().unwrap(), Some(42));
}

#[test]
fn test_producers_and_blocking_consumer() {
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 1_000;

    let dq: Arc<Deque<usize>> = Arc::new(Deque::with_capacity(8));
    let mut handles = Vec::new();
    for p in 0..PRODUCERS {
        let dq = dq.clone();
        handles.push(thread::spawn(move || {
            for i in 0..PER_PRODUCER {
                dq.push_back(p * PER_PRODUCER + i);
            }
        }));
    }

    let mut sum = 0usize;
    let mut got = 0usize;
    while got < PRODUCERS * PER_PRODUCER {
        if let Some(v) = dq.pop_front(true) {
            sum += v;
            got += 1;
        }
    }
    for h in handles {
        h.join().unwrap();
    }
    let expected: usize = (0..PRODUCERS * PER_PRODUCER).sum();
    assert_eq!(sum, expected);
    assert!(dq.is_empty());
}
