//! A pool with zero workers: submission still queues, and an otherwise
//! idle thread drains it with `run_one_task`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use taskpool::{TaskAttributes, TaskFn, ThreadPool};

#[test]
fn test_run_one_task_drains_without_workers() {
    ThreadPool::begin(Some(0));
    assert_eq!(ThreadPool::size(), 0);

    // With no worker racing us, queue order is exactly observable:
    // high-priority submissions land at the front.
    let order: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
    for i in [1u32, 2] {
        let order = order.clone();
        ThreadPool::submit(Box::new(TaskFn::new(move || {
            order.lock().unwrap().push(i);
        })));
    }
    let order_high = order.clone();
    ThreadPool::submit(Box::new(TaskFn::with_attrs(
        move || {
            order_high.lock().unwrap().push(3);
        },
        TaskAttributes::high_priority(),
    )));

    assert!(ThreadPool::run_one_task());
    assert!(ThreadPool::run_one_task());
    assert!(ThreadPool::run_one_task());
    assert!(!ThreadPool::run_one_task());
    assert_eq!(*order.lock().unwrap(), vec![3, 1, 2]);

    let counter = Arc::new(AtomicUsize::new(0));
    for _ in 0..10 {
        let counter = counter.clone();
        ThreadPool::submit(Box::new(TaskFn::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })));
    }
    let mut ran = 0;
    while ThreadPool::run_one_task() {
        ran += 1;
    }
    assert_eq!(ran, 10);
    assert_eq!(counter.load(Ordering::SeqCst), 10);

    ThreadPool::end();
    assert_eq!(ThreadPool::finished_count(), 0);
}
