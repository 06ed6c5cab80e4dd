//! Deque throughput benchmark using criterion.
//!
//! Measures raw push/pop cost on one thread and the contended
//! producers-plus-blocking-consumer pattern the pool exercises.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::thread;
use taskpool::Deque;

const OPS: usize = 100_000;

fn bench_single_thread(c: &mut Criterion) {
    let mut group = c.benchmark_group("deque");
    group.throughput(Throughput::Elements(OPS as u64));
    group.bench_function("push_back_pop_front", |b| {
        b.iter(|| {
            let dq: Deque<usize> = Deque::new();
            for i in 0..OPS {
                dq.push_back(i);
            }
            while dq.pop_front(false).is_some() {}
        });
    });
    group.finish();
}

fn bench_contended(c: &mut Criterion) {
    let producers = (num_cpus::get() - 1).clamp(1, 4);
    let mut group = c.benchmark_group("deque_contended");
    group.throughput(Throughput::Elements(OPS as u64));
    group.sample_size(10);
    group.bench_function(BenchmarkId::new("producers_one_consumer", producers), |b| {
        b.iter(|| {
            let dq: Arc<Deque<usize>> = Arc::new(Deque::new());
            let per = OPS / producers;
            let mut handles = Vec::new();
            for _ in 0..producers {
                let dq = dq.clone();
                handles.push(thread::spawn(move || {
                    for i in 0..per {
                        dq.push_back(i);
                    }
                }));
            }
            let mut got = 0;
            while got < per * producers {
                if dq.pop_front(true).is_some() {
                    got += 1;
                }
            }
            for h in handles {
                h.join().unwrap();
            }
        });
    });
    group.finish();
}

criterion_group!(benches, bench_single_thread, bench_contended);
criterion_main!(benches);
