//! Ingestion throughput benchmarks for the tracker

use audit_core::{EmitContext, SharedDirectoryRead, TrackerConfig};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use std::time::Duration;
use tracker::{ManualClock, Tracker};

fn read(path: String) -> SharedDirectoryRead {
    SharedDirectoryRead {
        session_id: "bench".to_string(),
        directory_id: 1,
        directory_name: "dir".to_string(),
        path,
        offset: 0,
        length: 4096,
    }
}

fn bench_add_event(c: &mut Criterion) {
    c.bench_function("add_event_hot_key", |b| {
        let clock = Arc::new(ManualClock::new());
        let tracker = Tracker::new(TrackerConfig::default(), clock, |_: &EmitContext, e: SharedDirectoryRead| {
            black_box(e);
        });
        b.iter(|| tracker.add_event(read("hot.bin".to_string())));
    });

    c.bench_function("add_event_10k_keys", |b| {
        let clock = Arc::new(ManualClock::new());
        let tracker = Tracker::new(TrackerConfig::default(), clock, |_: &EmitContext, e: SharedDirectoryRead| {
            black_box(e);
        });
        let paths: Vec<String> = (0..10_000).map(|i| format!("file-{}.bin", i)).collect();
        let mut next = 0usize;
        b.iter(|| {
            tracker.add_event(read(paths[next % paths.len()].clone()));
            next += 1;
        });
    });
}

fn bench_deadlines(c: &mut Criterion) {
    c.bench_function("advance_1k_deadlines", |b| {
        b.iter(|| {
            let clock = Arc::new(ManualClock::new());
            let tracker = Tracker::new(TrackerConfig::default(), clock.clone(), |_: &EmitContext, e: SharedDirectoryRead| {
                black_box(e);
            });
            for i in 0..1000 {
                tracker.add_event(read(format!("file-{}.bin", i)));
            }
            clock.advance(Duration::from_secs(1));
            black_box(tracker.pending_len())
        });
    });
}

criterion_group!(benches, bench_add_event, bench_deadlines);
criterion_main!(benches);
