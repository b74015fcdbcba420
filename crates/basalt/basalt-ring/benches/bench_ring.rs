use basalt_region::{Region, RingKind, TopicConfig};
use basalt_ring::{MwmrPublisher, Subscriber, SwmrPublisher};
use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::sync::Arc;

const CAPACITY: u32 = 65_536;
const PAYLOAD: [u8; 40] = [0xA5; 40];

fn bench_region(tag: &str, kind: RingKind) -> (String, Arc<Region>) {
    let name = format!("basalt_bench_{tag}_{}", std::process::id());
    let region = Region::init(
        &name,
        16 << 20,
        &[TopicConfig {
            name: "bench".into(),
            kind,
            slot_count: CAPACITY,
            payload_max: 64,
        }],
    )
    .expect("failed to init bench region");
    (name, Arc::new(region))
}

fn bench_swmr_publish(c: &mut Criterion) {
    let (name, region) = bench_region("swmr_pub", RingKind::Swmr);
    let mut tx = SwmrPublisher::attach(region, "bench", 1).expect("attach");

    let mut group = c.benchmark_group("ring");
    group.throughput(Throughput::Elements(1));

    group.bench_function("swmr publish", |b| {
        b.iter(|| tx.publish(black_box(&PAYLOAD)));
    });

    drop(group);
    drop(tx);
    let _ = Region::unlink(&name);
}

fn bench_mwmr_publish(c: &mut Criterion) {
    let (name, region) = bench_region("mwmr_pub", RingKind::Mwmr);
    let mut tx = MwmrPublisher::attach(region, "bench", 1).expect("attach");

    let mut group = c.benchmark_group("ring");
    group.throughput(Throughput::Elements(1));

    group.bench_function("mwmr publish (uncontended)", |b| {
        b.iter(|| tx.publish(black_box(&PAYLOAD)));
    });

    drop(group);
    drop(tx);
    let _ = Region::unlink(&name);
}

fn bench_next_data(c: &mut Criterion) {
    let (name, region) = bench_region("next_data", RingKind::Swmr);
    let mut tx = SwmrPublisher::attach(region.clone(), "bench", 1).expect("attach");
    let mut rx = Subscriber::attach(region, "bench").expect("attach");
    let mut buf = [0u8; 64];

    let mut group = c.benchmark_group("ring");
    group.throughput(Throughput::Elements(1));

    group.bench_function("next (data)", |b| {
        b.iter_custom(|iters| {
            // Pre-fill so every call delivers.
            for _ in 0..iters {
                tx.publish(&PAYLOAD).expect("publish");
            }
            let start = std::time::Instant::now();
            for _ in 0..iters {
                black_box(rx.next(&mut buf));
            }
            start.elapsed()
        });
    });

    drop(group);
    drop(tx);
    drop(rx);
    let _ = Region::unlink(&name);
}

fn bench_next_empty(c: &mut Criterion) {
    let (name, region) = bench_region("next_empty", RingKind::Swmr);
    let mut rx = Subscriber::attach(region, "bench").expect("attach");
    let mut buf = [0u8; 64];

    let mut group = c.benchmark_group("ring");
    group.throughput(Throughput::Elements(1));

    group.bench_function("next (empty)", |b| {
        b.iter(|| black_box(rx.next(&mut buf)));
    });

    drop(group);
    drop(rx);
    let _ = Region::unlink(&name);
}

fn bench_round_trip(c: &mut Criterion) {
    let (name, region) = bench_region("rt", RingKind::Swmr);
    let mut tx = SwmrPublisher::attach(region.clone(), "bench", 1).expect("attach");
    let mut rx = Subscriber::attach(region, "bench").expect("attach");
    let mut buf = [0u8; 64];

    let mut group = c.benchmark_group("ring");
    group.throughput(Throughput::Elements(1));

    group.bench_function("round_trip", |b| {
        b.iter(|| {
            tx.publish(black_box(&PAYLOAD)).expect("publish");
            black_box(rx.next(&mut buf));
        });
    });

    drop(group);
    drop(tx);
    drop(rx);
    let _ = Region::unlink(&name);
}

criterion_group!(
    benches,
    bench_swmr_publish,
    bench_mwmr_publish,
    bench_next_data,
    bench_next_empty,
    bench_round_trip,
);
criterion_main!(benches);
