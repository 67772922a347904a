use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use venom_map::{AccessMode, Mapping};

fn segment_name(tag: &str) -> String {
    format!("venom_map_bench_{}_{}", tag, std::process::id())
}

fn bench_lifecycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("lifecycle");
    for size in [4 * 1024, 1024 * 1024] {
        group.bench_with_input(BenchmarkId::new("segment_open_map_close", size), &size, |b, &size| {
            let name = segment_name("cycle");
            b.iter(|| {
                let mut seg = Mapping::with_size(&name, size, AccessMode::ReadWrite);
                seg.open().expect("open");
                seg.map().expect("map");
                seg.close().expect("close");
            });
        });
    }
    group.finish();
}

fn bench_write(c: &mut Criterion) {
    let size = 1024 * 1024;
    let mut seg = Mapping::with_size(segment_name("write"), size, AccessMode::ReadWrite);
    seg.open().expect("open");
    seg.map().expect("map");
    let payload = vec![0x5Au8; size];

    let mut group = c.benchmark_group("mapped_write");
    group.throughput(Throughput::Bytes(size as u64));
    group.bench_function("write_at_1mb", |b| {
        b.iter(|| seg.write_at(0, &payload).expect("write"));
    });
    group.finish();
}

criterion_group!(benches, bench_lifecycle, bench_write);
criterion_main!(benches);
