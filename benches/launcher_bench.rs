//! Benchmarks for inventory parsing and cache-key derivation.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use engine_launcher::gpu::probe::parse_inventory;
use engine_launcher::gpu::sanitize_name;

fn bench_parse_inventory(c: &mut Criterion) {
    // A large multi-node style report.
    let report: String = (0..512)
        .map(|i| format!("{i}, NVIDIA GeForce RTX 4090, 24564 MiB\n"))
        .collect();

    c.bench_function("parse_inventory_512_rows", |b| {
        b.iter(|| {
            let devices = parse_inventory(black_box(&report)).unwrap();
            black_box(devices);
        })
    });
}

fn bench_sanitize(c: &mut Criterion) {
    let names = [
        "NVIDIA A100-SXM4-80GB",
        "NVIDIA H100 80GB HBM3",
        "Quadro M6000 (24GB)",
        "NVIDIA GeForce GTX 1070",
    ];

    c.bench_function("sanitize_name", |b| {
        b.iter(|| {
            for name in names {
                black_box(sanitize_name(black_box(name)));
            }
        })
    });
}

criterion_group!(benches, bench_parse_inventory, bench_sanitize);
criterion_main!(benches);
