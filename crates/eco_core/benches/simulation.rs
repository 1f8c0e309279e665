//! Simulation benchmarks for eco_core.
//!
//! Run with: `cargo bench -p eco_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use eco_core::config::EcosystemConfig;
use eco_core::math::Vec2;
use eco_core::simulation::Simulation;
use eco_core::snapshot::{ComponentLists, SnapshotEncoder};
use eco_core::spatial::SpatialGrid;

fn scaled_config(scale: u32) -> EcosystemConfig {
    let mut config = EcosystemConfig::default();
    let p = &mut config.population;
    p.agents *= scale;
    p.predators *= scale;
    p.apex *= scale;
    p.coral *= scale;
    p.titans *= scale;
    p.resources *= scale;
    config
}

/// Raw step cost at increasing population sizes.
pub fn step_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("step");
    for scale in [1_u32, 4, 16] {
        group.bench_with_input(BenchmarkId::from_parameter(scale), &scale, |b, &scale| {
            let mut sim = Simulation::new(scaled_config(scale), 42);
            b.iter(|| black_box(sim.step(0.06)));
        });
    }
    group.finish();
}

/// Grid build plus one query per entry.
pub fn spatial_benchmark(c: &mut Criterion) {
    let sim = Simulation::new(scaled_config(8), 7);
    let points: Vec<(u32, Vec2)> = sim
        .store()
        .positions
        .iter()
        .map(|(id, pos)| (id, pos.value))
        .collect();

    c.bench_function("spatial_build_and_query", |b| {
        b.iter(|| {
            let grid = SpatialGrid::build(48.0, points.iter().copied(), 0.0);
            let mut found = 0;
            for (_, at) in &points {
                found += grid.query_within(*at, 60.0).len();
            }
            black_box(found)
        });
    });
}

/// Capture and delta encoding.
pub fn snapshot_benchmark(c: &mut Criterion) {
    let mut sim = Simulation::new(scaled_config(4), 3);
    c.bench_function("snapshot_capture", |b| {
        b.iter(|| black_box(ComponentLists::capture(sim.store())));
    });

    let mut encoder = SnapshotEncoder::new();
    encoder.full(&sim, 0.0);
    c.bench_function("snapshot_delta_after_step", |b| {
        b.iter(|| {
            sim.step(0.06);
            let message = encoder.delta(&sim, 0.0);
            black_box(message.to_bytes().map(|bytes| bytes.len()))
        });
    });
}

criterion_group!(benches, step_benchmark, spatial_benchmark, snapshot_benchmark);
criterion_main!(benches);
