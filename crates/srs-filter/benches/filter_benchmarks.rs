//! Benchmarks for the filter stages.
//!
//! Run with: cargo bench -p srs-filter
//!
//! Compare against a baseline with `-- --save-baseline main` on the first
//! run and `-- --baseline main` afterwards.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use nalgebra::Point3;
use srs_filter::phantom::{fractured_sphere, grid_patch, uv_sphere};
use srs_filter::shrinkwrap::{enclosing_sphere, wrap_step};
use srs_filter::{FilterMode, FilterParams, Pipeline, SpatialQuery, remesh_uniform, solidify};
use srs_mesh::RunContext;

fn bench_spatial(c: &mut Criterion) {
    let mut group = c.benchmark_group("SpatialQuery");

    for resolution in [16usize, 48] {
        let sphere = uv_sphere(Point3::origin(), 20.0, resolution, 2 * resolution);
        let query = SpatialQuery::new(&sphere).unwrap();
        let probes: Vec<Point3<f64>> = (0..256)
            .map(|i| {
                let t = i as f64 * 0.37;
                Point3::new(30.0 * t.cos(), 30.0 * t.sin(), 10.0 * (t * 0.5).sin())
            })
            .collect();

        group.throughput(Throughput::Elements(probes.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("signed_distance", sphere.face_count()),
            &probes,
            |b, probes| {
                b.iter(|| {
                    probes
                        .iter()
                        .map(|p| query.signed_distance(black_box(p)))
                        .sum::<f64>()
                })
            },
        );
    }

    group.finish();
}

fn bench_remesh(c: &mut Criterion) {
    let mut group = c.benchmark_group("Remesh");
    group.sample_size(10);

    let sphere = uv_sphere(Point3::origin(), 20.0, 24, 48);
    for spacing in [4.0, 2.0, 1.0] {
        group.bench_with_input(
            BenchmarkId::new("sphere_r20", spacing),
            &spacing,
            |b, &spacing| b.iter(|| remesh_uniform(black_box(&sphere), spacing).unwrap()),
        );
    }

    group.finish();
}

fn bench_shrinkwrap(c: &mut Criterion) {
    let mut group = c.benchmark_group("Shrinkwrap");
    group.sample_size(10);

    let input = fractured_sphere(Point3::origin(), 20.0, 3.0, 32);
    let target = SpatialQuery::new(&input).unwrap();
    let start = input.bounds().map(|b| enclosing_sphere(&b)).unwrap();
    let start = remesh_uniform(&start, 4.0).unwrap();

    group.throughput(Throughput::Elements(start.vertex_count() as u64));
    group.bench_function("wrap_step", |b| {
        b.iter(|| {
            let mut mesh = start.clone();
            wrap_step(&mut mesh, black_box(&target), 15.0);
            mesh
        })
    });

    group.finish();
}

fn bench_solidify(c: &mut Criterion) {
    let mut group = c.benchmark_group("Solidify");

    for n in [8usize, 32, 64] {
        let patch = grid_patch(n, n, 1.0);
        group.throughput(Throughput::Elements(patch.face_count() as u64));
        group.bench_with_input(BenchmarkId::new("grid_patch", n), &patch, |b, patch| {
            b.iter(|| solidify(black_box(patch), 1.5).unwrap())
        });
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("Pipeline");
    group.sample_size(10);

    let input = fractured_sphere(Point3::origin(), 15.0, 3.0, 24);
    for mode in [FilterMode::ConvexHull, FilterMode::DeepHull, FilterMode::Solidified] {
        let params = FilterParams::default()
            .with_filter_mode(mode)
            .with_offset(3.0)
            .with_spacing(5.0, 1.5)
            .with_iterations(2, 2);
        let pipeline = Pipeline::new(params).unwrap();
        group.bench_function(mode.as_str(), |b| {
            b.iter(|| pipeline.run_on_mesh(black_box(&input), &RunContext::new()))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_spatial,
    bench_remesh,
    bench_shrinkwrap,
    bench_solidify,
    bench_pipeline,
);

criterion_main!(benches);
