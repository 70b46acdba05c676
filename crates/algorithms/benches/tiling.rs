//! Benchmarks for the tiled engines

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sarflood_algorithms::floodfill::two_level_flood_fill;
use sarflood_algorithms::tile_stats::compute_tile_stats;
use sarflood_core::{Raster, Window};
use sarflood_parallel::TileGrid;

fn synthetic_scene(size: usize) -> Raster<f32> {
    let mut image: Raster<f32> = Raster::new(size, size);
    for row in 0..size {
        for col in 0..size {
            // Dark river meandering through bright terrain
            let base = if (col + row / 3) % 97 < 11 { 60.0 } else { 250.0 };
            let speckle = ((row * 7 + col * 13) % 32) as f32;
            image.set(row, col, base + speckle).unwrap();
        }
    }
    image
}

fn bench_tile_stats(c: &mut Criterion) {
    let mut group = c.benchmark_group("tile_stats");
    for size in [512, 1024, 2048].iter() {
        let image = synthetic_scene(*size);
        let grid = TileGrid::divide(Window::of_extent(*size, *size), 128, false);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| compute_tile_stats(black_box(&image), &grid, 0.9))
        });
    }
    group.finish();
}

fn bench_flood_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("flood_fill");
    for size in [512, 1024].iter() {
        let image = synthetic_scene(*size);
        // Scores in [0, 1]: dark pixels near 1, bright near 0
        let mut scores: Raster<f32> = Raster::new(*size, *size);
        for row in 0..*size {
            for col in 0..*size {
                let v = image.get(row, col).unwrap();
                scores.set(row, col, 1.0 - (v / 300.0).min(1.0)).unwrap();
            }
        }
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| two_level_flood_fill(black_box(&scores), 256, 64, 0.6, 0.45, 1, 255))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_tile_stats, bench_flood_fill);
criterion_main!(benches);
