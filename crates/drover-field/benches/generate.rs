//! Measure flow-field generation over open and obstructed terrain.

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use drover_core::Vec2;
use drover_field::{
    CacheKey, FieldGenerator, GenerationRequest, TerrainSampler, Urgency,
};
use drover_field::FieldHandle;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

fn request(destination: Vec2, radius: f32) -> GenerationRequest {
    GenerationRequest {
        center: Vec2::ZERO,
        destination,
        radius,
        cell_size: 1.0,
        key: CacheKey::quantize(Vec2::ZERO, destination, radius, 0.5),
        urgency: Urgency::Explicit,
        handle: FieldHandle::from_raw_parts(0, 0),
        arrival_seq: 0,
    }
}

/// Pseudo-random scatter of impassable circular blobs.
struct Blobs {
    centers: Vec<Vec2>,
}

impl Blobs {
    fn scatter(count: usize, extent: f32, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let centers = (0..count)
            .map(|_| {
                Vec2::new(
                    rng.random_range(-extent..extent),
                    rng.random_range(-extent..extent),
                )
            })
            .collect();
        Self { centers }
    }
}

impl TerrainSampler for Blobs {
    fn passable(&self, world: Vec2) -> bool {
        self.centers.iter().all(|c| c.distance(world) > 2.0)
    }
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("field_generation");
    group.significance_level(0.05).sample_size(60);

    let open = FieldGenerator::open();
    group.bench_function("open_64", |b| {
        b.iter(|| open.generate(black_box(&request(Vec2::new(20.0, -12.0), 32.0))))
    });
    group.bench_function("open_128", |b| {
        b.iter(|| open.generate(black_box(&request(Vec2::new(40.0, 25.0), 64.0))))
    });

    let blobbed = FieldGenerator::new(Arc::new(Blobs::scatter(48, 64.0, 7)));
    group.bench_function("blobs_128", |b| {
        b.iter(|| blobbed.generate(black_box(&request(Vec2::new(40.0, 25.0), 64.0))))
    });

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
