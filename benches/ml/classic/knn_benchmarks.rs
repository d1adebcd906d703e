//! Benchmarks for batch k-NN classification.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use knn_batch::ml::classic::{knn, DistanceMetric, KnnConfig};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const FEATURES: usize = 64;

fn samples(rng: &mut StdRng, rows: usize) -> Array2<f64> {
    Array2::from_shape_fn((rows, FEATURES + 1), |(_, col)| {
        if col == 0 {
            rng.gen_range(0..10) as f64
        } else {
            rng.gen_range(0..256) as f64
        }
    })
}

fn bench_knn(c: &mut Criterion) {
    let mut group = c.benchmark_group("knn");
    let mut rng = StdRng::seed_from_u64(42);
    let test = samples(&mut rng, 50);

    for size in [100, 1000, 5000].iter() {
        let model = samples(&mut rng, *size);

        for metric in [DistanceMetric::SquaredEuclidean, DistanceMetric::Manhattan] {
            let config = KnnConfig::new().with_metric(metric);
            group.bench_with_input(BenchmarkId::new(metric.to_string(), size), size, |b, _| {
                b.iter(|| knn(black_box(model.view()), black_box(test.view()), &config).unwrap());
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_knn);
criterion_main!(benches);
