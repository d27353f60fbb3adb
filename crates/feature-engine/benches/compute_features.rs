use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use feature_engine::{FeatureConfig, FeatureStackBuilder, Workers};
use ndarray::Array2;

fn synthetic(side: usize) -> ndarray::ArrayD<f32> {
    Array2::from_shape_fn((side, side), |(r, c)| {
        ((r as f32 * 0.21).sin() * (c as f32 * 0.13).cos() + 1.0) * 0.5
    })
    .into_dyn()
}

fn bench_compute_features(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_features");
    group.sample_size(10);
    for &side in &[64usize, 128, 256] {
        let image = synthetic(side);
        for (label, workers) in [("serial", Workers::Fixed(1)), ("auto", Workers::Auto)] {
            let builder = FeatureStackBuilder::new(FeatureConfig {
                sigma_min: 1.0,
                sigma_max: 8.0,
                workers,
                ..Default::default()
            })
            .expect("valid bench config");
            let id = BenchmarkId::new(label, side);
            group.bench_with_input(id, &image, |b, image| {
                b.iter(|| {
                    let stack = builder
                        .build(black_box(&image.view()))
                        .expect("feature computation");
                    black_box(stack.n_features());
                });
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_compute_features);
criterion_main!(benches);
