use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use nchypergeom::dist::{MultivariateDistribution, MultivariateWallenius};
use nchypergeom::rng::SplitMix64;

fn bench_probability_three_colors(c: &mut Criterion) {
    c.bench_function("wallenius_mv_probability_3colors", |b| {
        b.iter_batched(
            || MultivariateWallenius::new(24, vec![20, 30, 20], vec![1.0, 2.5, 1.8], 1e-6).unwrap(),
            |mut w| black_box(w.probability(&[8, 10, 6])),
            BatchSize::SmallInput,
        )
    });
}

fn bench_mean1_three_colors(c: &mut Criterion) {
    c.bench_function("wallenius_mv_mean1_3colors", |b| {
        b.iter_batched(
            || MultivariateWallenius::new(24, vec![20, 30, 20], vec![1.0, 2.5, 1.8], 1e-6).unwrap(),
            |w| black_box(w.mean1().unwrap()),
            BatchSize::SmallInput,
        )
    });
}

fn bench_sample_three_colors(c: &mut Criterion) {
    c.bench_function("wallenius_mv_sample_1000_3colors", |b| {
        b.iter_batched(
            || {
                (
                    MultivariateWallenius::new(24, vec![20, 30, 20], vec![1.0, 2.5, 1.8], 1e-6)
                        .unwrap(),
                    SplitMix64::seed_from_u64(7),
                )
            },
            |(mut w, mut rng)| {
                let mut acc = 0i64;
                for _ in 0..1000 {
                    acc ^= w.sample(&mut rng).iter().sum::<i64>();
                }
                black_box(acc)
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_probability_three_colors, bench_mean1_three_colors, bench_sample_three_colors);
criterion_main!(benches);
