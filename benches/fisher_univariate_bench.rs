use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use nchypergeom::dist::Fishers;
use nchypergeom::rng::SplitMix64;

fn bench_probability_scan(c: &mut Criterion) {
    c.bench_function("fisher_probability_scan_n20", |b| {
        b.iter_batched(
            || Fishers::new(20, 25, 32, 2.5, 1e-10).unwrap(),
            |mut f| {
                let mut acc = 0.0;
                for x in f.xmin()..=f.xmax() {
                    acc += f.probability(x);
                }
                black_box(acc)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_sample_chop_down(c: &mut Criterion) {
    c.bench_function("fisher_sample_chop_down_1000", |b| {
        b.iter_batched(
            || (Fishers::new(200, 250, 320, 2.5, 1e-8).unwrap(), SplitMix64::seed_from_u64(123)),
            |(mut f, mut rng)| {
                let mut acc = 0i64;
                for _ in 0..1000 {
                    acc ^= f.sample(&mut rng);
                }
                black_box(acc)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_moments_large_urn(c: &mut Criterion) {
    c.bench_function("fisher_moments_n2000", |b| {
        b.iter_batched(
            || Fishers::new(2000, 2500, 3200, 2.5, 1e-8).unwrap(),
            |mut f| black_box(f.moments()),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_probability_scan, bench_sample_chop_down, bench_moments_large_urn);
criterion_main!(benches);
