use nchypergeom::dist::{Fishers, MultivariateDistribution, MultivariateFishers, Wallenius};
use nchypergeom::rng::SplitMix64;

fn main() {
    let mut fisher = Fishers::new(20, 25, 32, 2.5, 1e-10).unwrap();
    let mut wallenius = Wallenius::new(20, 25, 32, 2.5, 1e-10).unwrap();
    let mut multi = MultivariateFishers::new(24, vec![20, 30, 20], vec![1.0, 2.5, 1.8], 1e-6).unwrap();

    let mut rng = SplitMix64::seed_from_u64(2024);
    let x_fisher = fisher.sample(&mut rng);
    let x_wallenius = wallenius.sample(&mut rng);
    let x_multi = multi.sample(&mut rng);

    println!(
        "Fisher:    P(X=12)={:.6} mean={:.4} mode={} sample={x_fisher}",
        fisher.probability(12),
        fisher.mean(),
        fisher.mode(),
    );
    println!(
        "Wallenius: P(X=12)={:.6} mean={:.4} sample={x_wallenius}",
        wallenius.probability(12),
        wallenius.mean(),
    );
    println!(
        "Multivariate Fisher: P([8,10,6])={:.6} mean1={:?} sample={x_multi:?}",
        multi.probability(&[8, 10, 6]),
        multi.mean1().unwrap(),
    );
}
