//! Noncentral hypergeometric distributions: Fisher's and Wallenius'
//! variants, each in a univariate and a multivariate flavor.
//!
//! Each concrete engine below is a stateful numeric object rather than a
//! pure function: constructing one validates the urn parameters once,
//! and repeated `probability`/`mean`/`sample` calls reuse a lazily
//! populated cache (`scale`, `rsum`, and for the univariate case the
//! last-evaluated `x`) so that scanning neighbouring values of `x` is
//! O(1) per step instead of re-summing the whole support.

pub mod fisher;
pub mod inverse;
pub mod support;
pub mod wallenius;

pub use fisher::multivariate::MultivariateFishers;
pub use fisher::univariate::Fishers;
pub use support::{MultivariateUrn, UnivariateUrn, MAX_COLORS};
pub use wallenius::multivariate::MultivariateWallenius;
pub use wallenius::univariate::Wallenius;

/// Lifecycle of an engine's internal cache.
///
/// Transitions only ever move forward: `Fresh -> MeanKnown -> Normalized`.
/// There is no mutator that changes an engine's parameters in place (a
/// new urn means a new instance), so the "demote to Fresh" transition
/// described upstream has no reachable trigger here and is intentionally
/// not modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheState {
    #[default]
    Fresh,
    MeanKnown,
    Normalized,
}

/// Common surface for the univariate engines (`Fishers`, `Wallenius`).
///
/// `Value` is `i64` for both: the count of color-1 balls drawn.
pub trait UnivariateDistribution {
    /// Probability mass at `x`. Returns `0.0` for `x` outside the
    /// support (a soft failure) rather than an error.
    fn probability(&mut self, x: i64) -> f64;
    /// `P(X <= x)`.
    fn cdf(&mut self, x: i64) -> f64;
    fn mean(&self) -> f64;
    /// Cheap Cornfield-style variance approximation. See `moments` for
    /// the accuracy-bounded exact alternative.
    fn variance_approx(&self) -> f64;
    /// Exact mean/variance from summing the normalized proportional
    /// function over the support, to within `accuracy`.
    fn moments(&mut self) -> (f64, f64);
    fn mode(&self) -> i64;
    fn xmin(&self) -> i64;
    fn xmax(&self) -> i64;
    fn sample<R: crate::rng::RngCore>(&mut self, rng: &mut R) -> i64;
}

/// Common surface for the multivariate engines.
///
/// `Value` is `Vec<i64>`: one count per color.
pub trait MultivariateDistribution {
    fn probability(&mut self, x: &[i64]) -> f64;
    /// Approximate per-color mean via the Cornfield-style fixed point.
    fn mean1(&self) -> crate::error::Result<Vec<f64>>;
    /// Exact per-color mean/variance from the depth-first lattice walk.
    fn moments(&mut self) -> (Vec<f64>, Vec<f64>);
    fn colors(&self) -> usize;
    fn sample<R: crate::rng::RngCore>(&mut self, rng: &mut R) -> Vec<i64>;
}
