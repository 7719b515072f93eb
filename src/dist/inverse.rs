//! Inverse estimators: recover `odds` from a target mean (`oddsNC*`), or
//! recover an urn split `(m1, m2)` from a target mean and total
//! (`numNC*`). Fisher's univariate case inverts the Cornfield mean
//! quadratic analytically (see `fisher::univariate::odds_nc`); everything
//! else here is bisection against the relevant engine's own mean
//! approximation, since neither Wallenius nor the multivariate case has
//! a closed-form inverse.
//!
//! `accuracy` below `0.1` is clamped to `0.1` for every inverse
//! estimator: these are hints, not exact-precision solves.

use crate::dist::fisher::multivariate::MultivariateFishers;
use crate::dist::fisher::univariate::Fishers;
use crate::dist::wallenius::multivariate::MultivariateWallenius;
use crate::dist::wallenius::univariate::Wallenius;
use crate::dist::MultivariateDistribution;
use crate::error::Result;

/// Clamps an `accuracy` hint to the range the inverse estimators accept.
#[inline]
pub fn clamp_accuracy(accuracy: f64) -> f64 {
    accuracy.max(0.1)
}

/// Bisects `odds` in `[1e-9, 1e9]` (geometric steps, since a ratio of
/// weights naturally spans many orders of magnitude) so that
/// `mean_fn(odds) == target_mean`. `mean_fn` must be monotonically
/// increasing in `odds`, which holds for every mean approximation in
/// this crate.
pub fn bisect_odds_for_mean<F>(target_mean: f64, mut mean_fn: F) -> Result<f64>
where
    F: FnMut(f64) -> Result<f64>,
{
    let mut lo = 1e-9_f64;
    let mut hi = 1e9_f64;
    let mean_lo = mean_fn(lo)?;
    let mean_hi = mean_fn(hi)?;
    if target_mean <= mean_lo {
        return Ok(lo);
    }
    if target_mean >= mean_hi {
        return Ok(hi);
    }
    for _ in 0..200 {
        let mid = (lo * hi).sqrt();
        let m = mean_fn(mid)?;
        if m < target_mean {
            lo = mid;
        } else {
            hi = mid;
        }
        if (hi / lo - 1.0).abs() < 1e-9 {
            break;
        }
    }
    Ok((lo * hi).sqrt())
}

/// Bisects an integer `m1 in [0, big_n]` so that `mean_fn(m1)` is as
/// close as possible to `target_mean`. `mean_fn` must be monotonically
/// increasing in `m1`.
pub fn bisect_m1_for_mean<F>(target_mean: f64, big_n: u64, mut mean_fn: F) -> Result<(u64, u64)>
where
    F: FnMut(u64) -> Result<f64>,
{
    let mut lo = 0_u64;
    let mut hi = big_n;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let m = mean_fn(mid)?;
        if m < target_mean {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    // `lo` now straddles the target from above; check whether `lo - 1`
    // (if it exists) is actually closer.
    let mut best = lo;
    if lo > 0 {
        let m_here = mean_fn(lo)?;
        let m_prev = mean_fn(lo - 1)?;
        if (m_prev - target_mean).abs() <= (m_here - target_mean).abs() {
            best = lo - 1;
        }
    }
    Ok((best, big_n - best))
}

/// `oddsNC` for Fisher's univariate engine: exact analytic inversion.
pub fn odds_nc_fisher_univariate(mean: f64, m1: u64, m2: u64, n: u64) -> Result<f64> {
    crate::dist::fisher::univariate::odds_nc(mean, m1, m2, n)
}

/// `oddsNC` for Wallenius' univariate engine: bisection against its mean
/// approximation.
pub fn odds_nc_wallenius_univariate(
    mean: f64,
    m1: u64,
    m2: u64,
    n: u64,
    accuracy: f64,
) -> Result<f64> {
    let acc = clamp_accuracy(accuracy);
    bisect_odds_for_mean(mean, |o| Ok(Wallenius::new(n, m1, m2, o, acc)?.mean()))
}

/// `oddsNC` for a single color of the multivariate Fisher engine,
/// holding every other color's odds fixed.
pub fn odds_nc_fisher_multivariate(
    mean_for_color: f64,
    color: usize,
    n: u64,
    m: &[u64],
    odds: &[f64],
    accuracy: f64,
) -> Result<f64> {
    let acc = clamp_accuracy(accuracy);
    let m = m.to_vec();
    bisect_odds_for_mean(mean_for_color, move |o| {
        let mut odds = odds.to_vec();
        odds[color] = o;
        let f = MultivariateFishers::new(n, m.clone(), odds, acc)?;
        Ok(f.mean1()?[color])
    })
}

/// `oddsNC` for a single color of the multivariate Wallenius engine.
pub fn odds_nc_wallenius_multivariate(
    mean_for_color: f64,
    color: usize,
    n: u64,
    m: &[u64],
    odds: &[f64],
    accuracy: f64,
) -> Result<f64> {
    let acc = clamp_accuracy(accuracy);
    let m = m.to_vec();
    bisect_odds_for_mean(mean_for_color, move |o| {
        let mut odds = odds.to_vec();
        odds[color] = o;
        let w = MultivariateWallenius::new(n, m.clone(), odds, acc)?;
        Ok(w.mean1()?[color])
    })
}

/// `numNC` for Fisher's univariate engine: recovers `(m1, m2)` with
/// `m1 + m2 == big_n` whose approximate mean is closest to `mean`.
pub fn num_nc_fisher(mean: f64, n: u64, big_n: u64, odds: f64, accuracy: f64) -> Result<(u64, u64)> {
    bisect_m1_for_mean(mean, big_n, |m1| {
        Ok(Fishers::new(n, m1, big_n - m1, odds, accuracy)?.mean())
    })
}

/// `numNC` for Wallenius' univariate engine.
pub fn num_nc_wallenius(
    mean: f64,
    n: u64,
    big_n: u64,
    odds: f64,
    accuracy: f64,
) -> Result<(u64, u64)> {
    let acc = clamp_accuracy(accuracy);
    bisect_m1_for_mean(mean, big_n, |m1| {
        Ok(Wallenius::new(n, m1, big_n - m1, odds, acc)?.mean())
    })
}
