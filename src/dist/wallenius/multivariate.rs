//! Wallenius' multivariate noncentral hypergeometric distribution: `c`
//! colors, balls drawn one at a time with each draw's color chosen with
//! probability proportional to its residual count times its odds.

use crate::dist::support::{MultivariateUrn, Reduced};
use crate::dist::wallenius::univariate::Wallenius;
use crate::dist::MultivariateDistribution;
use crate::error::{Error, Result};
use crate::num;
use crate::num::quadrature::adaptive_gauss_legendre;
use crate::rng::RngCore;
use std::cell::Cell;

#[derive(Debug, Clone)]
pub struct MultivariateWallenius {
    urn: MultivariateUrn,
    reduced: Reduced,
    t_cache: Cell<Option<f64>>,
}

impl MultivariateWallenius {
    pub fn new(n: u64, m: Vec<u64>, odds: Vec<f64>, accuracy: f64) -> Result<Self> {
        let urn = MultivariateUrn::new(n, m, odds, accuracy)?;
        let reduced = urn.reduce();
        Ok(Self { urn, reduced, t_cache: Cell::new(None) })
    }

    pub fn urn(&self) -> &MultivariateUrn {
        &self.urn
    }

    fn ln_binom_sum(x: &[u64], mu: &[u64]) -> f64 {
        x.iter()
            .zip(mu.iter())
            .map(|(&xi, &mi)| num::ln_fac(mi) - num::ln_fac(xi) - num::ln_fac(mi - xi))
            .sum()
    }

    /// Removal-time integrand for a full used-color index vector:
    /// `Prod_i (1 - t^{odds_i/d})^{x_i}`, `d = Sum_i odds_i*(m_i - x_i)`.
    fn integrand(x: &[u64], mu: &[u64], oddsu: &[f64], t: f64) -> f64 {
        let d: f64 = mu
            .iter()
            .zip(oddsu.iter())
            .zip(x.iter())
            .map(|((&mi, &oi), &xi)| oi * (mi as f64 - xi as f64))
            .sum();
        if d <= 0.0 {
            return 0.0;
        }
        let mut prod = 1.0_f64;
        for ((&_mi, &oi), &xi) in mu.iter().zip(oddsu.iter()).zip(x.iter()) {
            let a = if t <= 0.0 { 0.0 } else { t.powf(oi / d) };
            prod *= (1.0 - a).powf(xi as f64);
            if prod == 0.0 {
                break;
            }
        }
        prod
    }

    fn pmf_used(x: &[u64], mu: &[u64], oddsu: &[f64], accuracy: f64) -> f64 {
        let tol = (accuracy * 0.1).max(1e-14);
        let value = adaptive_gauss_legendre(|t| Self::integrand(x, mu, oddsu, t), 0.0, 1.0, tol);
        num::safe_exp(Self::ln_binom_sum(x, mu) + value.max(0.0).ln())
    }

    /// Bisects the continuous removal-time parameter `t` such that the
    /// expected used count at `t` equals `n`. Returns a fatal
    /// `Convergence` error if the bracket can't be widened far enough or
    /// the bisection fails to tighten within its iteration cap.
    fn solve_t_checked(&self) -> Result<f64> {
        if let Some(t) = self.t_cache.get() {
            return Ok(t);
        }
        let mu = &self.reduced.mu;
        let oddsu = &self.reduced.oddsu;
        let n = self.urn.n as f64;
        let f = |t: f64| -> f64 {
            mu.iter()
                .zip(oddsu.iter())
                .map(|(&m, &o)| m as f64 * (1.0 - (-o * t).exp()))
                .sum()
        };
        let mut lo = 0.0_f64;
        let mut hi = 1.0_f64;
        while f(hi) < n && hi < 1e15 {
            hi *= 2.0;
        }
        if f(hi) < n {
            return Err(Error::Convergence("could not bracket the removal-time parameter"));
        }
        let mut converged = false;
        for _ in 0..100 {
            let mid = 0.5 * (lo + hi);
            if f(mid) < n {
                lo = mid;
            } else {
                hi = mid;
            }
            if (hi - lo) < 1e-14 * hi.max(1.0) {
                converged = true;
                break;
            }
        }
        if !converged {
            return Err(Error::Convergence("removal-time bisection did not converge within the iteration cap"));
        }
        let t = 0.5 * (lo + hi);
        self.t_cache.set(Some(t));
        Ok(t)
    }

    /// Infallible wrapper for callers (`moments`, the lattice anchor) that
    /// can't propagate a `Result`: falls back to a weight-proportional
    /// heuristic `t=1` if the fixed point search doesn't converge, which
    /// only degrades the anchor's quality, not the enumeration's
    /// correctness.
    fn solve_t(&self) -> f64 {
        self.solve_t_checked().unwrap_or(1.0)
    }

    /// Mean-anchored lattice point used to seed the pruned walk: each
    /// color's used-count mean at `solve_t()`'s removal time, rounded to
    /// the nearest feasible integer vector summing to `n`.
    fn anchor(&self) -> Vec<u64> {
        let mu = &self.reduced.mu;
        let oddsu = &self.reduced.oddsu;
        let t = self.solve_t();
        let weight: Vec<f64> = mu
            .iter()
            .zip(oddsu.iter())
            .map(|(&m, &o)| m as f64 * (1.0 - (-o * t).exp()))
            .collect();
        let total_weight: f64 = weight.iter().sum();
        if total_weight <= 0.0 {
            return vec![0; mu.len()];
        }
        let mut raw: Vec<u64> = weight
            .iter()
            .zip(mu.iter())
            .map(|(&w, &m)| w.round().clamp(0.0, m as f64) as u64)
            .collect();
        let mut sum: i64 = raw.iter().sum::<u64>() as i64;
        let target = self.urn.n as i64;
        let mut order: Vec<usize> = (0..raw.len()).collect();
        order.sort_by(|&a, &b| weight[b].partial_cmp(&weight[a]).unwrap());
        let mut idx = 0;
        while sum != target && !order.is_empty() {
            let i = order[idx % order.len()];
            if sum < target && raw[i] < mu[i] {
                raw[i] += 1;
                sum += 1;
            } else if sum > target && raw[i] > 0 {
                raw[i] -= 1;
                sum -= 1;
            }
            idx += 1;
            if idx > 10_000 {
                break;
            }
        }
        raw
    }

    /// Mean-anchored depth-first enumeration of the feasible lattice,
    /// mirroring `MultivariateFishers::walk`: starts each level at the
    /// anchor component and walks outward in both directions, stopping a
    /// direction once two consecutive subtree sums fall below `accuracy`
    /// and are no longer growing.
    #[allow(clippy::too_many_arguments)]
    fn walk(
        i: usize,
        remaining: u64,
        x: &mut [u64],
        mu: &[u64],
        oddsu: &[f64],
        accuracy: f64,
        anchor: &[u64],
        z: &mut f64,
        mean: &mut [f64],
        m2: &mut [f64],
    ) -> f64 {
        let c = mu.len();
        if i == c - 1 {
            if remaining > mu[i] {
                return 0.0;
            }
            x[i] = remaining;
            let p = Self::pmf_used(x, mu, oddsu, accuracy);
            *z += p;
            for (k, xi) in x.iter().enumerate() {
                let xf = *xi as f64;
                mean[k] += xf * p;
                m2[k] += xf * xf * p;
            }
            return p;
        }
        let rest_after: u64 = mu[i + 1..].iter().sum();
        let lo = remaining.saturating_sub(rest_after);
        let hi = remaining.min(mu[i]);
        if lo > hi {
            return 0.0;
        }
        let a = anchor[i].clamp(lo, hi);
        x[i] = a;
        let mut total = Self::walk(i + 1, remaining - a, x, mu, oddsu, accuracy, anchor, z, mean, m2);

        let mut xi = a;
        let mut prev = f64::INFINITY;
        while xi > lo {
            xi -= 1;
            x[i] = xi;
            let sub = Self::walk(i + 1, remaining - xi, x, mu, oddsu, accuracy, anchor, z, mean, m2);
            total += sub;
            if prev < accuracy && sub < accuracy && sub <= prev {
                break;
            }
            prev = sub;
        }

        let mut xi = a;
        let mut prev = f64::INFINITY;
        while xi < hi {
            xi += 1;
            x[i] = xi;
            let sub = Self::walk(i + 1, remaining - xi, x, mu, oddsu, accuracy, anchor, z, mean, m2);
            total += sub;
            if prev < accuracy && sub < accuracy && sub <= prev {
                break;
            }
            prev = sub;
        }

        total
    }
}

impl MultivariateDistribution for MultivariateWallenius {
    fn probability(&mut self, x: &[i64]) -> f64 {
        if x.len() != self.urn.colors() {
            return 0.0;
        }
        let sum: i64 = x.iter().sum();
        if sum != self.urn.n as i64 {
            return 0.0;
        }
        for (i, &xi) in x.iter().enumerate() {
            if xi < 0 || xi as u64 > self.urn.m[i] {
                return 0.0;
            }
        }
        for orig_i in 0..self.urn.colors() {
            let excluded = !self.reduced.index_map.contains(&orig_i);
            if excluded && x[orig_i] != 0 {
                return 0.0;
            }
        }
        let used: Vec<u64> = self.reduced.index_map.iter().map(|&i| x[i] as u64).collect();
        match self.reduced.usedcolors() {
            0 => {
                if self.urn.n == 0 {
                    1.0
                } else {
                    0.0
                }
            }
            1 => {
                if used[0] == self.urn.n {
                    1.0
                } else {
                    0.0
                }
            }
            2 => {
                let (m1, m2) = (self.reduced.mu[0], self.reduced.mu[1]);
                let ratio = self.reduced.oddsu[0] / self.reduced.oddsu[1];
                match Wallenius::new(self.urn.n, m1, m2, ratio, self.urn.accuracy) {
                    Ok(mut w) => w.probability(used[0] as i64),
                    Err(_) => 0.0,
                }
            }
            _ => Self::pmf_used(&used, &self.reduced.mu, &self.reduced.oddsu, self.urn.accuracy),
        }
    }

    fn mean1(&self) -> Result<Vec<f64>> {
        let mu = &self.reduced.mu;
        let oddsu = &self.reduced.oddsu;
        let total: u64 = mu.iter().sum();
        if self.urn.n > total {
            return Err(Error::Infeasible("n exceeds the usable urn total"));
        }
        let t = self.solve_t_checked()?;
        let used_mean: Vec<f64> = mu
            .iter()
            .zip(oddsu.iter())
            .map(|(&m, &o)| m as f64 * (1.0 - (-o * t).exp()))
            .collect();
        let mut full = vec![0.0; self.urn.colors()];
        for (ri, &orig_i) in self.reduced.index_map.iter().enumerate() {
            full[orig_i] = used_mean[ri];
        }
        Ok(full)
    }

    fn moments(&mut self) -> (Vec<f64>, Vec<f64>) {
        let c = self.urn.colors();
        if self.reduced.usedcolors() <= 2 {
            let mut mean = vec![0.0; c];
            let mut var = vec![0.0; c];
            if self.reduced.usedcolors() == 1 {
                let i = self.reduced.index_map[0];
                mean[i] = self.urn.n as f64;
            } else if self.reduced.usedcolors() == 2 {
                let (m1, m2) = (self.reduced.mu[0], self.reduced.mu[1]);
                let ratio = self.reduced.oddsu[0] / self.reduced.oddsu[1];
                if let Ok(mut w) = Wallenius::new(self.urn.n, m1, m2, ratio, self.urn.accuracy) {
                    let (mu_x, var_x) = w.moments();
                    let (i0, i1) = (self.reduced.index_map[0], self.reduced.index_map[1]);
                    mean[i0] = mu_x;
                    mean[i1] = self.urn.n as f64 - mu_x;
                    var[i0] = var_x;
                    var[i1] = var_x;
                }
            }
            return (mean, var);
        }
        let mu = self.reduced.mu.clone();
        let oddsu = self.reduced.oddsu.clone();
        let anchor = self.anchor();
        let mut z = 0.0;
        let mut mean = vec![0.0; mu.len()];
        let mut m2 = vec![0.0; mu.len()];
        let mut x = vec![0u64; mu.len()];
        Self::walk(0, self.urn.n, &mut x, &mu, &oddsu, self.urn.accuracy, &anchor, &mut z, &mut mean, &mut m2);
        let z = z.max(1e-300);
        let mut full_mean = vec![0.0; c];
        let mut full_var = vec![0.0; c];
        for (ri, &orig_i) in self.reduced.index_map.iter().enumerate() {
            let m = mean[ri] / z;
            let m2v = m2[ri] / z;
            full_mean[orig_i] = m;
            full_var[orig_i] = (m2v - m * m).max(0.0);
        }
        (full_mean, full_var)
    }

    fn colors(&self) -> usize {
        self.urn.colors()
    }

    fn sample<R: RngCore>(&mut self, rng: &mut R) -> Vec<i64> {
        let mu = self.reduced.mu.clone();
        let oddsu = self.reduced.oddsu.clone();
        let mut rem = mu.clone();
        let mut xs_used = vec![0u64; mu.len()];
        for _ in 0..self.urn.n {
            let weights: Vec<f64> =
                rem.iter().zip(oddsu.iter()).map(|(&r, &o)| r as f64 * o).collect();
            let total: f64 = weights.iter().sum();
            if total <= 0.0 {
                break;
            }
            let u = rng.next_f64() * total;
            let mut acc = 0.0;
            let mut chosen = weights.len() - 1;
            for (k, &w) in weights.iter().enumerate() {
                acc += w;
                if u < acc {
                    chosen = k;
                    break;
                }
            }
            rem[chosen] -= 1;
            xs_used[chosen] += 1;
        }
        let mut out = vec![0i64; self.urn.colors()];
        for (ri, &orig_i) in self.reduced.index_map.iter().enumerate() {
            out[orig_i] = xs_used[ri] as i64;
        }
        out
    }
}
