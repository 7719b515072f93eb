//! Fisher's multivariate noncentral hypergeometric distribution: `c`
//! colors, independent weighted Bernoulli draws per ball conditioned on
//! a fixed total `n`. `P(x) ∝ Prod_i C(m_i, x_i) * odds_i^x_i` over the
//! lattice `{x : sum x_i = n, 0 <= x_i <= m_i}`.

use crate::dist::fisher::univariate::Fishers;
use crate::dist::support::{MultivariateUrn, Reduced};
use crate::dist::MultivariateDistribution;
use crate::error::{Error, Result};
use crate::num;
use crate::rng::RngCore;

#[derive(Debug, Clone)]
struct SumCache {
    scale: f64,
    z: f64,
    mean: Vec<f64>,
    m2: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct MultivariateFishers {
    urn: MultivariateUrn,
    reduced: Reduced,
    cache: Option<SumCache>,
}

impl MultivariateFishers {
    pub fn new(n: u64, m: Vec<u64>, odds: Vec<f64>, accuracy: f64) -> Result<Self> {
        let urn = MultivariateUrn::new(n, m, odds, accuracy)?;
        let reduced = urn.reduce();
        Ok(Self { urn, reduced, cache: None })
    }

    pub fn urn(&self) -> &MultivariateUrn {
        &self.urn
    }

    fn ln_g(x: &[u64], mu: &[u64], oddsu: &[f64]) -> f64 {
        let mut v = 0.0;
        for i in 0..mu.len() {
            v += num::ln_fac(mu[i]) - num::ln_fac(x[i]) - num::ln_fac(mu[i] - x[i])
                + x[i] as f64 * oddsu[i].ln();
        }
        v
    }

    fn anchor(&self) -> Vec<u64> {
        let mu = &self.reduced.mu;
        let oddsu = &self.reduced.oddsu;
        let weight: Vec<f64> = mu.iter().zip(oddsu).map(|(&m, &o)| m as f64 * o).collect();
        let total_weight: f64 = weight.iter().sum();
        if total_weight <= 0.0 {
            return vec![0; mu.len()];
        }
        let mut raw: Vec<u64> = weight
            .iter()
            .zip(mu.iter())
            .map(|(&w, &m)| ((self.urn.n as f64) * w / total_weight).round().clamp(0.0, m as f64) as u64)
            .collect();
        let mut sum: i64 = raw.iter().sum::<u64>() as i64;
        let target = self.urn.n as i64;
        // Nudge the largest-weight color(s) to absorb the rounding residual.
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

    fn ensure_cache(&mut self) {
        if self.cache.is_some() {
            return;
        }
        let mu = self.reduced.mu.clone();
        let oddsu = self.reduced.oddsu.clone();
        let n = self.urn.n;
        let anchor = self.anchor();
        let scale = Self::ln_g(&anchor, &mu, &oddsu);
        let accuracy = self.urn.accuracy;
        let mut z = 0.0;
        let mut mean = vec![0.0; mu.len()];
        let mut m2 = vec![0.0; mu.len()];
        let mut x = vec![0u64; mu.len()];
        Self::walk(0, n, &mut x, &mu, &oddsu, scale, accuracy, &anchor, &mut z, &mut mean, &mut m2);
        self.cache = Some(SumCache { scale, z, mean, m2 });
    }

    /// Mean-anchored depth-first enumeration of the feasible lattice.
    ///
    /// At each level, starts at the (range-clipped) anchor component and
    /// walks outward in both directions, stopping a direction once two
    /// consecutive subtree sums fall below `accuracy` and are no longer
    /// growing. Returns the subtree sum rooted at this call so the caller
    /// can apply the same cutoff one level up.
    #[allow(clippy::too_many_arguments)]
    fn walk(
        i: usize,
        remaining: u64,
        x: &mut [u64],
        mu: &[u64],
        oddsu: &[f64],
        scale: f64,
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
            let term = num::safe_exp(Self::ln_g(x, mu, oddsu) - scale);
            *z += term;
            for (k, xi) in x.iter().enumerate() {
                let xf = *xi as f64;
                mean[k] += xf * term;
                m2[k] += xf * xf * term;
            }
            return term;
        }
        let rest_after: u64 = mu[i + 1..].iter().sum();
        let lo = remaining.saturating_sub(rest_after);
        let hi = remaining.min(mu[i]);
        if lo > hi {
            return 0.0;
        }
        let a = anchor[i].clamp(lo, hi);
        x[i] = a;
        let mut total =
            Self::walk(i + 1, remaining - a, x, mu, oddsu, scale, accuracy, anchor, z, mean, m2);

        let mut xi = a;
        let mut prev = f64::INFINITY;
        while xi > lo {
            xi -= 1;
            x[i] = xi;
            let sub = Self::walk(
                i + 1,
                remaining - xi,
                x,
                mu,
                oddsu,
                scale,
                accuracy,
                anchor,
                z,
                mean,
                m2,
            );
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
            let sub = Self::walk(
                i + 1,
                remaining - xi,
                x,
                mu,
                oddsu,
                scale,
                accuracy,
                anchor,
                z,
                mean,
                m2,
            );
            total += sub;
            if prev < accuracy && sub < accuracy && sub <= prev {
                break;
            }
            prev = sub;
        }

        total
    }

    /// Exact unnormalized lattice weight for a subset of colors summing
    /// to `total`, used by the conditional-decomposition sampler to
    /// marginalize over the colors not yet drawn.
    fn suffix_sum(mu: &[u64], oddsu: &[f64], total: u64) -> f64 {
        match mu.len() {
            0 => {
                if total == 0 {
                    1.0
                } else {
                    0.0
                }
            }
            1 => {
                if total <= mu[0] {
                    num::safe_exp(
                        num::ln_fac(mu[0]) - num::ln_fac(total) - num::ln_fac(mu[0] - total)
                            + total as f64 * oddsu[0].ln(),
                    )
                } else {
                    0.0
                }
            }
            _ => {
                let rest_after: u64 = mu[1..].iter().sum();
                let lo = total.saturating_sub(rest_after);
                let hi = total.min(mu[0]);
                let mut acc = 0.0;
                let mut x0 = lo;
                while x0 <= hi {
                    let w = num::safe_exp(
                        num::ln_fac(mu[0]) - num::ln_fac(x0) - num::ln_fac(mu[0] - x0)
                            + x0 as f64 * oddsu[0].ln(),
                    );
                    acc += w * Self::suffix_sum(&mu[1..], &oddsu[1..], total - x0);
                    x0 += 1;
                }
                acc
            }
        }
    }
}

impl MultivariateDistribution for MultivariateFishers {
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
                match Fishers::new(self.urn.n, m1, m2, ratio, self.urn.accuracy) {
                    Ok(mut f) => f.probability(used[0] as i64),
                    Err(_) => 0.0,
                }
            }
            _ => {
                self.ensure_cache();
                let cache = self.cache.as_ref().unwrap();
                let lw = Self::ln_g(&used, &self.reduced.mu, &self.reduced.oddsu);
                num::safe_exp(lw - cache.scale) / cache.z.max(1e-300)
            }
        }
    }

    fn mean1(&self) -> Result<Vec<f64>> {
        let mu = &self.reduced.mu;
        let oddsu = &self.reduced.oddsu;
        let n = self.urn.n as f64;
        let total: u64 = mu.iter().sum();
        if n as u64 > total {
            return Err(Error::Infeasible("n exceeds the usable urn total"));
        }
        // Common-tilt Cornfield fixed point: find tau >= 0 such that
        // sum_i m_i*odds_i*tau / (1 + odds_i*tau) == n, then report each
        // color's mean at that tau. sum(tau) is continuous and strictly
        // increasing in tau (for used colors), so bisection suffices.
        let sum_at = |tau: f64| -> f64 {
            mu.iter()
                .zip(oddsu.iter())
                .map(|(&m, &o)| {
                    let w = o * tau;
                    m as f64 * w / (1.0 + w)
                })
                .sum()
        };
        let mut lo = 0.0_f64;
        let mut hi = 1.0_f64;
        while sum_at(hi) < n && hi < 1e300 {
            hi *= 2.0;
        }
        if sum_at(hi) < n {
            return Err(Error::Convergence("could not bracket the common-tilt parameter"));
        }
        let mut converged = false;
        for _ in 0..100 {
            let mid = 0.5 * (lo + hi);
            if sum_at(mid) < n {
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
            return Err(Error::Convergence("common-tilt bisection did not converge within the iteration cap"));
        }
        let tau = 0.5 * (lo + hi);
        let used_mean: Vec<f64> = mu
            .iter()
            .zip(oddsu.iter())
            .map(|(&m, &o)| {
                let w = o * tau;
                m as f64 * w / (1.0 + w)
            })
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
                if let Ok(mut f) = Fishers::new(self.urn.n, m1, m2, ratio, self.urn.accuracy) {
                    let (mu_x, var_x) = f.moments();
                    let (i0, i1) = (self.reduced.index_map[0], self.reduced.index_map[1]);
                    mean[i0] = mu_x;
                    mean[i1] = self.urn.n as f64 - mu_x;
                    var[i0] = var_x;
                    var[i1] = var_x;
                }
            }
            return (mean, var);
        }
        self.ensure_cache();
        let cache = self.cache.as_ref().unwrap();
        let z = cache.z.max(1e-300);
        let mut mean = vec![0.0; c];
        let mut var = vec![0.0; c];
        for (ri, &orig_i) in self.reduced.index_map.iter().enumerate() {
            let m = cache.mean[ri] / z;
            let m2 = cache.m2[ri] / z;
            mean[orig_i] = m;
            var[orig_i] = (m2 - m * m).max(0.0);
        }
        (mean, var)
    }

    fn colors(&self) -> usize {
        self.urn.colors()
    }

    fn sample<R: RngCore>(&mut self, rng: &mut R) -> Vec<i64> {
        let mu = self.reduced.mu.clone();
        let oddsu = self.reduced.oddsu.clone();
        let c = mu.len();
        let mut remaining_n = self.urn.n;
        let mut xs_used = vec![0u64; c];
        for i in 0..c {
            if i == c - 1 {
                xs_used[i] = remaining_n;
                break;
            }
            let rest_after: u64 = mu[i + 1..].iter().sum();
            let lo = remaining_n.saturating_sub(rest_after);
            let hi = remaining_n.min(mu[i]);
            let mut weights = Vec::with_capacity((hi - lo + 1) as usize);
            let mut total = 0.0;
            let mut xi = lo;
            while xi <= hi {
                let w = num::safe_exp(
                    num::ln_fac(mu[i]) - num::ln_fac(xi) - num::ln_fac(mu[i] - xi)
                        + xi as f64 * oddsu[i].ln(),
                ) * Self::suffix_sum(&mu[i + 1..], &oddsu[i + 1..], remaining_n - xi);
                weights.push(w);
                total += w;
                xi += 1;
            }
            let u = rng.next_f64() * total;
            let mut acc = 0.0;
            let mut chosen = hi;
            for (k, &w) in weights.iter().enumerate() {
                acc += w;
                if u < acc {
                    chosen = lo + k as u64;
                    break;
                }
            }
            xs_used[i] = chosen;
            remaining_n -= chosen;
        }
        let mut out = vec![0i64; self.urn.colors()];
        for (ri, &orig_i) in self.reduced.index_map.iter().enumerate() {
            out[orig_i] = xs_used[ri] as i64;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::SplitMix64;

    fn build(n: u64, m: Vec<u64>, odds: Vec<f64>) -> MultivariateFishers {
        MultivariateFishers::new(n, m, odds, 1e-8).unwrap()
    }

    #[test]
    fn probability_sums_to_one_over_lattice() {
        let mut f = build(6, vec![5, 4, 3], vec![1.0, 2.0, 0.5]);
        let mut total = 0.0;
        for x0 in 0..=5 {
            for x1 in 0..=4 {
                let x2 = 6 - x0 - x1;
                if !(0..=3).contains(&x2) {
                    continue;
                }
                total += f.probability(&[x0, x1, x2]);
            }
        }
        assert!((total - 1.0).abs() < 1e-6, "total = {total}");
    }

    #[test]
    fn two_color_case_matches_univariate() {
        let mut f = build(10, vec![12, 15], vec![2.0, 1.0]);
        let mut u = Fishers::new(10, 12, 15, 2.0, 1e-10).unwrap();
        for x0 in 0..=10 {
            let x1 = 10 - x0;
            let mv = f.probability(&[x0, x1]);
            let uv = u.probability(x0);
            assert!((mv - uv).abs() < 1e-9, "x0={x0} mv={mv} uv={uv}");
        }
    }

    #[test]
    fn zero_odds_color_forced_to_zero() {
        let mut f = build(5, vec![5, 10], vec![1.0, 0.0]);
        assert_eq!(f.probability(&[4, 1]), 0.0);
        assert!((f.probability(&[5, 0]) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn mean1_sums_to_n() {
        let f = build(6, vec![5, 4, 3], vec![1.0, 2.0, 0.5]);
        let mean = f.mean1().unwrap();
        let total: f64 = mean.iter().sum();
        assert!((total - 6.0).abs() < 1e-6, "total = {total}");
    }

    #[test]
    fn moments_exact_sum_to_n() {
        let mut f = build(6, vec![5, 4, 3], vec![1.0, 2.0, 0.5]);
        let (mean, _var) = f.moments();
        let total: f64 = mean.iter().sum();
        assert!((total - 6.0).abs() < 1e-6, "total = {total}");
    }

    #[test]
    fn sample_respects_urn_and_total() {
        let mut f = build(6, vec![5, 4, 3], vec![1.0, 2.0, 0.5]);
        let mut rng = SplitMix64::seed_from_u64(42);
        for _ in 0..200 {
            let x = f.sample(&mut rng);
            assert_eq!(x.iter().sum::<i64>(), 6);
            assert_eq!(x[0].clamp(0, 5), x[0]);
            assert_eq!(x[1].clamp(0, 4), x[1]);
            assert_eq!(x[2].clamp(0, 3), x[2]);
        }
    }
}
