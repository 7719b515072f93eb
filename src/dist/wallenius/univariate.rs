//! Wallenius' univariate noncentral hypergeometric distribution.
//!
//! The defining picture (Fog's continuous-removal construction): run a
//! clock `t`; while it runs, balls of color `i` are removed from the
//! urn at rate `odds_i` per remaining ball of that color, so the
//! expected count remaining at time `t` is `m_i * exp(-odds_i * t)`.
//! Stopping the clock at the (unique) `t` where exactly `n` balls have
//! been removed in expectation gives the approximate mean; the exact
//! PMF is the integral of the removal-time density over `t in [0, 1]`
//! after a change of variables. `g(x)` has no recurrence
//! the way Fisher's does, so there is no neighbor-update cache here —
//! each `x` is evaluated independently, with the overall PMF already
//! normalized by construction (no `scale`/`rsum` bookkeeping needed).

use crate::dist::fisher::univariate::central_pmf;
use crate::dist::support::{max_hypergeo, min_hypergeo, UnivariateUrn};
use crate::error::Result;
use crate::num;
use crate::num::quadrature::adaptive_gauss_legendre;
use crate::rng::RngCore;
use std::cell::Cell;

/// Support size at or below which exact adaptive quadrature is cheap
/// enough to use directly. Above it we fall back to an approximation;
/// which one depends on `accuracy`.
const EXACT_QUADRATURE_SUPPORT_LIMIT: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EvalStrategy {
    ExactQuadrature,
    Laplace,
    Normal,
}

#[derive(Debug, Clone)]
pub struct Wallenius {
    urn: UnivariateUrn,
    /// Cached solution of the continuous removal-time equation; reused
    /// by `mean`, `mode`, `variance_approx`, and the normal-approximation
    /// branch of `probability`.
    t_cache: Cell<Option<f64>>,
}

impl Wallenius {
    pub fn new(n: u64, m1: u64, m2: u64, odds: f64, accuracy: f64) -> Result<Self> {
        let urn = UnivariateUrn::new(n, m1, m2, odds, accuracy)?;
        Ok(Self { urn, t_cache: Cell::new(None) })
    }

    pub fn urn(&self) -> &UnivariateUrn {
        &self.urn
    }

    #[inline]
    pub fn xmin(&self) -> i64 {
        min_hypergeo(self.urn.n, self.urn.m1, self.urn.m2) as i64
    }

    #[inline]
    pub fn xmax(&self) -> i64 {
        max_hypergeo(self.urn.n, self.urn.m1, self.urn.m2) as i64
    }

    fn strategy(&self) -> EvalStrategy {
        let support = (self.xmax() - self.xmin() + 1).max(0) as usize;
        if support <= EXACT_QUADRATURE_SUPPORT_LIMIT {
            EvalStrategy::ExactQuadrature
        } else if self.urn.accuracy >= 0.1 {
            EvalStrategy::Normal
        } else {
            EvalStrategy::Laplace
        }
    }

    fn ln_binom(&self, x: i64) -> f64 {
        let (m1, m2, n) = (self.urn.m1, self.urn.m2, self.urn.n);
        let xu = x as u64;
        let nmx = n - xu;
        num::ln_fac(m1) - num::ln_fac(xu) - num::ln_fac(m1 - xu) + num::ln_fac(m2)
            - num::ln_fac(nmx)
            - num::ln_fac(m2 - nmx)
    }

    /// The removal-time integrand at a given `x`, `t`: `(1-t^{o1/d})^x
    /// (1-t^{o2/d})^{n-x}` with `o2 = 1` (the urn's `odds` field is
    /// already a ratio against color 2).
    fn integrand(&self, x: i64, t: f64) -> f64 {
        let (m1, m2, n) = (self.urn.m1 as f64, self.urn.m2 as f64, self.urn.n as f64);
        let xf = x as f64;
        let o1 = self.urn.odds;
        let o2 = 1.0_f64;
        let d = o1 * (m1 - xf) + o2 * (m2 - (n - xf));
        if d <= 0.0 {
            return 0.0;
        }
        let a = if t <= 0.0 { 0.0 } else { t.powf(o1 / d) };
        let b = if t <= 0.0 { 0.0 } else { t.powf(o2 / d) };
        (1.0 - a).powf(xf) * (1.0 - b).powf(n - xf)
    }

    fn ln_integral_quadrature(&self, x: i64) -> f64 {
        let tol = (self.urn.accuracy * 0.1).max(1e-14);
        let value = adaptive_gauss_legendre(|t| self.integrand(x, t), 0.0, 1.0, tol);
        value.max(0.0).ln()
    }

    /// Laplace expansion of the integral around the interior maximum of
    /// `ln(integrand)`, found by ternary search (the log-integrand is
    /// unimodal and concave on `(0,1)` for the cases this strategy is
    /// selected for).
    fn ln_integral_laplace(&self, x: i64) -> f64 {
        let phi = |t: f64| -> f64 {
            let v = self.integrand(x, t);
            if v <= 0.0 {
                f64::NEG_INFINITY
            } else {
                v.ln()
            }
        };
        let mut lo = 1e-9_f64;
        let mut hi = 1.0 - 1e-9_f64;
        for _ in 0..100 {
            let m1 = lo + (hi - lo) / 3.0;
            let m2 = hi - (hi - lo) / 3.0;
            if phi(m1) < phi(m2) {
                lo = m1;
            } else {
                hi = m2;
            }
        }
        let t_star = 0.5 * (lo + hi);
        let h = 1e-4_f64;
        let f0 = phi(t_star);
        let f_plus = phi((t_star + h).min(1.0 - 1e-12));
        let f_minus = phi((t_star - h).max(1e-12));
        let second = (f_plus - 2.0 * f0 + f_minus) / (h * h);
        let curvature = (-second).max(1e-6);
        f0 + 0.5 * (2.0 * std::f64::consts::PI / curvature).ln()
    }

    fn pmf_at(&self, x: i64) -> f64 {
        if x < self.xmin() || x > self.xmax() {
            return 0.0;
        }
        if self.xmin() == self.xmax() {
            return 1.0;
        }
        if self.urn.odds == 0.0 {
            return if x == self.xmin() { 1.0 } else { 0.0 };
        }
        if self.urn.odds == 1.0 {
            return central_pmf(self.urn.n, self.urn.m1, self.urn.m2, x);
        }
        match self.strategy() {
            EvalStrategy::Normal => self.probability_normal(x),
            EvalStrategy::ExactQuadrature => {
                num::safe_exp(self.ln_binom(x) + self.ln_integral_quadrature(x))
            }
            EvalStrategy::Laplace => {
                num::safe_exp(self.ln_binom(x) + self.ln_integral_laplace(x))
            }
        }
    }

    fn probability_normal(&self, x: i64) -> f64 {
        let mu = self.mean();
        let sigma = self.variance_approx().sqrt().max(1e-6);
        let z = (x as f64 - mu) / sigma;
        num::standard_normal_pdf(z) / sigma
    }

    /// Solves `m1*(1-exp(-odds*t)) + m2*(1-exp(-t)) = n` for `t >= 0` by
    /// bisection: the continuous-removal analogue of the Cornfield
    /// fixed point, used as the Wallenius approximate mean.
    fn solve_t(&self) -> f64 {
        if let Some(t) = self.t_cache.get() {
            return t;
        }
        let (m1, m2, n) = (self.urn.m1 as f64, self.urn.m2 as f64, self.urn.n as f64);
        let o1 = self.urn.odds;
        let f = |t: f64| m1 * (1.0 - (-o1 * t).exp()) + m2 * (1.0 - (-t).exp());
        let mut lo = 0.0_f64;
        let mut hi = 1.0_f64;
        while f(hi) < n && hi < 1e15 {
            hi *= 2.0;
        }
        for _ in 0..200 {
            let mid = 0.5 * (lo + hi);
            if f(mid) < n {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        let t = 0.5 * (lo + hi);
        self.t_cache.set(Some(t));
        t
    }

    /// Approximate mean via the continuous-removal fixed point.
    pub fn mean(&self) -> f64 {
        if self.xmin() == self.xmax() {
            return self.xmin() as f64;
        }
        if self.urn.odds == 0.0 {
            return self.xmin() as f64;
        }
        if self.urn.odds == 1.0 {
            return self.urn.m1 as f64 * self.urn.n as f64 / self.urn.big_n() as f64;
        }
        let t = self.solve_t();
        let mu = self.urn.m1 as f64 * (1.0 - (-self.urn.odds * t).exp());
        mu.clamp(self.xmin() as f64, self.xmax() as f64)
    }

    /// Cheap variance approximation, reusing the Fisher engine's
    /// Cornfield-derived formula at the Wallenius mean.
    pub fn variance_approx(&self) -> f64 {
        let (m1, n) = (self.urn.m1 as f64, self.urn.n as f64);
        let big_n = self.urn.big_n() as f64;
        let mu = self.mean();
        let r1 = mu * (m1 - mu);
        let r2 = (n - mu) * (mu + big_n - n - m1);
        if big_n <= 1.0 {
            return 0.0;
        }
        let denom = (big_n - 1.0) * (m1 * r2 + (big_n - m1) * r1);
        if denom.abs() < 1e-300 {
            return 0.0;
        }
        (big_n * r1 * r2 / denom).max(0.0)
    }

    /// Local hill-climb from the approximate mean: cheap since there is
    /// no closed-form mode, and the PMF is unimodal.
    pub fn mode(&self) -> i64 {
        if self.xmin() == self.xmax() {
            return self.xmin();
        }
        let mut x = (self.mean().round() as i64).clamp(self.xmin(), self.xmax());
        let mut p = self.pmf_at(x);
        loop {
            let right = if x < self.xmax() { Some(self.pmf_at(x + 1)) } else { None };
            let left = if x > self.xmin() { Some(self.pmf_at(x - 1)) } else { None };
            if let Some(r) = right {
                if r > p {
                    x += 1;
                    p = r;
                    continue;
                }
            }
            if let Some(l) = left {
                if l > p {
                    x -= 1;
                    p = l;
                    continue;
                }
            }
            break;
        }
        x
    }

    pub fn probability(&mut self, x: i64) -> f64 {
        self.pmf_at(x)
    }

    pub fn cdf(&mut self, x: i64) -> f64 {
        if x < self.xmin() {
            return 0.0;
        }
        if x >= self.xmax() {
            return 1.0;
        }
        let mut acc = 0.0;
        for k in self.xmin()..=x {
            acc += self.pmf_at(k);
        }
        acc.min(1.0)
    }

    /// Exact moments by summing the (already normalized) PMF outward
    /// from the approximate mean until each tail drops below
    /// `accuracy * 0.1`, mirroring `Fishers::moments`.
    pub fn moments(&mut self) -> (f64, f64) {
        if self.xmin() == self.xmax() {
            return (self.xmin() as f64, 0.0);
        }
        let anchor = (self.mean().round() as i64).clamp(self.xmin(), self.xmax());
        let thresh = self.urn.accuracy * 0.1;
        let p0 = self.pmf_at(anchor);
        let mut total = p0;
        let mut sum1 = 0.0;
        let mut sum2 = 0.0;
        let mut x = anchor;
        while x > self.xmin() {
            x -= 1;
            let p = self.pmf_at(x);
            let dx = (x - anchor) as f64;
            sum1 += dx * p;
            sum2 += dx * dx * p;
            total += p;
            if p < thresh {
                break;
            }
        }
        let mut x = anchor;
        while x < self.xmax() {
            x += 1;
            let p = self.pmf_at(x);
            let dx = (x - anchor) as f64;
            sum1 += dx * p;
            sum2 += dx * dx * p;
            total += p;
            if p < thresh {
                break;
            }
        }
        let total = total.max(1e-300);
        let mean = anchor as f64 + sum1 / total;
        let var = (sum2 / total - (sum1 / total).powi(2)).max(0.0);
        (mean, var)
    }

    /// `rWNC`: exact urn emulation. Draws `n` balls one at a time,
    /// picking a color with probability proportional to its residual
    /// count times its odds, and decrementing. Exact by construction;
    /// no table is built.
    pub fn sample<R: RngCore>(&mut self, rng: &mut R) -> i64 {
        if self.xmin() == self.xmax() {
            return self.xmin();
        }
        let (mut rem1, mut rem2) = (self.urn.m1, self.urn.m2);
        let mut x: i64 = 0;
        for _ in 0..self.urn.n {
            let w1 = rem1 as f64 * self.urn.odds;
            let w2 = rem2 as f64;
            let total = w1 + w2;
            if total <= 0.0 {
                break;
            }
            let u = rng.next_f64() * total;
            if u < w1 {
                rem1 -= 1;
                x += 1;
            } else {
                rem2 -= 1;
            }
        }
        x
    }
}

impl crate::dist::UnivariateDistribution for Wallenius {
    fn probability(&mut self, x: i64) -> f64 {
        self.probability(x)
    }
    fn cdf(&mut self, x: i64) -> f64 {
        self.cdf(x)
    }
    fn mean(&self) -> f64 {
        self.mean()
    }
    fn variance_approx(&self) -> f64 {
        self.variance_approx()
    }
    fn moments(&mut self) -> (f64, f64) {
        self.moments()
    }
    fn mode(&self) -> i64 {
        self.mode()
    }
    fn xmin(&self) -> i64 {
        self.xmin()
    }
    fn xmax(&self) -> i64 {
        self.xmax()
    }
    fn sample<R: RngCore>(&mut self, rng: &mut R) -> i64 {
        self.sample(rng)
    }
}
