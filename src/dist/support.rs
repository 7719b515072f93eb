//! Urn parameters, support bounds, and the "reduction" step that drops
//! zero-weight or empty colors before a multivariate engine does any
//! real work.

use crate::error::{Error, Result};

/// Hard cap on the number of colors a multivariate urn may have. The
/// upstream source imposes this for table-sized auxiliary arrays; we
/// keep it as a fixed `const` rather than a dynamic limit both for
/// parity with the source and because it bounds the recursion depth of
/// the lattice walk in `dist::fisher::multivariate`/`dist::wallenius::multivariate`
/// to something trivially stack-safe.
pub const MAX_COLORS: usize = 32;

/// `xmin = max(0, n - m2)`, computed without risking `u64` underflow.
#[inline]
pub fn min_hypergeo(n: u64, m1: u64, m2: u64) -> u64 {
    let _ = m1;
    n.saturating_sub(m2)
}

/// `xmax = min(n, m1)`.
#[inline]
pub fn max_hypergeo(n: u64, m1: u64, m2: u64) -> u64 {
    let _ = m2;
    n.min(m1)
}

/// Parameters of a univariate urn: `n` balls drawn from `m1 + m2` balls
/// of two colors, color 1 carrying relative weight `odds`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnivariateUrn {
    pub n: u64,
    pub m1: u64,
    pub m2: u64,
    pub odds: f64,
    pub accuracy: f64,
}

impl UnivariateUrn {
    pub fn new(n: u64, m1: u64, m2: u64, odds: f64, accuracy: f64) -> Result<Self> {
        if !(odds.is_finite() && odds >= 0.0) {
            return Err(Error::ParameterRange("odds must be finite and >= 0"));
        }
        if !(accuracy.is_finite() && accuracy > 0.0 && accuracy <= 1.0) {
            return Err(Error::ParameterRange("accuracy must be in (0, 1]"));
        }
        if n > m1 + m2 {
            return Err(Error::ParameterRange("n must not exceed m1 + m2"));
        }
        Ok(Self { n, m1, m2, odds, accuracy })
    }

    #[inline]
    pub fn big_n(&self) -> u64 {
        self.m1 + self.m2
    }

    #[inline]
    pub fn xmin(&self) -> i64 {
        min_hypergeo(self.n, self.m1, self.m2) as i64
    }

    #[inline]
    pub fn xmax(&self) -> i64 {
        max_hypergeo(self.n, self.m1, self.m2) as i64
    }
}

/// Parameters of a multivariate urn: `n` balls drawn from `c` colors
/// with sizes `m[i]` and relative weights `odds[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct MultivariateUrn {
    pub n: u64,
    pub m: Vec<u64>,
    pub odds: Vec<f64>,
    pub accuracy: f64,
}

impl MultivariateUrn {
    pub fn new(n: u64, m: Vec<u64>, odds: Vec<f64>, accuracy: f64) -> Result<Self> {
        if m.len() != odds.len() {
            return Err(Error::ParameterRange("m and odds must have the same length"));
        }
        if m.is_empty() {
            return Err(Error::ParameterRange("at least one color is required"));
        }
        if m.len() > MAX_COLORS {
            return Err(Error::ParameterRange("color count exceeds MAX_COLORS"));
        }
        if !(accuracy.is_finite() && accuracy > 0.0 && accuracy <= 1.0) {
            return Err(Error::ParameterRange("accuracy must be in (0, 1]"));
        }
        for &o in &odds {
            if !(o.is_finite() && o >= 0.0) {
                return Err(Error::ParameterRange("all odds must be finite and >= 0"));
            }
        }
        let big_n: u64 = m.iter().sum();
        if n > big_n {
            return Err(Error::ParameterRange("n must not exceed the sum of m"));
        }
        let feasible: u64 = m
            .iter()
            .zip(odds.iter())
            .filter(|(_, &o)| o > 0.0)
            .map(|(&mi, _)| mi)
            .sum();
        if feasible < n {
            return Err(Error::Infeasible(
                "n exceeds the total size of colors with positive odds",
            ));
        }
        Ok(Self { n, m, odds, accuracy })
    }

    #[inline]
    pub fn colors(&self) -> usize {
        self.m.len()
    }

    #[inline]
    pub fn big_n(&self) -> u64 {
        self.m.iter().sum()
    }

    /// Drop colors with `m[i] == 0` or `odds[i] == 0`: any outcome with
    /// a nonzero count at such a color has probability zero, so
    /// computation only ever needs to range over the rest.
    pub fn reduce(&self) -> Reduced {
        let mut index_map = Vec::new();
        let mut mu = Vec::new();
        let mut oddsu = Vec::new();
        for (i, (&mi, &oi)) in self.m.iter().zip(self.odds.iter()).enumerate() {
            if mi > 0 && oi > 0.0 {
                index_map.push(i);
                mu.push(mi);
                oddsu.push(oi);
            }
        }
        let all_odds_equal = oddsu.windows(2).all(|w| (w[0] - w[1]).abs() < 1e-12);
        Reduced { index_map, mu, oddsu, all_odds_equal }
    }
}

/// The reduced urn: colors with zero size or zero odds removed.
#[derive(Debug, Clone)]
pub struct Reduced {
    /// `index_map[reduced_i] == original_i`.
    pub index_map: Vec<usize>,
    pub mu: Vec<u64>,
    pub oddsu: Vec<f64>,
    pub all_odds_equal: bool,
}

impl Reduced {
    #[inline]
    pub fn usedcolors(&self) -> usize {
        self.mu.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_max_hypergeo_matches_spec() {
        assert_eq!(min_hypergeo(20, 25, 32), 0);
        assert_eq!(max_hypergeo(20, 25, 32), 20);
        assert_eq!(min_hypergeo(40, 10, 20), 20);
        assert_eq!(max_hypergeo(40, 10, 20), 10);
    }

    #[test]
    fn univariate_rejects_bad_accuracy() {
        assert!(UnivariateUrn::new(20, 25, 32, 2.5, 0.0).is_err());
        assert!(UnivariateUrn::new(20, 25, 32, 2.5, 1.5).is_err());
    }

    #[test]
    fn univariate_rejects_negative_odds() {
        assert!(UnivariateUrn::new(20, 25, 32, -1.0, 1e-10).is_err());
    }

    #[test]
    fn multivariate_reduce_drops_zero_colors() {
        let urn = MultivariateUrn::new(
            10,
            vec![5, 0, 8],
            vec![1.0, 2.0, 0.0],
            1e-6,
        )
        .unwrap();
        let r = urn.reduce();
        assert_eq!(r.usedcolors(), 1);
        assert_eq!(r.index_map, vec![0]);
    }

    #[test]
    fn multivariate_infeasible_rejected() {
        // Only 5 balls have positive odds, cannot draw 10.
        let urn = MultivariateUrn::new(10, vec![5, 20], vec![1.0, 0.0], 1e-6);
        assert!(matches!(urn, Err(Error::Infeasible(_))));
    }

    #[test]
    fn multivariate_all_odds_equal_detected() {
        let urn = MultivariateUrn::new(5, vec![3, 4, 5], vec![2.0, 2.0, 2.0], 1e-6).unwrap();
        assert!(urn.reduce().all_odds_equal);
    }
}
