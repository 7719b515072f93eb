//! Process-wide log-factorial cache (L0) and the small set of helpers
//! built directly on top of it.
//!
//! `ln_fac` backs essentially every PMF evaluation in the crate: the
//! proportional function `g(x)` of both the Fisher and Wallenius engines
//! is always evaluated as a sum/difference of `ln_fac` calls rather than
//! as a ratio of raw factorials, which is what keeps the whole library
//! from overflowing for urns with thousands of balls.

use std::sync::OnceLock;

/// Number of exact entries kept in the log-factorial table. Values at or
/// above this fall back to a Stirling-series approximation.
const FAK_LEN: usize = 1024;

fn table() -> &'static [f64; FAK_LEN] {
    static TABLE: OnceLock<[f64; FAK_LEN]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut t = [0.0_f64; FAK_LEN];
        let mut acc = 0.0;
        for (k, slot) in t.iter_mut().enumerate().skip(1) {
            acc += (k as f64).ln();
            *slot = acc;
        }
        t
    })
}

/// `ln(k!)` with relative error <= 1e-13.
pub fn ln_fac(k: u64) -> f64 {
    if (k as usize) < FAK_LEN {
        table()[k as usize]
    } else {
        stirling_ln_fac(k)
    }
}

/// Stirling's series for `ln(k!) = ln(Gamma(k+1))`, truncated once
/// successive terms drop below 1e-14.
fn stirling_ln_fac(k: u64) -> f64 {
    let x = k as f64 + 1.0;
    let inv = 1.0 / x;
    let inv2 = inv * inv;
    const TERMS: [f64; 4] = [1.0 / 12.0, -1.0 / 360.0, 1.0 / 1260.0, -1.0 / 1680.0];
    let mut corr = 0.0;
    let mut p = inv;
    for &c in &TERMS {
        let term = c * p;
        corr += term;
        if term.abs() < 1e-14 {
            break;
        }
        p *= inv2;
    }
    (k as f64 + 0.5) * x.ln() - x + 0.5 * (2.0 * std::f64::consts::PI).ln() + corr
}

/// `ln(Gamma(a+1) / Gamma(a-dx+1))`. Uses the exact log-factorial table
/// when both `a` and `a - dx` are non-negative integers, and
/// `ln_gamma` otherwise.
pub fn falling_factorial(a: f64, dx: f64) -> f64 {
    let b = a - dx;
    let a_is_int = a >= 0.0 && a.fract() == 0.0;
    let b_is_int = b >= 0.0 && b.fract() == 0.0;
    if a_is_int && b_is_int {
        ln_fac(a as u64) - ln_fac(b as u64)
    } else {
        super::ln_gamma(a + 1.0) - super::ln_gamma(b + 1.0)
    }
}

/// Number of standard deviations from the mean beyond which a standard
/// normal tail falls below `accuracy`. Used to size truncated tables.
pub fn num_sd(accuracy: f64) -> f64 {
    let acc = accuracy.clamp(1e-15, 1.0 - 1e-15);
    super::standard_normal_inv_cdf(1.0 - acc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ln_fac_small_matches_direct() {
        // 10! = 3628800
        assert!((ln_fac(10).exp() - 3_628_800.0).abs() < 1e-6);
    }

    #[test]
    fn ln_fac_large_uses_stirling_and_stays_accurate() {
        // Compare ln(2000!) against the recurrence ln(2000!) = ln(1999!) + ln(2000)
        // by checking the ratio ln_fac(2000) - ln_fac(1999) == ln(2000).
        let diff = ln_fac(2000) - ln_fac(1999);
        assert!((diff - 2000f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn falling_factorial_integer_matches_ratio() {
        // FallingFactorial(5, 2) = ln(5!/3!) = ln(20)
        let v = falling_factorial(5.0, 2.0);
        assert!((v - 20f64.ln()).abs() < 1e-10);
    }

    #[test]
    fn num_sd_monotone_in_accuracy() {
        // Tighter accuracy (smaller number) needs more standard deviations.
        assert!(num_sd(0.01) > num_sd(0.1));
    }
}
