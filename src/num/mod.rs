//! Shared numerical helpers: normal-distribution building blocks, the
//! process-wide log-factorial cache, and Gauss-Legendre quadrature.
//!
//! These are the L0 leaves of the dependency graph: everything else in
//! the crate (the Fisher and Wallenius engines) is built on top of the
//! functions in this module and never the other way around.

pub mod logfact;
pub mod quadrature;

pub use logfact::{falling_factorial, ln_fac, num_sd};

pub const SQRT_2: f64 = std::f64::consts::SQRT_2;
pub const INV_SQRT_2: f64 = std::f64::consts::FRAC_1_SQRT_2;
pub const SQRT_2PI: f64 = 2.506_628_274_631_000_2_f64; // sqrt(2*pi) using double precision
pub const INV_SQRT_2PI: f64 = 1.0 / SQRT_2PI; // 1 / sqrt(2*pi)

/// Guard threshold below which `exp(x)` is treated as exactly zero. Makes
/// the "numerical underflow clamped silently" error kind auditable in one
/// place rather than relying on implicit IEEE-754 underflow-to-zero.
const EXP_UNDERFLOW_GUARD: f64 = -745.0;

/// `exp(x)`, clamped to `0.0` when `x` is low enough that the true result
/// would underflow anyway.
#[inline]
pub fn safe_exp(x: f64) -> f64 {
    if x < EXP_UNDERFLOW_GUARD { 0.0 } else { x.exp() }
}

/// Standard normal PDF.
#[inline]
pub fn standard_normal_pdf(z: f64) -> f64 {
    (-0.5 * z * z).exp() * INV_SQRT_2PI
}

/// Fast approximation of erf(x) (Abramowitz & Stegun 7.1.26).
pub fn erf(x: f64) -> f64 {
    // Preserve sign.
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + 0.3275911 * x);
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();
    sign * y
}

/// Standard normal CDF via erf.
pub fn standard_normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z * INV_SQRT_2))
}

/// Standard normal inverse CDF (probit) using Peter J. Acklam's rational approximation.
/// Typical absolute error < 4.5e-4 in double precision.
#[allow(clippy::excessive_precision)]
pub fn standard_normal_inv_cdf(p: f64) -> f64 {
    assert!(p > 0.0 && p < 1.0, "p must be in (0,1)");

    // Coefficients (Acklam 2003). See public documentation.
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;
    const P_HIGH: f64 = 1.0 - P_LOW;
    if p < P_LOW {
        // Lower tail region
        let q = (-2.0 * p.ln()).sqrt();
        let x = (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0);
        return -x;
    }
    if p > P_HIGH {
        // Upper tail region
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        let x = (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0);
        return x;
    }
    // Central region
    let q = p - 0.5;
    let r = q * q;
    (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
        / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
}

/// Lanczos approximation for ln Gamma (g=7, n=9). Used by
/// `falling_factorial` for non-integer arguments.
pub fn ln_gamma(z: f64) -> f64 {
    const COF: [f64; 9] = [
        0.99999999999980993,
        676.5203681218851,
        -1259.1392167224028,
        771.32342877765313,
        -176.61502916214059,
        12.507343278686905,
        -0.13857109526572012,
        9.9843695780195716e-6,
        1.5056327351493116e-7,
    ];
    if z < 0.5 {
        return std::f64::consts::PI.ln()
            - (std::f64::consts::PI * z).sin().ln()
            - ln_gamma(1.0 - z);
    }
    let z = z - 1.0;
    let mut x = COF[0];
    for (i, &c) in COF.iter().enumerate().skip(1) {
        x += c / (z + i as f64);
    }
    let t = z + 7.5;
    0.5 * (2.0 * std::f64::consts::PI).ln() + (z + 0.5) * t.ln() - t + x.ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_cdf_symmetry() {
        assert!((standard_normal_cdf(0.0) - 0.5).abs() < 2e-6);
        let f = standard_normal_cdf(0.7);
        let f_neg = standard_normal_cdf(-0.7);
        assert!((f + f_neg - 1.0).abs() < 3e-6);
    }

    #[test]
    fn inv_cdf_roundtrip() {
        let p = 0.975;
        let q = standard_normal_inv_cdf(p);
        assert!((q - 1.959963).abs() < 5e-4);
    }

    #[test]
    fn safe_exp_clamps_underflow() {
        assert_eq!(safe_exp(-1000.0), 0.0);
        assert!((safe_exp(0.0) - 1.0).abs() < 1e-15);
    }

    #[test]
    fn ln_gamma_matches_factorial() {
        // ln(5!) = ln(120)
        assert!((ln_gamma(6.0) - 120f64.ln()).abs() < 1e-10);
    }
}
