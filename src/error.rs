//! Single error surface for the crate.
//!
//! The upstream design reports every fatal condition through one
//! `FatalError(text)` sink; here that collapses to a typed `Result`
//! instead, with one variant per error kind distinguished in the
//! component design. Soft failures (PMF queried outside the support)
//! are not represented here — they return `0.0` directly.

use std::fmt;

/// Errors raised at construction time or during an iterative solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A parameter was out of its documented range (negative counts,
    /// `n > N`, `odds < 0`, `accuracy` outside `(0, 1]`, too many colors).
    ParameterRange(&'static str),
    /// The urn cannot supply `n` balls from colors with positive odds,
    /// or a requested multi-index is outside the feasible lattice.
    Infeasible(&'static str),
    /// An iterative mean/odds solver exceeded its iteration cap without
    /// reaching the convergence tolerance.
    Convergence(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ParameterRange(msg) => write!(f, "parameter out of range: {msg}"),
            Error::Infeasible(msg) => write!(f, "infeasible urn configuration: {msg}"),
            Error::Convergence(msg) => write!(f, "solver did not converge: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
