//! Univariate and multivariate noncentral hypergeometric distributions:
//! Fisher's and Wallenius' variants, plus their samplers and mean/odds
//! inverse estimators.
//!
//! Both variants model sampling *without replacement* from an urn whose
//! colors carry unequal selection weights ("odds"). Fisher's variant
//! treats each ball's inclusion as an independent weighted Bernoulli
//! trial conditioned on the total drawn; Wallenius' draws balls one at
//! a time so that order — and hence the residual urn composition at
//! each step — matters, yielding a different distribution for the same
//! parameters.
//!
//! ```
//! use nchypergeom::dist::Fishers;
//!
//! // 20 balls drawn from an urn of 25 color-1 and 32 color-2 balls,
//! // color 1 weighted 2.5x.
//! let mut f = Fishers::new(20, 25, 32, 2.5, 1e-10).unwrap();
//! let p = f.probability(12);
//! assert!((p - 0.22197).abs() < 1e-3);
//! assert_eq!(f.xmin(), 0);
//! assert_eq!(f.xmax(), 20);
//! ```

pub mod dist;
pub mod error;
pub mod num;
pub mod rng;

pub use dist::{
    Fishers, MultivariateDistribution, MultivariateFishers, MultivariateUrn,
    MultivariateWallenius, UnivariateDistribution, UnivariateUrn, Wallenius, MAX_COLORS,
};
pub use error::{Error, Result};
