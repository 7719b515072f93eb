//! Fisher's noncentral hypergeometric distribution: independent
//! weighted Bernoulli draws per ball, conditioned on a fixed total `n`.
//! Order of the draws does not matter, unlike Wallenius'.

pub mod multivariate;
pub mod univariate;
