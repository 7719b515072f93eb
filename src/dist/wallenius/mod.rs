//! Wallenius' noncentral hypergeometric distribution: balls are drawn
//! one at a time, each draw's color chosen with probability
//! proportional to the residual count of that color times its odds.
//! Order matters, so (unlike Fisher's variant) the PMF has no closed
//! form; it is expressed as an integral over a "removal time" `t` and
//! evaluated by one of three strategies selected by support size (see
//! `univariate::EvalStrategy`).

pub mod multivariate;
pub mod univariate;
