//! A module for the likelihood mapping a latent GP value to a class membership probability.
//!
//! Labels are signs: `+1` for the positive class, `-1` for the negative one.

use crate::quadrature::GaussHermite;
use crate::utils::{log_normal_cdf, log_sigmoid, normal_cdf, sigmoid};
use std::fmt;

/// Link function of the bernoulli likelihood
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Link {
    /// Standard normal cdf: p(y | f) = Phi(y f)
    #[default]
    Probit,
    /// Logistic function: p(y | f) = sigmoid(y f)
    Logit,
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Link::Probit => write!(f, "Probit"),
            Link::Logit => write!(f, "Logit"),
        }
    }
}

/// Bernoulli likelihood p(y | f) for binary classification
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct BernoulliLikelihood {
    link: Link,
}

impl BernoulliLikelihood {
    /// Constructor given the link function
    pub fn new(link: Link) -> Self {
        BernoulliLikelihood { link }
    }

    /// Get the link function
    pub fn link(&self) -> Link {
        self.link
    }

    /// Probability of the positive class given the latent value `f`
    pub fn prob(&self, f: f64) -> f64 {
        match self.link {
            Link::Probit => normal_cdf(f),
            Link::Logit => sigmoid(f),
        }
    }

    /// log p(y | f) where y is a sign label
    pub fn log_prob(&self, y: f64, f: f64) -> f64 {
        match self.link {
            Link::Probit => log_normal_cdf(y * f),
            Link::Logit => log_sigmoid(y * f),
        }
    }

    /// E[log p(y | f)] where f ~ N(mean, var)
    pub fn expected_log_prob(&self, y: f64, mean: f64, var: f64, quad: &GaussHermite) -> f64 {
        quad.integrate(|f| self.log_prob(y, f), mean, var)
    }

    /// Probability of the positive class p(y = +1) = E[p(+1 | f)] where f ~ N(mean, var)
    pub fn predictive_prob(&self, mean: f64, var: f64, quad: &GaussHermite) -> f64 {
        match self.link {
            Link::Probit => normal_cdf(mean / (1. + var.max(0.)).sqrt()),
            Link::Logit => quad.integrate(sigmoid, mean, var),
        }
    }
}

impl fmt::Display for BernoulliLikelihood {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Bernoulli({})", self.link)
    }
}
