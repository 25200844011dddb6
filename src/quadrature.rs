//! Gauss-Hermite quadrature used to compute expectations under gaussian marginals.
//!
//! Nodes and weights are obtained with the Golub-Welsch method: nodes are the
//! eigenvalues of the symmetric tridiagonal Jacobi matrix of the (physicists')
//! Hermite polynomials, weights are given by the squared first components of
//! the normalized eigenvectors.

use crate::errors::{GpcError, Result};
use crate::optimization::into_f64;
use linfa::Float;
use linfa_linalg::eigh::*;
use ndarray::{Array1, Array2};

/// Default number of quadrature nodes
pub const GPC_DEFAULT_N_QUADRATURE: usize = 20;

/// A Gauss-Hermite quadrature rule normalized to compute `E[f(X)]`
/// where `X ~ N(mean, var)`
#[derive(Clone, Debug, PartialEq)]
pub struct GaussHermite {
    /// Sorted nodes t_k of the rule with weight exp(-t^2)
    nodes: Array1<f64>,
    /// Weights divided by sqrt(pi), summing to one
    weights: Array1<f64>,
}

impl GaussHermite {
    /// Build a rule with `n` nodes
    pub fn new(n: usize) -> Result<Self> {
        if n == 0 {
            return Err(GpcError::InvalidValueError(
                "Gauss-Hermite quadrature requires at least one node".to_string(),
            ));
        }
        let mut jacobi = Array2::<f64>::zeros((n, n));
        for k in 1..n {
            let b = (k as f64 / 2.).sqrt();
            jacobi[[k, k - 1]] = b;
            jacobi[[k - 1, k]] = b;
        }
        let (vals, vecs) = jacobi.eigh_into()?;

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&i, &j| vals[i].total_cmp(&vals[j]));
        let nodes = order.iter().map(|&i| vals[i]).collect::<Array1<_>>();
        let weights = order
            .iter()
            .map(|&i| vecs[[0, i]] * vecs[[0, i]])
            .collect::<Array1<_>>();
        // eigenvectors are normalized, still renormalize against rounding
        let total = weights.sum();
        Ok(GaussHermite {
            nodes,
            weights: weights / total,
        })
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the rule has no node (never the case for a built rule)
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes of the rule wrt the exp(-t^2) weight function
    pub fn nodes(&self) -> &Array1<f64> {
        &self.nodes
    }

    /// Normalized weights (summing to one)
    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    /// Approximate `E[f(X)]` with `X ~ N(mean, var)`
    pub fn integrate<F: Float>(&self, f: impl Fn(f64) -> f64, mean: F, var: F) -> f64 {
        let mean = into_f64(mean);
        let scale = (2. * into_f64(var).max(0.)).sqrt();
        self.nodes
            .iter()
            .zip(self.weights.iter())
            .map(|(t, w)| w * f(mean + scale * t))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_gauss_hermite_three_nodes() {
        let gh = GaussHermite::new(3).unwrap();
        let s = (1.5f64).sqrt();
        assert_abs_diff_eq!(gh.nodes()[0], -s, epsilon = 1e-10);
        assert_abs_diff_eq!(gh.nodes()[1], 0., epsilon = 1e-10);
        assert_abs_diff_eq!(gh.nodes()[2], s, epsilon = 1e-10);
        assert_abs_diff_eq!(gh.weights()[0], 1. / 6., epsilon = 1e-10);
        assert_abs_diff_eq!(gh.weights()[1], 2. / 3., epsilon = 1e-10);
    }

    #[test]
    fn test_gauss_hermite_moments() {
        let gh = GaussHermite::new(GPC_DEFAULT_N_QUADRATURE).unwrap();
        assert_eq!(gh.len(), GPC_DEFAULT_N_QUADRATURE);
        assert_abs_diff_eq!(gh.weights().sum(), 1., epsilon = 1e-12);
        let (mean, var) = (0.7, 2.5);
        assert_abs_diff_eq!(gh.integrate(|_| 1., mean, var), 1., epsilon = 1e-10);
        assert_abs_diff_eq!(gh.integrate(|x| x, mean, var), mean, epsilon = 1e-10);
        assert_abs_diff_eq!(
            gh.integrate(|x| (x - mean) * (x - mean), mean, var),
            var,
            epsilon = 1e-8
        );
        // E[(X-m)^4] = 3 var^2
        assert_abs_diff_eq!(
            gh.integrate(|x| (x - mean).powi(4), mean, var),
            3. * var * var,
            epsilon = 1e-7
        );
    }

    #[test]
    fn test_gauss_hermite_symmetric_nodes() {
        let gh = GaussHermite::new(8).unwrap();
        for k in 0..4 {
            assert_abs_diff_eq!(gh.nodes()[k], -gh.nodes()[7 - k], epsilon = 1e-10);
            assert_abs_diff_eq!(gh.weights()[k], gh.weights()[7 - k], epsilon = 1e-10);
        }
    }

    #[test]
    fn test_gauss_hermite_zero_nodes() {
        assert!(GaussHermite::new(0).is_err());
    }
}
