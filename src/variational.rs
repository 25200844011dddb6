//! Sparse variational approximation of the latent GP posterior.
//!
//! The latent GP `f` is summarized by its values `u = f(Z)` at `M` inducing points `Z`.
//! The posterior over `u` is approximated by a gaussian `q(u) = N(m, S)` with `S = L L^T`,
//! the latent marginals at any `x` are then obtained by conditioning the GP prior on `u`
//! and integrating `u` out against `q`.
//!
//! # Reference
//!
//! James Hensman, Alexander Matthews, Zoubin Ghahramani.
//! [Scalable Variational Gaussian Process Classification](https://arxiv.org/abs/1411.2005).
//! In: Proceedings of AISTATS 2015.

use crate::correlation_models::CorrelationModel;
use crate::errors::{GpcError, Result};
use crate::mean_models::RegressionModel;
use crate::utils::{pairwise_differences, tril_len, tril_to_vec, vec_to_tril};
use linfa::Float;
use linfa_linalg::{cholesky::*, triangular::*};
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix2};
use std::fmt;

/// Variational distribution family of q(u)
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum VariationalDistribution {
    /// Full covariance parameterized by its lower triangular Cholesky factor
    #[default]
    Cholesky,
    /// Diagonal covariance parameterized by log standard deviations
    MeanField,
}

/// Variational strategy: how q relates to the inducing values
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum VariationalStrategy {
    /// q(u) is a distribution over the inducing values, prior N(mu(Z), Kzz)
    #[default]
    Unwhitened,
    /// u = mu(Z) + Lzz v and q(v) is compared against the N(0, I) prior
    Whitened,
}

impl fmt::Display for VariationalDistribution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VariationalDistribution::Cholesky => write!(f, "Cholesky"),
            VariationalDistribution::MeanField => write!(f, "MeanField"),
        }
    }
}

impl fmt::Display for VariationalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VariationalStrategy::Unwhitened => write!(f, "Unwhitened"),
            VariationalStrategy::Whitened => write!(f, "Whitened"),
        }
    }
}

/// Inducing points specification
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum Inducings<F: Float> {
    /// Inducing points are the training inputs
    #[default]
    Training,
    /// `usize` points are selected randomly in the training dataset
    Randomized(usize),
    /// Points are given as a (npoints, nx) matrix
    Located(Array2<F>),
}

/// Current values of all the model parameters
#[derive(Clone, Debug, PartialEq)]
pub struct ModelState<F: Float> {
    /// Kernel inverse length-scales
    pub theta: Array1<F>,
    /// Kernel variance
    pub sigma2: F,
    /// Mean model coefficients
    pub beta: Array1<F>,
    /// Inducing points (M, nx)
    pub inducings: Array2<F>,
    /// Mean of q
    pub q_mean: Array1<F>,
    /// Lower triangular factor of the covariance of q
    pub q_chol: Array2<F>,
}

/// Mapping between a [`ModelState`] and the flat vector of unconstrained values
/// handled by the optimizer:
/// `[log(theta), log(sigma2), beta, q_mean, q_cov, [inducings]]`
/// where `q_cov` is the row-major packed lower triangular factor (Cholesky)
/// or the log standard deviations (mean field), and inducing points
/// are only present when they are learned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ParamLayout {
    pub n_theta: usize,
    pub n_beta: usize,
    pub n_inducings: usize,
    pub nx: usize,
    pub distribution: VariationalDistribution,
    pub learn_inducings: bool,
}

impl ParamLayout {
    fn n_cov(&self) -> usize {
        match self.distribution {
            VariationalDistribution::Cholesky => tril_len(self.n_inducings),
            VariationalDistribution::MeanField => self.n_inducings,
        }
    }

    /// Size of the flat parameter vector
    pub fn len(&self) -> usize {
        let n_z = if self.learn_inducings {
            self.n_inducings * self.nx
        } else {
            0
        };
        self.n_theta + 1 + self.n_beta + self.n_inducings + self.n_cov() + n_z
    }

    pub fn pack<F: Float>(&self, state: &ModelState<F>) -> Array1<F> {
        let mut p = Vec::with_capacity(self.len());
        p.extend(state.theta.iter().map(|v| v.ln()));
        p.push(state.sigma2.ln());
        p.extend(state.beta.iter());
        p.extend(state.q_mean.iter());
        match self.distribution {
            VariationalDistribution::Cholesky => p.extend(tril_to_vec(&state.q_chol)),
            VariationalDistribution::MeanField => {
                p.extend(state.q_chol.diag().iter().map(|v| v.abs().ln()))
            }
        }
        if self.learn_inducings {
            p.extend(state.inducings.iter());
        }
        Array1::from_vec(p)
    }

    /// Rebuild a state from flat values, `inducings` is used when inducing points are not learned
    pub fn unpack<F: Float>(&self, p: &[F], inducings: &Array2<F>) -> Result<ModelState<F>> {
        if p.len() != self.len() {
            return Err(GpcError::InvalidValueError(format!(
                "Parameter vector length ({}) should be {}",
                p.len(),
                self.len()
            )));
        }
        let m = self.n_inducings;
        let mut rest = p;
        let mut take = |n: usize| split_head(&mut rest, n);
        let theta = Array1::from_iter(take(self.n_theta).iter().map(|v| v.exp()));
        let sigma2 = take(1)[0].exp();
        let beta = Array1::from_iter(take(self.n_beta).iter().cloned());
        let q_mean = Array1::from_iter(take(m).iter().cloned());
        let q_chol = match self.distribution {
            VariationalDistribution::Cholesky => vec_to_tril(take(tril_len(m)), m),
            VariationalDistribution::MeanField => {
                Array2::from_diag(&Array1::from_iter(take(m).iter().map(|v| v.exp())))
            }
        };
        let inducings = if self.learn_inducings {
            Array2::from_shape_vec((m, self.nx), take(m * self.nx).to_vec())
                .map_err(|e| GpcError::NumericalError(e.to_string()))?
        } else {
            inducings.to_owned()
        };
        Ok(ModelState {
            theta,
            sigma2,
            beta,
            inducings,
            q_mean,
            q_chol,
        })
    }
}

fn split_head<'a, F>(rest: &mut &'a [F], n: usize) -> &'a [F] {
    let (head, tail) = rest.split_at(n);
    *rest = tail;
    head
}

/// Latent GP posterior approximation for a given [`ModelState`]
#[derive(Clone, Debug)]
pub struct VariationalPosterior<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> {
    mean: Mean,
    corr: Corr,
    strategy: VariationalStrategy,
    state: ModelState<F>,
    /// Cholesky factor of Kzz
    lzz: Array2<F>,
    jitter: F,
}

impl<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>>
    VariationalPosterior<F, Mean, Corr>
{
    /// Constructor, factorizes the inducing points covariance matrix
    pub fn new(
        mean: Mean,
        corr: Corr,
        strategy: VariationalStrategy,
        state: ModelState<F>,
        jitter: F,
    ) -> Result<Self> {
        let kzz = prior_covariance(&corr, &state, &state.inducings, jitter)?;
        let lzz = kzz.cholesky()?;
        Ok(VariationalPosterior {
            mean,
            corr,
            strategy,
            state,
            lzz,
            jitter,
        })
    }

    /// Model state
    pub fn state(&self) -> &ModelState<F> {
        &self.state
    }

    /// Variational strategy
    pub fn strategy(&self) -> VariationalStrategy {
        self.strategy
    }

    /// Jitter added to the inducing points covariance diagonal
    pub fn jitter(&self) -> F {
        self.jitter
    }

    /// Kernel covariance matrix between a and b
    fn compute_k(
        &self,
        a: &ArrayBase<impl Data<Elem = F>, Ix2>,
        b: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Array2<F>> {
        cross_covariance(&self.corr, &self.state, a, b)
    }

    fn prior_mean(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F> {
        self.mean.value(x).dot(&self.state.beta)
    }

    /// Latent marginals q(f(x)) = N(mean, var) at n given `x` points specified as a (n, nx) matrix.
    /// Returns (mean, var) as two (n,) vectors.
    pub fn marginals(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(Array1<F>, Array1<F>)> {
        let z = &self.state.inducings;
        if x.ncols() != z.ncols() {
            return Err(GpcError::InvalidValueError(format!(
                "Input dimension {} does not match inducing points dimension {}",
                x.ncols(),
                z.ncols()
            )));
        }
        let kzx = self.compute_k(z, x)?;
        let kxx = self
            .corr
            .value(&Array2::<F>::zeros((x.nrows(), x.ncols())), &self.state.theta)
            .remove_axis(Axis(1))
            .mapv(|v| v * self.state.sigma2);
        let mu_x = self.prior_mean(x);

        // A = Lzz^-1 Kzx
        let a = self.lzz.solve_triangular(&kzx, UPLO::Lower)?;
        let (mean, proj) = match self.strategy {
            VariationalStrategy::Whitened => {
                let mean = mu_x + a.t().dot(&self.state.q_mean);
                (mean, a.to_owned())
            }
            VariationalStrategy::Unwhitened => {
                let mu_z = self.prior_mean(z);
                let dm = (&self.state.q_mean - &mu_z).insert_axis(Axis(1));
                let w = self.lzz.solve_triangular(&dm, UPLO::Lower)?;
                // alpha = Kzz^-1 (m - mu_z)
                let alpha = self.lzz.t().solve_triangular(&w, UPLO::Upper)?;
                let mean = mu_x + kzx.t().dot(&alpha).remove_axis(Axis(1));
                // B = Kzz^-1 Kzx
                let b = self.lzz.t().solve_triangular(&a, UPLO::Upper)?;
                (mean, b)
            }
        };
        // var = Kxx - Kxz Kzz^-1 Kzx + P^T S P
        let ls_proj = self.state.q_chol.t().dot(&proj);
        let var = kxx - (&a * &a).sum_axis(Axis(0)) + (&ls_proj * &ls_proj).sum_axis(Axis(0));
        let var = var.mapv(|v| v.max(F::cast(1e-12)));
        Ok((mean, var))
    }

    /// KL(q || p) divergence between the variational distribution and the prior
    pub fn kl_divergence(&self) -> Result<F> {
        let m = self.state.q_mean.len();
        let ls = &self.state.q_chol;
        let logdet_s = F::cast(2.) * ls.diag().mapv(|v| v.abs().ln()).sum();
        let kl = match self.strategy {
            VariationalStrategy::Whitened => {
                let trace = ls.mapv(|v| v * v).sum();
                let maha = self.state.q_mean.dot(&self.state.q_mean);
                trace + maha - F::cast(m) - logdet_s
            }
            VariationalStrategy::Unwhitened => {
                let z = &self.state.inducings;
                let dm = (&self.state.q_mean - &self.prior_mean(z)).insert_axis(Axis(1));
                let w = self.lzz.solve_triangular(&dm, UPLO::Lower)?;
                let maha = w.mapv(|v| v * v).sum();
                // tr(Kzz^-1 S) = ||Lzz^-1 Ls||_F^2
                let c = self.lzz.solve_triangular(ls, UPLO::Lower)?;
                let trace = c.mapv(|v| v * v).sum();
                let logdet_k = F::cast(2.) * self.lzz.diag().mapv(|v| v.ln()).sum();
                trace + maha - F::cast(m) + logdet_k - logdet_s
            }
        };
        Ok(F::cast(0.5) * kl)
    }

    /// Mean of the variational distribution over the inducing values u
    pub fn inducing_mean(&self) -> Array1<F> {
        match self.strategy {
            VariationalStrategy::Unwhitened => self.state.q_mean.to_owned(),
            VariationalStrategy::Whitened => {
                self.prior_mean(&self.state.inducings) + self.lzz.dot(&self.state.q_mean)
            }
        }
    }

    /// Covariance of the variational distribution over the inducing values u
    pub fn inducing_covariance(&self) -> Array2<F> {
        let ls = match self.strategy {
            VariationalStrategy::Unwhitened => self.state.q_chol.to_owned(),
            VariationalStrategy::Whitened => self.lzz.dot(&self.state.q_chol),
        };
        ls.dot(&ls.t())
    }
}

/// Kernel covariance matrix between a and b given state hyperparameters
pub(crate) fn cross_covariance<F: Float, Corr: CorrelationModel<F>>(
    corr: &Corr,
    state: &ModelState<F>,
    a: &ArrayBase<impl Data<Elem = F>, Ix2>,
    b: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<Array2<F>> {
    // Get pairwise componentwise differences between both point sets
    let dx = pairwise_differences(a, b);
    let r = corr.value(&dx, &state.theta);
    Ok(r.into_shape_with_order((a.nrows(), b.nrows()))
        .map_err(|e| GpcError::NumericalError(e.to_string()))?
        .mapv(|v| v * state.sigma2))
}

/// Kernel covariance matrix of the inducing points with jitter added on the diagonal
pub(crate) fn prior_covariance<F: Float, Corr: CorrelationModel<F>>(
    corr: &Corr,
    state: &ModelState<F>,
    z: &ArrayBase<impl Data<Elem = F>, Ix2>,
    jitter: F,
) -> Result<Array2<F>> {
    let mut kzz = cross_covariance(corr, state, z, z)?;
    kzz.diag_mut().mapv_inplace(|v| v + jitter);
    Ok(kzz)
}

/// Selects `n_inducings` distinct rows of `xt` at random
pub(crate) fn make_inducings<F: Float, R: ndarray_rand::rand::Rng>(
    n_inducings: usize,
    xt: &ArrayBase<impl Data<Elem = F>, Ix2>,
    rng: &mut R,
) -> Array2<F> {
    use ndarray_rand::rand::seq::SliceRandom;
    let mut indices = (0..xt.nrows()).collect::<Vec<_>>();
    indices.shuffle(rng);
    let n = n_inducings.min(xt.nrows());
    xt.select(Axis(0), &indices[..n])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation_models::SquaredExponentialCorr;
    use crate::mean_models::ConstantMean;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array, array};
    use ndarray_rand::rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    fn state_at_prior(
        strategy: VariationalStrategy,
        z: &Array2<f64>,
        beta: f64,
        jitter: f64,
    ) -> ModelState<f64> {
        let mut state = ModelState {
            theta: array![3.],
            sigma2: 1.5,
            beta: array![beta],
            inducings: z.to_owned(),
            q_mean: Array1::zeros(z.nrows()),
            q_chol: Array2::eye(z.nrows()),
        };
        if strategy == VariationalStrategy::Unwhitened {
            let kzz = prior_covariance(&SquaredExponentialCorr(), &state, z, jitter).unwrap();
            state.q_chol = kzz.cholesky().unwrap();
            state.q_mean = Array1::from_elem(z.nrows(), beta);
        }
        state
    }

    #[test]
    fn test_kl_zero_at_prior() {
        let z = Array::linspace(0., 1., 6).insert_axis(Axis(1));
        for strategy in [VariationalStrategy::Unwhitened, VariationalStrategy::Whitened] {
            let state = state_at_prior(strategy, &z, 0.4, 1e-6);
            let post = VariationalPosterior::new(
                ConstantMean(),
                SquaredExponentialCorr(),
                strategy,
                state,
                1e-6,
            )
            .unwrap();
            assert_abs_diff_eq!(post.kl_divergence().unwrap(), 0., epsilon = 1e-8);
        }
    }

    #[test]
    fn test_marginals_at_prior_recover_prior() {
        let z = Array::linspace(0., 1., 5).insert_axis(Axis(1));
        let x = array![[0.1], [0.33], [0.9], [2.]];
        for strategy in [VariationalStrategy::Unwhitened, VariationalStrategy::Whitened] {
            let state = state_at_prior(strategy, &z, -0.2, 1e-8);
            let post = VariationalPosterior::new(
                ConstantMean(),
                SquaredExponentialCorr(),
                strategy,
                state,
                1e-8,
            )
            .unwrap();
            let (mean, var) = post.marginals(&x).unwrap();
            assert_abs_diff_eq!(mean, Array1::from_elem(4, -0.2), epsilon = 1e-6);
            assert_abs_diff_eq!(var, Array1::from_elem(4, 1.5), epsilon = 1e-5);
        }
    }

    #[test]
    fn test_marginals_interpolate_at_inducings() {
        // with unwhitened strategy the latent marginals at inducing points are q itself
        let z = array![[0.], [0.5], [1.]];
        let state = ModelState {
            theta: array![4.],
            sigma2: 2.,
            beta: array![0.],
            inducings: z.clone(),
            q_mean: array![1., -1., 0.5],
            q_chol: array![[0.3, 0., 0.], [0.1, 0.2, 0.], [0., 0.05, 0.4]],
        };
        let post = VariationalPosterior::new(
            ConstantMean(),
            SquaredExponentialCorr(),
            VariationalStrategy::Unwhitened,
            state.clone(),
            1e-10,
        )
        .unwrap();
        let (mean, var) = post.marginals(&z).unwrap();
        assert_abs_diff_eq!(mean, state.q_mean, epsilon = 1e-6);
        let s = state.q_chol.dot(&state.q_chol.t());
        assert_abs_diff_eq!(var, s.diag().to_owned(), epsilon = 1e-6);
        assert_abs_diff_eq!(post.inducing_covariance(), s, epsilon = 1e-12);
    }

    #[test]
    fn test_whitened_inducing_moments() {
        let z = array![[0.], [0.4]];
        let state = ModelState {
            theta: array![2.],
            sigma2: 1.,
            beta: array![0.5],
            inducings: z,
            q_mean: array![0.2, -0.3],
            q_chol: array![[0.5, 0.], [0.1, 0.7]],
        };
        let post = VariationalPosterior::new(
            ConstantMean(),
            SquaredExponentialCorr(),
            VariationalStrategy::Whitened,
            state,
            1e-10,
        )
        .unwrap();
        let (mean, var) = post.marginals(&array![[0.], [0.4]]).unwrap();
        assert_abs_diff_eq!(mean, post.inducing_mean(), epsilon = 1e-6);
        assert_abs_diff_eq!(var, post.inducing_covariance().diag().to_owned(), epsilon = 1e-6);
    }

    #[test]
    fn test_layout_roundtrip() {
        let state = ModelState {
            theta: array![2., 0.5],
            sigma2: 1.3,
            beta: array![0.1, 0.2, 0.3],
            inducings: array![[0., 1.], [2., 3.]],
            q_mean: array![0.2, -0.3],
            q_chol: array![[0.5, 0.], [0.1, 0.7]],
        };
        let layout = ParamLayout {
            n_theta: 2,
            n_beta: 3,
            n_inducings: 2,
            nx: 2,
            distribution: VariationalDistribution::Cholesky,
            learn_inducings: true,
        };
        let p = layout.pack(&state);
        assert_eq!(layout.len(), p.len());
        assert_eq!(2 + 1 + 3 + 2 + 3 + 4, p.len());
        let back = layout
            .unpack(p.as_slice().unwrap(), &Array2::zeros((2, 2)))
            .unwrap();
        assert_abs_diff_eq!(back.theta, state.theta, epsilon = 1e-12);
        assert_abs_diff_eq!(back.sigma2, state.sigma2, epsilon = 1e-12);
        assert_eq!(back.inducings, state.inducings);
        assert_eq!(back.q_chol, state.q_chol);

        let layout = ParamLayout {
            distribution: VariationalDistribution::MeanField,
            learn_inducings: false,
            ..layout
        };
        let p = layout.pack(&state);
        assert_eq!(2 + 1 + 3 + 2 + 2, p.len());
        let back = layout
            .unpack(p.as_slice().unwrap(), &state.inducings)
            .unwrap();
        assert_abs_diff_eq!(back.q_chol, array![[0.5, 0.], [0., 0.7]], epsilon = 1e-12);

        let res = layout.unpack(&p.as_slice().unwrap()[1..], &state.inducings);
        assert!(matches!(res, Err(GpcError::InvalidValueError(_))));
    }

    #[test]
    fn test_make_inducings() {
        let xt: Array2<f64> = Array::linspace(0., 9., 10).insert_axis(Axis(1));
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let z = make_inducings(4, &xt, &mut rng);
        assert_eq!((4, 1), z.dim());
        let mut vals: Vec<f64> = z.column(0).to_vec();
        vals.sort_by(|a, b| a.total_cmp(b));
        vals.dedup();
        assert_eq!(4, vals.len());
        let z = make_inducings(20, &xt, &mut rng);
        assert_eq!((10, 1), z.dim());
    }
}
