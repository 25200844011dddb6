use crate::correlation_models::{CorrelationModel, SquaredExponentialCorr};
use crate::errors::{GpcError, Result};
use crate::likelihoods::BernoulliLikelihood;
use crate::mean_models::{ConstantMean, RegressionModel};
use crate::optimization::{Adam, gradient, into_f64};
use crate::parameters::{GpcParams, GpcValidParams};
use crate::quadrature::GaussHermite;
use crate::variational::{
    Inducings, ModelState, ParamLayout, VariationalDistribution, VariationalPosterior,
    VariationalStrategy, make_inducings, prior_covariance,
};
use linfa::prelude::{DatasetBase, Fit, Float, PredictInplace};
use linfa_linalg::cholesky::*;
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, ArrayView2, Data, Ix1, Ix2, Zip};
use ndarray_rand::RandomExt;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::StandardNormal;
use rand_xoshiro::Xoshiro256Plus;

use log::{debug, info};
use std::fmt;
use std::time::Instant;

/// Standard deviation of the gaussian noise added to the initial variational mean
const GPC_INIT_MEAN_NOISE: f64 = 1e-3;

/// Variational Gaussian Process classifier
///
/// A latent GP `f ~ GP(mu(x), sigma2 * r(x, x'))` is squashed through a Bernoulli
/// likelihood `p(y | f)` to model binary labels `y` in {-1, +1}.
/// As the posterior `p(f | y)` is intractable, it is approximated through
/// a gaussian distribution `q(u)` over the latent values `u` at inducing points
/// (see [`crate::VariationalStrategy`], [`crate::VariationalDistribution`]).
///
/// Kernel hyperparameters, mean coefficients and variational parameters
/// (and optionally inducing points) are trained jointly by minimizing the negative
/// evidence lower bound (ELBO) per data point
///
/// ```text
/// loss = - ( sum_i E_q[log p(y_i | f_i)] - KL(q(u) || p(u)) ) / n
/// ```
///
/// using a fixed number of Adam iterations, expectations being computed
/// with Gauss-Hermite quadrature.
///
/// # Example
///
/// ```no_run
/// use egobox_gpc::{GpClassifier, periodic_sign_data};
/// use linfa::prelude::*;
/// use ndarray::{Array, Axis};
///
/// // 10 points in [0, 1] labelled by the sign of cos(4 pi x)
/// let (xt, yt) = periodic_sign_data(10, 0., 1., 4.);
///
/// let gpc = GpClassifier::<f64>::params()
///     .n_iter(50)
///     .learning_rate(0.1)
///     .seed(Some(42))
///     .fit(&Dataset::new(xt, yt))
///     .expect("GP classifier fitted");
///
/// let x = Array::linspace(0., 1., 101).insert_axis(Axis(1));
/// let proba = gpc.predict_proba(&x).expect("P(y = +1 | x)");
/// let labels = gpc.predict(&x).expect("labels");
/// ```
///
/// # Reference
///
/// James Hensman, Alexander Matthews, Zoubin Ghahramani.
/// [Scalable Variational Gaussian Process Classification](https://arxiv.org/abs/1411.2005).
/// In: Proceedings of AISTATS 2015.
#[derive(Debug, Clone)]
pub struct VariationalGpClassifier<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> {
    /// Trained latent posterior approximation
    posterior: VariationalPosterior<F, Mean, Corr>,
    /// Likelihood used for training and prediction
    likelihood: BernoulliLikelihood,
    /// Quadrature rule used for likelihood expectations
    quadrature: GaussHermite,
    /// Loss value at each training iteration
    loss_history: Vec<F>,
    /// Training data (input, labels as signs)
    pub(crate) training_data: (Array2<F>, Array1<F>),
    /// Parameters used to fit this model
    pub(crate) params: GpcValidParams<F, Mean, Corr>,
}

/// Variational GP classifier with constant mean and squared exponential kernel
pub type VariationalKrigingClassifier<F> =
    VariationalGpClassifier<F, ConstantMean, SquaredExponentialCorr>;

impl<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> fmt::Display
    for VariationalGpClassifier<F, Mean, Corr>
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "GPC(mean={}, corr={}, likelihood={}, strategy={}, distribution={}, theta={}, variance={}, inducings={})",
            self.params.mean,
            self.params.corr,
            self.likelihood,
            self.posterior.strategy(),
            self.params.distribution,
            self.theta(),
            self.variance(),
            self.inducings().nrows()
        )
    }
}

impl<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>>
    VariationalGpClassifier<F, Mean, Corr>
{
    /// Gp classifier parameters contructor
    pub fn params<NewMean: RegressionModel<F>, NewCorr: CorrelationModel<F>>(
        mean: NewMean,
        corr: NewCorr,
    ) -> GpcParams<F, NewMean, NewCorr> {
        GpcParams::new(mean, corr)
    }

    /// Predict latent GP marginals at n given `x` points of nx components specified as a (n, nx) matrix.
    /// Returns (mean, variance) as two (n,) vectors.
    pub fn predict_latent(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(Array1<F>, Array1<F>)> {
        self.posterior.marginals(x)
    }

    /// Predict probabilities P(y = +1 | x) at n given `x` points of nx components specified as a (n, nx) matrix.
    /// Returns n probabilities as a vector (n,).
    pub fn predict_proba(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>> {
        let (mean, var) = self.predict_latent(x)?;
        let mut proba = Array1::zeros(mean.len());
        Zip::from(&mut proba)
            .and(&mean)
            .and(&var)
            .for_each(|p, &m, &v| {
                *p = F::cast(self.likelihood.predictive_prob(
                    into_f64(m),
                    into_f64(v),
                    &self.quadrature,
                ))
            });
        Ok(proba)
    }

    /// Predict labels at n given `x` points of nx components specified as a (n, nx) matrix.
    /// Returns n labels in {-1, +1} as a vector (n,), +1 when P(y = +1 | x) >= 0.5.
    pub fn predict(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| {
            if p >= F::cast(0.5) {
                F::one()
            } else {
                -F::one()
            }
        }))
    }

    /// Evidence lower bound of the trained model on its training data
    pub fn elbo(&self) -> Result<F> {
        let (xt, yt) = &self.training_data;
        let (mean, var) = self.posterior.marginals(xt)?;
        let ell = expected_log_likelihood(&self.likelihood, &self.quadrature, yt, &mean, &var);
        Ok(ell - self.posterior.kl_divergence()?)
    }

    /// KL divergence between the variational distribution and the prior
    pub fn kl_divergence(&self) -> Result<F> {
        self.posterior.kl_divergence()
    }

    /// Training loss (negative ELBO per data point) at each iteration
    pub fn loss_history(&self) -> &[F] {
        &self.loss_history
    }

    /// Optimized theta hyperparameters
    pub fn theta(&self) -> &Array1<F> {
        &self.posterior.state().theta
    }

    /// Optimized kernel variance
    pub fn variance(&self) -> F {
        self.posterior.state().sigma2
    }

    /// Optimized prior mean coefficients
    pub fn mean_coefficients(&self) -> &Array1<F> {
        &self.posterior.state().beta
    }

    /// Inducing points
    pub fn inducings(&self) -> &Array2<F> {
        &self.posterior.state().inducings
    }

    /// Mean of the variational distribution over the inducing values
    pub fn variational_mean(&self) -> Array1<F> {
        self.posterior.inducing_mean()
    }

    /// Covariance of the variational distribution over the inducing values
    pub fn variational_covariance(&self) -> Array2<F> {
        self.posterior.inducing_covariance()
    }

    /// All trained parameter values
    pub fn model_state(&self) -> &ModelState<F> {
        self.posterior.state()
    }

    /// Likelihood
    pub fn likelihood(&self) -> &BernoulliLikelihood {
        &self.likelihood
    }

    /// Parameters used to fit this model
    pub fn fitted_params(&self) -> &GpcValidParams<F, Mean, Corr> {
        &self.params
    }

    /// Retrieve number of training points and input dimension
    pub fn dims(&self) -> (usize, usize) {
        (self.training_data.0.nrows(), self.training_data.0.ncols())
    }
}

impl<F, D, Mean, Corr> PredictInplace<ArrayBase<D, Ix2>, Array1<F>>
    for VariationalGpClassifier<F, Mean, Corr>
where
    F: Float,
    D: Data<Elem = F>,
    Mean: RegressionModel<F>,
    Corr: CorrelationModel<F>,
{
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array1<F>) {
        assert_eq!(
            x.nrows(),
            y.len(),
            "The number of data points must match the number of output targets."
        );

        let values = self.predict(x).expect("GP classifier prediction");
        *y = values;
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array1<F> {
        Array1::zeros((x.nrows(),))
    }
}

/// Sum over data points of E_q[log p(y_i | f_i)]
fn expected_log_likelihood<F: Float>(
    likelihood: &BernoulliLikelihood,
    quadrature: &GaussHermite,
    y: &ArrayBase<impl Data<Elem = F>, Ix1>,
    mean: &Array1<F>,
    var: &Array1<F>,
) -> F {
    let ell: f64 = Zip::from(y)
        .and(mean)
        .and(var)
        .fold(0., |acc, &yi, &m, &v| {
            acc + likelihood.expected_log_prob(into_f64(yi), into_f64(m), into_f64(v), quadrature)
        });
    F::cast(ell)
}

/// Map labels to signs: +1 stays +1, -1 or 0 become -1
fn sign_labels<F: Float>(y: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<Array1<F>> {
    y.iter()
        .map(|&v| {
            if v == F::one() {
                Ok(F::one())
            } else if v == -F::one() || v == F::zero() {
                Ok(-F::one())
            } else {
                Err(GpcError::InvalidValueError(format!(
                    "Labels should be in {{-1, 1}} or {{0, 1}}, got {v}"
                )))
            }
        })
        .collect()
}

/// Negative ELBO objective over the flat parameter vector
struct NegativeElbo<'a, F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> {
    params: &'a GpcValidParams<F, Mean, Corr>,
    layout: ParamLayout,
    x: ArrayView2<'a, F>,
    y: ArrayView1<'a, F>,
    inducings: &'a Array2<F>,
    quadrature: &'a GaussHermite,
}

impl<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> NegativeElbo<'_, F, Mean, Corr> {
    fn posterior(&self, p: &[F]) -> Result<VariationalPosterior<F, Mean, Corr>> {
        let state = self.layout.unpack(p, self.inducings)?;
        VariationalPosterior::new(
            self.params.mean,
            self.params.corr,
            self.params.strategy,
            state,
            self.params.jitter,
        )
    }

    /// Negative ELBO per data point
    fn value(&self, p: &[F]) -> Result<F> {
        let posterior = self.posterior(p)?;
        let (mean, var) = posterior.marginals(&self.x)?;
        let ell = expected_log_likelihood(
            &self.params.likelihood,
            self.quadrature,
            &self.y,
            &mean,
            &var,
        );
        let kl = posterior.kl_divergence()?;
        Ok(-(ell - kl) / F::cast(self.x.nrows()))
    }

    /// Objective in f64 for finite differences, NaN when the value cannot be computed
    fn value_f64(&self, p: &[f64]) -> f64 {
        let p = p.iter().map(|v| F::cast(*v)).collect::<Vec<_>>();
        match self.value(&p) {
            Ok(v) => into_f64(v),
            Err(_) => f64::NAN,
        }
    }
}

impl<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> GpcValidParams<F, Mean, Corr> {
    /// Initial model state: zero mean coefficients, q(u) close to the prior
    fn initial_state(
        &self,
        theta: Array1<F>,
        nx: usize,
        z: &Array2<F>,
        rng: &mut Xoshiro256Plus,
    ) -> Result<ModelState<F>> {
        let m = z.nrows();
        let mut state = ModelState {
            theta,
            sigma2: self.sigma2_init,
            beta: Array1::zeros(self.mean.n_coefficients(nx)),
            inducings: z.to_owned(),
            q_mean: Array1::zeros(m),
            q_chol: Array2::eye(m),
        };
        let noise = Array1::<f64>::random_using(m, StandardNormal, rng)
            .mapv(|v| F::cast(GPC_INIT_MEAN_NOISE * v));
        match self.strategy {
            VariationalStrategy::Unwhitened => {
                let kzz = prior_covariance(&self.corr, &state, z, self.jitter)?;
                state.q_chol = kzz.cholesky()?;
                state.q_mean = self.mean.value(z).dot(&state.beta) + noise;
            }
            VariationalStrategy::Whitened => {
                state.q_mean = noise;
            }
        }
        if self.distribution == VariationalDistribution::MeanField {
            let std = state
                .q_chol
                .dot(&state.q_chol.t())
                .diag()
                .mapv(|v| v.sqrt());
            state.q_chol = Array2::from_diag(&std);
        }
        Ok(state)
    }
}

impl<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>, D: Data<Elem = F>>
    Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>, GpcError> for GpcValidParams<F, Mean, Corr>
{
    type Object = VariationalGpClassifier<F, Mean, Corr>;

    /// Fit GP classifier parameters by maximizing the evidence lower bound
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>>,
    ) -> Result<Self::Object> {
        let x = dataset.records();
        let (n, nx) = x.dim();
        if n == 0 {
            return Err(GpcError::InvalidValueError(
                "Training data should not be empty".to_string(),
            ));
        }
        if dataset.targets().len() != n {
            return Err(GpcError::InvalidValueError(format!(
                "Number of labels ({}) should match number of training points ({})",
                dataset.targets().len(),
                n
            )));
        }
        let y = sign_labels(dataset.targets())?;

        let mut rng = match self.seed() {
            Some(seed) => Xoshiro256Plus::seed_from_u64(seed),
            None => Xoshiro256Plus::from_entropy(),
        };
        let z = match self.inducings() {
            Inducings::Training => x.to_owned(),
            Inducings::Randomized(n_inducings) => make_inducings(*n_inducings, x, &mut rng),
            Inducings::Located(z) => {
                if z.ncols() != nx {
                    return Err(GpcError::InvalidValueError(format!(
                        "Inducing points dimension ({}) should match training input dimension ({})",
                        z.ncols(),
                        nx
                    )));
                }
                z.to_owned()
            }
        };

        let theta0_dim = self.theta_init().len();
        if theta0_dim != 1 && theta0_dim != nx {
            return Err(GpcError::InvalidValueError(format!(
                "Initial guess for theta should be either 1-dim or dim of xtrain ({nx}), got {theta0_dim}"
            )));
        }

        let quadrature = GaussHermite::new(self.n_quadrature())?;
        let state0 = self.initial_state(self.theta_init().to_owned(), nx, &z, &mut rng)?;
        let layout = ParamLayout {
            n_theta: theta0_dim,
            n_beta: state0.beta.len(),
            n_inducings: z.nrows(),
            nx,
            distribution: self.distribution,
            learn_inducings: self.learn_inducings,
        };
        let objective = NegativeElbo {
            params: self,
            layout: layout.clone(),
            x: x.view(),
            y: y.view(),
            inducings: &z,
            quadrature: &quadrature,
        };

        let mut params = layout.pack(&state0);
        let mut adam = Adam::new(self.learning_rate(), params.len());
        let mut loss_history = Vec::with_capacity(self.n_iter());
        debug!(
            "Train GPC with {} parameters, {} inducing points, theta0 = {}",
            params.len(),
            z.nrows(),
            state0.theta
        );
        let now = Instant::now();
        for i in 1..=self.n_iter() {
            let loss = objective.value(&params.to_vec())?;
            if !loss.is_finite() {
                return Err(GpcError::NumericalError(format!(
                    "Non finite loss at iteration {i}: {loss}"
                )));
            }
            info!("Iter {}/{} - Loss: {:.3}", i, self.n_iter(), loss);
            loss_history.push(loss);

            let grad = gradient(|p| objective.value_f64(p), &params);
            if grad.iter().any(|g| !g.is_finite()) {
                return Err(GpcError::NumericalError(format!(
                    "Non finite loss gradient at iteration {i}"
                )));
            }
            adam.step(&mut params, &grad);
        }
        debug!("elapsed training = {:?}", now.elapsed().as_millis());

        let posterior = objective.posterior(&params.to_vec())?;
        debug!(
            "Trained theta = {}, variance = {}, mean coefficients = {}",
            posterior.state().theta,
            posterior.state().sigma2,
            posterior.state().beta
        );
        Ok(VariationalGpClassifier {
            posterior,
            likelihood: self.likelihood,
            quadrature,
            loss_history,
            training_data: (x.to_owned(), y),
            params: self.clone(),
        })
    }
}
