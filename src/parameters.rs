use crate::correlation_models::{CorrelationModel, SquaredExponentialCorr};
use crate::errors::{GpcError, Result};
use crate::likelihoods::{BernoulliLikelihood, Link};
use crate::mean_models::{ConstantMean, RegressionModel};
use crate::quadrature::GPC_DEFAULT_N_QUADRATURE;
use crate::variational::{Inducings, VariationalDistribution, VariationalStrategy};
use linfa::{Float, ParamGuard};

use ndarray::{Array1, array};

/// Default number of training iterations
pub const GPC_DEFAULT_N_ITER: usize = 50;
/// Default optimizer learning rate
pub const GPC_DEFAULT_LEARNING_RATE: f64 = 0.1;
/// Default jitter added to the inducing points covariance diagonal
pub const GPC_DEFAULT_JITTER: f64 = 1e-6;
/// Default initial kernel inverse length-scale
pub const GPC_DEFAULT_THETA_INIT: f64 = 10.;
/// Default initial kernel variance
pub const GPC_DEFAULT_SIGMA2_INIT: f64 = 1.;

/// A set of validated GP classifier parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct GpcValidParams<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> {
    /// Regression model representing the prior mean(x)
    pub(crate) mean: Mean,
    /// Correlation model of the latent GP
    pub(crate) corr: Corr,
    /// Initial inverse length-scales, one value or one per input component
    pub(crate) theta_init: Array1<F>,
    /// Initial kernel variance
    pub(crate) sigma2_init: F,
    /// Likelihood linking latent values to labels
    pub(crate) likelihood: BernoulliLikelihood,
    /// Variational distribution family
    pub(crate) distribution: VariationalDistribution,
    /// Variational strategy
    pub(crate) strategy: VariationalStrategy,
    /// Inducing points specification
    pub(crate) inducings: Inducings<F>,
    /// Whether inducing locations are optimized
    pub(crate) learn_inducings: bool,
    /// Number of training iterations
    pub(crate) n_iter: usize,
    /// Optimizer learning rate
    pub(crate) learning_rate: F,
    /// Number of Gauss-Hermite nodes
    pub(crate) n_quadrature: usize,
    /// Parameter to improve numerical stability
    pub(crate) jitter: F,
    /// Random generator seed
    pub(crate) seed: Option<u64>,
}

impl<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> Default
    for GpcValidParams<F, Mean, Corr>
{
    fn default() -> GpcValidParams<F, Mean, Corr> {
        GpcValidParams {
            mean: Mean::default(),
            corr: Corr::default(),
            theta_init: array![F::cast(GPC_DEFAULT_THETA_INIT)],
            sigma2_init: F::cast(GPC_DEFAULT_SIGMA2_INIT),
            likelihood: BernoulliLikelihood::default(),
            distribution: VariationalDistribution::default(),
            strategy: VariationalStrategy::default(),
            inducings: Inducings::default(),
            learn_inducings: false,
            n_iter: GPC_DEFAULT_N_ITER,
            learning_rate: F::cast(GPC_DEFAULT_LEARNING_RATE),
            n_quadrature: GPC_DEFAULT_N_QUADRATURE,
            jitter: F::cast(GPC_DEFAULT_JITTER),
            seed: None,
        }
    }
}

impl<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>>
    GpcValidParams<F, Mean, Corr>
{
    /// Get mean model
    pub fn mean(&self) -> &Mean {
        &self.mean
    }

    /// Get correlation corr k(x, x')
    pub fn corr(&self) -> &Corr {
        &self.corr
    }

    /// Get starting theta value
    pub fn theta_init(&self) -> &Array1<F> {
        &self.theta_init
    }

    /// Get starting kernel variance
    pub fn sigma2_init(&self) -> F {
        self.sigma2_init
    }

    /// Get likelihood
    pub fn likelihood(&self) -> &BernoulliLikelihood {
        &self.likelihood
    }

    /// Get variational distribution family
    pub fn variational_distribution(&self) -> VariationalDistribution {
        self.distribution
    }

    /// Get variational strategy
    pub fn variational_strategy(&self) -> VariationalStrategy {
        self.strategy
    }

    /// Get inducing points specification
    pub fn inducings(&self) -> &Inducings<F> {
        &self.inducings
    }

    /// Whether inducing locations are learned
    pub fn learn_inducings(&self) -> bool {
        self.learn_inducings
    }

    /// Get the number of training iterations
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Get the optimizer learning rate
    pub fn learning_rate(&self) -> F {
        self.learning_rate
    }

    /// Get the number of quadrature nodes
    pub fn n_quadrature(&self) -> usize {
        self.n_quadrature
    }

    /// Get jitter
    pub fn jitter(&self) -> F {
        self.jitter
    }

    /// Get random generator seed
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}

#[derive(Clone, Debug)]
/// The set of hyperparameters that can be specified for the execution of
/// the [GP classification algorithm](struct.VariationalGpClassifier.html).
pub struct GpcParams<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>>(
    GpcValidParams<F, Mean, Corr>,
);

impl<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> GpcParams<F, Mean, Corr> {
    /// A constructor for GP classifier parameters given mean and correlation models
    pub fn new(mean: Mean, corr: Corr) -> GpcParams<F, Mean, Corr> {
        Self(GpcValidParams {
            mean,
            corr,
            ..Default::default()
        })
    }

    /// A constructor for GP classifier parameters from validated parameters
    pub fn new_from_valid(params: &GpcValidParams<F, Mean, Corr>) -> Self {
        Self(params.clone())
    }

    /// Set mean model.
    pub fn mean(mut self, mean: Mean) -> Self {
        self.0.mean = mean;
        self
    }

    /// Set correlation model.
    pub fn corr(mut self, corr: Corr) -> Self {
        self.0.corr = corr;
        self
    }

    /// Set initial value of theta hyper parameters.
    ///
    /// A single value is shared by all input components,
    /// otherwise one value per input component is expected.
    pub fn theta_init(mut self, theta_init: Array1<F>) -> Self {
        self.0.theta_init = theta_init;
        self
    }

    /// Set initial kernel variance
    pub fn sigma2_init(mut self, sigma2_init: F) -> Self {
        self.0.sigma2_init = sigma2_init;
        self
    }

    /// Set the likelihood
    pub fn likelihood(mut self, likelihood: BernoulliLikelihood) -> Self {
        self.0.likelihood = likelihood;
        self
    }

    /// Set the likelihood link function
    pub fn link(mut self, link: Link) -> Self {
        self.0.likelihood = BernoulliLikelihood::new(link);
        self
    }

    /// Set the variational distribution family
    pub fn variational_distribution(mut self, distribution: VariationalDistribution) -> Self {
        self.0.distribution = distribution;
        self
    }

    /// Set the variational strategy
    pub fn variational_strategy(mut self, strategy: VariationalStrategy) -> Self {
        self.0.strategy = strategy;
        self
    }

    /// Set inducing points specification
    pub fn inducings(mut self, inducings: Inducings<F>) -> Self {
        self.0.inducings = inducings;
        self
    }

    /// Set whether inducing locations are optimized along with other parameters
    pub fn learn_inducings(mut self, learn_inducings: bool) -> Self {
        self.0.learn_inducings = learn_inducings;
        self
    }

    /// Set the number of training iterations
    pub fn n_iter(mut self, n_iter: usize) -> Self {
        self.0.n_iter = n_iter;
        self
    }

    /// Set the optimizer learning rate
    pub fn learning_rate(mut self, learning_rate: F) -> Self {
        self.0.learning_rate = learning_rate;
        self
    }

    /// Set the number of Gauss-Hermite quadrature nodes
    pub fn n_quadrature(mut self, n_quadrature: usize) -> Self {
        self.0.n_quadrature = n_quadrature;
        self
    }

    /// Set jitter.
    ///
    /// Jitter is added to the inducing points covariance diagonal to improve numerical stability
    pub fn jitter(mut self, jitter: F) -> Self {
        self.0.jitter = jitter;
        self
    }

    /// Set the random generator seed for reproducibility
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.0.seed = seed;
        self
    }
}

impl<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>>
    From<GpcValidParams<F, Mean, Corr>> for GpcParams<F, Mean, Corr>
{
    fn from(valid: GpcValidParams<F, Mean, Corr>) -> Self {
        GpcParams(valid)
    }
}

impl<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> ParamGuard
    for GpcParams<F, Mean, Corr>
{
    type Checked = GpcValidParams<F, Mean, Corr>;
    type Error = GpcError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        let p = &self.0;
        if p.n_iter == 0 {
            return Err(GpcError::InvalidValueError(
                "`n_iter` cannot be 0!".to_string(),
            ));
        }
        if !(p.learning_rate.is_finite() && p.learning_rate > F::zero()) {
            return Err(GpcError::InvalidValueError(format!(
                "`learning_rate` should be a positive finite value, got {}",
                p.learning_rate
            )));
        }
        if p.n_quadrature == 0 {
            return Err(GpcError::InvalidValueError(
                "`n_quadrature` cannot be 0!".to_string(),
            ));
        }
        if !(p.jitter >= F::zero()) {
            return Err(GpcError::InvalidValueError(format!(
                "`jitter` should be non negative, got {}",
                p.jitter
            )));
        }
        if p.theta_init.is_empty() || p.theta_init.iter().any(|t| !(*t > F::zero())) {
            return Err(GpcError::InvalidValueError(format!(
                "`theta_init` values should be positive, got {}",
                p.theta_init
            )));
        }
        if !(p.sigma2_init > F::zero()) {
            return Err(GpcError::InvalidValueError(format!(
                "`sigma2_init` should be positive, got {}",
                p.sigma2_init
            )));
        }
        match &p.inducings {
            Inducings::Randomized(0) => {
                return Err(GpcError::InvalidValueError(
                    "Number of randomized inducing points cannot be 0!".to_string(),
                ));
            }
            Inducings::Located(z) if z.is_empty() => {
                return Err(GpcError::InvalidValueError(
                    "Located inducing points cannot be empty!".to_string(),
                ));
            }
            _ => (),
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

/// GP classifier with constant prior mean and squared exponential kernel
pub type GpClassifier<F> = GpcParams<F, ConstantMean, SquaredExponentialCorr>;

impl<F: Float> GpcParams<F, ConstantMean, SquaredExponentialCorr> {
    /// Default GP classifier parameters: constant mean, squared exponential kernel,
    /// probit likelihood, Cholesky variational distribution with unwhitened strategy
    /// and inducing points located at training inputs.
    pub fn params() -> Self {
        GpcParams::new(ConstantMean(), SquaredExponentialCorr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mean_models::LinearMean;
    use crate::correlation_models::Matern32Corr;
    use ndarray::Array2;

    #[test]
    fn test_default_params() {
        let params = GpClassifier::<f64>::params().check().unwrap();
        assert_eq!(params.n_iter(), 50);
        assert_eq!(params.learning_rate(), 0.1);
        assert_eq!(params.n_quadrature(), 20);
        assert_eq!(params.variational_strategy(), VariationalStrategy::Unwhitened);
        assert_eq!(
            params.variational_distribution(),
            VariationalDistribution::Cholesky
        );
        assert_eq!(params.inducings(), &Inducings::Training);
        assert!(!params.learn_inducings());
        assert_eq!(params.likelihood().link(), Link::Probit);
        assert_eq!(params.seed(), None);
    }

    #[test]
    fn test_builder() {
        let params = GpcParams::<f64, _, _>::new(LinearMean(), Matern32Corr())
            .theta_init(array![1., 2.])
            .link(Link::Logit)
            .variational_strategy(VariationalStrategy::Whitened)
            .n_iter(3)
            .seed(Some(42))
            .check()
            .unwrap();
        assert_eq!(params.theta_init(), &array![1., 2.]);
        assert_eq!(params.likelihood().link(), Link::Logit);
        assert_eq!(params.n_iter(), 3);
        assert_eq!(params.seed(), Some(42));
        let back = GpcParams::new_from_valid(&params).check().unwrap();
        assert_eq!(back, params);
    }

    #[test]
    fn test_invalid_params() {
        let base = GpClassifier::<f64>::params;
        assert!(base().n_iter(0).check().is_err());
        assert!(base().learning_rate(0.).check().is_err());
        assert!(base().learning_rate(-0.1).check().is_err());
        assert!(base().learning_rate(f64::NAN).check().is_err());
        assert!(base().learning_rate(f64::INFINITY).check().is_err());
        assert!(base().n_quadrature(0).check().is_err());
        assert!(base().jitter(-1e-6).check().is_err());
        assert!(base().jitter(0.).check().is_ok());
        assert!(base().theta_init(array![1., 0.]).check().is_err());
        assert!(base().theta_init(array![]).check().is_err());
        assert!(base().sigma2_init(0.).check().is_err());
        assert!(base().inducings(Inducings::Randomized(0)).check().is_err());
        assert!(
            base()
                .inducings(Inducings::Located(Array2::zeros((0, 1))))
                .check()
                .is_err()
        );
    }
}
