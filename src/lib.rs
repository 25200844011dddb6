//! This library implements [Gaussian Process](https://en.wikipedia.org/wiki/Gaussian_process) binary classification
//! using sparse variational inference.
//!
//! A latent GP is squashed through a Bernoulli likelihood (probit or logit link) to give class
//! membership probabilities. As the resulting posterior is not gaussian, it is approximated by
//! a gaussian distribution over the latent values at M inducing points, the approximation
//! being fitted along with the GP hyperparameters by maximizing the evidence lower bound (ELBO)
//! over a fixed number of Adam iterations.
//!
//! GP classification is implemented by [VariationalGpClassifier] parameterized by [GpcParams].
//! The [GpClassifier] shortcut gives a constant prior mean and a squared exponential kernel.
//!
//! # Example
//!
//! ```no_run
//! use egobox_gpc::{GpClassifier, periodic_sign_data, linspace_grid};
//! use linfa::prelude::*;
//!
//! let (xt, yt) = periodic_sign_data(10, 0., 1., 4.);
//! let gpc = GpClassifier::<f64>::params()
//!     .seed(Some(42))
//!     .fit(&Dataset::new(xt, yt))
//!     .expect("GP classifier fitted");
//!
//! let x = linspace_grid(101, 0., 1.);
//! let proba = gpc.predict_proba(&x).expect("class probabilities");
//! ```
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod algorithm;
pub mod correlation_models;
mod datasets;
mod errors;
pub mod likelihoods;
pub mod mean_models;
pub mod metrics;
pub mod quadrature;
mod variational;

mod parameters;
mod utils;

mod optimization;

pub use algorithm::*;
pub use datasets::*;
pub use errors::*;
pub use parameters::*;
pub use variational::{
    Inducings, ModelState, VariationalDistribution, VariationalPosterior, VariationalStrategy,
};
