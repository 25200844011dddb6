//! A module for regression models used as prior mean of the latent GP.
//!
//! The prior mean is `mu(x) = H(x) beta` where `H` is the regression basis
//! and `beta` the coefficients learned along with the other hyperparameters.
//!
//! The following models are implemented:
//! * zero,
//! * constant,
//! * linear

use linfa::Float;
use ndarray::{Array2, ArrayBase, Axis, Data, Ix2, concatenate};
use paste::paste;
use std::convert::TryFrom;
use std::fmt;

/// A trait for mean models used in GP classification
pub trait RegressionModel<F: Float>: Clone + Copy + Default + fmt::Display + Sync {
    /// Compute regression basis defining the mean behaviour of the latent GP
    /// for the given `x` data points specified as (n, nx) matrix.
    /// Returns a (n, n_coefficients(nx)) matrix
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F>;

    /// Number of regression coefficients for inputs of dimension `nx`
    fn n_coefficients(&self, nx: usize) -> usize;
}

/// A zero function as mean of the GP
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ZeroMean();

impl<F: Float> RegressionModel<F> for ZeroMean {
    /// Empty basis: regr(x) = []
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        Array2::<F>::zeros((x.nrows(), 0))
    }

    fn n_coefficients(&self, _nx: usize) -> usize {
        0
    }
}

/// A constant function as mean of the GP
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ConstantMean();

impl<F: Float> RegressionModel<F> for ConstantMean {
    /// Zero order polynomial (constant) regression model.
    /// regr(x) = [1, ..., 1].T
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        Array2::<F>::ones((x.nrows(), 1))
    }

    fn n_coefficients(&self, _nx: usize) -> usize {
        1
    }
}

/// An affine function as mean of the GP
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct LinearMean();

impl<F: Float> RegressionModel<F> for LinearMean {
    /// First order polynomial (linear) regression model.
    /// regr(x) = [ 1, x_1, ..., x_n ].T
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        concatenate![Axis(1), Array2::ones((x.nrows(), 1)), x.to_owned()]
    }

    fn n_coefficients(&self, nx: usize) -> usize {
        1 + nx
    }
}

macro_rules! declare_mean_util_impls {
    ($regr:ident) => {
        paste! {
            impl fmt::Display for [<$regr Mean>] {
                fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    write!(f, "{}Mean", stringify!($regr))
                }
            }

            impl From<[<$regr Mean>]> for String {
                fn from(_item: [<$regr Mean>]) -> Self {
                    [<$regr Mean>]().to_string()
                }
            }

            impl TryFrom<String> for [<$regr Mean>] {
                type Error = &'static str;
                fn try_from(s: String) -> Result<Self, Self::Error> {
                    if s == stringify!([<$regr Mean>]) {
                        Ok(Self::default())
                    } else {
                        Err(concat!(
                            "Bad string value for ",
                            stringify!([<$regr Mean>])
                        ))
                    }
                }
            }
        }
    };
}

declare_mean_util_impls!(Zero);
declare_mean_util_impls!(Constant);
declare_mean_util_impls!(Linear);
