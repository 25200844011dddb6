//! A module for stationary correlation models used as covariance kernels of the latent GP.
//!
//! The covariance between latent values at x and x' is `sigma2 * r(x - x'; theta)`
//! where `theta` holds the inverse length-scales (one per input component, or a
//! single value broadcast over all components).
//!
//! The following correlation models are implemented:
//! * squared exponential (aka RBF),
//! * absolute exponential,
//! * matern 3/2,
//! * matern 5/2.

use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2};
use paste::paste;
use std::convert::TryFrom;
use std::fmt;

/// A trait for using a correlation model as a GP classification kernel
pub trait CorrelationModel<F: Float>: Clone + Copy + Default + fmt::Display + Sync {
    /// Compute correlation values r(x, x') given differences `d` between x and x'
    /// and `theta` inverse length-scales, where:
    /// `d`     : differences (n, nx)
    /// `theta` : hyperparameters (nx,) or (1,)
    ///
    /// Returns a (n, 1) column of correlation values.
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array2<F>;
}

/// Broadcast `theta` to the number of components `nx` and scale absolute differences
/// component-wise: returns |d_j| * theta_j
fn scaled_distances<F: Float>(
    d: &ArrayBase<impl Data<Elem = F>, Ix2>,
    theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
) -> Array2<F> {
    let theta: Array1<F> = if theta.len() == 1 {
        Array1::from_elem(d.ncols(), theta[0])
    } else {
        theta.to_owned()
    };
    d.mapv(|v| v.abs()) * &theta
}

/// Squared exponential correlation model
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SquaredExponentialCorr();

impl<F: Float> CorrelationModel<F> for SquaredExponentialCorr {
    ///   nx
    /// prod exp( - |theta_j * d_j|^2 / 2 )
    ///  j=1
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array2<F> {
        let a = scaled_distances(d, theta);
        a.mapv(|v| v * v)
            .sum_axis(Axis(1))
            .mapv(|v| F::exp(F::cast(-0.5) * v))
            .insert_axis(Axis(1))
    }
}

/// Absolute exponential correlation model
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AbsoluteExponentialCorr();

impl<F: Float> CorrelationModel<F> for AbsoluteExponentialCorr {
    ///   nx
    /// prod exp( - theta_j * |d_j| )
    ///  j=1
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array2<F> {
        let a = scaled_distances(d, theta);
        a.sum_axis(Axis(1)).mapv(|v| F::exp(-v)).insert_axis(Axis(1))
    }
}

/// Matern 3/2 correlation model
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Matern32Corr();

impl<F: Float> CorrelationModel<F> for Matern32Corr {
    ///   nx
    /// prod (1 + sqrt(3) * theta_j * |d_j|) exp( - sqrt(3) * theta_j * |d_j| )
    ///  j=1
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array2<F> {
        let sqrt3 = F::cast(3.).sqrt();
        let a = scaled_distances(d, theta).mapv(|v| sqrt3 * v);
        let poly = a.mapv(|v| F::one() + v).map_axis(Axis(1), |row| {
            row.iter().fold(F::one(), |acc, v| acc * *v)
        });
        let expo = a.sum_axis(Axis(1)).mapv(|v| F::exp(-v));
        (poly * expo).insert_axis(Axis(1))
    }
}

/// Matern 5/2 correlation model
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Matern52Corr();

impl<F: Float> CorrelationModel<F> for Matern52Corr {
    ///   nx
    /// prod (1 + sqrt(5) * a_j + 5/3 * a_j^2) exp( - sqrt(5) * a_j )
    ///  j=1
    /// with a_j = theta_j * |d_j|
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array2<F> {
        let sqrt5 = F::cast(5.).sqrt();
        let a = scaled_distances(d, theta);
        let poly = a
            .mapv(|v| F::one() + sqrt5 * v + F::cast(5. / 3.) * v * v)
            .map_axis(Axis(1), |row| row.iter().fold(F::one(), |acc, v| acc * *v));
        let expo = a.sum_axis(Axis(1)).mapv(|v| F::exp(-sqrt5 * v));
        (poly * expo).insert_axis(Axis(1))
    }
}

macro_rules! declare_corr_util_impls {
    ($corr:ident) => {
        paste! {
            impl fmt::Display for [<$corr Corr>] {
                fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    write!(f, "{}", stringify!($corr))
                }
            }

            impl From<[<$corr Corr>]> for String {
                fn from(item: [<$corr Corr>]) -> String {
                    item.to_string()
                }
            }

            impl TryFrom<String> for [<$corr Corr>] {
                type Error = &'static str;
                fn try_from(s: String) -> Result<Self, Self::Error> {
                    if s == stringify!($corr) {
                        Ok(Self::default())
                    } else {
                        Err(concat!(
                            "Bad string value for ",
                            stringify!([<$corr Corr>]),
                            ", should be '",
                            stringify!($corr),
                            "'"
                        ))
                    }
                }
            }
        }
    };
}

declare_corr_util_impls!(SquaredExponential);
declare_corr_util_impls!(AbsoluteExponential);
declare_corr_util_impls!(Matern32);
declare_corr_util_impls!(Matern52);
