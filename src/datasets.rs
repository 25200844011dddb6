//! Toy binary classification datasets

use linfa::Float;
use ndarray::{Array, Array1, Array2, Axis};

/// Generate `n` inputs equally spaced in `[lo, hi]` labelled by the sign of `cos(freq * pi * x)`,
/// `+1` when the cosine is non negative, `-1` otherwise.
///
/// Returns inputs as a (n, 1) matrix and labels as a (n,) vector.
pub fn periodic_sign_data<F: Float>(n: usize, lo: F, hi: F, freq: F) -> (Array2<F>, Array1<F>) {
    let x = Array::linspace(lo, hi, n);
    let y = x.mapv(|v| {
        if (freq * F::cast(std::f64::consts::PI) * v).cos() >= F::zero() {
            F::one()
        } else {
            -F::one()
        }
    });
    (x.insert_axis(Axis(1)), y)
}

/// Evaluation grid of `n` points equally spaced in `[lo, hi]` as a (n, 1) matrix
pub fn linspace_grid<F: Float>(n: usize, lo: F, hi: F) -> Array2<F> {
    Array::linspace(lo, hi, n).insert_axis(Axis(1))
}
