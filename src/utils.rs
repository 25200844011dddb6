use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Data, Ix2};

const LN_2PI: f64 = 1.837_877_066_409_345_5;

/// Computes differences between each element of x and each element of y
/// resulting in a 2d array of shape (nrows(x) * nrows(y), ncols(x));
/// *Panics* if x and y have not the same column numbers
pub fn pairwise_differences<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Array2<F> {
    assert!(x.ncols() == y.ncols());

    let nx = x.nrows();
    let ny = y.nrows();
    let ncols = x.ncols();
    let mut result = Array2::zeros((nx * ny, ncols));

    for (i, x_row) in x.rows().into_iter().enumerate() {
        for (j, y_row) in y.rows().into_iter().enumerate() {
            let idx = i * ny + j;
            for k in 0..ncols {
                result[[idx, k]] = x_row[k] - y_row[k];
            }
        }
    }

    result
}

/// Standard normal cumulative distribution function
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * libm::erfc(-z / std::f64::consts::SQRT_2)
}

/// Logarithm of the standard normal cdf, accurate in the far left tail
/// where `normal_cdf` underflows.
pub fn log_normal_cdf(z: f64) -> f64 {
    if z < -20. {
        // asymptotic expansion of the Mills ratio
        let z2 = z * z;
        -0.5 * z2 - (-z).ln() - 0.5 * LN_2PI
            + (1. - 1. / z2 + 3. / (z2 * z2) - 15. / (z2 * z2 * z2)).ln()
    } else {
        normal_cdf(z).ln()
    }
}

/// Logistic function
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0. {
        1. / (1. + (-z).exp())
    } else {
        let e = z.exp();
        e / (1. + e)
    }
}

/// Logarithm of the logistic function: -softplus(-z)
pub fn log_sigmoid(z: f64) -> f64 {
    if z >= 0. {
        -(-z).exp().ln_1p()
    } else {
        z - z.exp().ln_1p()
    }
}

/// Number of free values of a (n, n) lower triangular matrix
pub(crate) fn tril_len(n: usize) -> usize {
    n * (n + 1) / 2
}

/// Lower triangular part of a square matrix packed row-major
pub(crate) fn tril_to_vec<F: Float>(l: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F> {
    let n = l.nrows();
    let mut v = Vec::with_capacity(tril_len(n));
    for i in 0..n {
        for j in 0..=i {
            v.push(l[[i, j]]);
        }
    }
    Array1::from_vec(v)
}

/// Unpack row-major packed values as a (n, n) lower triangular matrix
pub(crate) fn vec_to_tril<F: Float>(v: &[F], n: usize) -> Array2<F> {
    let mut l = Array2::zeros((n, n));
    let mut k = 0;
    for i in 0..n {
        for j in 0..=i {
            l[[i, j]] = v[k];
            k += 1;
        }
    }
    l
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_pairwise_differences() {
        let x = array![[-0.9486833], [-0.82219219]];
        let y = array![[-1.26491106], [-0.63245553], [0.]];
        assert_abs_diff_eq!(
            &array![
                [0.31622777],
                [-0.31622777],
                [-0.9486833],
                [0.44271887],
                [-0.18973666],
                [-0.82219219],
            ],
            &pairwise_differences(&x, &y),
            epsilon = 1e-6
        )
    }

    #[test]
    fn test_normal_cdf() {
        assert_abs_diff_eq!(normal_cdf(0.), 0.5, epsilon = 1e-15);
        assert_abs_diff_eq!(normal_cdf(1.959963984540054), 0.975, epsilon = 1e-12);
        assert_abs_diff_eq!(normal_cdf(-1.) + normal_cdf(1.), 1., epsilon = 1e-15);
    }

    #[test]
    fn test_log_normal_cdf_tail() {
        // both branches agree around the switch point
        let below = log_normal_cdf(-20. - 1e-9);
        let above = log_normal_cdf(-20. + 1e-9);
        assert_abs_diff_eq!(below, above, epsilon = 1e-6);
        assert!(log_normal_cdf(-100.).is_finite());
        assert!(log_normal_cdf(-100.) < log_normal_cdf(-50.));
        assert_abs_diff_eq!(log_normal_cdf(40.), 0., epsilon = 1e-15);
    }

    #[test]
    fn test_sigmoid() {
        assert_abs_diff_eq!(sigmoid(0.), 0.5);
        assert_abs_diff_eq!(sigmoid(3.) + sigmoid(-3.), 1., epsilon = 1e-15);
        assert_abs_diff_eq!(log_sigmoid(2.), sigmoid(2.).ln(), epsilon = 1e-14);
        assert_abs_diff_eq!(log_sigmoid(-2.), sigmoid(-2.).ln(), epsilon = 1e-14);
        assert!(log_sigmoid(-800.).is_finite());
    }

    #[test]
    fn test_tril_packing() {
        let l = array![[1., 0., 0.], [2., 3., 0.], [4., 5., 6.]];
        let v = tril_to_vec(&l);
        assert_eq!(v, array![1., 2., 3., 4., 5., 6.]);
        assert_eq!(vec_to_tril(v.as_slice().unwrap(), 3), l);
        assert_eq!(tril_len(3), 6);
    }
}
