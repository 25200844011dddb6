use finitediff::FiniteDiff;
use linfa::prelude::Float;
use ndarray::{Array1, Zip};

/// Adam optimizer parameters
pub(crate) struct AdamParams {
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
}

impl Default for AdamParams {
    fn default() -> Self {
        AdamParams {
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

/// Adam first-order optimizer with bias-corrected moment estimates.
///
/// D. P. Kingma, J. Ba. Adam: A Method for Stochastic Optimization. ICLR 2015.
pub(crate) struct Adam<F: Float> {
    learning_rate: F,
    params: AdamParams,
    /// First moment estimate
    m: Array1<F>,
    /// Second moment estimate
    v: Array1<F>,
    /// Number of steps done
    t: i32,
}

impl<F: Float> Adam<F> {
    pub fn new(learning_rate: F, dim: usize) -> Self {
        Self::with_params(learning_rate, dim, AdamParams::default())
    }

    pub fn with_params(learning_rate: F, dim: usize, params: AdamParams) -> Self {
        Adam {
            learning_rate,
            params,
            m: Array1::zeros(dim),
            v: Array1::zeros(dim),
            t: 0,
        }
    }

    /// Update `x` in place given the gradient of the objective at `x`
    pub fn step(&mut self, x: &mut Array1<F>, grad: &Array1<F>) {
        self.t += 1;
        let beta1 = F::cast(self.params.beta1);
        let beta2 = F::cast(self.params.beta2);
        let eps = F::cast(self.params.epsilon);
        let bias1 = F::one() - beta1.powi(self.t);
        let bias2 = F::one() - beta2.powi(self.t);
        let lr = self.learning_rate;

        Zip::from(x)
            .and(&mut self.m)
            .and(&mut self.v)
            .and(grad)
            .for_each(|x, m, v, &g| {
                *m = beta1 * *m + (F::one() - beta1) * g;
                *v = beta2 * *v + (F::one() - beta2) * g * g;
                let m_hat = *m / bias1;
                let v_hat = *v / bias2;
                *x -= lr * m_hat / (v_hat.sqrt() + eps);
            });
    }
}

/// Gradient of `objfn` at `x` by central finite differences.
///
/// `objfn` is expected to be computed in `F` precision: the finite difference step,
/// `sqrt(f64::EPSILON)` in `finitediff`, is rescaled to `sqrt(F::epsilon())`.
pub(crate) fn gradient<F: Float>(objfn: impl Fn(&[f64]) -> f64, x: &Array1<F>) -> Array1<F> {
    let scale = (into_f64(F::epsilon()) / f64::EPSILON).sqrt();
    let x0 = x.iter().map(|v| into_f64(*v)).collect::<Vec<_>>();
    let f = |u: &Vec<f64>| -> f64 {
        let p = x0
            .iter()
            .zip(u)
            .map(|(x, u)| x + scale * u)
            .collect::<Vec<_>>();
        objfn(&p)
    };
    vec![0.; x0.len()]
        .central_diff(&f)
        .into_iter()
        .map(|g| F::cast(g / scale))
        .collect()
}

#[inline(always)]
pub(crate) fn into_f64<F: Float>(v: F) -> f64 {
    v.to_f64().unwrap_or(f64::NAN)
}
