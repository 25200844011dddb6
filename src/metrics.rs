//! A module for metrics to evaluate GP classifier performances

use linfa::dataset::Dataset;
use linfa::{
    Float, ParamGuard,
    traits::{Fit, Predict, PredictInplace},
};
use ndarray::{Array1, Array2, ArrayBase, Data, Ix1, Zip};

use crate::{GpcError, GpcParams, VariationalGpClassifier, correlation_models, mean_models};

/// Fraction of matching labels, labels being compared by their positive or non positive class
/// so that {-1, 1} and {0, 1} encodings can be mixed.
pub fn accuracy<F: Float>(
    predicted: &ArrayBase<impl Data<Elem = F>, Ix1>,
    observed: &ArrayBase<impl Data<Elem = F>, Ix1>,
) -> F {
    assert_eq!(
        predicted.len(),
        observed.len(),
        "The number of predicted labels must match the number of observed ones."
    );
    if predicted.is_empty() {
        return F::zero();
    }
    let matches = Zip::from(predicted)
        .and(observed)
        .fold(0usize, |acc, &p, &o| {
            acc + ((p > F::zero()) == (o > F::zero())) as usize
        });
    F::cast(matches) / F::cast(predicted.len())
}

/// A trait for classification accuracy scores including cross validation
pub trait ClassificationScore<F, ER, P, O>
where
    F: Float,
    ER: std::error::Error + From<linfa::error::Error>,
    P: Fit<Array2<F>, Array1<F>, ER, Object = O> + ParamGuard,
    O: PredictInplace<Array2<F>, Array1<F>>,
{
    /// Return the training data (xt, yt)
    fn training_data(&self) -> &(Array2<F>, Array1<F>);

    /// Return the model parameters
    fn params(&self) -> P;

    /// Accuracy of the model predictions on (x, y) labelled data
    fn accuracy_score(&self, x: &Array2<F>, y: &Array1<F>) -> F;

    /// Compute accuracy with kfold cross validation
    fn cv_accuracy(&self, kfold: usize) -> Result<F, ER> {
        let (xt, yt) = self.training_data();
        let dataset = Dataset::new(xt.to_owned(), yt.to_owned());
        let mut n_matches = F::zero();
        for (train, valid) in dataset.fold(kfold).into_iter() {
            let model: O = self.params().fit(&train)?;
            let pred = model.predict(valid.records());
            n_matches += accuracy(&pred, valid.targets()) * F::cast(valid.records().nrows());
        }
        Ok(n_matches / F::cast(xt.nrows()))
    }

    /// Accuracy with Leave-One-Out Cross-Validation
    fn loo_accuracy(&self) -> Result<F, ER> {
        self.cv_accuracy(self.training_data().0.nrows())
    }
}

impl<F, Mean, Corr> ClassificationScore<F, GpcError, GpcParams<F, Mean, Corr>, Self>
    for VariationalGpClassifier<F, Mean, Corr>
where
    F: Float,
    Mean: mean_models::RegressionModel<F>,
    Corr: correlation_models::CorrelationModel<F>,
{
    fn training_data(&self) -> &(Array2<F>, Array1<F>) {
        &self.training_data
    }

    fn params(&self) -> GpcParams<F, Mean, Corr> {
        GpcParams::from(self.params.clone())
    }

    fn accuracy_score(&self, x: &Array2<F>, y: &Array1<F>) -> F {
        let pred: Array1<F> = Predict::predict(self, x);
        accuracy(&pred, y)
    }
}
