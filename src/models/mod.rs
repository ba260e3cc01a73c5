//! Fitted classifier handles used by the decoders.
//!
//! Every model in this module is fitted once through its own constructor
//! (`fit`) and afterwards answers predictions through the [`Classifier`]
//! trait. All models are `serde` serializable so decoders can persist them.
use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::error::{DecoderError, Result};

pub mod boosting;
pub mod discriminant;
pub mod dummy;
pub mod logistic;

pub use boosting::{BoostingParams, GradientBoosting, TreeGrowth};
pub use discriminant::{LinearDiscriminant, QuadraticDiscriminant};
pub use dummy::UniformDummy;
pub use logistic::{LogisticParams, LogisticRegression};

/// A small trait abstraction for fitted classifiers.
///
/// Labels are the original class values; probability columns follow the
/// order of [`Classifier::classes`].
pub trait Classifier: Send + Sync {
    /// Human readable model name, used in error messages.
    fn name(&self) -> &'static str;

    /// Sorted class labels seen during fitting.
    fn classes(&self) -> &[usize];

    /// Class membership probabilities, shape (n_samples, n_classes).
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    /// Most probable class for every row.
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let proba = self.predict_proba(x)?;
        let classes = self.classes();
        Ok(proba
            .axis_iter(Axis(0))
            .map(|row| classes[argmax(row)])
            .collect())
    }

    /// Raw decision scores. Binary models return a single column holding the
    /// score of the second class; multiclass models one column per class.
    fn decision_function(&self, _x: &Array2<f64>) -> Result<Array2<f64>> {
        Err(DecoderError::Unsupported {
            backend: self.name(),
            operation: "decision_function",
        })
    }
}

/// Sorted distinct labels. Fitting needs at least two of them.
pub(crate) fn fit_classes(y: &Array1<usize>) -> Result<Vec<usize>> {
    let mut classes = y.to_vec();
    classes.sort_unstable();
    classes.dedup();
    if classes.len() < 2 {
        return Err(DecoderError::Model(format!(
            "need at least two classes to fit, got {}",
            classes.len()
        )));
    }
    Ok(classes)
}

/// Position of every label in `classes`.
pub(crate) fn encode_labels(y: &Array1<usize>, classes: &[usize]) -> Result<Vec<usize>> {
    y.iter()
        .map(|label| {
            classes
                .binary_search(label)
                .map_err(|_| DecoderError::Model(format!("unknown class label {}", label)))
        })
        .collect()
}

/// Validate a training call: rows agree and weights, if any, match.
pub(crate) fn check_fit_input(
    x: &Array2<f64>,
    y: &Array1<usize>,
    sample_weight: Option<&Array1<f64>>,
) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(DecoderError::Shape(format!(
            "data has {} rows but labels have {}",
            x.nrows(),
            y.len()
        )));
    }
    if x.nrows() == 0 {
        return Err(DecoderError::Shape("cannot fit on an empty table".to_string()));
    }
    if let Some(w) = sample_weight {
        if w.len() != y.len() {
            return Err(DecoderError::Shape(format!(
                "{} sample weights for {} rows",
                w.len(),
                y.len()
            )));
        }
    }
    Ok(())
}

pub(crate) fn check_n_features(name: &str, expected: usize, x: &Array2<f64>) -> Result<()> {
    if x.ncols() != expected {
        return Err(DecoderError::Shape(format!(
            "{} was fitted on {} features, got {}",
            name,
            expected,
            x.ncols()
        )));
    }
    Ok(())
}

pub(crate) fn argmax(row: ArrayView1<f64>) -> usize {
    let mut best = 0;
    for (i, &v) in row.iter().enumerate() {
        if v > row[best] {
            best = i;
        }
    }
    best
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Row-wise softmax, stabilised by the row maximum.
pub(crate) fn softmax_rows(scores: &mut Array2<f64>) {
    for mut row in scores.axis_iter_mut(Axis(0)) {
        let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
}

/// Lower Cholesky factor of a symmetric positive definite matrix.
pub(crate) fn cholesky(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            if i == j {
                if sum <= 0.0 {
                    return None;
                }
                l[[i, j]] = sum.sqrt();
            } else {
                l[[i, j]] = sum / l[[j, j]];
            }
        }
    }
    Some(l)
}

/// Solve `L L^T x = b` given the lower factor `L`.
pub(crate) fn cholesky_solve(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[[i, k]] * z[k];
        }
        z[i] = sum / l[[i, i]];
    }
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = z[i];
        for k in (i + 1)..n {
            sum -= l[[k, i]] * x[k];
        }
        x[i] = sum / l[[i, i]];
    }
    x
}

/// Factorize, adding growing jitter to the diagonal until it succeeds.
pub(crate) fn robust_cholesky(a: &Array2<f64>) -> Result<Array2<f64>> {
    if let Some(l) = cholesky(a) {
        return Ok(l);
    }
    let scale = a.diag().iter().map(|v| v.abs()).fold(0.0, f64::max).max(1e-12);
    let mut jitter = 1e-10 * scale;
    for _ in 0..10 {
        let mut shifted = a.clone();
        shifted.diag_mut().mapv_inplace(|v| v + jitter);
        if let Some(l) = cholesky(&shifted) {
            log::trace!("Cholesky needed jitter {:e}", jitter);
            return Ok(l);
        }
        jitter *= 10.0;
    }
    Err(DecoderError::Model(
        "matrix is not positive definite".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn cholesky_solves_spd_system() {
        let a = array![[4.0, 2.0], [2.0, 3.0]];
        let b = array![2.0, 1.0];
        let l = cholesky(&a).unwrap();
        let x = cholesky_solve(&l, &b);
        let back = a.dot(&x);
        assert!((back[0] - 2.0).abs() < 1e-12);
        assert!((back[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn softmax_rows_sum_to_one() {
        let mut scores = array![[1.0, 2.0, 3.0], [1000.0, 1000.0, 0.0]];
        softmax_rows(&mut scores);
        for row in scores.axis_iter(Axis(0)) {
            assert!((row.sum() - 1.0).abs() < 1e-12);
        }
        assert!((scores[[1, 0]] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn labels_encode_to_class_positions() {
        let y = array![3, 7, 3, 9];
        let classes = fit_classes(&y).unwrap();
        assert_eq!(classes, vec![3, 7, 9]);
        assert_eq!(encode_labels(&y, &classes).unwrap(), vec![0, 1, 0, 2]);
        assert!(fit_classes(&array![1, 1]).is_err());
    }
}
