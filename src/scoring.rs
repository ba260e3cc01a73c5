//! Scoring functions selectable by name.
use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2};

use crate::dataset::class_counts;
use crate::error::{Allowed, DecoderError, Result};
use crate::models::Classifier;

pub const SCORING_METHODS: [&str; 2] = ["balanced_accuracy", "log_loss"];

const LOG_LOSS_EPS: f64 = 1e-15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoringMethod {
    #[default]
    BalancedAccuracy,
    LogLoss,
}

impl ScoringMethod {
    /// Score a fitted model on held-out data.
    ///
    /// Balanced accuracy compares hard predictions; log-loss uses the
    /// predicted class probabilities.
    pub fn score(&self, model: &dyn Classifier, x: &Array2<f64>, y: &Array1<usize>) -> Result<f64> {
        if x.nrows() != y.len() {
            return Err(DecoderError::Shape(format!(
                "data has {} rows but labels have {}",
                x.nrows(),
                y.len()
            )));
        }
        match self {
            ScoringMethod::BalancedAccuracy => Ok(balanced_accuracy(y, &model.predict(x)?)),
            ScoringMethod::LogLoss => Ok(log_loss(y, &model.predict_proba(x)?, model.classes())),
        }
    }
}

impl FromStr for ScoringMethod {
    type Err = DecoderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "balanced_accuracy" => Ok(ScoringMethod::BalancedAccuracy),
            "log_loss" => Ok(ScoringMethod::LogLoss),
            _ => Err(DecoderError::ScoringMethodNotFound {
                input: s.to_lowercase(),
                allowed: Allowed(SCORING_METHODS.to_vec()),
            }),
        }
    }
}

impl fmt::Display for ScoringMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScoringMethod::BalancedAccuracy => f.write_str("balanced_accuracy"),
            ScoringMethod::LogLoss => f.write_str("log_loss"),
        }
    }
}

/// Mean per-class recall over the classes present in `y_true`.
pub fn balanced_accuracy(y_true: &Array1<usize>, y_pred: &Array1<usize>) -> f64 {
    let counts = class_counts(y_true);
    if counts.is_empty() {
        return f64::NAN;
    }
    let recall_sum: f64 = counts
        .iter()
        .map(|(&class, &n)| {
            let hits = y_true
                .iter()
                .zip(y_pred.iter())
                .filter(|&(&t, &p)| t == class && p == class)
                .count();
            hits as f64 / n as f64
        })
        .sum();
    recall_sum / counts.len() as f64
}

/// Mean negative log-likelihood of the true class.
///
/// `classes` gives the label of each probability column. Probabilities are
/// clipped to `[1e-15, 1 - 1e-15]` and rows renormalised; a label missing
/// from `classes` counts as probability zero.
pub fn log_loss(y_true: &Array1<usize>, proba: &Array2<f64>, classes: &[usize]) -> f64 {
    if y_true.is_empty() {
        return f64::NAN;
    }
    let total: f64 = y_true
        .iter()
        .zip(proba.rows())
        .map(|(label, row)| {
            let clipped = row.mapv(|p| p.clamp(LOG_LOSS_EPS, 1.0 - LOG_LOSS_EPS));
            let norm = clipped.sum();
            let p = match classes.binary_search(label) {
                Ok(col) => clipped[col] / norm,
                Err(_) => LOG_LOSS_EPS,
            };
            -p.ln()
        })
        .sum();
    total / y_true.len() as f64
}
