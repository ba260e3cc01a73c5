//! Decoder backends and the contract they share.
//!
//! A decoder couples a classifier backend with the scoring method, the
//! balancing strategy and the optional hyperparameter search chosen at
//! construction. Decoders start unfitted; [`Decoder::fit`] replaces any
//! previous model in full.
use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2};

use crate::error::{DecoderError, Result};
use crate::models::Classifier;

pub mod base;
pub mod catboost;
pub mod dummy;
pub mod lda;
pub mod lr;
pub mod qda;
pub(crate) mod tuning;
pub mod xgb;

pub use base::{model_path, DecoderSettings, FitContext, TrainingSnapshot, VALIDATION_TRAIN_FRACTION};
pub use catboost::CatBoostDecoder;
pub use dummy::DummyDecoder;
pub use lda::LdaDecoder;
pub use lr::LogisticDecoder;
pub use qda::QdaDecoder;
pub use xgb::XgbDecoder;

pub trait Decoder: Send + Sync {
    /// Registry name of the backend.
    fn name(&self) -> &'static str;

    fn settings(&self) -> &DecoderSettings;

    /// Train the backend model. Rows of `data_train`, `labels` and `groups`
    /// must line up.
    fn fit(&mut self, data_train: &Array2<f64>, labels: &Array1<usize>, groups: &Array1<i64>) -> Result<()>;

    /// Fitted model handle, `None` before the first fit.
    fn model(&self) -> Option<&dyn Classifier>;

    /// Balanced data the current model was trained on.
    fn training_snapshot(&self) -> Option<&TrainingSnapshot>;

    /// Persist the fitted model. The extension of `path` is replaced by the
    /// backend's own; the written path is returned.
    fn save_model(&self, path: &Path) -> Result<PathBuf>;

    /// Restore a model written by [`Decoder::save_model`] of the same backend.
    fn load_model(&mut self, path: &Path) -> Result<()>;

    fn fitted(&self) -> Result<&dyn Classifier> {
        self.model().ok_or(DecoderError::NotFitted)
    }

    fn fit_and_predict(
        &mut self,
        data_train: &Array2<f64>,
        data_test: &Array2<f64>,
        labels: &Array1<usize>,
        groups: &Array1<i64>,
    ) -> Result<Array1<usize>> {
        self.fit(data_train, labels, groups)?;
        self.predict(data_test)
    }

    fn predict(&self, data: &Array2<f64>) -> Result<Array1<usize>> {
        self.fitted()?.predict(data)
    }

    fn predict_proba(&self, data: &Array2<f64>) -> Result<Array2<f64>> {
        self.fitted()?.predict_proba(data)
    }

    fn decision_function(&self, data: &Array2<f64>) -> Result<Array2<f64>> {
        self.fitted()?.decision_function(data)
    }

    /// Score the fitted model on held-out data with the configured method.
    fn get_score(&self, data_test: &Array2<f64>, label_test: &Array1<usize>) -> Result<f64> {
        self.settings().scoring.score(self.fitted()?, data_test, label_test)
    }
}

/// Model handle of a fitted decoder, for `save_model` implementations.
pub(crate) fn require_fitted<M>(model: &Option<M>) -> Result<&M> {
    model.as_ref().ok_or(DecoderError::NotFitted)
}
