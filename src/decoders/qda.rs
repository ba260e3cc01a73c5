use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2};

use super::base::{load_bincode, save_bincode, DecoderSettings, FitContext, TrainingSnapshot};
use super::{require_fitted, Decoder};
use crate::error::Result;
use crate::models::{Classifier, QuadraticDiscriminant};

pub const EXTENSION: &str = "qda";

const NAME: &str = "qda";

/// Quadratic discriminant analysis, one covariance per class.
#[derive(Debug, Clone)]
pub struct QdaDecoder {
    settings: DecoderSettings,
    model: Option<QuadraticDiscriminant>,
    snapshot: Option<TrainingSnapshot>,
}

impl QdaDecoder {
    pub fn new(settings: DecoderSettings) -> Result<Self> {
        settings.reject_weights_and_tuning(NAME)?;
        Ok(QdaDecoder {
            settings,
            model: None,
            snapshot: None,
        })
    }
}

impl Decoder for QdaDecoder {
    fn name(&self) -> &'static str {
        NAME
    }

    fn settings(&self) -> &DecoderSettings {
        &self.settings
    }

    fn fit(&mut self, data_train: &Array2<f64>, labels: &Array1<usize>, groups: &Array1<i64>) -> Result<()> {
        let ctx = FitContext::new(data_train, labels, groups)?;
        let mut rng = self.settings.rng();
        let balanced = self.settings.balance(ctx.data, ctx.labels, &mut rng)?;
        self.model = Some(QuadraticDiscriminant::fit(&balanced.data, &balanced.labels)?);
        self.snapshot = Some(TrainingSnapshot::new(balanced, groups));
        Ok(())
    }

    fn model(&self) -> Option<&dyn Classifier> {
        self.model.as_ref().map(|m| m as &dyn Classifier)
    }

    fn training_snapshot(&self) -> Option<&TrainingSnapshot> {
        self.snapshot.as_ref()
    }

    fn save_model(&self, path: &Path) -> Result<PathBuf> {
        save_bincode(NAME, require_fitted(&self.model)?, path, EXTENSION)
    }

    fn load_model(&mut self, path: &Path) -> Result<()> {
        self.model = Some(load_bincode(NAME, path)?);
        self.snapshot = None;
        Ok(())
    }
}
