use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2};

use super::base::{load_bincode, save_bincode, DecoderSettings, FitContext, TrainingSnapshot};
use super::{require_fitted, Decoder};
use crate::error::Result;
use crate::models::{Classifier, LinearDiscriminant};

pub const EXTENSION: &str = "lda";

const NAME: &str = "lda";

/// Shrinkage linear discriminant analysis.
#[derive(Debug, Clone)]
pub struct LdaDecoder {
    settings: DecoderSettings,
    model: Option<LinearDiscriminant>,
    snapshot: Option<TrainingSnapshot>,
}

impl LdaDecoder {
    /// Fails when sample-weight balancing or tuning is requested.
    pub fn new(settings: DecoderSettings) -> Result<Self> {
        settings.reject_weights_and_tuning(NAME)?;
        Ok(LdaDecoder {
            settings,
            model: None,
            snapshot: None,
        })
    }

    pub fn discriminant(&self) -> Option<&LinearDiscriminant> {
        self.model.as_ref()
    }
}

impl Decoder for LdaDecoder {
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
        let model = LinearDiscriminant::fit(&balanced.data, &balanced.labels)?;
        self.model = Some(model);
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
