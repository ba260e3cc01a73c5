use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2};
use rand::Rng;

use super::base::{load_bincode, save_bincode, DecoderSettings, FitContext, TrainingSnapshot};
use super::{require_fitted, Decoder};
use crate::error::Result;
use crate::models::{Classifier, UniformDummy};

pub const EXTENSION: &str = "dummy";

const NAME: &str = "dummy";

/// Repetitions averaged by [`DummyDecoder::get_score`].
pub const SCORE_REPEATS: usize = 100;

/// Chance-level baseline predicting uniformly random classes.
#[derive(Debug, Clone)]
pub struct DummyDecoder {
    settings: DecoderSettings,
    model: Option<UniformDummy>,
    snapshot: Option<TrainingSnapshot>,
}

impl DummyDecoder {
    pub fn new(settings: DecoderSettings) -> Self {
        DummyDecoder {
            settings,
            model: None,
            snapshot: None,
        }
    }
}

impl Decoder for DummyDecoder {
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
        let prediction_seed = self.settings.seed.map(|_| rng.gen::<u64>());
        self.model = Some(UniformDummy::fit(&balanced.data, &balanced.labels)?.with_seed(prediction_seed));
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

    /// Mean of repeated scores, since every prediction is a fresh draw.
    fn get_score(&self, data_test: &Array2<f64>, label_test: &Array1<usize>) -> Result<f64> {
        let model = self.fitted()?;
        let mut total = 0.0;
        for _ in 0..SCORE_REPEATS {
            total += self.settings.scoring.score(model, data_test, label_test)?;
        }
        Ok(total / SCORE_REPEATS as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::ScoringMethod;

    #[test]
    fn log_loss_of_uniform_baseline_is_ln_classes() {
        let data = Array2::zeros((30, 1));
        let labels = Array1::from_shape_fn(30, |i| i % 3);
        let groups = Array1::from_shape_fn(30, |i| i as i64);
        let settings = DecoderSettings::new(ScoringMethod::LogLoss, None, false);
        let mut decoder = DummyDecoder::new(settings);
        decoder.fit(&data, &labels, &groups).unwrap();
        let score = decoder.get_score(&data, &labels).unwrap();
        assert!((score - 3f64.ln()).abs() < 1e-9);
    }
}
