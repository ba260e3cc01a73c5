//! L2-regularised logistic regression.
use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;

use super::base::{load_bincode, save_bincode, DecoderSettings, FitContext, TrainingSnapshot};
use super::tuning::{param, tune, InnerSplit};
use super::{require_fitted, Decoder};
use crate::error::Result;
use crate::models::{Classifier, LogisticParams, LogisticRegression};
use crate::optimizer::HyperparameterBounds;

pub const EXTENSION: &str = "lr";

const NAME: &str = "lr";
const TUNED_MAX_ITER: usize = 500;

#[derive(Debug, Clone)]
pub struct LogisticDecoder {
    settings: DecoderSettings,
    model: Option<LogisticRegression>,
    snapshot: Option<TrainingSnapshot>,
}

impl LogisticDecoder {
    pub fn new(settings: DecoderSettings) -> Self {
        LogisticDecoder {
            settings,
            model: None,
            snapshot: None,
        }
    }

    pub fn search_space() -> HyperparameterBounds {
        HyperparameterBounds::new(vec![("C", 0.01, 1.0)])
    }

    pub fn logistic(&self) -> Option<&LogisticRegression> {
        self.model.as_ref()
    }

    /// Pick `C` by nested grouped cross-validation. Each fold is balanced
    /// and fitted in one shot, without an early-stopping split.
    fn tune_params(&self, ctx: &FitContext, rng: &mut StdRng) -> Result<LogisticParams> {
        let settings = &self.settings;
        let tuned = tune(
            ctx,
            &Self::search_space(),
            &InnerSplit::shuffle_default(),
            rng,
            |candidate, fold, rng| {
                let params = LogisticParams {
                    c: param(candidate, "C", 1.0),
                    max_iter: TUNED_MAX_ITER,
                    ..LogisticParams::default()
                };
                let balanced = settings.balance(&fold.data_train, &fold.labels_train, rng)?;
                let model = LogisticRegression::fit(
                    &balanced.data,
                    &balanced.labels,
                    balanced.sample_weight.as_ref(),
                    &params,
                )?;
                Ok(Box::new(model) as Box<dyn Classifier>)
            },
        )?;
        log::info!("{} tuned C = {:.4}", NAME, param(&tuned, "C", 1.0));
        Ok(LogisticParams {
            c: param(&tuned, "C", 1.0),
            max_iter: TUNED_MAX_ITER,
            ..LogisticParams::default()
        })
    }
}

impl Decoder for LogisticDecoder {
    fn name(&self) -> &'static str {
        NAME
    }

    fn settings(&self) -> &DecoderSettings {
        &self.settings
    }

    fn fit(&mut self, data_train: &Array2<f64>, labels: &Array1<usize>, groups: &Array1<i64>) -> Result<()> {
        let ctx = FitContext::new(data_train, labels, groups)?;
        let mut rng = self.settings.rng();
        let params = if self.settings.optimize {
            self.tune_params(&ctx, &mut rng)?
        } else {
            LogisticParams::default()
        };

        let balanced = self.settings.balance(ctx.data, ctx.labels, &mut rng)?;
        let model = LogisticRegression::fit(
            &balanced.data,
            &balanced.labels,
            balanced.sample_weight.as_ref(),
            &params,
        )?;
        log::debug!("{} converged in {} iterations", NAME, model.n_iter());
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::ScoringMethod;

    fn overlapping(n: usize) -> (Array2<f64>, Array1<usize>, Array1<i64>) {
        let labels = Array1::from_shape_fn(n, |i| usize::from(i % 4 == 0));
        let data = Array2::from_shape_fn((n, 2), |(i, j)| {
            let offset = if labels[i] == 1 { 1.0 } else { 0.0 };
            offset + (((i * 31 + j * 17) % 23) as f64 / 23.0 - 0.5)
        });
        let groups = Array1::from_shape_fn(n, |i| (i / 4) as i64);
        (data, labels, groups)
    }

    #[test]
    fn balance_weights_reach_the_final_fit() {
        let (data, labels, groups) = overlapping(120);
        let settings = DecoderSettings::new(ScoringMethod::BalancedAccuracy, Some("balance_weights"), false);
        let mut decoder = LogisticDecoder::new(settings);
        decoder.fit(&data, &labels, &groups).unwrap();

        let snapshot = decoder.training_snapshot().unwrap();
        assert_eq!(snapshot.labels.len(), 120);
        let weights = snapshot.sample_weight.as_ref().unwrap();
        assert!(weights.iter().all(|&w| w > 0.0));
        assert!(decoder.get_score(&data, &labels).unwrap() > 0.7);
    }

    #[test]
    fn tuning_keeps_c_within_bounds() {
        let (data, labels, groups) = overlapping(96);
        let settings = DecoderSettings::new(ScoringMethod::LogLoss, Some("oversample"), true).with_seed(Some(2));
        let mut decoder = LogisticDecoder::new(settings);
        decoder.fit(&data, &labels, &groups).unwrap();

        let params = decoder.logistic().unwrap().params();
        assert!(params.c >= 0.01 && params.c <= 1.0);
        assert_eq!(params.max_iter, 500);
        assert_eq!(decoder.decision_function(&data).unwrap().ncols(), 1);
    }
}
