//! Histogram boosting with depth-wise trees.
use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2};

use super::base::{load_bincode, save_bincode, DecoderSettings, FitContext, TrainingSnapshot};
use super::tuning::{fit_boosted, param, tune, InnerSplit};
use super::{require_fitted, Decoder};
use crate::error::Result;
use crate::models::{BoostingParams, Classifier, GradientBoosting};
use crate::optimizer::{HyperparameterBounds, Params};

pub const EXTENSION: &str = "xgb";

const NAME: &str = "xgb";
const N_ESTIMATORS: usize = 200;
const TUNING_ESTIMATORS: usize = 100;
const EARLY_STOPPING_ROUNDS: usize = 20;

#[derive(Debug, Clone)]
pub struct XgbDecoder {
    settings: DecoderSettings,
    model: Option<GradientBoosting>,
    snapshot: Option<TrainingSnapshot>,
}

impl XgbDecoder {
    pub fn new(settings: DecoderSettings) -> Self {
        XgbDecoder {
            settings,
            model: None,
            snapshot: None,
        }
    }

    pub fn default_params() -> BoostingParams {
        BoostingParams {
            n_estimators: N_ESTIMATORS,
            early_stopping_rounds: Some(EARLY_STOPPING_ROUNDS),
            ..BoostingParams::depth_wise()
        }
    }

    pub fn search_space() -> HyperparameterBounds {
        HyperparameterBounds::new(vec![
            ("learning_rate", 0.003, 0.3),
            ("max_depth", 4.0, 10.0),
            ("gamma", 0.0, 1.0),
            ("colsample_bytree", 0.4, 1.0),
            ("subsample", 0.4, 1.0),
        ])
    }

    /// Boosting parameters for a point of the search space. Depth is truncated.
    pub fn params_from(tuned: &Params, n_estimators: usize) -> BoostingParams {
        let defaults = Self::default_params();
        BoostingParams {
            n_estimators,
            learning_rate: param(tuned, "learning_rate", defaults.learning_rate),
            max_depth: param(tuned, "max_depth", defaults.max_depth as f64) as usize,
            gamma: param(tuned, "gamma", defaults.gamma),
            colsample_bytree: param(tuned, "colsample_bytree", defaults.colsample_bytree),
            subsample: param(tuned, "subsample", defaults.subsample),
            ..defaults
        }
    }

    pub fn booster(&self) -> Option<&GradientBoosting> {
        self.model.as_ref()
    }
}

impl Decoder for XgbDecoder {
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
            let settings = &self.settings;
            let tuned = tune(
                &ctx,
                &Self::search_space(),
                &InnerSplit::k_fold_default(),
                &mut rng,
                |candidate, fold, rng| {
                    let params = Self::params_from(candidate, TUNING_ESTIMATORS);
                    let (model, _) = fit_boosted(
                        settings,
                        &fold.data_train,
                        &fold.labels_train,
                        &fold.groups_train,
                        &params,
                        rng,
                    )?;
                    Ok(Box::new(model) as Box<dyn Classifier>)
                },
            )?;
            log::info!("{} tuned hyperparameters: {:?}", NAME, tuned);
            Self::params_from(&tuned, N_ESTIMATORS)
        } else {
            Self::default_params()
        };

        let (model, balanced) = fit_boosted(&self.settings, data_train, labels, groups, &params, &mut rng)?;
        log::debug!("{} stopped after {} rounds", NAME, model.n_rounds());
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
    use crate::models::TreeGrowth;
    use crate::scoring::ScoringMethod;

    fn noisy_blobs(n: usize) -> (Array2<f64>, Array1<usize>, Array1<i64>) {
        let labels = Array1::from_shape_fn(n, |i| i % 2);
        let data = Array2::from_shape_fn((n, 3), |(i, j)| {
            let centre = if labels[i] == 1 { 1.0 } else { -1.0 };
            centre * (j as f64 + 1.0) + (((i * 13 + j * 5) % 17) as f64 - 8.0) * 0.05
        });
        let groups = Array1::from_shape_fn(n, |i| (i / 8) as i64);
        (data, labels, groups)
    }

    #[test]
    fn tuned_depth_is_truncated() {
        let mut tuned = Params::new();
        tuned.insert("max_depth".to_string(), 6.9);
        tuned.insert("subsample".to_string(), 0.5);
        let params = XgbDecoder::params_from(&tuned, N_ESTIMATORS);
        assert_eq!(params.growth, TreeGrowth::DepthWise);
        assert_eq!(params.max_depth, 6);
        assert_eq!(params.subsample, 0.5);
        assert_eq!(params.early_stopping_rounds, Some(20));
    }

    #[test]
    fn search_space_lists_five_parameters() {
        let space = XgbDecoder::search_space();
        assert_eq!(space.len(), 5);
        assert!(space.iter().all(|(_, lo, hi)| lo < hi));
    }

    #[test]
    fn tuned_fit_separates_blobs() {
        let (data, labels, groups) = noisy_blobs(96);
        let settings = DecoderSettings::new(ScoringMethod::BalancedAccuracy, None, true).with_seed(Some(11));
        let mut decoder = XgbDecoder::new(settings);
        decoder.fit(&data, &labels, &groups).unwrap();
        assert!(decoder.get_score(&data, &labels).unwrap() > 0.9);
        let proba = decoder.predict_proba(&data).unwrap();
        assert_eq!(proba.dim(), (96, 2));
    }
}
