//! Ordered boosting with symmetric (oblivious) trees.
use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2};

use super::base::{load_bincode, save_bincode, DecoderSettings, FitContext, TrainingSnapshot};
use super::tuning::{fit_boosted, param, tune, InnerSplit};
use super::{require_fitted, Decoder};
use crate::error::Result;
use crate::models::{BoostingParams, Classifier, GradientBoosting};
use crate::optimizer::{HyperparameterBounds, Params};

pub const EXTENSION: &str = "catboost";

const NAME: &str = "catboost";
const N_ESTIMATORS: usize = 200;
const TUNING_ESTIMATORS: usize = 100;
const EARLY_STOPPING_ROUNDS: usize = 25;

#[derive(Debug, Clone)]
pub struct CatBoostDecoder {
    settings: DecoderSettings,
    model: Option<GradientBoosting>,
    snapshot: Option<TrainingSnapshot>,
}

impl CatBoostDecoder {
    pub fn new(settings: DecoderSettings) -> Self {
        CatBoostDecoder {
            settings,
            model: None,
            snapshot: None,
        }
    }

    /// Untuned configuration: 200 trees, early stopping after 25 rounds.
    pub fn default_params() -> BoostingParams {
        BoostingParams {
            n_estimators: N_ESTIMATORS,
            early_stopping_rounds: Some(EARLY_STOPPING_ROUNDS),
            ..BoostingParams::oblivious()
        }
    }

    pub fn search_space() -> HyperparameterBounds {
        HyperparameterBounds::new(vec![
            ("max_depth", 4.0, 10.0),
            ("learning_rate", 0.003, 0.3),
            ("bagging_temperature", 0.0, 1.0),
            ("l2_leaf_reg", 1.0, 30.0),
            ("random_strength", 0.01, 1.0),
        ])
    }

    /// Boosting parameters for a point of the search space.
    pub fn params_from(tuned: &Params, n_estimators: usize) -> BoostingParams {
        let defaults = Self::default_params();
        BoostingParams {
            n_estimators,
            max_depth: param(tuned, "max_depth", defaults.max_depth as f64).round() as usize,
            learning_rate: param(tuned, "learning_rate", defaults.learning_rate),
            bagging_temperature: param(tuned, "bagging_temperature", defaults.bagging_temperature),
            reg_lambda: param(tuned, "l2_leaf_reg", defaults.reg_lambda),
            random_strength: param(tuned, "random_strength", defaults.random_strength),
            ..defaults
        }
    }

    pub fn booster(&self) -> Option<&GradientBoosting> {
        self.model.as_ref()
    }
}

impl Decoder for CatBoostDecoder {
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
                &InnerSplit::shuffle_default(),
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
        log::debug!(
            "{} kept {} rounds (best iteration {:?})",
            NAME,
            model.n_rounds(),
            model.best_iteration()
        );
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
    use ndarray::Array;

    fn separable(n: usize) -> (Array2<f64>, Array1<usize>, Array1<i64>) {
        let labels = Array1::from_shape_fn(n, |i| usize::from(i % 3 == 0));
        let data = Array::from_shape_fn((n, 2), |(i, j)| {
            let shift = if labels[i] == 1 { 2.0 } else { -2.0 };
            shift + ((i * 7 + j * 3) % 11) as f64 * 0.1
        });
        let groups = Array1::from_shape_fn(n, |i| (i % 10) as i64);
        (data, labels, groups)
    }

    #[test]
    fn tuned_point_maps_to_oblivious_params() {
        let mut tuned = Params::new();
        tuned.insert("max_depth".to_string(), 6.6);
        tuned.insert("l2_leaf_reg".to_string(), 12.0);
        let params = CatBoostDecoder::params_from(&tuned, TUNING_ESTIMATORS);
        assert_eq!(params.growth, TreeGrowth::Oblivious);
        assert_eq!(params.max_depth, 7);
        assert_eq!(params.reg_lambda, 12.0);
        assert_eq!(params.n_estimators, 100);
        assert_eq!(params.early_stopping_rounds, Some(25));
    }

    #[test]
    fn fits_and_predicts_separable_classes() {
        let (data, labels, groups) = separable(90);
        let settings = DecoderSettings::new(ScoringMethod::BalancedAccuracy, Some("oversample"), false)
            .with_seed(Some(5));
        let mut decoder = CatBoostDecoder::new(settings);
        let predictions = decoder.fit_and_predict(&data, &data, &labels, &groups).unwrap();
        assert_eq!(predictions.len(), 90);
        assert!(decoder.get_score(&data, &labels).unwrap() > 0.9);

        let booster = decoder.booster().unwrap();
        assert!(booster.n_rounds() <= N_ESTIMATORS);
        let snapshot = decoder.training_snapshot().unwrap();
        let ones = snapshot.labels.iter().filter(|&&l| l == 1).count();
        assert_eq!(ones * 2, snapshot.labels.len());
    }

    #[test]
    fn unfitted_decoder_refuses_to_predict() {
        let settings = DecoderSettings::new(ScoringMethod::LogLoss, None, false);
        let decoder = CatBoostDecoder::new(settings);
        assert!(decoder.predict(&Array2::zeros((1, 2))).is_err());
        assert!(decoder.save_model(Path::new("unused")).is_err());
    }
}
