//! Nested grouped cross-validation used as the hyperparameter objective.
//!
//! Folds are evaluated in parallel. Each fold draws from its own generator
//! seeded with `base_seed + fold_index`, so the objective value does not
//! depend on thread scheduling.
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::base::{DecoderSettings, FitContext};
use crate::balancing::Balanced;
use crate::error::Result;
use crate::models::{BoostingParams, Classifier, GradientBoosting};
use crate::optimizer::{BayesianOptimizer, HyperparameterBounds, Maximizer, Params};
use crate::scoring::log_loss;
use crate::splitting::{Fold, GroupKFold, GroupShuffleSplit};

/// Outer splitter of the tuning objective.
#[derive(Debug, Clone)]
pub(crate) enum InnerSplit {
    Shuffle(GroupShuffleSplit),
    KFold(GroupKFold),
}

impl InnerSplit {
    /// `GroupShuffleSplit(3, train_size 0.66, seed 42)`
    pub(crate) fn shuffle_default() -> Self {
        InnerSplit::Shuffle(GroupShuffleSplit::new(3, 0.66).with_seed(42))
    }

    pub(crate) fn k_fold_default() -> Self {
        InnerSplit::KFold(GroupKFold::new(3))
    }

    fn folds(&self, groups: &Array1<i64>, rng: &mut StdRng) -> Result<Vec<Fold>> {
        match self {
            InnerSplit::Shuffle(splitter) => splitter.split(groups, rng),
            InnerSplit::KFold(splitter) => splitter.split(groups),
        }
    }
}

/// One fold of the tuning objective.
pub(crate) struct FoldData {
    pub data_train: Array2<f64>,
    pub labels_train: Array1<usize>,
    pub groups_train: Array1<i64>,
    pub data_test: Array2<f64>,
    pub labels_test: Array1<usize>,
}

impl FoldData {
    fn new(ctx: &FitContext, fold: &Fold) -> Self {
        FoldData {
            data_train: ctx.data.select(Axis(0), &fold.train),
            labels_train: ctx.labels.select(Axis(0), &fold.train),
            groups_train: ctx.groups.select(Axis(0), &fold.train),
            data_test: ctx.data.select(Axis(0), &fold.test),
            labels_test: ctx.labels.select(Axis(0), &fold.test),
        }
    }
}

/// Negative mean log-loss of `fit_fold` over the folds of `splitter`.
pub(crate) fn negative_cv_log_loss<F>(
    ctx: &FitContext,
    splitter: &InnerSplit,
    base_seed: u64,
    fit_fold: &F,
) -> Result<f64>
where
    F: Fn(&FoldData, &mut StdRng) -> Result<Box<dyn Classifier>> + Sync,
{
    let mut split_rng = StdRng::seed_from_u64(base_seed);
    let folds = splitter.folds(ctx.groups, &mut split_rng)?;

    let losses = folds
        .par_iter()
        .enumerate()
        .map(|(i, fold)| {
            let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(i as u64 + 1));
            let data = FoldData::new(ctx, fold);
            let model = fit_fold(&data, &mut rng)?;
            let proba = model.predict_proba(&data.data_test)?;
            Ok(log_loss(&data.labels_test, &proba, model.classes()))
        })
        .collect::<Result<Vec<f64>>>()?;

    Ok(-losses.iter().sum::<f64>() / losses.len() as f64)
}

/// Run the Bayesian search and return the best hyperparameters.
pub(crate) fn tune<F>(
    ctx: &FitContext,
    bounds: &HyperparameterBounds,
    splitter: &InnerSplit,
    rng: &mut StdRng,
    fit_fold: F,
) -> Result<Params>
where
    F: Fn(&Params, &FoldData, &mut StdRng) -> Result<Box<dyn Classifier>> + Sync,
{
    let optimizer = BayesianOptimizer::default().with_seed(rng.gen());
    let base_seed: u64 = rng.gen();
    log::info!(
        "Tuning {} hyperparameters on {} samples",
        bounds.len(),
        ctx.data.nrows()
    );

    let mut objective = |params: &Params| {
        let fit = |fold: &FoldData, rng: &mut StdRng| fit_fold(params, fold, rng);
        negative_cv_log_loss(ctx, splitter, base_seed, &fit)
    };
    let result = optimizer.maximize(&mut objective, bounds)?;
    Ok(result.best.params)
}

/// Split off an early-stopping set, balance the rest and fit a boosted model.
pub(crate) fn fit_boosted(
    settings: &DecoderSettings,
    data: &Array2<f64>,
    labels: &Array1<usize>,
    groups: &Array1<i64>,
    params: &BoostingParams,
    rng: &mut StdRng,
) -> Result<(GradientBoosting, Balanced)> {
    let split = settings.validation_split(data, labels, groups, rng)?;
    let balanced = settings.balance(&split.data_train, &split.labels_train, rng)?;
    let params = BoostingParams {
        seed: rng.gen(),
        ..params.clone()
    };
    let model = GradientBoosting::fit(
        &balanced.data,
        &balanced.labels,
        balanced.sample_weight.as_ref(),
        split.eval_set.first(),
        &params,
    )?;
    Ok((model, balanced))
}

/// Read a tuned value, falling back to `default` when absent.
pub(crate) fn param(params: &Params, name: &str, default: f64) -> f64 {
    params.get(name).copied().unwrap_or(default)
}
