//! Second-order gradient-boosted decision trees.
//!
//! Two tree growers share one boosting loop:
//!
//! * [`TreeGrowth::DepthWise`] grows ordinary binary trees level by level,
//!   pruning splits whose gain does not exceed `gamma`, with row
//!   (`subsample`) and per-tree column (`colsample_bytree`) sampling.
//! * [`TreeGrowth::Oblivious`] grows symmetric trees where every node of a
//!   level shares the same split. Split scores are perturbed with Gaussian
//!   noise scaled by `random_strength`, and rows are re-weighted each round
//!   with a Bayesian bootstrap controlled by `bagging_temperature`.
//!
//! Features are bucketed into quantile bins once per fit. Binary problems
//! boost a single logit; multiclass problems boost one tree per class per
//! round under a softmax link. When an evaluation set is supplied the loop
//! stops after `early_stopping_rounds` rounds without improvement of the
//! evaluation log-loss and the ensemble is truncated to its best round.
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;

use super::{check_fit_input, check_n_features, encode_labels, fit_classes, sigmoid, softmax_rows, Classifier};
use crate::error::{DecoderError, Result};

const PROBA_EPS: f64 = 1e-15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreeGrowth {
    DepthWise,
    Oblivious,
}

/// Hyperparameters of a boosting run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    pub growth: TreeGrowth,
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub early_stopping_rounds: Option<usize>,
    /// L2 regularisation of leaf values
    pub reg_lambda: f64,
    /// Minimum gain required to keep a split (depth-wise only)
    pub gamma: f64,
    pub min_child_weight: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub random_strength: f64,
    pub bagging_temperature: f64,
    pub max_bins: usize,
    pub seed: u64,
}

impl BoostingParams {
    /// Histogram depth-wise defaults.
    pub fn depth_wise() -> Self {
        BoostingParams {
            growth: TreeGrowth::DepthWise,
            n_estimators: 200,
            learning_rate: 0.3,
            max_depth: 6,
            early_stopping_rounds: None,
            reg_lambda: 1.0,
            gamma: 0.0,
            min_child_weight: 1.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            random_strength: 0.0,
            bagging_temperature: 0.0,
            max_bins: 64,
            seed: 0,
        }
    }

    /// Symmetric-tree defaults.
    pub fn oblivious() -> Self {
        BoostingParams {
            growth: TreeGrowth::Oblivious,
            n_estimators: 200,
            learning_rate: 0.1,
            max_depth: 6,
            early_stopping_rounds: None,
            reg_lambda: 3.0,
            gamma: 0.0,
            min_child_weight: 0.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            random_strength: 1.0,
            bagging_temperature: 1.0,
            max_bins: 64,
            seed: 0,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 || self.max_depth == 0 {
            return Err(DecoderError::Model(
                "n_estimators and max_depth must be positive".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0) {
            return Err(DecoderError::Model(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0)
            || !(self.colsample_bytree > 0.0 && self.colsample_bytree <= 1.0)
        {
            return Err(DecoderError::Model(
                "subsample and colsample_bytree must lie in (0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Trees
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf(f64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Tree {
    Nodes(Vec<Node>),
    /// One `(feature, threshold)` per level and `2^levels` leaf values.
    Oblivious {
        splits: Vec<(usize, f64)>,
        leaves: Vec<f64>,
    },
}

impl Tree {
    fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        match self {
            Tree::Nodes(nodes) => {
                let mut idx = 0;
                loop {
                    match &nodes[idx] {
                        Node::Leaf(value) => return *value,
                        Node::Split {
                            feature,
                            threshold,
                            left,
                            right,
                        } => {
                            idx = if row[*feature] <= *threshold { *left } else { *right };
                        }
                    }
                }
            }
            Tree::Oblivious { splits, leaves } => {
                let idx = splits
                    .iter()
                    .fold(0, |idx, &(f, t)| idx * 2 + usize::from(row[f] > t));
                leaves[idx]
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Binning
// ---------------------------------------------------------------------------

/// Quantile thresholds per feature and the bin of every training value.
///
/// A value `v` falls in bin `b` when exactly `b` thresholds are below it, so
/// `v <= thresholds[b]` holds iff `bin(v) <= b`.
struct Binned {
    thresholds: Vec<Vec<f64>>,
    bins: Vec<Vec<u16>>,
}

impl Binned {
    fn new(x: &Array2<f64>, max_bins: usize) -> Self {
        let max_bins = max_bins.clamp(2, u16::MAX as usize);
        let mut thresholds = Vec::with_capacity(x.ncols());
        let mut bins = Vec::with_capacity(x.ncols());

        for column in x.axis_iter(Axis(1)) {
            let mut values: Vec<f64> = column.iter().copied().filter(|v| v.is_finite()).collect();
            values.sort_by(|a, b| a.total_cmp(b));
            values.dedup();

            let mut cuts = Vec::new();
            if values.len() > 1 {
                if values.len() <= max_bins {
                    cuts.extend(values.windows(2).map(|w| 0.5 * (w[0] + w[1])));
                } else {
                    for q in 1..max_bins {
                        let idx = q * values.len() / max_bins;
                        cuts.push(0.5 * (values[idx - 1] + values[idx]));
                    }
                    cuts.dedup();
                }
            }

            let column_bins = column
                .iter()
                .map(|&v| cuts.partition_point(|&t| t < v) as u16)
                .collect();
            thresholds.push(cuts);
            bins.push(column_bins);
        }

        Binned { thresholds, bins }
    }

    fn n_bins(&self, feature: usize) -> usize {
        self.thresholds[feature].len() + 1
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    bin: usize,
    gain: f64,
}

fn leaf_score(g: f64, h: f64, lambda: f64) -> f64 {
    g * g / (h + lambda)
}

/// Gradients and hessians for one output, already multiplied by row weights.
struct TreeInput<'a> {
    binned: &'a Binned,
    grad: &'a [f64],
    hess: &'a [f64],
    features: &'a [usize],
    params: &'a BoostingParams,
}

impl<'a> TreeInput<'a> {
    fn histogram(&self, rows: &[usize], feature: usize) -> (Vec<f64>, Vec<f64>) {
        let n_bins = self.binned.n_bins(feature);
        let mut hist_g = vec![0.0; n_bins];
        let mut hist_h = vec![0.0; n_bins];
        let bins = &self.binned.bins[feature];
        for &r in rows {
            let b = bins[r] as usize;
            hist_g[b] += self.grad[r];
            hist_h[b] += self.hess[r];
        }
        (hist_g, hist_h)
    }

    fn leaf_value(&self, rows: &[usize]) -> f64 {
        let g: f64 = rows.iter().map(|&r| self.grad[r]).sum();
        let h: f64 = rows.iter().map(|&r| self.hess[r]).sum();
        -g / (h + self.params.reg_lambda) * self.params.learning_rate
    }

    fn best_split(&self, rows: &[usize]) -> Option<SplitCandidate> {
        let lambda = self.params.reg_lambda;
        let g_total: f64 = rows.iter().map(|&r| self.grad[r]).sum();
        let h_total: f64 = rows.iter().map(|&r| self.hess[r]).sum();
        let parent = leaf_score(g_total, h_total, lambda);

        let mut best: Option<SplitCandidate> = None;
        for &feature in self.features {
            let (hist_g, hist_h) = self.histogram(rows, feature);
            let (mut gl, mut hl) = (0.0, 0.0);
            for bin in 0..hist_g.len() - 1 {
                gl += hist_g[bin];
                hl += hist_h[bin];
                let (gr, hr) = (g_total - gl, h_total - hl);
                if hl < self.params.min_child_weight || hr < self.params.min_child_weight {
                    continue;
                }
                if hl <= 0.0 || hr <= 0.0 {
                    continue;
                }
                let gain = 0.5 * (leaf_score(gl, hl, lambda) + leaf_score(gr, hr, lambda) - parent)
                    - self.params.gamma;
                if best.map_or(true, |b| gain > b.gain) {
                    best = Some(SplitCandidate { feature, bin, gain });
                }
            }
        }
        best.filter(|b| b.gain > 0.0)
    }

    fn grow_depth_wise(&self, rows: Vec<usize>) -> Tree {
        let mut nodes = Vec::new();
        self.grow_node(rows, 0, &mut nodes);
        Tree::Nodes(nodes)
    }

    fn grow_node(&self, rows: Vec<usize>, depth: usize, nodes: &mut Vec<Node>) -> usize {
        let idx = nodes.len();
        let split = if depth < self.params.max_depth && rows.len() >= 2 {
            self.best_split(&rows)
        } else {
            None
        };

        let Some(split) = split else {
            nodes.push(Node::Leaf(self.leaf_value(&rows)));
            return idx;
        };

        let bins = &self.binned.bins[split.feature];
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.into_iter().partition(|&r| bins[r] as usize <= split.bin);

        // reserve the slot, children are appended after it
        nodes.push(Node::Leaf(0.0));
        let left = self.grow_node(left_rows, depth + 1, nodes);
        let right = self.grow_node(right_rows, depth + 1, nodes);
        nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: self.binned.thresholds[split.feature][split.bin],
            left,
            right,
        };
        idx
    }

    fn grow_oblivious(&self, rows: &[usize], rng: &mut StdRng) -> Tree {
        let lambda = self.params.reg_lambda;
        let mut leaf_of = vec![0usize; rows.len()];
        let mut splits: Vec<(usize, f64)> = Vec::new();

        for level in 0..self.params.max_depth {
            let n_leaves = 1usize << level;
            let mut candidates: Vec<SplitCandidate> = Vec::new();

            for &feature in self.features {
                let n_bins = self.binned.n_bins(feature);
                if n_bins < 2 {
                    continue;
                }
                let bins = &self.binned.bins[feature];
                let mut hist_g = vec![vec![0.0; n_bins]; n_leaves];
                let mut hist_h = vec![vec![0.0; n_bins]; n_leaves];
                for (pos, &r) in rows.iter().enumerate() {
                    let b = bins[r] as usize;
                    hist_g[leaf_of[pos]][b] += self.grad[r];
                    hist_h[leaf_of[pos]][b] += self.hess[r];
                }
                let totals: Vec<(f64, f64)> = (0..n_leaves)
                    .map(|l| (hist_g[l].iter().sum(), hist_h[l].iter().sum()))
                    .collect();

                let mut left = vec![(0.0, 0.0); n_leaves];
                for bin in 0..n_bins - 1 {
                    let mut gain = 0.0;
                    for l in 0..n_leaves {
                        left[l].0 += hist_g[l][bin];
                        left[l].1 += hist_h[l][bin];
                        let (gl, hl) = left[l];
                        let (gr, hr) = (totals[l].0 - gl, totals[l].1 - hl);
                        gain += leaf_score(gl, hl, lambda) + leaf_score(gr, hr, lambda)
                            - leaf_score(totals[l].0, totals[l].1, lambda);
                    }
                    candidates.push(SplitCandidate {
                        feature,
                        bin,
                        gain: 0.5 * gain,
                    });
                }
            }

            if candidates.is_empty() {
                break;
            }

            let noise_scale = self.params.random_strength * score_spread(&candidates);
            let noise = Normal::new(0.0, 1.0).ok();
            let mut best: Option<(f64, SplitCandidate)> = None;
            for candidate in candidates {
                let jitter = match (&noise, noise_scale > 0.0) {
                    (Some(normal), true) => noise_scale * rng.sample(normal),
                    _ => 0.0,
                };
                let noisy = candidate.gain + jitter;
                if best.map_or(true, |(score, _)| noisy > score) {
                    best = Some((noisy, candidate));
                }
            }

            let Some((_, chosen)) = best else { break };
            if chosen.gain <= 0.0 {
                break;
            }
            let bins = &self.binned.bins[chosen.feature];
            for (pos, &r) in rows.iter().enumerate() {
                leaf_of[pos] = leaf_of[pos] * 2 + usize::from(bins[r] as usize > chosen.bin);
            }
            splits.push((chosen.feature, self.binned.thresholds[chosen.feature][chosen.bin]));
        }

        let n_leaves = 1usize << splits.len();
        let mut g = vec![0.0; n_leaves];
        let mut h = vec![0.0; n_leaves];
        for (pos, &r) in rows.iter().enumerate() {
            g[leaf_of[pos]] += self.grad[r];
            h[leaf_of[pos]] += self.hess[r];
        }
        let leaves = g
            .iter()
            .zip(h.iter())
            .map(|(&g, &h)| -g / (h + lambda) * self.params.learning_rate)
            .collect();
        Tree::Oblivious { splits, leaves }
    }
}

/// Standard deviation of candidate gains, the scale of split-score noise.
fn score_spread(candidates: &[SplitCandidate]) -> f64 {
    let n = candidates.len() as f64;
    let mean = candidates.iter().map(|c| c.gain).sum::<f64>() / n;
    let var = candidates.iter().map(|c| (c.gain - mean).powi(2)).sum::<f64>() / n;
    var.sqrt()
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// A fitted boosted ensemble.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoosting {
    params: BoostingParams,
    classes: Vec<usize>,
    n_features: usize,
    base_score: Vec<f64>,
    /// One tree per output per round.
    rounds: Vec<Vec<Tree>>,
    best_iteration: Option<usize>,
}

impl GradientBoosting {
    /// Fit an ensemble.
    ///
    /// # Arguments
    ///
    /// * `x` - Training features
    /// * `y` - Training labels
    /// * `sample_weight` - Optional per-row weights
    /// * `eval_set` - Held-out `(data, labels)` used for early stopping
    /// * `params` - Hyperparameters
    pub fn fit(
        x: &Array2<f64>,
        y: &Array1<usize>,
        sample_weight: Option<&Array1<f64>>,
        eval_set: Option<&(Array2<f64>, Array1<usize>)>,
        params: &BoostingParams,
    ) -> Result<Self> {
        params.validate()?;
        check_fit_input(x, y, sample_weight)?;
        let classes = fit_classes(y)?;
        let encoded = encode_labels(y, &classes)?;
        let n = x.nrows();
        let n_features = x.ncols();
        if n_features == 0 {
            return Err(DecoderError::Shape("cannot fit on a table without features".to_string()));
        }
        let n_outputs = if classes.len() == 2 { 1 } else { classes.len() };
        let weights: Vec<f64> = match sample_weight {
            Some(w) => w.to_vec(),
            None => vec![1.0; n],
        };

        let base_score = prior_margins(&encoded, &weights, classes.len());
        let binned = Binned::new(x, params.max_bins);
        let mut rng = StdRng::seed_from_u64(params.seed);

        let mut margins = Array2::from_shape_fn((n, n_outputs), |(_, k)| base_score[k]);

        let eval = match eval_set {
            Some((x_val, y_val)) => {
                check_n_features("eval set", n_features, x_val)?;
                let targets: Vec<Option<usize>> =
                    y_val.iter().map(|l| classes.binary_search(l).ok()).collect();
                let val_margins =
                    Array2::from_shape_fn((x_val.nrows(), n_outputs), |(_, k)| base_score[k]);
                Some((x_val, targets, val_margins))
            }
            None => None,
        };
        let mut eval = eval.filter(|(x_val, _, _)| x_val.nrows() > 0);
        let patience = params.early_stopping_rounds.filter(|_| eval.is_some());

        let mut rounds: Vec<Vec<Tree>> = Vec::with_capacity(params.n_estimators);
        let mut best_loss = f64::INFINITY;
        let mut best_round = 0;

        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];
        let all_features: Vec<usize> = (0..n_features).collect();

        for round in 0..params.n_estimators {
            let proba = margins_to_proba(&margins);
            let rows = sample_rows(params, n, &mut rng);
            let row_weights = bootstrap_weights(params, n, &mut rng);
            let features = sample_features(params, &all_features, &mut rng);

            let mut trees = Vec::with_capacity(n_outputs);
            for k in 0..n_outputs {
                for i in 0..n {
                    let (p, target) = if n_outputs == 1 {
                        (proba[[i, 1]], f64::from(u8::from(encoded[i] == 1)))
                    } else {
                        (proba[[i, k]], f64::from(u8::from(encoded[i] == k)))
                    };
                    let w = weights[i] * row_weights.as_ref().map_or(1.0, |rw| rw[i]);
                    grad[i] = (p - target) * w;
                    hess[i] = (p * (1.0 - p)).max(1e-16) * w;
                }
                let input = TreeInput {
                    binned: &binned,
                    grad: &grad,
                    hess: &hess,
                    features: &features,
                    params,
                };
                let tree = match params.growth {
                    TreeGrowth::DepthWise => input.grow_depth_wise(rows.clone()),
                    TreeGrowth::Oblivious => input.grow_oblivious(&rows, &mut rng),
                };
                trees.push(tree);
            }

            for (k, tree) in trees.iter().enumerate() {
                for (i, row) in x.axis_iter(Axis(0)).enumerate() {
                    margins[[i, k]] += tree.predict_row(row);
                }
            }

            if let Some((x_val, targets, val_margins)) = eval.as_mut() {
                for (k, tree) in trees.iter().enumerate() {
                    for (i, row) in x_val.axis_iter(Axis(0)).enumerate() {
                        val_margins[[i, k]] += tree.predict_row(row);
                    }
                }
                let loss = margin_log_loss(val_margins, targets);
                if loss < best_loss {
                    best_loss = loss;
                    best_round = round + 1;
                }
            }
            rounds.push(trees);

            if let Some(patience) = patience {
                if rounds.len() - best_round >= patience {
                    log::trace!(
                        "Early stopping at round {}, best round {} with eval log-loss {:.5}",
                        round + 1,
                        best_round,
                        best_loss
                    );
                    break;
                }
            }
        }

        let best_iteration = if eval.is_some() {
            rounds.truncate(best_round.max(1));
            Some(rounds.len() - 1)
        } else {
            None
        };

        log::debug!(
            "Fitted {:?} boosting with {} rounds for {} classes",
            params.growth,
            rounds.len(),
            classes.len()
        );

        Ok(GradientBoosting {
            params: params.clone(),
            classes,
            n_features,
            base_score,
            rounds,
            best_iteration,
        })
    }

    /// Number of boosting rounds kept in the ensemble.
    pub fn n_rounds(&self) -> usize {
        self.rounds.len()
    }

    /// Zero-based index of the best round when an eval set was used.
    pub fn best_iteration(&self) -> Option<usize> {
        self.best_iteration
    }

    pub fn params(&self) -> &BoostingParams {
        &self.params
    }

    fn margins(&self, x: &Array2<f64>) -> Array2<f64> {
        let n_outputs = self.base_score.len();
        let mut margins = Array2::from_shape_fn((x.nrows(), n_outputs), |(_, k)| self.base_score[k]);
        for (i, row) in x.axis_iter(Axis(0)).enumerate() {
            for trees in &self.rounds {
                for (k, tree) in trees.iter().enumerate() {
                    margins[[i, k]] += tree.predict_row(row);
                }
            }
        }
        margins
    }
}

impl Classifier for GradientBoosting {
    fn name(&self) -> &'static str {
        match self.params.growth {
            TreeGrowth::DepthWise => "xgb",
            TreeGrowth::Oblivious => "catboost",
        }
    }

    fn classes(&self) -> &[usize] {
        &self.classes
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        check_n_features(self.name(), self.n_features, x)?;
        Ok(margins_to_proba(&self.margins(x)))
    }
}

/// Starting margins from the weighted class priors.
fn prior_margins(encoded: &[usize], weights: &[f64], n_classes: usize) -> Vec<f64> {
    let mut mass = vec![0.0; n_classes];
    for (&c, &w) in encoded.iter().zip(weights.iter()) {
        mass[c] += w;
    }
    let total: f64 = mass.iter().sum();
    let priors: Vec<f64> = mass
        .iter()
        .map(|m| (m / total).clamp(1e-6, 1.0 - 1e-6))
        .collect();
    if n_classes == 2 {
        vec![(priors[1] / priors[0]).ln()]
    } else {
        priors.iter().map(|p| p.ln()).collect()
    }
}

/// Binary margins hold one logit column; the output always has one column per class.
fn margins_to_proba(margins: &Array2<f64>) -> Array2<f64> {
    if margins.ncols() == 1 {
        let mut proba = Array2::zeros((margins.nrows(), 2));
        for (i, &m) in margins.column(0).iter().enumerate() {
            let p = sigmoid(m);
            proba[[i, 0]] = 1.0 - p;
            proba[[i, 1]] = p;
        }
        proba
    } else {
        let mut proba = margins.clone();
        softmax_rows(&mut proba);
        proba
    }
}

fn margin_log_loss(margins: &Array2<f64>, targets: &[Option<usize>]) -> f64 {
    let proba = margins_to_proba(margins);
    let total: f64 = targets
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let p = t.map_or(0.0, |c| proba[[i, c]]);
            -p.clamp(PROBA_EPS, 1.0 - PROBA_EPS).ln()
        })
        .sum();
    total / targets.len() as f64
}

fn sample_rows(params: &BoostingParams, n: usize, rng: &mut StdRng) -> Vec<usize> {
    if params.growth == TreeGrowth::DepthWise && params.subsample < 1.0 {
        let count = ((n as f64 * params.subsample).ceil() as usize).clamp(1, n);
        let mut rows = sample(rng, n, count).into_vec();
        rows.sort_unstable();
        rows
    } else {
        (0..n).collect()
    }
}

fn sample_features(params: &BoostingParams, all: &[usize], rng: &mut StdRng) -> Vec<usize> {
    if params.growth == TreeGrowth::DepthWise && params.colsample_bytree < 1.0 && !all.is_empty() {
        let count = ((all.len() as f64 * params.colsample_bytree).ceil() as usize).clamp(1, all.len());
        let mut features = sample(rng, all.len(), count).into_vec();
        features.sort_unstable();
        features
    } else {
        all.to_vec()
    }
}

/// Bayesian bootstrap multipliers `(-ln u)^temperature`.
fn bootstrap_weights(params: &BoostingParams, n: usize, rng: &mut StdRng) -> Option<Vec<f64>> {
    if params.growth != TreeGrowth::Oblivious || params.bagging_temperature <= 0.0 {
        return None;
    }
    Some(
        (0..n)
            .map(|_| {
                let u: f64 = rng.gen_range(f64::EPSILON..1.0);
                (-u.ln()).powf(params.bagging_temperature)
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs(n_per_class: usize, n_classes: usize, seed: u64) -> (Array2<f64>, Array1<usize>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let n = n_per_class * n_classes;
        let x = Array2::from_shape_fn((n, 3), |(i, j)| {
            let class = i / n_per_class;
            let center = if j == class % 3 { 3.0 } else { 0.0 };
            center + rng.gen_range(-1.0..1.0)
        });
        let y = Array1::from_shape_fn(n, |i| i / n_per_class);
        (x, y)
    }

    fn accuracy(pred: &Array1<usize>, y: &Array1<usize>) -> f64 {
        pred.iter().zip(y.iter()).filter(|(a, b)| a == b).count() as f64 / y.len() as f64
    }

    #[test]
    fn depth_wise_learns_separable_binary_data() {
        let (x, y) = blobs(40, 2, 1);
        let params = BoostingParams {
            n_estimators: 30,
            ..BoostingParams::depth_wise()
        };
        let model = GradientBoosting::fit(&x, &y, None, None, &params).unwrap();
        assert_eq!(model.n_rounds(), 30);
        assert!(model.best_iteration().is_none());
        assert!(accuracy(&model.predict(&x).unwrap(), &y) > 0.95);
    }

    #[test]
    fn oblivious_trees_handle_multiclass() {
        let (x, y) = blobs(30, 3, 2);
        let params = BoostingParams {
            n_estimators: 40,
            max_depth: 4,
            ..BoostingParams::oblivious()
        };
        let model = GradientBoosting::fit(&x, &y, None, None, &params).unwrap();
        let proba = model.predict_proba(&x).unwrap();
        assert_eq!(proba.dim(), (90, 3));
        for row in proba.axis_iter(Axis(0)) {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
        assert!(accuracy(&model.predict(&x).unwrap(), &y) > 0.9);
        assert!(matches!(
            model.decision_function(&x),
            Err(DecoderError::Unsupported { backend: "catboost", .. })
        ));
    }

    #[test]
    fn early_stopping_truncates_to_best_round() {
        // labels carry no signal, so the eval loss stops improving quickly
        let mut rng = StdRng::seed_from_u64(3);
        let x = Array2::from_shape_fn((120, 4), |_| rng.gen_range(0.0..1.0));
        let y = Array1::from_shape_fn(120, |_| rng.gen_range(0..2usize));
        let x_val = Array2::from_shape_fn((60, 4), |_| rng.gen_range(0.0..1.0));
        let y_val = Array1::from_shape_fn(60, |_| rng.gen_range(0..2usize));

        let params = BoostingParams {
            early_stopping_rounds: Some(5),
            ..BoostingParams::depth_wise()
        };
        let eval_set = (x_val, y_val);
        let model = GradientBoosting::fit(&x, &y, None, Some(&eval_set), &params).unwrap();
        assert!(model.n_rounds() < 200);
        assert_eq!(model.best_iteration(), Some(model.n_rounds() - 1));
    }

    #[test]
    fn featureless_table_is_a_shape_error() {
        let x = Array2::<f64>::zeros((10, 0));
        let y = Array1::from_shape_fn(10, |i| i % 2);
        let params = BoostingParams {
            colsample_bytree: 0.5,
            ..BoostingParams::depth_wise()
        };
        assert!(matches!(
            GradientBoosting::fit(&x, &y, None, None, &params),
            Err(DecoderError::Shape(_))
        ));

        let mut rng = StdRng::seed_from_u64(0);
        assert!(sample_features(&params, &[], &mut rng).is_empty());
    }

    #[test]
    fn sample_weights_shift_predictions() {
        let x = Array2::from_shape_vec((4, 1), vec![0.0, 0.0, 0.0, 0.0]).unwrap();
        let y = Array1::from_vec(vec![0, 0, 1, 1]);
        let heavy_ones = Array1::from_vec(vec![1.0, 1.0, 5.0, 5.0]);
        let params = BoostingParams {
            n_estimators: 5,
            ..BoostingParams::depth_wise()
        };
        let model = GradientBoosting::fit(&x, &y, Some(&heavy_ones), None, &params).unwrap();
        let proba = model.predict_proba(&x).unwrap();
        assert!(proba[[0, 1]] > 0.7);
    }

    #[test]
    fn invalid_params_are_rejected() {
        let (x, y) = blobs(5, 2, 0);
        let params = BoostingParams {
            learning_rate: 0.0,
            ..BoostingParams::depth_wise()
        };
        assert!(matches!(
            GradientBoosting::fit(&x, &y, None, None, &params),
            Err(DecoderError::Model(_))
        ));
    }
}
