//! Black-box maximisation of hyperparameter objectives.
//!
//! [`BayesianOptimizer`] models the objective with a Gaussian process
//! (Matern 5/2 kernel on the unit-scaled search box) and picks each new
//! point by maximising expected improvement over a random candidate pool.
use std::collections::BTreeMap;

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

use crate::error::{DecoderError, Result};
use crate::models::{cholesky_solve, robust_cholesky};

/// Named hyperparameter values.
pub type Params = BTreeMap<String, f64>;

/// Ordered closed intervals `[low, high]` per hyperparameter.
#[derive(Debug, Clone, PartialEq)]
pub struct HyperparameterBounds {
    bounds: Vec<(&'static str, f64, f64)>,
}

impl HyperparameterBounds {
    pub fn new(bounds: Vec<(&'static str, f64, f64)>) -> Self {
        HyperparameterBounds { bounds }
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(&'static str, f64, f64)> {
        self.bounds.iter()
    }

    fn validate(&self) -> Result<()> {
        if self.bounds.is_empty() {
            return Err(DecoderError::Optimization("empty search space".to_string()));
        }
        for &(name, low, high) in &self.bounds {
            if !(low.is_finite() && high.is_finite() && low <= high) {
                return Err(DecoderError::Optimization(format!(
                    "invalid bounds for {}: [{}, {}]",
                    name, low, high
                )));
            }
        }
        Ok(())
    }

    /// Map a point of the unit cube onto the search box.
    fn to_params(&self, unit: &[f64]) -> Params {
        self.bounds
            .iter()
            .zip(unit.iter())
            .map(|(&(name, low, high), &u)| (name.to_string(), low + u * (high - low)))
            .collect()
    }
}

/// One evaluated point.
#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    pub params: Params,
    pub target: f64,
}

#[derive(Debug, Clone)]
pub struct OptimizationResult {
    pub best: Trial,
    pub history: Vec<Trial>,
}

/// Black-box maximiser of a scalar objective over a box.
pub trait Maximizer: Send + Sync {
    fn maximize(
        &self,
        objective: &mut dyn FnMut(&Params) -> Result<f64>,
        bounds: &HyperparameterBounds,
    ) -> Result<OptimizationResult>;
}

/// Gaussian-process Bayesian optimisation with expected improvement.
#[derive(Debug, Clone)]
pub struct BayesianOptimizer {
    pub init_points: usize,
    pub n_iter: usize,
    pub n_candidates: usize,
    /// Exploration margin of the expected improvement
    pub xi: f64,
    pub seed: Option<u64>,
}

impl Default for BayesianOptimizer {
    fn default() -> Self {
        BayesianOptimizer {
            init_points: 10,
            n_iter: 20,
            n_candidates: 1000,
            xi: 0.0,
            seed: None,
        }
    }
}

impl BayesianOptimizer {
    pub fn new(init_points: usize, n_iter: usize) -> Self {
        BayesianOptimizer {
            init_points,
            n_iter,
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    fn suggest(&self, points: &[Vec<f64>], targets: &[f64], dim: usize, rng: &mut StdRng) -> Result<Vec<f64>> {
        let gp = GaussianProcess::fit(points, targets)?;
        let best_idx = argmax(targets);
        let best_target = gp.standardize(targets[best_idx]);
        let normal = Normal::new(0.0, 1.0).map_err(|e| DecoderError::Optimization(e.to_string()))?;

        let mut best: Option<(f64, Vec<f64>)> = None;
        for c in 0..self.n_candidates {
            // a tenth of the pool explores around the incumbent
            let candidate: Vec<f64> = if c % 10 == 0 {
                points[best_idx]
                    .iter()
                    .map(|&u| (u + rng.gen_range(-0.05..0.05)).clamp(0.0, 1.0))
                    .collect()
            } else {
                (0..dim).map(|_| rng.gen::<f64>()).collect()
            };
            let (mean, var) = gp.predict(&candidate);
            let ei = expected_improvement(mean, var.sqrt(), best_target, self.xi, &normal);
            if best.as_ref().map_or(true, |(score, _)| ei > *score) {
                best = Some((ei, candidate));
            }
        }

        let candidate = best.map(|(_, c)| c).unwrap_or_default();
        let duplicate = points
            .iter()
            .any(|p| p.iter().zip(candidate.iter()).all(|(a, b)| (a - b).abs() < 1e-9));
        if candidate.len() != dim || duplicate {
            return Ok((0..dim).map(|_| rng.gen::<f64>()).collect());
        }
        Ok(candidate)
    }
}

impl Maximizer for BayesianOptimizer {
    fn maximize(
        &self,
        objective: &mut dyn FnMut(&Params) -> Result<f64>,
        bounds: &HyperparameterBounds,
    ) -> Result<OptimizationResult> {
        bounds.validate()?;
        let dim = bounds.len();
        let mut rng = self.rng();
        let mut points: Vec<Vec<f64>> = Vec::new();
        let mut targets: Vec<f64> = Vec::new();
        let mut history = Vec::new();

        let total = self.init_points.max(1) + self.n_iter;
        for step in 0..total {
            let unit = if step < self.init_points.max(1) {
                (0..dim).map(|_| rng.gen::<f64>()).collect()
            } else {
                self.suggest(&points, &targets, dim, &mut rng)?
            };
            let params = bounds.to_params(&unit);
            let target = objective(&params)?;
            if !target.is_finite() {
                return Err(DecoderError::Optimization(format!(
                    "objective returned {} for {:?}",
                    target, params
                )));
            }
            log::debug!("Bayesian step {}/{}: target {:.5} at {:?}", step + 1, total, target, params);
            points.push(unit);
            targets.push(target);
            history.push(Trial { params, target });
        }

        let best = history[argmax(&targets)].clone();
        log::info!("Best target {:.5} with {:?}", best.target, best.params);
        Ok(OptimizationResult { best, history })
    }
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

fn expected_improvement(mean: f64, std: f64, best: f64, xi: f64, normal: &Normal) -> f64 {
    if std <= 1e-12 {
        return 0.0;
    }
    let improvement = mean - best - xi;
    let z = improvement / std;
    improvement * normal.cdf(z) + std * normal.pdf(z)
}

fn matern52(a: &[f64], b: &[f64], length_scale: f64) -> f64 {
    let dist = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt();
    let r = 5.0f64.sqrt() * dist / length_scale;
    (1.0 + r + r * r / 3.0) * (-r).exp()
}

fn forward_solve(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();
    let mut z = Array1::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[[i, k]] * z[k];
        }
        z[i] = sum / l[[i, i]];
    }
    z
}

/// GP regression on standardized targets.
struct GaussianProcess<'a> {
    points: &'a [Vec<f64>],
    length_scale: f64,
    chol: Array2<f64>,
    alpha: Array1<f64>,
    y_mean: f64,
    y_std: f64,
}

const GP_NOISE: f64 = 1e-6;
const LENGTH_SCALES: [f64; 6] = [0.05, 0.1, 0.2, 0.5, 1.0, 2.0];

impl<'a> GaussianProcess<'a> {
    /// Fit, choosing the length scale with the best log marginal likelihood.
    fn fit(points: &'a [Vec<f64>], targets: &[f64]) -> Result<Self> {
        let n = targets.len();
        let y_mean = targets.iter().sum::<f64>() / n as f64;
        let var = targets.iter().map(|t| (t - y_mean).powi(2)).sum::<f64>() / n as f64;
        let y_std = if var > 0.0 { var.sqrt() } else { 1.0 };
        let y = Array1::from_iter(targets.iter().map(|t| (t - y_mean) / y_std));

        let mut best: Option<(f64, GaussianProcess<'a>)> = None;
        for &length_scale in &LENGTH_SCALES {
            let k = Array2::from_shape_fn((n, n), |(i, j)| {
                matern52(&points[i], &points[j], length_scale) + if i == j { GP_NOISE } else { 0.0 }
            });
            let chol = robust_cholesky(&k)?;
            let alpha = cholesky_solve(&chol, &y);
            let log_likelihood = -0.5 * y.dot(&alpha) - chol.diag().iter().map(|v| v.ln()).sum::<f64>();
            if best.as_ref().map_or(true, |(ll, _)| log_likelihood > *ll) {
                best = Some((
                    log_likelihood,
                    GaussianProcess {
                        points,
                        length_scale,
                        chol,
                        alpha,
                        y_mean,
                        y_std,
                    },
                ));
            }
        }
        best.map(|(_, gp)| gp)
            .ok_or_else(|| DecoderError::Optimization("could not fit surrogate".to_string()))
    }

    fn standardize(&self, target: f64) -> f64 {
        (target - self.y_mean) / self.y_std
    }

    /// Posterior mean and variance in standardized units.
    fn predict(&self, x: &[f64]) -> (f64, f64) {
        let k_star = Array1::from_iter(self.points.iter().map(|p| matern52(p, x, self.length_scale)));
        let mean = k_star.dot(&self.alpha);
        let v = forward_solve(&self.chol, &k_star);
        let var = (1.0 - v.dot(&v)).max(0.0);
        (mean, var)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_maximum_of_smooth_function() {
        let optimizer = BayesianOptimizer::new(5, 15).with_seed(7);
        let bounds = HyperparameterBounds::new(vec![("x", -2.0, 2.0)]);
        let mut objective = |p: &Params| -> Result<f64> { Ok(-(p["x"] - 0.7).powi(2)) };
        let result = optimizer.maximize(&mut objective, &bounds).unwrap();
        assert_eq!(result.history.len(), 20);
        assert!((result.best.params["x"] - 0.7).abs() < 0.15, "{:?}", result.best);
    }

    #[test]
    fn every_trial_respects_bounds() {
        let optimizer = BayesianOptimizer::new(4, 4).with_seed(1);
        let bounds = HyperparameterBounds::new(vec![("a", 0.003, 0.3), ("b", 4.0, 10.0)]);
        let mut objective = |p: &Params| -> Result<f64> { Ok(p["a"] * p["b"]) };
        let result = optimizer.maximize(&mut objective, &bounds).unwrap();
        for trial in &result.history {
            assert!((0.003..=0.3).contains(&trial.params["a"]));
            assert!((4.0..=10.0).contains(&trial.params["b"]));
        }
        let max = result.history.iter().map(|t| t.target).fold(f64::MIN, f64::max);
        assert_eq!(result.best.target, max);
    }

    #[test]
    fn objective_errors_abort_the_search() {
        let optimizer = BayesianOptimizer::new(2, 2).with_seed(0);
        let bounds = HyperparameterBounds::new(vec![("c", 0.01, 1.0)]);
        let mut objective = |_: &Params| -> Result<f64> { Err(DecoderError::Model("boom".to_string())) };
        assert!(matches!(
            optimizer.maximize(&mut objective, &bounds),
            Err(DecoderError::Model(_))
        ));
    }

    #[test]
    fn expected_improvement_is_zero_without_uncertainty() {
        let normal = Normal::new(0.0, 1.0).unwrap();
        assert_eq!(expected_improvement(1.0, 0.0, 0.0, 0.0, &normal), 0.0);
        assert!(expected_improvement(0.0, 1.0, 0.0, 0.0, &normal) > 0.0);
    }
}
