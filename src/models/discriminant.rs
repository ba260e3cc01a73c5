//! Linear and quadratic discriminant analysis.
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use super::{
    check_fit_input, check_n_features, cholesky_solve, encode_labels, fit_classes, robust_cholesky,
    sigmoid, softmax_rows, Classifier,
};
use crate::error::{DecoderError, Result};

/// Per-class rows, empirical priors and means.
struct ClassStats {
    members: Vec<Array2<f64>>,
    priors: Vec<f64>,
    means: Array2<f64>,
}

fn class_stats(x: &Array2<f64>, encoded: &[usize], n_classes: usize) -> Result<ClassStats> {
    let mut members = Vec::with_capacity(n_classes);
    let mut means = Array2::zeros((n_classes, x.ncols()));
    for k in 0..n_classes {
        let rows: Vec<usize> = (0..encoded.len()).filter(|&i| encoded[i] == k).collect();
        let xk = x.select(Axis(0), &rows);
        let mean = xk
            .mean_axis(Axis(0))
            .ok_or_else(|| DecoderError::Model(format!("class {} has no samples", k)))?;
        means.row_mut(k).assign(&mean);
        members.push(xk);
    }
    let n = encoded.len() as f64;
    let priors = members.iter().map(|m| m.nrows() as f64 / n).collect();
    Ok(ClassStats {
        members,
        priors,
        means,
    })
}

/// Ledoit-Wolf shrinkage intensity for centered data.
pub(crate) fn ledoit_wolf_shrinkage(x: &Array2<f64>) -> f64 {
    let (n, p) = x.dim();
    if n == 0 || p == 0 {
        return 0.0;
    }
    let (n, p) = (n as f64, p as f64);
    let x2 = x.mapv(|v| v * v);
    let emp_cov_trace = x2.sum_axis(Axis(0)) / n;
    let mu = emp_cov_trace.sum() / p;

    let beta_ = x2.t().dot(&x2).sum();
    let delta_ = x.t().dot(x).mapv(|v| v * v).sum() / (n * n);

    let mut beta = (beta_ / n - delta_) / (p * n);
    let delta = (delta_ - 2.0 * mu * emp_cov_trace.sum() + p * mu * mu) / p;
    beta = beta.min(delta);
    if beta == 0.0 || delta == 0.0 {
        0.0
    } else {
        beta / delta
    }
}

/// Shrunk covariance estimated on standardized features, then rescaled.
fn shrunk_covariance(xk: &Array2<f64>, mean: &Array1<f64>) -> Array2<f64> {
    let n = xk.nrows() as f64;
    let centered = xk - mean;
    let scale = centered
        .mapv(|v| v * v)
        .mean_axis(Axis(0))
        .map(|var| var.mapv(|v| if v > 0.0 { v.sqrt() } else { 1.0 }))
        .unwrap_or_else(|| Array1::ones(xk.ncols()));
    let standardized = &centered / &scale;

    let shrinkage = ledoit_wolf_shrinkage(&standardized);
    let p = standardized.ncols();
    let emp_cov = standardized.t().dot(&standardized) / n;
    let mu = emp_cov.diag().sum() / p as f64;
    let mut cov = emp_cov * (1.0 - shrinkage);
    cov.diag_mut().mapv_inplace(|v| v + shrinkage * mu);

    for i in 0..p {
        for j in 0..p {
            cov[[i, j]] *= scale[i] * scale[j];
        }
    }
    cov
}

/// Least-squares LDA with automatic covariance shrinkage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearDiscriminant {
    classes: Vec<usize>,
    /// (n_classes, n_features), or a single row for binary problems
    coef: Array2<f64>,
    intercept: Array1<f64>,
}

impl LinearDiscriminant {
    pub fn fit(x: &Array2<f64>, y: &Array1<usize>) -> Result<Self> {
        check_fit_input(x, y, None)?;
        let classes = fit_classes(y)?;
        let encoded = encode_labels(y, &classes)?;
        let stats = class_stats(x, &encoded, classes.len())?;

        let p = x.ncols();
        let mut cov = Array2::<f64>::zeros((p, p));
        for (k, xk) in stats.members.iter().enumerate() {
            let mean = stats.means.row(k).to_owned();
            cov = cov + shrunk_covariance(xk, &mean) * stats.priors[k];
        }
        let l = robust_cholesky(&cov)?;

        let n_classes = classes.len();
        let mut coef = Array2::zeros((n_classes, p));
        let mut intercept = Array1::zeros(n_classes);
        for k in 0..n_classes {
            let mean = stats.means.row(k).to_owned();
            let w = cholesky_solve(&l, &mean);
            intercept[k] = -0.5 * mean.dot(&w) + stats.priors[k].ln();
            coef.row_mut(k).assign(&w);
        }

        if n_classes == 2 {
            let diff = &coef.row(1) - &coef.row(0);
            coef = diff.insert_axis(Axis(0));
            intercept = Array1::from_elem(1, intercept[1] - intercept[0]);
        }
        log::trace!("Fitted LDA on {} samples, {} classes", x.nrows(), n_classes);

        Ok(LinearDiscriminant {
            classes,
            coef,
            intercept,
        })
    }

    pub fn coef(&self) -> &Array2<f64> {
        &self.coef
    }

    pub fn intercept(&self) -> &Array1<f64> {
        &self.intercept
    }
}

impl Classifier for LinearDiscriminant {
    fn name(&self) -> &'static str {
        "lda"
    }

    fn classes(&self) -> &[usize] {
        &self.classes
    }

    fn decision_function(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        check_n_features(self.name(), self.coef.ncols(), x)?;
        Ok(x.dot(&self.coef.t()) + &self.intercept)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let scores = self.decision_function(x)?;
        if scores.ncols() == 1 {
            let mut proba = Array2::zeros((x.nrows(), 2));
            for (i, &s) in scores.column(0).iter().enumerate() {
                let p = sigmoid(s);
                proba[[i, 0]] = 1.0 - p;
                proba[[i, 1]] = p;
            }
            return Ok(proba);
        }
        let mut proba = scores;
        softmax_rows(&mut proba);
        Ok(proba)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClassGaussian {
    mean: Array1<f64>,
    /// Lower Cholesky factor of the class covariance
    chol: Array2<f64>,
    log_det: f64,
    log_prior: f64,
}

/// Quadratic discriminant analysis: one Gaussian per class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuadraticDiscriminant {
    classes: Vec<usize>,
    n_features: usize,
    gaussians: Vec<ClassGaussian>,
}

impl QuadraticDiscriminant {
    pub fn fit(x: &Array2<f64>, y: &Array1<usize>) -> Result<Self> {
        check_fit_input(x, y, None)?;
        let classes = fit_classes(y)?;
        let encoded = encode_labels(y, &classes)?;
        let stats = class_stats(x, &encoded, classes.len())?;

        let mut gaussians = Vec::with_capacity(classes.len());
        for (k, xk) in stats.members.iter().enumerate() {
            if xk.nrows() < 2 {
                return Err(DecoderError::Model(format!(
                    "class {} needs at least two samples for a covariance estimate",
                    classes[k]
                )));
            }
            let mean = stats.means.row(k).to_owned();
            let centered = xk - &mean;
            let cov = centered.t().dot(&centered) / (xk.nrows() as f64 - 1.0);
            let chol = robust_cholesky(&cov)?;
            let log_det = 2.0 * chol.diag().iter().map(|v| v.ln()).sum::<f64>();
            gaussians.push(ClassGaussian {
                mean,
                chol,
                log_det,
                log_prior: stats.priors[k].ln(),
            });
        }

        Ok(QuadraticDiscriminant {
            classes,
            n_features: x.ncols(),
            gaussians,
        })
    }

    fn log_likelihoods(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut out = Array2::zeros((x.nrows(), self.gaussians.len()));
        for (i, row) in x.axis_iter(Axis(0)).enumerate() {
            for (k, g) in self.gaussians.iter().enumerate() {
                let diff = &row - &g.mean;
                let solved = cholesky_solve(&g.chol, &diff);
                let mahalanobis = diff.dot(&solved);
                out[[i, k]] = -0.5 * (g.log_det + mahalanobis) + g.log_prior;
            }
        }
        out
    }
}

impl Classifier for QuadraticDiscriminant {
    fn name(&self) -> &'static str {
        "qda"
    }

    fn classes(&self) -> &[usize] {
        &self.classes
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        check_n_features(self.name(), self.n_features, x)?;
        let mut proba = self.log_likelihoods(x);
        softmax_rows(&mut proba);
        Ok(proba)
    }
}
