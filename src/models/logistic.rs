//! L2-regularised logistic regression.
//!
//! Minimises `0.5 * ||w||^2 + C * sum_i s_i * loss_i` with an unpenalised
//! intercept. Binary problems are solved with Newton steps, multiclass
//! problems with a multinomial softmax model and backtracking gradient
//! descent.
use ndarray::{concatenate, s, Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use super::{
    check_fit_input, check_n_features, cholesky_solve, encode_labels, fit_classes, robust_cholesky,
    sigmoid, softmax_rows, Classifier,
};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    /// Inverse regularisation strength
    pub c: f64,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        LogisticParams {
            c: 1.0,
            max_iter: 100,
            tol: 1e-4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    classes: Vec<usize>,
    /// One row for binary problems, one row per class otherwise
    coef: Array2<f64>,
    intercept: Array1<f64>,
    params: LogisticParams,
    n_iter: usize,
}

/// Features with a trailing column of ones.
fn with_intercept(x: &Array2<f64>) -> Result<Array2<f64>> {
    let ones = Array2::ones((x.nrows(), 1));
    Ok(concatenate(Axis(1), &[x.view(), ones.view()])?)
}

impl LogisticRegression {
    pub fn fit(
        x: &Array2<f64>,
        y: &Array1<usize>,
        sample_weight: Option<&Array1<f64>>,
        params: &LogisticParams,
    ) -> Result<Self> {
        check_fit_input(x, y, sample_weight)?;
        let classes = fit_classes(y)?;
        let encoded = encode_labels(y, &classes)?;
        let weights = sample_weight
            .cloned()
            .unwrap_or_else(|| Array1::ones(x.nrows()));
        let xa = with_intercept(x)?;

        let (coef, intercept, n_iter) = if classes.len() == 2 {
            let target = Array1::from_iter(encoded.iter().map(|&c| c as f64));
            let (w, n_iter) = fit_binary(&xa, &target, &weights, params)?;
            let p = x.ncols();
            let coef = w.slice(s![..p]).to_owned().insert_axis(Axis(0));
            (coef, Array1::from_elem(1, w[p]), n_iter)
        } else {
            let (w, n_iter) = fit_multinomial(&xa, &encoded, classes.len(), &weights, params);
            let p = x.ncols();
            (w.slice(s![.., ..p]).to_owned(), w.column(p).to_owned(), n_iter)
        };

        if n_iter >= params.max_iter {
            log::warn!(
                "Logistic regression did not converge in {} iterations",
                params.max_iter
            );
        }
        log::trace!("Fitted logistic regression (C = {}) in {} iterations", params.c, n_iter);

        Ok(LogisticRegression {
            classes,
            coef,
            intercept,
            params: *params,
            n_iter,
        })
    }

    pub fn coef(&self) -> &Array2<f64> {
        &self.coef
    }

    pub fn intercept(&self) -> &Array1<f64> {
        &self.intercept
    }

    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    pub fn params(&self) -> &LogisticParams {
        &self.params
    }
}

fn binary_objective(xa: &Array2<f64>, w: &Array1<f64>, y: &Array1<f64>, s: &Array1<f64>, c: f64) -> f64 {
    let p = w.len() - 1;
    let penalty = 0.5 * w.slice(s![..p]).mapv(|v| v * v).sum();
    let z = xa.dot(w);
    let loss: f64 = z
        .iter()
        .zip(y.iter())
        .zip(s.iter())
        .map(|((&z, &y), &s)| {
            // log(1 + exp(z)) - y z, computed stably
            let softplus = if z > 0.0 { z + (-z).exp().ln_1p() } else { z.exp().ln_1p() };
            s * (softplus - y * z)
        })
        .sum();
    penalty + c * loss
}

fn fit_binary(
    xa: &Array2<f64>,
    y: &Array1<f64>,
    s: &Array1<f64>,
    params: &LogisticParams,
) -> Result<(Array1<f64>, usize)> {
    let dim = xa.ncols();
    let p = dim - 1;
    let mut w = Array1::<f64>::zeros(dim);
    let mut objective = binary_objective(xa, &w, y, s, params.c);

    for iter in 0..params.max_iter {
        let z = xa.dot(&w);
        let prob = z.mapv(sigmoid);
        let residual = (&prob - y) * s;
        let mut grad = xa.t().dot(&residual) * params.c;
        for j in 0..p {
            grad[j] += w[j];
        }
        if grad.iter().fold(0.0f64, |m, g| m.max(g.abs())) < params.tol {
            return Ok((w, iter));
        }

        let curvature = prob.mapv(|q| (q * (1.0 - q)).max(1e-12)) * s * params.c;
        let weighted = xa * &curvature.insert_axis(Axis(1));
        let mut hessian = xa.t().dot(&weighted);
        for j in 0..dim {
            hessian[[j, j]] += if j < p { 1.0 } else { 1e-10 };
        }
        let l = robust_cholesky(&hessian)?;
        let step = cholesky_solve(&l, &grad);

        let mut t = 1.0;
        loop {
            let candidate = &w - &(&step * t);
            let value = binary_objective(xa, &candidate, y, s, params.c);
            if value <= objective || t < 1e-8 {
                w = candidate;
                objective = value;
                break;
            }
            t *= 0.5;
        }
    }
    Ok((w, params.max_iter))
}

fn multinomial_state(
    xa: &Array2<f64>,
    w: &Array2<f64>,
    encoded: &[usize],
    s: &Array1<f64>,
    c: f64,
) -> (f64, Array2<f64>) {
    let p = w.ncols() - 1;
    let mut proba = xa.dot(&w.t());
    softmax_rows(&mut proba);

    let mut loss = 0.5 * w.slice(s![.., ..p]).mapv(|v| v * v).sum();
    for (i, &k) in encoded.iter().enumerate() {
        loss -= c * s[i] * proba[[i, k]].max(1e-300).ln();
    }

    let mut residual = proba;
    for (i, &k) in encoded.iter().enumerate() {
        residual[[i, k]] -= 1.0;
    }
    let residual = residual * &s.view().insert_axis(Axis(1));
    let mut grad = residual.t().dot(xa) * c;
    let mut penalised = grad.slice_mut(s![.., ..p]);
    penalised += &w.slice(s![.., ..p]);
    (loss, grad)
}

fn fit_multinomial(
    xa: &Array2<f64>,
    encoded: &[usize],
    n_classes: usize,
    s: &Array1<f64>,
    params: &LogisticParams,
) -> (Array2<f64>, usize) {
    let mut w = Array2::<f64>::zeros((n_classes, xa.ncols()));
    let (mut loss, mut grad) = multinomial_state(xa, &w, encoded, s, params.c);
    let mut step = 1.0;

    for iter in 0..params.max_iter {
        let grad_norm2 = grad.mapv(|g| g * g).sum();
        if grad.iter().fold(0.0f64, |m, g| m.max(g.abs())) < params.tol {
            return (w, iter);
        }
        // Armijo backtracking
        loop {
            let candidate = &w - &(&grad * step);
            let (new_loss, new_grad) = multinomial_state(xa, &candidate, encoded, s, params.c);
            if new_loss <= loss - 1e-4 * step * grad_norm2 || step < 1e-12 {
                w = candidate;
                loss = new_loss;
                grad = new_grad;
                break;
            }
            step *= 0.5;
        }
        step *= 2.0;
    }
    (w, params.max_iter)
}

impl Classifier for LogisticRegression {
    fn name(&self) -> &'static str {
        "lr"
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
            for (i, &z) in scores.column(0).iter().enumerate() {
                let q = sigmoid(z);
                proba[[i, 0]] = 1.0 - q;
                proba[[i, 1]] = q;
            }
            return Ok(proba);
        }
        let mut proba = scores;
        softmax_rows(&mut proba);
        Ok(proba)
    }
}
