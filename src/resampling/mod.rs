//! Class resampling capabilities used by the balancer.
//!
//! Every sampler follows the "auto" strategy: oversamplers raise each
//! non-majority class to the majority count, the undersampler lowers each
//! class to the minority count.
mod adasyn;
mod random_sampling;
mod smote;

pub use adasyn::Adasyn;
pub use random_sampling::{RandomOverSampler, RandomUnderSampler};
pub use smote::{Smote, SmoteVariant};

use ndarray::{concatenate, Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResampleError {
    /// The requested ratio yields no synthetic rows (ADASYN on data whose
    /// minority neighbourhoods contain no other class).
    #[error("No samples will be generated with the provided ratio settings.")]
    NoSamplesGenerated,

    #[error("Resampling needs at least 2 classes, got {0}")]
    TooFewClasses(usize),

    #[error("Class {class} has {n_samples} samples, need at least 2 to interpolate neighbours")]
    NotEnoughNeighbors { class: usize, n_samples: usize },
}

/// Capability contract: rebalance a labeled table.
pub trait Resampler: Send + Sync {
    fn name(&self) -> &'static str;

    fn fit_resample(
        &self,
        x: &Array2<f64>,
        y: &Array1<usize>,
        rng: &mut StdRng,
    ) -> Result<(Array2<f64>, Array1<usize>), ResampleError>;
}

fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(p, q)| (p - q) * (p - q)).sum()
}

/// The `k` rows of `candidates` closest to row `point`, excluding `point` itself.
pub(crate) fn nearest_neighbors(
    x: &Array2<f64>,
    point: usize,
    candidates: &[usize],
    k: usize,
) -> Vec<usize> {
    let origin = x.row(point);
    let mut distances: Vec<(usize, f64)> = candidates
        .iter()
        .filter(|&&c| c != point)
        .map(|&c| (c, squared_distance(origin, x.row(c))))
        .collect();
    distances.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    distances.into_iter().take(k).map(|(i, _)| i).collect()
}

/// Append synthetic rows to the original table.
pub(crate) fn stack_synthetic(
    x: &Array2<f64>,
    y: &Array1<usize>,
    synthetic_x: Vec<f64>,
    synthetic_y: Vec<usize>,
) -> (Array2<f64>, Array1<usize>) {
    if synthetic_y.is_empty() {
        return (x.clone(), y.clone());
    }
    let extra = Array2::from_shape_vec((synthetic_y.len(), x.ncols()), synthetic_x)
        .expect("synthetic rows have the feature width of the input");
    let x_out = concatenate(Axis(0), &[x.view(), extra.view()])
        .expect("synthetic rows have the feature width of the input");
    let y_out = concatenate(Axis(0), &[y.view(), Array1::from_vec(synthetic_y).view()])
        .expect("label vectors are one dimensional");
    (x_out, y_out)
}
