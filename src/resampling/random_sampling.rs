use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use super::{ResampleError, Resampler};
use crate::dataset::class_indices;

/// Duplicate random rows of every non-majority class.
#[derive(Debug, Clone, Default)]
pub struct RandomOverSampler;

impl Resampler for RandomOverSampler {
    fn name(&self) -> &'static str {
        "oversample"
    }

    fn fit_resample(
        &self,
        x: &Array2<f64>,
        y: &Array1<usize>,
        rng: &mut StdRng,
    ) -> Result<(Array2<f64>, Array1<usize>), ResampleError> {
        let indices = class_indices(y);
        if indices.len() < 2 {
            return Err(ResampleError::TooFewClasses(indices.len()));
        }
        let max_count = indices.values().map(Vec::len).max().unwrap_or(0);

        let mut keep: Vec<usize> = (0..y.len()).collect();
        for members in indices.values() {
            for _ in members.len()..max_count {
                keep.push(members[rng.gen_range(0..members.len())]);
            }
        }
        Ok((x.select(Axis(0), &keep), y.select(Axis(0), &keep)))
    }
}

/// Drop random rows of every class down to the minority count.
#[derive(Debug, Clone, Default)]
pub struct RandomUnderSampler;

impl Resampler for RandomUnderSampler {
    fn name(&self) -> &'static str {
        "undersample"
    }

    fn fit_resample(
        &self,
        x: &Array2<f64>,
        y: &Array1<usize>,
        rng: &mut StdRng,
    ) -> Result<(Array2<f64>, Array1<usize>), ResampleError> {
        let indices = class_indices(y);
        if indices.len() < 2 {
            return Err(ResampleError::TooFewClasses(indices.len()));
        }
        let min_count = indices.values().map(Vec::len).min().unwrap_or(0);

        let mut keep = Vec::with_capacity(min_count * indices.len());
        for members in indices.values() {
            let mut chosen: Vec<usize> = members.choose_multiple(rng, min_count).copied().collect();
            chosen.sort_unstable();
            keep.extend(chosen);
        }
        Ok((x.select(Axis(0), &keep), y.select(Axis(0), &keep)))
    }
}
