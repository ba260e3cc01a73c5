use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::Rng;

use super::{nearest_neighbors, stack_synthetic, ResampleError, Resampler};
use crate::dataset::class_indices;

/// ADASYN adaptive synthetic sampling: minority samples surrounded by other
/// classes receive proportionally more synthetic neighbours.
#[derive(Debug, Clone)]
pub struct Adasyn {
    n_neighbors: usize,
}

impl Adasyn {
    pub fn new() -> Self {
        Self { n_neighbors: 5 }
    }

    pub fn with_n_neighbors(mut self, k: usize) -> Self {
        self.n_neighbors = k.max(1);
        self
    }
}

impl Default for Adasyn {
    fn default() -> Self {
        Self::new()
    }
}

/// Distribute `total` over `weights` (summing to 1) so the parts add up exactly.
fn apportion(weights: &[f64], total: usize) -> Vec<usize> {
    let raw: Vec<f64> = weights.iter().map(|w| w * total as f64).collect();
    let mut counts: Vec<usize> = raw.iter().map(|r| r.floor() as usize).collect();
    let assigned: usize = counts.iter().sum();

    let mut order: Vec<usize> = (0..raw.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = raw[a] - raw[a].floor();
        let rb = raw[b] - raw[b].floor();
        rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal)
    });
    for &i in order.iter().take(total.saturating_sub(assigned)) {
        counts[i] += 1;
    }
    counts
}

impl Resampler for Adasyn {
    fn name(&self) -> &'static str {
        "adasyn"
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
        let all: Vec<usize> = (0..y.len()).collect();

        let mut synthetic_x = Vec::new();
        let mut synthetic_y = Vec::new();

        for (&class, members) in &indices {
            let n_to_generate = max_count - members.len();
            if n_to_generate == 0 {
                continue;
            }

            // Hardness: share of each sample's neighbourhood belonging to other classes
            let hardness: Vec<f64> = members
                .iter()
                .map(|&i| {
                    let nn = nearest_neighbors(x, i, &all, self.n_neighbors);
                    nn.iter().filter(|&&j| y[j] != class).count() as f64 / self.n_neighbors as f64
                })
                .collect();
            let total: f64 = hardness.iter().sum();
            if total == 0.0 {
                return Err(ResampleError::NoSamplesGenerated);
            }
            if members.len() < 2 {
                return Err(ResampleError::NotEnoughNeighbors {
                    class,
                    n_samples: members.len(),
                });
            }

            let weights: Vec<f64> = hardness.iter().map(|h| h / total).collect();
            let per_sample = apportion(&weights, n_to_generate);
            let k = self.n_neighbors.min(members.len() - 1);

            for (&seed_idx, &n_seed) in members.iter().zip(per_sample.iter()) {
                if n_seed == 0 {
                    continue;
                }
                let nn = nearest_neighbors(x, seed_idx, members, k);
                let seed = x.row(seed_idx);
                for _ in 0..n_seed {
                    let neighbor = x.row(nn[rng.gen_range(0..nn.len())]);
                    let gap: f64 = rng.gen();
                    synthetic_x.extend(seed.iter().zip(neighbor.iter()).map(|(&p, &n)| p + gap * (n - p)));
                    synthetic_y.push(class);
                }
            }
        }

        Ok(stack_synthetic(x, y, synthetic_x, synthetic_y))
    }
}
