use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::Rng;

use super::{nearest_neighbors, stack_synthetic, ResampleError, Resampler};
use crate::dataset::class_indices;

/// SMOTE variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmoteVariant {
    /// Interpolate from every minority sample
    Regular,
    /// Interpolate only from minority samples in danger (borderline-1)
    Borderline1,
}

/// Synthetic minority oversampling by interpolation between same-class neighbours.
#[derive(Debug, Clone)]
pub struct Smote {
    k_neighbors: usize,
    m_neighbors: usize,
    variant: SmoteVariant,
}

impl Smote {
    pub fn new() -> Self {
        Self {
            k_neighbors: 5,
            m_neighbors: 10,
            variant: SmoteVariant::Regular,
        }
    }

    pub fn borderline() -> Self {
        Self {
            variant: SmoteVariant::Borderline1,
            ..Self::new()
        }
    }

    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k.max(1);
        self
    }

    /// Minority samples whose m-neighbourhood is at least half, but not entirely,
    /// made of other classes.
    fn danger_samples(&self, x: &Array2<f64>, y: &Array1<usize>, members: &[usize], class: usize) -> Vec<usize> {
        let all: Vec<usize> = (0..y.len()).collect();
        members
            .iter()
            .copied()
            .filter(|&i| {
                let nn = nearest_neighbors(x, i, &all, self.m_neighbors);
                let n_other = nn.iter().filter(|&&j| y[j] != class).count();
                2 * n_other >= nn.len() && n_other < nn.len()
            })
            .collect()
    }
}

impl Default for Smote {
    fn default() -> Self {
        Self::new()
    }
}

impl Resampler for Smote {
    fn name(&self) -> &'static str {
        match self.variant {
            SmoteVariant::Regular => "smote",
            SmoteVariant::Borderline1 => "borderline_smote",
        }
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

        let mut synthetic_x = Vec::new();
        let mut synthetic_y = Vec::new();

        for (&class, members) in &indices {
            let n_to_generate = max_count - members.len();
            if n_to_generate == 0 {
                continue;
            }
            if members.len() < 2 {
                return Err(ResampleError::NotEnoughNeighbors {
                    class,
                    n_samples: members.len(),
                });
            }
            let k = self.k_neighbors.min(members.len() - 1);

            let seeds = match self.variant {
                SmoteVariant::Regular => members.clone(),
                SmoteVariant::Borderline1 => {
                    let danger = self.danger_samples(x, y, members, class);
                    if danger.is_empty() {
                        log::debug!(
                            "No borderline samples for class {}, interpolating from all {} samples",
                            class,
                            members.len()
                        );
                        members.clone()
                    } else {
                        danger
                    }
                }
            };
            let neighbors: Vec<Vec<usize>> = seeds
                .iter()
                .map(|&s| nearest_neighbors(x, s, members, k))
                .collect();

            for _ in 0..n_to_generate {
                let pick = rng.gen_range(0..seeds.len());
                let seed = x.row(seeds[pick]);
                let nn = &neighbors[pick];
                let neighbor = x.row(nn[rng.gen_range(0..nn.len())]);
                let gap: f64 = rng.gen();
                synthetic_x.extend(seed.iter().zip(neighbor.iter()).map(|(&p, &n)| p + gap * (n - p)));
                synthetic_y.push(class);
            }
        }

        Ok(stack_synthetic(x, y, synthetic_x, synthetic_y))
    }
}
