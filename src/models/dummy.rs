use std::sync::atomic::{AtomicU64, Ordering};

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{check_fit_input, fit_classes, Classifier};
use crate::error::Result;

/// Chance-level baseline: predicts a class drawn uniformly at random.
///
/// A seeded dummy replays the same sequence of prediction calls: the n-th
/// `predict` draws from `seed + n`.
#[derive(Debug, Serialize, Deserialize)]
pub struct UniformDummy {
    classes: Vec<usize>,
    #[serde(default)]
    seed: Option<u64>,
    #[serde(skip)]
    draws: AtomicU64,
}

impl Clone for UniformDummy {
    fn clone(&self) -> Self {
        UniformDummy {
            classes: self.classes.clone(),
            seed: self.seed,
            draws: AtomicU64::new(self.draws.load(Ordering::Relaxed)),
        }
    }
}

impl UniformDummy {
    pub fn fit(x: &Array2<f64>, y: &Array1<usize>) -> Result<Self> {
        check_fit_input(x, y, None)?;
        Ok(UniformDummy {
            classes: fit_classes(y)?,
            seed: None,
            draws: AtomicU64::new(0),
        })
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self.draws = AtomicU64::new(0);
        self
    }

    fn draw_rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => {
                let call = self.draws.fetch_add(1, Ordering::Relaxed);
                StdRng::seed_from_u64(seed.wrapping_add(call))
            }
            None => StdRng::from_entropy(),
        }
    }
}

impl Classifier for UniformDummy {
    fn name(&self) -> &'static str {
        "dummy"
    }

    fn classes(&self) -> &[usize] {
        &self.classes
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        Ok(Array2::from_elem(
            (x.nrows(), self.classes.len()),
            1.0 / self.classes.len() as f64,
        ))
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let mut rng = self.draw_rng();
        Ok((0..x.nrows())
            .map(|_| self.classes[rng.gen_range(0..self.classes.len())])
            .collect())
    }
}
