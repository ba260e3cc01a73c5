//! Group-aware splitting.
//!
//! All splitters operate on distinct group ids rather than rows: every row
//! of a group lands on the same side of a split.
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::dataset::check_rows;
use crate::error::{DecoderError, Result};

/// A single train/test split, as row indices.
#[derive(Debug, Clone)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Held-out set used for early stopping: always a single `(data, labels)` pair.
pub type EvalSet = Vec<(Array2<f64>, Array1<usize>)>;

/// Training partition plus its held-out evaluation set.
#[derive(Debug, Clone)]
pub struct ValidationSplit {
    pub data_train: Array2<f64>,
    pub labels_train: Array1<usize>,
    pub groups_train: Array1<i64>,
    pub eval_set: EvalSet,
}

fn sorted_unique(groups: &Array1<i64>) -> Vec<i64> {
    let mut unique = groups.to_vec();
    unique.sort_unstable();
    unique.dedup();
    unique
}

fn rows_of(groups: &Array1<i64>, selected: &[i64]) -> (Vec<usize>, Vec<usize>) {
    (0..groups.len()).partition(|&i| selected.binary_search(&groups[i]).is_ok())
}

/// Random group-level shuffle splits.
#[derive(Debug, Clone)]
pub struct GroupShuffleSplit {
    n_splits: usize,
    train_size: f64,
    seed: Option<u64>,
}

impl GroupShuffleSplit {
    pub fn new(n_splits: usize, train_size: f64) -> Self {
        Self {
            n_splits,
            train_size,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Generate splits; a fixed seed makes them reproducible, otherwise `rng` is used.
    pub fn split(&self, groups: &Array1<i64>, rng: &mut StdRng) -> Result<Vec<Fold>> {
        match self.seed {
            Some(seed) => self.split_with(groups, &mut StdRng::seed_from_u64(seed)),
            None => self.split_with(groups, rng),
        }
    }

    fn split_with(&self, groups: &Array1<i64>, rng: &mut StdRng) -> Result<Vec<Fold>> {
        if !(self.train_size > 0.0 && self.train_size < 1.0) {
            return Err(DecoderError::InvalidSplit(format!(
                "train_size must lie in (0, 1), got {}",
                self.train_size
            )));
        }
        let mut unique = sorted_unique(groups);
        let n_groups = unique.len();
        let n_train = (self.train_size * n_groups as f64).floor() as usize;
        if n_train == 0 || n_train == n_groups {
            return Err(DecoderError::InvalidSplit(format!(
                "{} groups with train_size {} leaves an empty partition",
                n_groups, self.train_size
            )));
        }

        let mut folds = Vec::with_capacity(self.n_splits);
        for _ in 0..self.n_splits {
            unique.shuffle(rng);
            let mut train_groups = unique[..n_train].to_vec();
            train_groups.sort_unstable();
            let (train, test) = rows_of(groups, &train_groups);
            folds.push(Fold { train, test });
        }
        Ok(folds)
    }
}

/// K folds of groups, balanced by row count.
#[derive(Debug, Clone)]
pub struct GroupKFold {
    n_splits: usize,
}

impl GroupKFold {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }

    pub fn split(&self, groups: &Array1<i64>) -> Result<Vec<Fold>> {
        let unique = sorted_unique(groups);
        if self.n_splits < 2 || unique.len() < self.n_splits {
            return Err(DecoderError::InvalidSplit(format!(
                "cannot build {} group folds from {} groups",
                self.n_splits,
                unique.len()
            )));
        }

        let mut sizes: Vec<(i64, usize)> = unique
            .iter()
            .map(|&g| (g, groups.iter().filter(|&&v| v == g).count()))
            .collect();
        // largest groups first, each to the currently lightest fold
        sizes.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut fold_rows = vec![0usize; self.n_splits];
        let mut fold_groups: Vec<Vec<i64>> = vec![Vec::new(); self.n_splits];
        for (group, size) in sizes {
            let lightest = (0..self.n_splits)
                .min_by_key(|&f| fold_rows[f])
                .unwrap_or(0);
            fold_rows[lightest] += size;
            fold_groups[lightest].push(group);
        }

        Ok(fold_groups
            .into_iter()
            .map(|mut test_groups| {
                test_groups.sort_unstable();
                let (test, train) = rows_of(groups, &test_groups);
                Fold { train, test }
            })
            .collect())
    }
}

/// Split data into a single training and validation set.
///
/// `train_fraction` of the distinct groups (not rows) end up in the training
/// partition. The validation part is returned as a one-element eval set.
pub fn validation_split(
    data: &Array2<f64>,
    labels: &Array1<usize>,
    groups: &Array1<i64>,
    train_fraction: f64,
    rng: &mut StdRng,
) -> Result<ValidationSplit> {
    check_rows(data, labels, groups)?;
    let folds = GroupShuffleSplit::new(1, train_fraction).split(groups, rng)?;
    let fold = &folds[0];

    log::trace!(
        "Validation split: {} training rows, {} validation rows",
        fold.train.len(),
        fold.test.len()
    );

    Ok(ValidationSplit {
        data_train: data.select(Axis(0), &fold.train),
        labels_train: labels.select(Axis(0), &fold.train),
        groups_train: groups.select(Axis(0), &fold.train),
        eval_set: vec![(
            data.select(Axis(0), &fold.test),
            labels.select(Axis(0), &fold.test),
        )],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn groups_of(rows: &[usize], groups: &Array1<i64>) -> HashSet<i64> {
        rows.iter().map(|&i| groups[i]).collect()
    }

    #[test]
    fn shuffle_split_keeps_groups_together() {
        let groups = Array1::from_shape_fn(50, |i| (i / 5) as i64);
        let mut rng = StdRng::seed_from_u64(1);
        let folds = GroupShuffleSplit::new(3, 0.66).split(&groups, &mut rng).unwrap();
        assert_eq!(folds.len(), 3);
        for fold in &folds {
            let train = groups_of(&fold.train, &groups);
            let test = groups_of(&fold.test, &groups);
            assert!(train.is_disjoint(&test));
            assert_eq!(train.len(), 6);
            assert_eq!(test.len(), 4);
            assert_eq!(fold.train.len() + fold.test.len(), 50);
        }
    }

    #[test]
    fn fixed_seed_reproduces_splits() {
        let groups = Array1::from_shape_fn(30, |i| (i % 10) as i64);
        let a = GroupShuffleSplit::new(3, 0.66)
            .with_seed(42)
            .split(&groups, &mut StdRng::seed_from_u64(1))
            .unwrap();
        let b = GroupShuffleSplit::new(3, 0.66)
            .with_seed(42)
            .split(&groups, &mut StdRng::seed_from_u64(2))
            .unwrap();
        for (fa, fb) in a.iter().zip(b.iter()) {
            assert_eq!(fa.train, fb.train);
        }
    }

    #[test]
    fn group_k_fold_covers_every_group_once() {
        let groups = Array1::from_vec(vec![0, 0, 0, 1, 1, 2, 3, 3, 3, 3, 4, 5]);
        let folds = GroupKFold::new(3).split(&groups).unwrap();
        assert_eq!(folds.len(), 3);
        let mut seen = Vec::new();
        for fold in &folds {
            let train = groups_of(&fold.train, &groups);
            let test = groups_of(&fold.test, &groups);
            assert!(train.is_disjoint(&test));
            seen.extend(test);
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn group_k_fold_needs_enough_groups() {
        let groups = Array1::from_vec(vec![0, 0, 1, 1]);
        assert!(matches!(
            GroupKFold::new(3).split(&groups),
            Err(DecoderError::InvalidSplit(_))
        ));
    }

    #[test]
    fn validation_split_returns_single_eval_set() {
        let data = Array2::from_shape_fn((40, 3), |(i, j)| (i * 3 + j) as f64);
        let labels = Array1::from_shape_fn(40, |i| i % 2);
        let groups = Array1::from_shape_fn(40, |i| (i / 4) as i64);
        let mut rng = StdRng::seed_from_u64(9);

        let split = validation_split(&data, &labels, &groups, 0.8, &mut rng).unwrap();
        assert_eq!(split.eval_set.len(), 1);
        assert_eq!(split.data_train.nrows(), 32);
        assert_eq!(split.eval_set[0].0.nrows(), 8);
        assert_eq!(split.labels_train.len(), split.data_train.nrows());

        let train_groups: HashSet<i64> = split.groups_train.iter().copied().collect();
        assert_eq!(train_groups.len(), 8);
        // every validation row belongs to a group absent from training
        let val_values: Vec<f64> = split.eval_set[0].0.column(0).to_vec();
        for v in val_values {
            let row = (v / 3.0) as usize;
            assert!(!train_groups.contains(&groups[row]));
        }
    }

    #[test]
    fn train_fraction_controls_group_ratio() {
        let data = Array2::zeros((100, 1));
        let labels = Array1::from_shape_fn(100, |i| i % 2);
        let groups = Array1::from_shape_fn(100, |i| (i / 5) as i64);
        let mut rng = StdRng::seed_from_u64(4);

        let half = validation_split(&data, &labels, &groups, 0.5, &mut rng).unwrap();
        let most = validation_split(&data, &labels, &groups, 0.8, &mut rng).unwrap();
        assert_eq!(half.data_train.nrows(), 50);
        assert_eq!(most.data_train.nrows(), 80);
    }

    #[test]
    fn single_group_cannot_be_split() {
        let data = Array2::zeros((4, 1));
        let labels = Array1::from_vec(vec![0, 1, 0, 1]);
        let groups = Array1::from_vec(vec![7, 7, 7, 7]);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            validation_split(&data, &labels, &groups, 0.8, &mut rng),
            Err(DecoderError::InvalidSplit(_))
        ));
    }
}
