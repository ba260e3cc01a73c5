//! Grouped, labeled feature tables.
//!
//! A `Dataset` bundles a feature matrix (rows are trials, columns are
//! features) with one class label and one group id per row. Groups mark
//! blocks of rows that must never be separated by a split, e.g. all
//! trials recorded in the same session.
use std::collections::BTreeMap;

use ndarray::{Array1, Array2, Axis};

use crate::error::{DecoderError, Result};

#[derive(Debug, Clone)]
pub struct Dataset {
    pub x: Array2<f64>,
    pub y: Array1<usize>,
    pub groups: Array1<i64>,
}

impl Dataset {
    pub fn new(x: Array2<f64>, y: Array1<usize>, groups: Array1<i64>) -> Result<Self> {
        check_rows(&x, &y, &groups)?;
        Ok(Dataset { x, y, groups })
    }

    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    /// Keep only the given rows, preserving alignment of features, labels and groups.
    pub fn select_rows(&self, indices: &[usize]) -> Dataset {
        Dataset {
            x: self.x.select(Axis(0), indices),
            y: self.y.select(Axis(0), indices),
            groups: self.groups.select(Axis(0), indices),
        }
    }

    /// Split rows into two datasets by group membership.
    pub fn partition_by_groups(&self, first: &[i64]) -> (Dataset, Dataset) {
        let (a, b): (Vec<usize>, Vec<usize>) =
            (0..self.n_samples()).partition(|&i| first.contains(&self.groups[i]));
        (self.select_rows(&a), self.select_rows(&b))
    }

    pub fn class_counts(&self) -> BTreeMap<usize, usize> {
        class_counts(&self.y)
    }

    pub fn log_summary(&self) {
        log::info!(
            "Dataset: {} samples, {} features, {} groups, class counts {:?}",
            self.n_samples(),
            self.n_features(),
            unique_groups(&self.groups).len(),
            self.class_counts()
        );
    }
}

/// Validate that features, labels and groups describe the same rows.
pub fn check_rows(x: &Array2<f64>, y: &Array1<usize>, groups: &Array1<i64>) -> Result<()> {
    if x.nrows() != y.len() || x.nrows() != groups.len() {
        return Err(DecoderError::Shape(format!(
            "data has {} rows, labels {} and groups {}",
            x.nrows(),
            y.len(),
            groups.len()
        )));
    }
    Ok(())
}

/// Number of rows per class label, ordered by label.
pub fn class_counts(y: &Array1<usize>) -> BTreeMap<usize, usize> {
    let mut counts = BTreeMap::new();
    for &label in y.iter() {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

/// Row indices per class label, ordered by label.
pub fn class_indices(y: &Array1<usize>) -> BTreeMap<usize, Vec<usize>> {
    let mut indices: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, &label) in y.iter().enumerate() {
        indices.entry(label).or_default().push(i);
    }
    indices
}

/// Distinct group ids in order of first appearance.
pub fn unique_groups(groups: &Array1<i64>) -> Vec<i64> {
    let mut seen = Vec::new();
    for &g in groups.iter() {
        if !seen.contains(&g) {
            seen.push(g);
        }
    }
    seen
}

/// Mean of the label vector, used by the balancing skip rule.
pub fn label_mean(y: &Array1<usize>) -> f64 {
    if y.is_empty() {
        return f64::NAN;
    }
    y.iter().map(|&v| v as f64).sum::<f64>() / y.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn new_rejects_mismatched_rows() {
        let x = Array2::<f64>::zeros((4, 2));
        let y = array![0, 1, 0];
        let groups = array![0, 0, 1, 1];
        assert!(matches!(
            Dataset::new(x, y, groups),
            Err(DecoderError::Shape(_))
        ));
    }

    #[test]
    fn partition_keeps_rows_aligned() {
        let x = Array2::from_shape_fn((6, 2), |(i, j)| (i * 10 + j) as f64);
        let y = array![0, 1, 0, 1, 0, 1];
        let groups = array![1, 1, 2, 2, 3, 3];
        let ds = Dataset::new(x, y, groups).unwrap();

        let (a, b) = ds.partition_by_groups(&[2]);
        assert_eq!(a.n_samples(), 2);
        assert_eq!(b.n_samples(), 4);
        assert_eq!(a.x[[0, 0]], 20.0);
        assert_eq!(a.groups.to_vec(), vec![2, 2]);
        assert!(b.groups.iter().all(|&g| g != 2));
    }

    #[test]
    fn label_mean_of_binary_labels() {
        assert_eq!(label_mean(&array![0, 1, 1, 0]), 0.5);
        assert!((label_mean(&array![0, 0, 0, 1]) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn unique_groups_preserve_first_appearance() {
        assert_eq!(unique_groups(&array![5, 3, 5, 1, 3]), vec![5, 3, 1]);
    }
}
