use std::collections::HashSet;

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;

use pte_decode::balancing::compute_sample_weight;
use pte_decode::dataset::class_counts;
use pte_decode::splitting::validation_split;
use pte_decode::{balance_samples, DecoderError};

/// 70/30 two-class table with features that differ between classes.
fn imbalanced(n: usize) -> (Array2<f64>, Array1<usize>) {
    let y = Array1::from_shape_fn(n, |i| usize::from(i % 10 < 3));
    let x = Array2::from_shape_fn((n, 3), |(i, j)| {
        let centre = if y[i] == 1 { 2.0 } else { -2.0 };
        centre + ((i * (j + 3)) % 13) as f64 * 0.1
    });
    (x, y)
}

#[test]
fn test_resampling_methods_equalise_class_counts() {
    let (x, y) = imbalanced(100);
    for method in ["oversample", "smote", "borderline_smote", "undersample", "true"] {
        let mut rng = StdRng::seed_from_u64(3);
        let balanced = balance_samples(&x, &y, Some(method), &mut rng).unwrap();
        let counts = class_counts(&balanced.labels);
        let sizes: Vec<usize> = counts.values().copied().collect();
        assert_eq!(sizes.len(), 2, "{}", method);
        assert!(sizes[0].abs_diff(sizes[1]) <= 1, "{} gave {:?}", method, counts);
        assert_eq!(balanced.data.nrows(), balanced.labels.len());
        assert!(balanced.sample_weight.is_none());
    }
}

#[test]
fn test_adasyn_without_hard_samples_passes_through() {
    // classes are far apart, so no minority sample has a majority neighbour
    let (x, y) = imbalanced(100);
    let mut rng = StdRng::seed_from_u64(3);
    let balanced = balance_samples(&x, &y, Some("adasyn"), &mut rng).unwrap();
    assert_eq!(balanced.data, x);
    assert_eq!(balanced.labels, y);
}

#[test]
fn test_adasyn_balances_overlapping_classes() {
    let y = Array1::from_shape_fn(80, |i| usize::from(i % 4 == 0));
    let x = Array2::from_shape_fn((80, 2), |(i, j)| ((i * 7 + j * 3) % 19) as f64 * 0.1);
    let mut rng = StdRng::seed_from_u64(4);
    let balanced = balance_samples(&x, &y, Some("adasyn"), &mut rng).unwrap();
    let counts = class_counts(&balanced.labels);
    assert_eq!(counts[&0], 60);
    assert!(counts[&1] > 20);
}

#[test]
fn test_undersample_keeps_minority_size() {
    let (x, y) = imbalanced(100);
    let mut rng = StdRng::seed_from_u64(0);
    let balanced = balance_samples(&x, &y, Some("undersample"), &mut rng).unwrap();
    assert_eq!(balanced.labels.len(), 60);
}

#[test]
fn test_exactly_balanced_labels_pass_through() {
    let x = Array2::from_shape_fn((10, 2), |(i, j)| (i + j) as f64);
    let y = Array1::from_vec(vec![1, 1, 1, 1, 1, 0, 0, 0, 0, 0]);
    for method in ["oversample", "smote", "undersample", "balance_weights"] {
        let mut rng = StdRng::seed_from_u64(1);
        let balanced = balance_samples(&x, &y, Some(method), &mut rng).unwrap();
        assert_eq!(balanced.data, x);
        assert_eq!(balanced.labels, y);
        assert!(balanced.sample_weight.is_none(), "{}", method);
    }
}

#[test]
fn test_balance_weights_leave_rows_untouched() {
    let (x, y) = imbalanced(50);
    let mut rng = StdRng::seed_from_u64(1);
    let balanced = balance_samples(&x, &y, Some("balance_weights"), &mut rng).unwrap();
    assert_eq!(balanced.data, x);
    assert_eq!(balanced.labels, y);
    let weights = balanced.sample_weight.expect("weights");
    assert_eq!(weights.len(), 50);
    assert!(weights.iter().all(|&w| w > 0.0));
    assert_eq!(weights, compute_sample_weight(&y));

    // each class carries the same total weight
    let total = |class: usize| -> f64 {
        y.iter().zip(weights.iter()).filter(|(&l, _)| l == class).map(|(_, &w)| w).sum()
    };
    assert!((total(0) - total(1)).abs() < 1e-9);
}

#[test]
fn test_disabled_balancing_is_a_no_op() {
    let (x, y) = imbalanced(30);
    for method in [None, Some("false"), Some("None")] {
        let mut rng = StdRng::seed_from_u64(1);
        let balanced = balance_samples(&x, &y, method, &mut rng).unwrap();
        assert_eq!(balanced.labels, y);
    }
}

#[test]
fn test_unknown_balancing_method_is_an_error() {
    let (x, y) = imbalanced(30);
    let mut rng = StdRng::seed_from_u64(1);
    match balance_samples(&x, &y, Some("bootstrap"), &mut rng) {
        Err(DecoderError::BalancingMethod { input, allowed }) => {
            assert_eq!(input, "bootstrap");
            assert!(allowed.0.contains(&"smote"));
        }
        other => panic!("unexpected {:?}", other.map(|b| b.labels)),
    }
}

#[test]
fn test_validation_split_never_straddles_a_group() {
    let n = 120;
    let x = Array2::from_shape_fn((n, 2), |(i, j)| (i * 2 + j) as f64);
    let y = Array1::from_shape_fn(n, |i| i % 2);
    let groups = Array1::from_shape_fn(n, |i| (i / 6) as i64);

    for seed in 0..5 {
        let mut rng = StdRng::seed_from_u64(seed);
        let split = validation_split(&x, &y, &groups, 0.8, &mut rng).unwrap();
        assert_eq!(split.eval_set.len(), 1);
        let (x_val, y_val) = &split.eval_set[0];
        assert_eq!(x_val.nrows(), y_val.len());
        assert_eq!(split.data_train.nrows() + x_val.nrows(), n);

        // features encode the row index, so recover the validation groups from them
        let val_groups: HashSet<i64> = x_val.column(0).iter().map(|v| (*v as i64 / 2) / 6).collect();
        let train_groups: HashSet<i64> = split.groups_train.iter().copied().collect();
        assert!(val_groups.is_disjoint(&train_groups));
        assert_eq!(train_groups.len(), 16);
        assert_eq!(val_groups.len(), 4);
    }
}

#[test]
fn test_train_fraction_controls_group_ratio() {
    let n = 100;
    let x = Array2::zeros((n, 1));
    let y = Array1::from_shape_fn(n, |i| i % 2);
    let groups = Array1::from_shape_fn(n, |i| (i / 5) as i64);
    let mut rng = StdRng::seed_from_u64(9);
    for (fraction, expected) in [(0.5, 10), (0.8, 16)] {
        let split = validation_split(&x, &y, &groups, fraction, &mut rng).unwrap();
        let train_groups: HashSet<i64> = split.groups_train.iter().copied().collect();
        assert_eq!(train_groups.len(), expected);
    }
}
