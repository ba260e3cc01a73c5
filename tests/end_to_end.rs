use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use pte_decode::dataset::class_counts;
use pte_decode::{create_decoder, create_decoder_with_seed, DecoderError};

/// Two-class table with a 70/30 imbalance; class 1 is shifted along every feature.
fn grouped_trials(n: usize, seed: u64) -> (Array2<f64>, Array1<usize>, Array1<i64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let y = Array1::from_shape_fn(n, |i| usize::from(i % 10 >= 7));
    let mut x = Array2::from_shape_fn((n, 3), |_| rng.gen_range(-1.0..1.0));
    for (i, mut row) in x.axis_iter_mut(Axis(0)).enumerate() {
        if y[i] == 1 {
            row += 1.5;
        }
    }
    let groups = Array1::from_shape_fn(n, |i| (i / 20) as i64);
    (x, y, groups)
}

#[test]
fn test_dummy_baseline_scores_at_chance() {
    let (x, y, groups) = grouped_trials(200, 1);
    let (x_test, y_test, _) = grouped_trials(400, 2);

    let mut decoder = create_decoder("dummy", "balanced_accuracy", Some("oversample"), false).unwrap();
    let predictions = decoder.fit_and_predict(&x, &x_test, &y, &groups).unwrap();
    assert_eq!(predictions.len(), 400);

    let snapshot = decoder.training_snapshot().expect("snapshot after fit");
    let counts = class_counts(&snapshot.labels);
    assert_eq!(counts[&0], counts[&1]);
    assert_eq!(counts[&0], 140);

    let score = decoder.get_score(&x_test, &y_test).unwrap();
    assert!((score - 0.5).abs() < 0.1, "dummy score {}", score);
}

#[test]
fn test_lda_round_trip_appends_extension() {
    let (x, y, groups) = grouped_trials(160, 3);
    let (x_test, _, _) = grouped_trials(50, 4);

    let mut decoder = create_decoder("lda", "balanced_accuracy", Some("smote"), false).unwrap();
    decoder.fit(&x, &y, &groups).unwrap();
    let before = decoder.predict(&x_test).unwrap();
    let proba_before = decoder.predict_proba(&x_test).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let written = decoder.save_model(&dir.path().join("model")).unwrap();
    assert_eq!(written, dir.path().join("model.lda"));
    assert!(written.exists());

    let mut restored = create_decoder("lda", "balanced_accuracy", None, false).unwrap();
    restored.load_model(&written).unwrap();
    assert_eq!(restored.predict(&x_test).unwrap(), before);
    assert_eq!(restored.predict_proba(&x_test).unwrap(), proba_before);
    assert!(restored.training_snapshot().is_none());
}

#[test]
fn test_model_files_are_not_interchangeable() {
    let (x, y, groups) = grouped_trials(100, 5);
    let mut lda = create_decoder("lda", "balanced_accuracy", None, false).unwrap();
    lda.fit(&x, &y, &groups).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let written = lda.save_model(&dir.path().join("model.bin")).unwrap();
    assert_eq!(written.extension().unwrap(), "lda");

    let mut qda = create_decoder("qda", "balanced_accuracy", None, false).unwrap();
    assert!(matches!(qda.load_model(&written), Err(DecoderError::Serialization(_))));
    assert!(qda.model().is_none());
}

#[test]
fn test_loading_a_foreign_file_is_a_serialization_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.lda");
    std::fs::write(&path, "trial,channel,power\n1,C3,0.25\n").unwrap();

    let mut lda = create_decoder("lda", "balanced_accuracy", None, false).unwrap();
    assert!(matches!(lda.load_model(&path), Err(DecoderError::Serialization(_))));
    assert!(lda.model().is_none());

    let short = dir.path().join("short.lda");
    std::fs::write(&short, [1u8, 2, 3]).unwrap();
    assert!(matches!(lda.load_model(&short), Err(DecoderError::Serialization(_))));
}

#[test]
fn test_boosted_decoders_learn_shifted_class() {
    let (x, y, groups) = grouped_trials(240, 6);
    let (x_test, y_test, _) = grouped_trials(120, 7);

    for name in ["xgb", "catboost"] {
        let mut decoder =
            create_decoder_with_seed(name, "balanced_accuracy", Some("balance_weights"), false, Some(3)).unwrap();
        decoder.fit(&x, &y, &groups).unwrap();
        let score = decoder.get_score(&x_test, &y_test).unwrap();
        assert!(score > 0.8, "{} scored {}", name, score);

        let snapshot = decoder.training_snapshot().unwrap();
        assert!(snapshot.sample_weight.is_some());
        // the early-stopping split removes whole groups from training
        assert!(snapshot.labels.len() < 240);
        assert_eq!(snapshot.groups, groups);
    }
}

#[test]
fn test_seeded_boosting_is_reproducible() {
    let (x, y, groups) = grouped_trials(120, 8);
    let fit = || {
        let mut decoder = create_decoder_with_seed("catboost", "log_loss", Some("oversample"), false, Some(9)).unwrap();
        decoder.fit(&x, &y, &groups).unwrap();
        decoder.predict_proba(&x).unwrap()
    };
    assert_eq!(fit(), fit());
}

#[test]
fn test_seeded_dummy_predictions_are_reproducible() {
    let (x, y, groups) = grouped_trials(100, 13);
    let (x_test, _, _) = grouped_trials(60, 14);
    let run = || {
        let mut decoder = create_decoder_with_seed("dummy", "balanced_accuracy", Some("oversample"), false, Some(21)).unwrap();
        decoder.fit_and_predict(&x, &x_test, &y, &groups).unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_tuned_catboost_beats_chance() {
    let (x, y, groups) = grouped_trials(160, 12);
    let (x_test, y_test, _) = grouped_trials(100, 15);

    let mut decoder = create_decoder_with_seed("catboost", "balanced_accuracy", Some("oversample"), true, Some(5)).unwrap();
    decoder.fit(&x, &y, &groups).unwrap();
    let score = decoder.get_score(&x_test, &y_test).unwrap();
    assert!(score > 0.7, "tuned catboost scored {}", score);
}

#[test]
fn test_log_loss_scoring_of_logistic_decoder() {
    let (x, y, groups) = grouped_trials(200, 10);
    let (x_test, y_test, _) = grouped_trials(100, 11);
    let mut decoder = create_decoder("lr", "log_loss", None, false).unwrap();
    decoder.fit(&x, &y, &groups).unwrap();
    let loss = decoder.get_score(&x_test, &y_test).unwrap();
    assert!(loss > 0.0 && loss < 0.5, "log-loss {}", loss);
}
